/*
Copyright 2025 Google LLC

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    https://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Graph implementation emission.
//!
//! One struct per graph: a provider field per value binding, constructed
//! in the sealed topological order. Cycle back edges go through delegate
//! providers patched immediately after their target exists. Scoped
//! bindings wrap their factory in the memoizing primitive so each graph
//! instance memoizes independently, including parent instances shared by
//! extensions.

use super::*;
use crate::diagnostics::InternalError;
use crate::graph::{
    Binding, BindingGraph, BindingIdx, BuiltGraph, DepLocation, ResolvedDependency, RootRequest,
};
use quote::{format_ident, quote};

pub fn emit_graph_impl(built: &BuiltGraph) -> Result<EmittedArtifact, InternalError> {
    let graph = &built.graph;
    let seal = graph
        .seal_data()
        .ok_or_else(|| InternalError::NotPopulated(graph.decl.name().to_owned()))?;
    let name = impl_name(graph);
    let requirements = ancestor_requirements(built);
    let no_receiver = quote! {};
    let self_receiver = quote! { self. };

    // ---- fields ----------------------------------------------------------

    let mut fields = quote! {};
    let mut field_idents = Vec::new();
    for (position, (_, key)) in requirements.iter().enumerate() {
        let field = inherited_field_name(position, key);
        let field_type = provider_field_type(key);
        fields = quote! { #fields #field: #field_type, };
        field_idents.push(field);
    }
    for idx in &seal.order {
        let binding = graph.binding(*idx);
        if !has_field(binding) {
            continue;
        }
        let field = field_name(graph, *idx)?;
        let field_type = binding_field_type(binding);
        fields = quote! { #fields #field: #field_type, };
        field_idents.push(field);
    }

    // ---- constructor -----------------------------------------------------

    let ctor_name = match &graph.decl.creator {
        Some(creator) => format_ident!("{}", creator.method_name),
        None if graph.decl.is_extension => format_ident!("create"),
        None => format_ident!("new"),
    };

    let mut ctor_params = quote! {};
    for (position, (_, key)) in requirements.iter().enumerate() {
        let field = inherited_field_name(position, key);
        let field_type = provider_field_type(key);
        ctor_params = quote! { #ctor_params #field: #field_type, };
    }
    if let Some(creator) = &graph.decl.creator {
        for param in &creator.params {
            let ident = format_ident!("{}", param.name);
            let ty = param.key.type_data().syn_type();
            ctor_params = quote! { #ctor_params #ident: #ty, };
        }
    }

    // Delegate providers for every cycle back-edge target.
    let mut delegate_targets: Vec<BindingIdx> = seal
        .back_edges
        .iter()
        .map(|(_, to)| *to)
        .collect::<std::collections::HashSet<_>>()
        .into_iter()
        .collect();
    delegate_targets.sort_by_key(|idx| seal.ordinals[idx.index()]);

    let mut statements = quote! {};
    for target in &delegate_targets {
        let delegate = delegate_name(graph, *target)?;
        let value = graph.binding(*target).key().type_data().syn_type();
        statements = quote! {
            #statements
            let #delegate: ::std::rc::Rc<::metro::DelegateProvider<#value>> =
                ::std::rc::Rc::new(::metro::DelegateProvider::new());
        };
    }

    for idx in &seal.order {
        let binding = graph.binding(*idx);
        if has_field(binding) {
            let field = field_name(graph, *idx)?;
            let field_type = binding_field_type(binding);
            let init = binding_init(graph, &requirements, *idx, &no_receiver)?;
            statements = quote! {
                #statements
                let #field: #field_type = #init;
            };
        }
        // Patch the delegate as soon as its target is constructed.
        if delegate_targets.contains(idx) {
            let delegate = delegate_name(graph, *idx)?;
            let target_expr = provider_rc_expr(
                graph,
                &requirements,
                DepLocation::Local(*idx),
                binding.key(),
                &no_receiver,
            )?;
            statements = quote! {
                #statements
                #delegate.set_delegate(#target_expr.clone());
            };
        }
    }

    let ctor = quote! {
        pub fn #ctor_name(#ctor_params) -> Self {
            #statements
            Self { #(#field_idents),* }
        }
    };

    // ---- trait overrides -------------------------------------------------

    let mut overrides = quote! {};
    for (i, request) in graph.root_requests.iter().enumerate() {
        let location = graph.root_locations.get(i).copied();
        match request {
            RootRequest::Accessor(accessor) => {
                overrides = append(
                    overrides,
                    accessor_override(built, &requirements, accessor, location, &self_receiver)?,
                );
            }
            RootRequest::Injector { decl, injector_key } => {
                let idx = graph
                    .lookup(injector_key)
                    .ok_or_else(|| InternalError::LostKey(injector_key.readable()))?;
                let injector = factory_name(graph.binding(idx))
                    .ok_or_else(|| InternalError::LostKey(injector_key.readable()))?;
                let method = format_ident!("{}", decl.name);
                let target = decl.target.type_data().syn_type();
                let args =
                    construction_args(graph, &requirements, graph.deps(idx), &self_receiver)?;
                overrides = quote! {
                    #overrides
                    fn #method(&self, target: &mut #target) {
                        #injector::new(#args).inject_members(target);
                    }
                };
            }
            RootRequest::Extension { .. } => {
                // Generated with the graph; nothing to override.
            }
        }
    }

    let graph_trait = graph.decl.type_data.syn_type();
    let tokens = quote! {
        pub struct #name {
            #fields
        }

        impl #name {
            #ctor
        }

        impl #graph_trait for #name {
            #overrides
        }
    };
    Ok(EmittedArtifact {
        name: name.to_string(),
        tokens,
    })
}

fn append(left: proc_macro2::TokenStream, right: proc_macro2::TokenStream) -> proc_macro2::TokenStream {
    quote! { #left #right }
}

fn delegate_name(graph: &BindingGraph, idx: BindingIdx) -> Result<proc_macro2::Ident, InternalError> {
    let seal = graph
        .seal_data()
        .ok_or_else(|| InternalError::NotPopulated(graph.decl.name().to_owned()))?;
    let mut short = graph.binding(idx).key().short_name().replace("::", "_");
    short.make_ascii_lowercase();
    Ok(format_ident!(
        "delegate_{}_{}",
        seal.ordinals[idx.index()],
        short
    ))
}

/// Argument list for a factory's `new` call: one provider expression per
/// non-defaulted dependency, back edges through their delegates.
fn construction_args(
    graph: &BindingGraph,
    requirements: &[(u32, crate::keys::TypeKey)],
    deps: &[ResolvedDependency],
    receiver: &proc_macro2::TokenStream,
) -> Result<proc_macro2::TokenStream, InternalError> {
    let mut args = quote! {};
    for dep in deps {
        if dep.location == DepLocation::Default {
            continue;
        }
        let expr = dep_provider_expr(graph, requirements, None, dep, receiver)?;
        args = quote! { #args #expr.clone(), };
    }
    Ok(args)
}

fn dep_provider_expr(
    graph: &BindingGraph,
    requirements: &[(u32, crate::keys::TypeKey)],
    from: Option<BindingIdx>,
    dep: &ResolvedDependency,
    receiver: &proc_macro2::TokenStream,
) -> Result<proc_macro2::TokenStream, InternalError> {
    if let (Some(from), DepLocation::Local(to)) = (from, dep.location) {
        let is_back_edge = graph
            .seal_data()
            .map(|seal| seal.back_edges.contains(&(from, to)))
            .unwrap_or(false);
        if is_back_edge {
            let delegate = delegate_name(graph, to)?;
            return Ok(quote! { #delegate });
        }
    }
    provider_rc_expr(graph, requirements, dep.location, &dep.request.key, receiver)
}

/// The initializer for one provider field in the constructor body.
fn binding_init(
    graph: &BindingGraph,
    requirements: &[(u32, crate::keys::TypeKey)],
    idx: BindingIdx,
    receiver: &proc_macro2::TokenStream,
) -> Result<proc_macro2::TokenStream, InternalError> {
    let binding = graph.binding(idx);
    let scope = binding.scope();
    let inner = match binding {
        Binding::Instance(instance) => {
            let param = format_ident!("{}", instance.param_name);
            quote! { ::std::rc::Rc::new(::metro::InstanceFactory::new(#param)) }
        }
        Binding::Provides(_) | Binding::ConstructorInject(_) => {
            let factory = factory_name(binding)
                .ok_or_else(|| InternalError::LostKey(binding.key().readable()))?;
            let mut args = quote! {};
            for dep in graph.deps(idx) {
                if dep.location == DepLocation::Default {
                    continue;
                }
                let expr = dep_provider_expr(graph, requirements, Some(idx), dep, receiver)?;
                args = quote! { #args #expr.clone(), };
            }
            quote! { ::std::rc::Rc::new(#factory::new(#args)) }
        }
        Binding::Alias(alias) => {
            // Only scoped aliases own a field; they memoize the target.
            let dep = graph
                .deps(idx)
                .first()
                .ok_or_else(|| InternalError::LostKey(alias.key.readable()))?;
            let target = dep_provider_expr(graph, requirements, Some(idx), dep, receiver)?;
            quote! { ::std::rc::Rc::new(::metro::SingleCheck::new(#target.clone())) }
        }
        Binding::MultiSet(set) => {
            let mut builder = quote! { ::metro::SetFactory::builder() };
            for (i, contribution) in set.contributions.iter().enumerate() {
                let dep = &graph.deps(idx)[i];
                let expr = dep_provider_expr(graph, requirements, Some(idx), dep, receiver)?;
                builder = if contribution.collection {
                    quote! { #builder.add_collection_provider(#expr.clone()) }
                } else {
                    quote! { #builder.add_provider(#expr.clone()) }
                };
            }
            quote! { ::std::rc::Rc::new(#builder.build()) }
        }
        Binding::MultiMap(map) => {
            let mut builder = if map.value_provider {
                quote! { ::metro::MapProviderFactory::builder() }
            } else {
                quote! { ::metro::MapFactory::builder() }
            };
            for (i, contribution) in map.contributions.iter().enumerate() {
                let dep = &graph.deps(idx)[i];
                let key_literal = contribution.map_key.literal_tokens();
                let expr = dep_provider_expr(graph, requirements, Some(idx), dep, receiver)?;
                builder = quote! { #builder.put(#key_literal, #expr.clone()) };
            }
            quote! { ::std::rc::Rc::new(#builder.build()) }
        }
        Binding::AssistedFactory(_) => {
            let factory = factory_name(binding)
                .ok_or_else(|| InternalError::LostKey(binding.key().readable()))?;
            let factory_impl = assisted_factory_impl_name(binding)
                .ok_or_else(|| InternalError::LostKey(binding.key().readable()))?;
            let mut captures = quote! {};
            let mut args = quote! {};
            for (i, dep) in graph.deps(idx).iter().enumerate() {
                if dep.location == DepLocation::Default {
                    continue;
                }
                let var = format_ident!("captured_{}", i);
                let expr = dep_provider_expr(graph, requirements, Some(idx), dep, receiver)?;
                captures = quote! { #captures let #var = #expr.clone(); };
                args = quote! { #args #var.clone(), };
            }
            quote! {
                ::std::rc::Rc::new(::metro::ProviderFn::new({
                    #captures
                    move || #factory_impl { factory: #factory::new(#args) }
                }))
            }
        }
        Binding::MembersInjector(_) | Binding::GraphExtensionLink(_) => {
            return Err(InternalError::LostKey(binding.key().readable()));
        }
    };
    if scope.is_unbounded() || matches!(binding, Binding::Alias(_)) {
        Ok(inner)
    } else {
        Ok(quote! { ::std::rc::Rc::new(::metro::SingleCheck::new(#inner)) })
    }
}

/// One accessor override. The body depends on what the request resolved
/// to: plain value bindings unwrap their provider per the request
/// wrapper; assisted factories and graph extensions construct their
/// implementation types.
fn accessor_override(
    built: &BuiltGraph,
    requirements: &[(u32, crate::keys::TypeKey)],
    accessor: &crate::asm::nodes::AccessorDecl,
    location: Option<DepLocation>,
    receiver: &proc_macro2::TokenStream,
) -> Result<proc_macro2::TokenStream, InternalError> {
    let graph = &built.graph;
    let method = format_ident!("{}", accessor.name);

    let Some(idx) = graph.lookup(&accessor.request.key) else {
        // Inherited from an ancestor.
        let Some(DepLocation::Ancestor(depth)) = location else {
            return Err(InternalError::LostKey(accessor.request.key.readable()));
        };
        let position = inherited_position(requirements, depth, &accessor.request.key)
            .ok_or_else(|| InternalError::LostKey(accessor.request.key.readable()))?;
        let field = inherited_field_name(position, &accessor.request.key);
        let return_type = wrapped_type(&accessor.request);
        let body = unwrap_expr(&accessor.request, quote! { #receiver #field });
        return Ok(quote! {
            fn #method(&self) -> #return_type {
                #body
            }
        });
    };

    match graph.binding(idx) {
        Binding::AssistedFactory(binding) => {
            let factory_impl = assisted_factory_impl_name(graph.binding(idx))
                .ok_or_else(|| InternalError::LostKey(binding.key.readable()))?;
            let field = field_name(graph, idx)?;
            Ok(quote! {
                fn #method(&self) -> #factory_impl {
                    #receiver #field.get()
                }
            })
        }
        Binding::GraphExtensionLink(link) => {
            let child = built
                .children
                .iter()
                .find(|c| c.graph.decl.class == link.child)
                .ok_or_else(|| InternalError::LostKey(link.key.readable()))?;
            let child_name = impl_name(&child.graph);
            let child_requirements = ancestor_requirements(child);
            let mut args = quote! {};
            let mut named_args = quote! {};
            for (position, (depth, key)) in child_requirements.iter().enumerate() {
                let expr = if *depth == 1 {
                    let local = graph
                        .lookup(key)
                        .ok_or_else(|| InternalError::LostKey(key.readable()))?;
                    provider_rc_expr(
                        graph,
                        requirements,
                        DepLocation::Local(local),
                        key,
                        receiver,
                    )?
                } else {
                    let inherited = inherited_position(requirements, depth - 1, key)
                        .ok_or_else(|| InternalError::LostKey(key.readable()))?;
                    let field = inherited_field_name(inherited, key);
                    quote! { #receiver #field }
                };
                let child_field = inherited_field_name(position, key);
                args = quote! { #args #expr.clone(), };
                named_args = quote! { #named_args #child_field: #expr.clone(), };
            }
            if link.via_factory {
                // The accessor exposes the child's factory; the factory
                // implementation forwards the creator arguments.
                let factory_impl = child_factory_impl_name(child);
                Ok(quote! {
                    fn #method(&self) -> #factory_impl {
                        #factory_impl { #named_args }
                    }
                })
            } else {
                let ctor = match &child.graph.decl.creator {
                    Some(creator) => format_ident!("{}", creator.method_name),
                    None => format_ident!("create"),
                };
                Ok(quote! {
                    fn #method(&self) -> #child_name {
                        #child_name::#ctor(#args)
                    }
                })
            }
        }
        _ => {
            let return_type = wrapped_type(&accessor.request);
            let provider = provider_rc_expr(
                graph,
                requirements,
                DepLocation::Local(idx),
                &accessor.request.key,
                receiver,
            )?;
            let body = unwrap_expr(&accessor.request, provider);
            Ok(quote! {
                fn #method(&self) -> #return_type {
                    #body
                }
            })
        }
    }
}

fn child_factory_impl_name(child: &BuiltGraph) -> proc_macro2::Ident {
    format_ident!(
        "{}FactoryImpl",
        child.graph.decl.type_data.short_name().replace("::", "_")
    )
}

/// Factory implementation for a child exposed through its extension
/// factory: holds the providers the child needs from its ancestors and
/// forwards creator arguments.
pub fn emit_child_factory_impl(
    parent: &BuiltGraph,
    child: &BuiltGraph,
) -> Result<Option<EmittedArtifact>, InternalError> {
    let link_is_factory = parent.graph.bindings().any(|(_, b)| {
        matches!(b, Binding::GraphExtensionLink(link) if link.child == child.graph.decl.class && link.via_factory)
    });
    if !link_is_factory {
        return Ok(None);
    }
    let Some(creator) = &child.graph.decl.creator else {
        return Ok(None);
    };

    let name = child_factory_impl_name(child);
    let child_name = impl_name(&child.graph);
    let requirements = ancestor_requirements(child);

    let mut fields = quote! {};
    let mut forwards = quote! {};
    for (position, (_, key)) in requirements.iter().enumerate() {
        let field = inherited_field_name(position, key);
        let field_type = provider_field_type(key);
        fields = quote! { #fields pub #field: #field_type, };
        forwards = quote! { #forwards self.#field.clone(), };
    }

    let mut create_params = quote! {};
    let mut create_args = quote! {};
    for param in &creator.params {
        let ident = format_ident!("{}", param.name);
        let ty = param.key.type_data().syn_type();
        create_params = quote! { #create_params #ident: #ty, };
        create_args = quote! { #create_args #ident, };
    }

    let iface = creator.factory_type.syn_type();
    let method = format_ident!("{}", creator.method_name);
    let ctor = format_ident!("{}", creator.method_name);

    let tokens = quote! {
        pub struct #name {
            #fields
        }

        impl #iface for #name {
            fn #method(&self, #create_params) -> #child_name {
                #child_name::#ctor(#forwards #create_args)
            }
        }
    };
    Ok(Some(EmittedArtifact {
        name: name.to_string(),
        tokens,
    }))
}
