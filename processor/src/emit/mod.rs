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

//! Code generation for sealed graphs.
//!
//! Emission is a pure function of the sealed graph: fields, factories and
//! overrides are ordered by the sealed ordinals, so identical inputs
//! produce byte-identical token streams.

mod factories;
mod graph_impl;
mod injectors;

use crate::diagnostics::InternalError;
use crate::graph::{Binding, BindingGraph, BindingIdx, BuiltGraph, DepLocation};
use crate::keys::{ContextualTypeKey, TypeKey, WrapperKind};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

/// One synthetic declaration handed back to the host IR writer.
#[derive(Debug, Clone)]
pub struct EmittedArtifact {
    pub name: String,
    pub tokens: TokenStream,
}

/// Emits the implementation class and all factory classes for a sealed
/// graph and, recursively, its extensions.
pub fn emit_tree(built: &BuiltGraph) -> Result<Vec<EmittedArtifact>, InternalError> {
    let mut artifacts = Vec::new();
    emit_into(built, &mut artifacts)?;
    Ok(artifacts)
}

fn emit_into(built: &BuiltGraph, artifacts: &mut Vec<EmittedArtifact>) -> Result<(), InternalError> {
    artifacts.extend(factories::emit_factories(&built.graph)?);
    artifacts.push(graph_impl::emit_graph_impl(built)?);
    for child in &built.children {
        if let Some(factory_impl) = graph_impl::emit_child_factory_impl(built, child)? {
            artifacts.push(factory_impl);
        }
        emit_into(child, artifacts)?;
    }
    Ok(())
}

// ---- naming -------------------------------------------------------------

/// `AppGraphMetroGraph` for roots, `ChildImpl` for extensions.
pub fn impl_name(graph: &BindingGraph) -> Ident {
    let short = graph.decl.type_data.short_name().replace("::", "_");
    if graph.decl.is_extension {
        format_ident!("{}Impl", short)
    } else {
        format_ident!("{}MetroGraph", short)
    }
}

pub fn factory_name(binding: &Binding) -> Option<Ident> {
    match binding {
        Binding::ConstructorInject(b) => Some(format_ident!(
            "{}MetroFactory",
            b.decl.type_data.short_name().replace("::", "_")
        )),
        Binding::Provides(b) => Some(format_ident!(
            "{}_{}MetroFactory",
            b.decl.owner.short_name().replace("::", "_"),
            b.decl.name
        )),
        Binding::AssistedFactory(b) => Some(format_ident!(
            "{}MetroFactory",
            b.target_decl.type_data.short_name().replace("::", "_")
        )),
        Binding::MembersInjector(b) => Some(format_ident!(
            "{}MembersInjector",
            b.target_type.short_name().replace("::", "_")
        )),
        _ => None,
    }
}

pub fn assisted_factory_impl_name(binding: &Binding) -> Option<Ident> {
    match binding {
        Binding::AssistedFactory(b) => Some(format_ident!(
            "{}Impl",
            b.decl.type_data.short_name().replace("::", "_")
        )),
        _ => None,
    }
}

fn binding_kind_str(binding: &Binding) -> &'static str {
    match binding {
        Binding::Provides(_) => "provides",
        Binding::ConstructorInject(_) => "inject",
        Binding::Alias(_) => "alias",
        Binding::MultiSet(_) | Binding::MultiMap(_) => "multi",
        Binding::AssistedFactory(_) => "assisted",
        Binding::MembersInjector(_) => "injector",
        Binding::GraphExtensionLink(_) => "extension",
        Binding::Instance(_) => "instance",
    }
}

/// Deterministic field name: binding kind, sealed ordinal, short key
/// form.
pub fn field_name(graph: &BindingGraph, idx: BindingIdx) -> Result<Ident, InternalError> {
    let seal = graph
        .seal_data()
        .ok_or_else(|| InternalError::NotPopulated(graph.decl.name().to_owned()))?;
    let binding = graph.binding(idx);
    let ordinal = seal.ordinals[idx.index()];
    Ok(format_ident!(
        "{}_{}_{}",
        binding_kind_str(binding),
        ordinal,
        short_fragment(binding.key())
    ))
}

fn short_fragment(key: &TypeKey) -> String {
    let mut fragment = key.short_name().replace("::", "_");
    fragment.make_ascii_lowercase();
    fragment
}

/// Name of the inherited-provider field holding an ancestor's binding.
pub fn inherited_field_name(position: usize, key: &TypeKey) -> Ident {
    format_ident!("inherited_{}_{}", position, short_fragment(key))
}

/// Whether a binding owns a provider field in the graph implementation.
/// Aliases without a scope forward to their target's field; links and
/// members injectors construct per call.
pub fn has_field(binding: &Binding) -> bool {
    match binding {
        Binding::Alias(alias) => !alias.scope.is_unbounded(),
        Binding::GraphExtensionLink(_) | Binding::MembersInjector(_) => false,
        _ => true,
    }
}

/// Token type of a binding's provider field. Assisted factories provide
/// their generated implementation type; everything else provides the
/// key's value type.
pub fn binding_field_type(binding: &Binding) -> TokenStream {
    if let Binding::AssistedFactory(_) = binding {
        let factory_impl = assisted_factory_impl_name(binding).expect("assisted impl name");
        return quote! { ::std::rc::Rc<dyn ::metro::Provider<#factory_impl>> };
    }
    provider_field_type(binding.key())
}

// ---- ancestor requirements ----------------------------------------------

/// Providers a graph must receive from above it at construction:
/// `(depth, key)` pairs, nearest ancestor first, deduplicated, in a
/// deterministic order shared by the graph and its creator.
pub fn ancestor_requirements(built: &BuiltGraph) -> Vec<(u32, TypeKey)> {
    let mut requirements: Vec<(u32, TypeKey)> = Vec::new();
    let mut push = |depth: u32, key: &TypeKey| {
        if !requirements.iter().any(|(d, k)| *d == depth && k == key) {
            requirements.push((depth, key.clone()));
        }
    };
    for (idx, _) in built.graph.bindings() {
        for dep in built.graph.deps(idx) {
            if let DepLocation::Ancestor(depth) = dep.location {
                push(depth, &dep.request.key);
            }
        }
    }
    // Root requests may resolve straight into an ancestor (an accessor
    // re-exposing an inherited binding).
    for (request, location) in built
        .graph
        .root_requests
        .iter()
        .zip(built.graph.root_locations.iter())
    {
        if let DepLocation::Ancestor(depth) = location {
            push(*depth, &request.request_key());
        }
    }
    for child in &built.children {
        for (depth, key) in ancestor_requirements(child) {
            if depth > 1 {
                push(depth - 1, &key);
            }
        }
    }
    requirements.sort_by(|(da, ka), (db, kb)| (da, ka.readable()).cmp(&(db, kb.readable())));
    requirements
}

/// Position of `(depth, key)` in the graph's requirement list.
pub fn inherited_position(
    requirements: &[(u32, TypeKey)],
    depth: u32,
    key: &TypeKey,
) -> Option<usize> {
    requirements
        .iter()
        .position(|(d, k)| *d == depth && k == key)
}

// ---- provider expressions -----------------------------------------------

/// Where the value for a binding comes from when referenced.
pub enum ValueSource {
    /// A provider field of this graph.
    Field(BindingIdx),
    /// An inherited provider field.
    Inherited(u32, TypeKey),
    /// The request site's declared default value.
    DefaultValue,
}

/// Follows unscoped aliases to the field that actually produces the
/// value.
pub fn resolve_value(graph: &BindingGraph, idx: BindingIdx) -> Result<ValueSource, InternalError> {
    let binding = graph.binding(idx);
    if let Binding::Alias(alias) = binding {
        if alias.scope.is_unbounded() {
            let dep = graph
                .deps(idx)
                .first()
                .ok_or_else(|| InternalError::LostKey(alias.key.readable()))?;
            return match dep.location {
                DepLocation::Local(target) => resolve_value(graph, target),
                DepLocation::Ancestor(depth) => {
                    Ok(ValueSource::Inherited(depth, dep.request.key.clone()))
                }
                DepLocation::Default => Ok(ValueSource::DefaultValue),
            };
        }
    }
    Ok(ValueSource::Field(idx))
}

/// Expression evaluating to the `Rc<dyn Provider<T>>` for a dependency
/// location. `receiver` is `quote!{self.}` inside methods and empty in
/// the constructor body (where fields are still local bindings).
pub fn provider_rc_expr(
    graph: &BindingGraph,
    requirements: &[(u32, TypeKey)],
    location: DepLocation,
    key: &TypeKey,
    receiver: &TokenStream,
) -> Result<TokenStream, InternalError> {
    match location {
        DepLocation::Local(idx) => match resolve_value(graph, idx)? {
            ValueSource::Field(idx) => {
                let field = field_name(graph, idx)?;
                Ok(quote! { #receiver #field })
            }
            ValueSource::Inherited(depth, key) => {
                inherited_expr(requirements, depth, &key, receiver)
            }
            ValueSource::DefaultValue => Err(InternalError::LostKey(key.readable())),
        },
        DepLocation::Ancestor(depth) => inherited_expr(requirements, depth, key, receiver),
        DepLocation::Default => Err(InternalError::LostKey(key.readable())),
    }
}

fn inherited_expr(
    requirements: &[(u32, TypeKey)],
    depth: u32,
    key: &TypeKey,
    receiver: &TokenStream,
) -> Result<TokenStream, InternalError> {
    let position = inherited_position(requirements, depth, key)
        .ok_or_else(|| InternalError::LostKey(key.readable()))?;
    let field = inherited_field_name(position, key);
    Ok(quote! { #receiver #field })
}

// ---- wrapper rendering --------------------------------------------------

/// Token type of a provider field for values of `key`.
pub fn provider_field_type(key: &TypeKey) -> TokenStream {
    let value = key.type_data().syn_type();
    quote! { ::std::rc::Rc<dyn ::metro::Provider<#value>> }
}

/// Declared return type of a request, including its wrapper.
pub fn wrapped_type(request: &ContextualTypeKey) -> TokenStream {
    let value = request.key.type_data().syn_type();
    match request.wrapper {
        WrapperKind::None => quote! { #value },
        WrapperKind::Provider => quote! { ::std::rc::Rc<dyn ::metro::Provider<#value>> },
        WrapperKind::Lazy => quote! { ::metro::Lazy<#value> },
        WrapperKind::ProviderOfLazy => {
            quote! { ::std::rc::Rc<dyn ::metro::Provider<::metro::Lazy<#value>>> }
        }
    }
}

/// Expression delivering a request's value from a provider expression,
/// honoring the request wrapper.
pub fn unwrap_expr(request: &ContextualTypeKey, provider: TokenStream) -> TokenStream {
    match request.wrapper {
        WrapperKind::None => quote! { #provider.get() },
        WrapperKind::Provider => quote! { #provider.clone() },
        WrapperKind::Lazy => quote! { ::metro::Lazy::new(#provider.clone()) },
        WrapperKind::ProviderOfLazy => quote! {
            ::std::rc::Rc::new(::metro::ProviderFn::new({
                let provider = #provider.clone();
                move || ::metro::Lazy::new(provider.clone())
            }))
        },
    }
}

/// Expression used for a defaulted parameter with no binding.
pub fn default_value_expr() -> TokenStream {
    quote! { ::std::default::Default::default() }
}
