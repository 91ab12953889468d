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

//! Factory class emission: one `Provider` implementation per
//! value-producing binding.

use super::{
    assisted_factory_impl_name, default_value_expr, factory_name, unwrap_expr, EmittedArtifact,
};
use crate::asm::nodes::ParamDecl;
use crate::diagnostics::InternalError;
use crate::emit::injectors;
use crate::graph::{Binding, BindingGraph, DepLocation, ResolvedDependency};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

pub fn emit_factories(graph: &BindingGraph) -> Result<Vec<EmittedArtifact>, InternalError> {
    let seal = graph
        .seal_data()
        .ok_or_else(|| InternalError::NotPopulated(graph.decl.name().to_owned()))?;
    let mut artifacts = Vec::new();
    for idx in &seal.order {
        let binding = graph.binding(*idx);
        match binding {
            Binding::ConstructorInject(_) | Binding::Provides(_) => {
                artifacts.push(value_factory(binding, graph.deps(*idx))?);
            }
            Binding::AssistedFactory(_) => {
                let (factory, factory_impl) =
                    assisted_factories(binding, graph.deps(*idx))?;
                artifacts.push(factory);
                artifacts.push(factory_impl);
            }
            Binding::MembersInjector(_) => {
                artifacts.push(injectors::members_injector(binding, graph.deps(*idx))?);
            }
            _ => {}
        }
    }
    Ok(artifacts)
}

/// Field name inside a factory for its `i`-th dependency.
pub fn dep_field(i: usize, dep: &ResolvedDependency) -> Ident {
    let mut short = dep.request.key.short_name().replace("::", "_");
    short.make_ascii_lowercase();
    format_ident!("provider_{}_{}", i, short)
}

/// The fields, constructor params and initializers shared by every
/// factory shape. Defaulted dependencies get no field.
pub struct FactoryFields {
    pub fields: TokenStream,
    pub params: TokenStream,
    pub inits: TokenStream,
}

pub fn factory_fields(deps: &[ResolvedDependency]) -> FactoryFields {
    let mut fields = quote! {};
    let mut params = quote! {};
    let mut inits = quote! {};
    for (i, dep) in deps.iter().enumerate() {
        if dep.location == DepLocation::Default {
            continue;
        }
        let field = dep_field(i, dep);
        let value = dep.request.key.type_data().syn_type();
        fields = quote! { #fields #field: ::std::rc::Rc<dyn ::metro::Provider<#value>>, };
        params = quote! { #params #field: ::std::rc::Rc<dyn ::metro::Provider<#value>>, };
        inits = quote! { #inits #field, };
    }
    FactoryFields {
        fields,
        params,
        inits,
    }
}

fn dep_value_expr(i: usize, dep: &ResolvedDependency) -> TokenStream {
    if dep.location == DepLocation::Default {
        return default_value_expr();
    }
    let field = dep_field(i, dep);
    unwrap_expr(&dep.request, quote! { self.#field })
}

/// Factory for a `ConstructorInject` or `Provides` binding.
fn value_factory(
    binding: &Binding,
    deps: &[ResolvedDependency],
) -> Result<EmittedArtifact, InternalError> {
    let name = factory_name(binding).ok_or_else(|| {
        InternalError::LostKey(binding.key().readable())
    })?;
    let value_type = binding.key().type_data().syn_type();
    let FactoryFields {
        fields,
        params,
        inits,
    } = factory_fields(deps);

    let invoke = match binding {
        Binding::ConstructorInject(b) => {
            let target = b.decl.type_data.syn_type();
            let ctor = format_ident!("{}", b.decl.ctor_name);
            let args = deps
                .iter()
                .enumerate()
                .map(|(i, dep)| dep_value_expr(i, dep));
            quote! { #target::#ctor(#(#args),*) }
        }
        Binding::Provides(b) => {
            let method = format_ident!("{}", b.decl.name);
            if b.decl.is_static {
                let owner = b.decl.owner.syn_type();
                let args = deps
                    .iter()
                    .enumerate()
                    .map(|(i, dep)| dep_value_expr(i, dep));
                quote! { #owner::#method(#(#args),*) }
            } else {
                // The receiver instance is the first dependency.
                let receiver = dep_value_expr(0, &deps[0]);
                let args = deps
                    .iter()
                    .enumerate()
                    .skip(1)
                    .map(|(i, dep)| dep_value_expr(i, dep));
                quote! { #receiver.#method(#(#args),*) }
            }
        }
        _ => return Err(InternalError::LostKey(binding.key().readable())),
    };

    let tokens = quote! {
        pub struct #name {
            #fields
        }

        impl #name {
            pub fn new(#params) -> Self {
                Self { #inits }
            }
        }

        impl ::metro::Provider<#value_type> for #name {
            fn get(&self) -> #value_type {
                #invoke
            }
        }

        impl ::metro::Factory<#value_type> for #name {}
    };
    Ok(EmittedArtifact {
        name: name.to_string(),
        tokens,
    })
}

/// Factory pair for assisted injection: the target factory holding the
/// provided-dependency providers, plus the implementation of the user's
/// factory interface delegating to it.
fn assisted_factories(
    binding: &Binding,
    deps: &[ResolvedDependency],
) -> Result<(EmittedArtifact, EmittedArtifact), InternalError> {
    let Binding::AssistedFactory(b) = binding else {
        return Err(InternalError::LostKey(binding.key().readable()));
    };
    let factory = factory_name(binding).ok_or_else(|| {
        InternalError::LostKey(binding.key().readable())
    })?;
    let factory_impl = assisted_factory_impl_name(binding).ok_or_else(|| {
        InternalError::LostKey(binding.key().readable())
    })?;
    let target = b.target_decl.type_data.syn_type();
    let ctor = format_ident!("{}", b.target_decl.ctor_name);
    let FactoryFields {
        fields,
        params,
        inits,
    } = factory_fields(deps);

    // `create` takes the assisted parameters in factory-method order.
    let mut create_params = quote! {};
    for (name, key, _) in &b.decl.assisted_params {
        let param = format_ident!("{}", name);
        let ty = key.type_data().syn_type();
        create_params = quote! { #create_params #param: #ty, };
    }

    // Constructor arguments follow the injected constructor's order,
    // matching assisted parameters by (type, identifier).
    let mut provided_index = 0usize;
    let mut args = Vec::new();
    for param in &b.target_decl.params {
        if param.is_assisted {
            let matched = match assisted_arg(&b.decl.assisted_params, param) {
                Some(name) => name,
                None => format_ident!("{}", param.name),
            };
            args.push(quote! { #matched });
        } else {
            let dep = &deps[provided_index];
            args.push(dep_value_expr(provided_index, dep));
            provided_index += 1;
        }
    }

    let factory_tokens = quote! {
        pub struct #factory {
            #fields
        }

        impl #factory {
            pub fn new(#params) -> Self {
                Self { #inits }
            }

            pub fn create(&self, #create_params) -> #target {
                #target::#ctor(#(#args),*)
            }
        }
    };

    let iface = b.decl.type_data.syn_type();
    let method = format_ident!("{}", b.decl.method_name);
    let call_args = b.decl.assisted_params.iter().map(|(name, _, _)| {
        let ident = format_ident!("{}", name);
        quote! { #ident }
    });
    let impl_tokens = quote! {
        pub struct #factory_impl {
            pub factory: #factory,
        }

        impl #iface for #factory_impl {
            fn #method(&self, #create_params) -> #target {
                self.factory.create(#(#call_args),*)
            }
        }
    };

    Ok((
        EmittedArtifact {
            name: factory.to_string(),
            tokens: factory_tokens,
        },
        EmittedArtifact {
            name: factory_impl.to_string(),
            tokens: impl_tokens,
        },
    ))
}

/// The factory-method parameter matching a constructor's assisted
/// parameter, by `(type, identifier)`.
fn assisted_arg(
    factory_params: &[(String, crate::keys::TypeKey, String)],
    ctor_param: &ParamDecl,
) -> Option<Ident> {
    factory_params
        .iter()
        .find(|(_, key, id)| {
            *key == ctor_param.request.key && *id == ctor_param.assisted_id
        })
        .map(|(name, _, _)| format_ident!("{}", name))
}
