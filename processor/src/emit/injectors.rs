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

//! Members injector emission.

use super::{factory_name, unwrap_expr, EmittedArtifact};
use crate::asm::nodes::MemberSiteKind;
use crate::diagnostics::InternalError;
use crate::emit::factories::{dep_field, factory_fields, FactoryFields};
use crate::graph::{Binding, DepLocation, ResolvedDependency};
use quote::{format_ident, quote};

/// `{Target}MembersInjector`: assigns `Inject` fields and calls `Inject`
/// setters, supertype sites first (the builder records them in that
/// order).
pub fn members_injector(
    binding: &Binding,
    deps: &[ResolvedDependency],
) -> Result<EmittedArtifact, InternalError> {
    let Binding::MembersInjector(b) = binding else {
        return Err(InternalError::LostKey(binding.key().readable()));
    };
    let name = factory_name(binding)
        .ok_or_else(|| InternalError::LostKey(binding.key().readable()))?;
    let target = b.target_type.syn_type();
    let FactoryFields {
        fields,
        params,
        inits,
    } = factory_fields(deps);

    let mut statements = quote! {};
    for (i, site) in b.sites.iter().enumerate() {
        let dep = &deps[i];
        let value = if dep.location == DepLocation::Default {
            super::default_value_expr()
        } else {
            let field = dep_field(i, dep);
            unwrap_expr(&dep.request, quote! { self.#field })
        };
        let member = format_ident!("{}", site.name);
        statements = match site.kind {
            MemberSiteKind::Field => quote! {
                #statements
                target.#member = #value;
            },
            MemberSiteKind::Setter => quote! {
                #statements
                target.#member(#value);
            },
        };
    }

    let tokens = quote! {
        pub struct #name {
            #fields
        }

        impl #name {
            pub fn new(#params) -> Self {
                Self { #inits }
            }
        }

        impl ::metro::MembersInjector<#target> for #name {
            fn inject_members(&self, target: &mut #target) {
                #statements
            }
        }
    };
    Ok(EmittedArtifact {
        name: name.to_string(),
        tokens,
    })
}
