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

use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Clone)]
pub enum TypeRoot {
    Unspecified,
    /// Fully qualified from the dependency universe root.
    Global,
    /// Declared inside a crate / compilation unit named by `crate_name`.
    Crate,
    /// Built-in value type with no path prefix.
    Primitive,
}

impl Default for TypeRoot {
    fn default() -> Self {
        TypeRoot::Unspecified
    }
}

/// Canonical representation of a host type reference.
///
/// The host frontend resolves aliases, imports and `Self` types before
/// lowering, so two `TypeData` values are interchangeable iff they are
/// structurally equal.
#[derive(Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Clone, Default)]
pub struct TypeData {
    pub root: TypeRoot,
    pub path: String,
    pub crate_name: String,
    pub args: Vec<TypeData>,
    pub trait_object: bool,
    pub nullable: bool,
}

impl TypeData {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn global(path: impl Into<String>) -> Self {
        TypeData {
            root: TypeRoot::Global,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn local(path: impl Into<String>, crate_name: impl Into<String>) -> Self {
        TypeData {
            root: TypeRoot::Crate,
            path: path.into(),
            crate_name: crate_name.into(),
            ..Default::default()
        }
    }

    pub fn primitive(path: impl Into<String>) -> Self {
        TypeData {
            root: TypeRoot::Primitive,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_args(mut self, args: Vec<TypeData>) -> Self {
        self.args = args;
        self
    }

    pub fn as_trait_object(mut self) -> Self {
        self.trait_object = true;
        self
    }

    pub fn as_nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Full path of the type in universal form.
    ///
    /// Wrapper markers like nullability are omitted.
    pub fn canonical_string_path(&self) -> String {
        match self.root {
            TypeRoot::Global => format!("::{}", self.path_with_args()),
            TypeRoot::Crate => format!("::{}::{}", self.crate_name, self.path_with_args()),
            TypeRoot::Primitive => self.path.clone(),
            TypeRoot::Unspecified => panic!("canonical_string_path: root unspecified"),
        }
    }

    /// Like [`canonical_string_path`](Self::canonical_string_path) but
    /// without generic arguments; the identity of the declaration itself.
    pub fn canonical_string_path_without_args(&self) -> String {
        match self.root {
            TypeRoot::Global => format!("::{}", self.path),
            TypeRoot::Crate => format!("::{}::{}", self.crate_name, self.path),
            TypeRoot::Primitive => self.path.clone(),
            TypeRoot::Unspecified => panic!("canonical_string_path: root unspecified"),
        }
    }

    /// Human readable form used in diagnostics.
    pub fn readable(&self) -> String {
        let suffix = if self.nullable { "?" } else { "" };
        format!("{}{}", self.canonical_string_path(), suffix)
    }

    /// Unique identifier fragment representing the type, usable inside a
    /// generated identifier.
    pub fn identifier_string(&self) -> String {
        let mut result = String::new();
        if self.trait_object {
            result.push_str("dyn_");
        }
        result.push_str(
            &self
                .canonical_string_path()
                .replace("::", "_")
                .replace('<', "_L_")
                .replace('>', "_R_")
                .replace(',', "_C_")
                .replace(['\'', ' ', '&'], "")
                .replace('-', "_"),
        );
        if self.nullable {
            result.push_str("_opt");
        }
        result
    }

    pub fn identifier(&self) -> syn::Ident {
        quote::format_ident!("{}", self.identifier_string())
    }

    /// The last path segment, for short display names in generated code.
    pub fn short_name(&self) -> &str {
        self.path.rsplit("::").next().unwrap_or(&self.path)
    }

    /// Full path of the type, which can be converted to tokens.
    ///
    /// Nullable types render as `Option<T>`.
    pub fn syn_type(&self) -> syn::Type {
        syn::parse_str(&self.type_string()).unwrap_or_else(|_| {
            panic!("cannot parse type path {}", self.type_string());
        })
    }

    fn type_string(&self) -> String {
        let inner = self.path_with_args();
        let inner = match self.root {
            TypeRoot::Crate => format!("::{}::{}", self.crate_name, inner),
            TypeRoot::Global => format!("::{}", inner),
            TypeRoot::Primitive => inner,
            TypeRoot::Unspecified => panic!("type_string: root unspecified"),
        };
        if self.nullable {
            format!("::std::option::Option<{}>", inner)
        } else {
            inner
        }
    }

    fn path_with_args(&self) -> String {
        let prefix = if self.trait_object { "dyn " } else { "" };
        if self.args.is_empty() {
            return format!("{}{}", prefix, self.path);
        }
        let args = self
            .args
            .iter()
            .map(|t| t.type_string())
            .collect::<Vec<String>>()
            .join(",");
        format!("{}{}<{}>", prefix, self.path, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_type() -> TypeData {
        TypeData::global("std::string::String")
    }

    #[test]
    fn canonical_path_includes_args() {
        let t = TypeData::global("std::vec::Vec").with_args(vec![string_type()]);
        assert_eq!(t.canonical_string_path(), "::std::vec::Vec<::std::string::String>");
        assert_eq!(t.canonical_string_path_without_args(), "::std::vec::Vec");
    }

    #[test]
    fn crate_rooted_path_names_the_crate() {
        let t = TypeData::local("cache::MemCache", "my_app");
        assert_eq!(t.canonical_string_path(), "::my_app::cache::MemCache");
        assert_eq!(t.short_name(), "MemCache");
    }

    #[test]
    fn readable_marks_nullable() {
        let t = string_type().as_nullable();
        assert_eq!(t.readable(), "::std::string::String?");
    }

    #[test]
    fn identifier_string_is_a_valid_fragment() {
        let t = TypeData::global("std::collections::HashMap")
            .with_args(vec![TypeData::primitive("i32"), string_type()]);
        let id = t.identifier_string();
        assert!(id.chars().all(|c| c.is_alphanumeric() || c == '_'), "{}", id);
    }

    #[test]
    fn identifiers_distinguish_nullability_and_dyn() {
        let plain = string_type();
        assert_ne!(plain.identifier_string(), plain.clone().as_nullable().identifier_string());
        assert_ne!(plain.identifier_string(), plain.clone().as_trait_object().identifier_string());
    }

    #[test]
    fn syn_type_renders_nullable_as_option() {
        fn to_string(t: &syn::Type) -> String {
            quote::quote! { #t }.to_string()
        }
        let t = string_type().as_nullable();
        assert_eq!(
            to_string(&t.syn_type()).replace(' ', ""),
            "::std::option::Option<::std::string::String>"
        );
    }
}
