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

use metro_common::{AnnotationData, TypeData};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Path of the deferred-evaluation wrapper in the runtime crate.
pub const PROVIDER_PATH: &str = "metro::Provider";
/// Path of the once-computed wrapper in the runtime crate.
pub const LAZY_PATH: &str = "metro::Lazy";

/// Canonicalized qualifier annotation. Equality is structural over the
/// annotation type and its argument tuple.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct QualifierKey {
    annotation: AnnotationData,
}

impl QualifierKey {
    pub fn new(annotation: AnnotationData) -> Self {
        QualifierKey {
            annotation: annotation.canonicalized(),
        }
    }

    pub fn annotation(&self) -> &AnnotationData {
        &self.annotation
    }
}

impl fmt::Display for QualifierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.annotation)
    }
}

/// Canonical type identity used for binding lookup.
///
/// Two keys are equal iff the type (path, arguments, nullability) and the
/// qualifier both match structurally. The hash is precomputed so key maps
/// stay cheap during graph population.
#[derive(Debug, Clone)]
pub struct TypeKey {
    type_data: TypeData,
    qualifier: Option<QualifierKey>,
    hash: u64,
}

impl TypeKey {
    pub fn new(type_data: TypeData) -> Self {
        TypeKey::qualified(type_data, None)
    }

    pub fn qualified(type_data: TypeData, qualifier: Option<AnnotationData>) -> Self {
        let qualifier = qualifier.map(QualifierKey::new);
        let mut hasher = DefaultHasher::new();
        type_data.hash(&mut hasher);
        qualifier.hash(&mut hasher);
        TypeKey {
            type_data,
            qualifier,
            hash: hasher.finish(),
        }
    }

    pub fn type_data(&self) -> &TypeData {
        &self.type_data
    }

    pub fn qualifier(&self) -> Option<&QualifierKey> {
        self.qualifier.as_ref()
    }

    /// Stable textual form used in diagnostics and reports.
    pub fn readable(&self) -> String {
        match &self.qualifier {
            Some(qualifier) => format!("{} {}", qualifier, self.type_data.readable()),
            None => self.type_data.readable(),
        }
    }

    /// Identifier fragment for generated field and factory names.
    pub fn identifier_string(&self) -> String {
        match &self.qualifier {
            Some(qualifier) => format!(
                "q_{}_{}",
                qualifier.annotation.type_data.identifier_string(),
                self.type_data.identifier_string()
            ),
            None => self.type_data.identifier_string(),
        }
    }

    pub fn short_name(&self) -> String {
        self.type_data.short_name().to_owned()
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.type_data == other.type_data
            && self.qualifier == other.qualifier
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.readable())
    }
}

/// Identity of a user-declared scope marker annotation.
///
/// The reserved [`unbounded`](Self::unbounded) scope means "no scope":
/// a new instance per request.
#[derive(Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub struct ScopeKey {
    path: String,
}

impl ScopeKey {
    pub fn of(type_data: &TypeData) -> Self {
        ScopeKey {
            path: type_data.canonical_string_path_without_args(),
        }
    }

    pub fn of_annotation(annotation: &AnnotationData) -> Self {
        ScopeKey::of(&annotation.type_data)
    }

    pub fn unbounded() -> Self {
        ScopeKey { path: String::new() }
    }

    pub fn is_unbounded(&self) -> bool {
        self.path.is_empty()
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unbounded() {
            write!(f, "Unbounded")
        } else {
            write!(f, "{}", self.path)
        }
    }
}

/// How a consumer receives a dependency.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum WrapperKind {
    None,
    Provider,
    Lazy,
    ProviderOfLazy,
}

impl WrapperKind {
    /// Deferrable wrappers postpone construction of the dependency, which
    /// is what makes an edge eligible to break a cycle.
    pub fn is_deferrable(&self) -> bool {
        !matches!(self, WrapperKind::None)
    }
}

/// A [`TypeKey`] plus the wrapper the request site asked for. The
/// unwrapped key participates in lookup; the wrapper only controls how
/// the consumer receives the value.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct ContextualTypeKey {
    pub key: TypeKey,
    pub wrapper: WrapperKind,
    pub has_default: bool,
}

impl ContextualTypeKey {
    pub fn new(key: TypeKey) -> Self {
        ContextualTypeKey {
            key,
            wrapper: WrapperKind::None,
            has_default: false,
        }
    }

    /// Builds the contextual key for a request site, peeling
    /// `Provider<T>`, `Lazy<T>` and `Provider<Lazy<T>>` wrappers off the
    /// declared type.
    pub fn from_request(
        type_data: &TypeData,
        qualifier: Option<AnnotationData>,
        has_default: bool,
    ) -> Self {
        let (wrapper, inner) = peel_wrappers(type_data);
        ContextualTypeKey {
            key: TypeKey::qualified(inner, qualifier),
            wrapper,
            has_default,
        }
    }

    pub fn is_deferrable(&self) -> bool {
        self.wrapper.is_deferrable()
    }

    pub fn readable(&self) -> String {
        match self.wrapper {
            WrapperKind::None => self.key.readable(),
            WrapperKind::Provider => format!("Provider<{}>", self.key.readable()),
            WrapperKind::Lazy => format!("Lazy<{}>", self.key.readable()),
            WrapperKind::ProviderOfLazy => format!("Provider<Lazy<{}>>", self.key.readable()),
        }
    }
}

fn peel_wrappers(type_data: &TypeData) -> (WrapperKind, TypeData) {
    if type_data.path == PROVIDER_PATH {
        if let Some(inner) = type_data.args.first() {
            if inner.path == LAZY_PATH {
                if let Some(innermost) = inner.args.first() {
                    return (WrapperKind::ProviderOfLazy, innermost.clone());
                }
            }
            return (WrapperKind::Provider, inner.clone());
        }
    }
    if type_data.path == LAZY_PATH {
        if let Some(inner) = type_data.args.first() {
            return (WrapperKind::Lazy, inner.clone());
        }
    }
    (WrapperKind::None, type_data.clone())
}

/// A typed key value attached to a multi-bound map contribution.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum MapKeyValue {
    Str(String),
    Int(i64),
    Bool(bool),
    EnumEntry(TypeData, String),
    /// Class literal keys are keyed by canonical path at runtime.
    ClassLiteral(TypeData),
}

impl MapKeyValue {
    /// The map's key type implied by this key value. Mixing key values
    /// whose key types differ within one map binding is an error.
    pub fn key_type(&self) -> TypeData {
        match self {
            MapKeyValue::Str(_) | MapKeyValue::ClassLiteral(_) => {
                TypeData::global("std::string::String")
            }
            MapKeyValue::Int(_) => TypeData::primitive("i64"),
            MapKeyValue::Bool(_) => TypeData::primitive("bool"),
            MapKeyValue::EnumEntry(enum_type, _) => enum_type.clone(),
        }
    }

    /// Tokens producing the key value in generated code.
    pub fn literal_tokens(&self) -> proc_macro2::TokenStream {
        match self {
            MapKeyValue::Str(s) => quote::quote! { #s.to_owned() },
            MapKeyValue::Int(i) => {
                let literal = proc_macro2::Literal::i64_unsuffixed(*i);
                quote::quote! { #literal }
            }
            MapKeyValue::Bool(b) => quote::quote! { #b },
            MapKeyValue::EnumEntry(enum_type, entry) => {
                let enum_path = enum_type.syn_type();
                let entry_ident = quote::format_ident!("{}", entry);
                quote::quote! { #enum_path::#entry_ident }
            }
            MapKeyValue::ClassLiteral(class) => {
                let path = class.canonical_string_path();
                quote::quote! { #path.to_owned() }
            }
        }
    }
}

impl fmt::Display for MapKeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKeyValue::Str(s) => write!(f, "\"{}\"", s),
            MapKeyValue::Int(i) => write!(f, "{}", i),
            MapKeyValue::Bool(b) => write!(f, "{}", b),
            MapKeyValue::EnumEntry(t, entry) => {
                write!(f, "{}::{}", t.canonical_string_path(), entry)
            }
            MapKeyValue::ClassLiteral(t) => write!(f, "{}", t.canonical_string_path()),
        }
    }
}
