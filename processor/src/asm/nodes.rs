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

//! The normalized dependency injection model built from host symbols.
//!
//! Everything here is detached from the host: plain data keyed by
//! [`TypeId`], safe to cache for the duration of one compilation pass.

use crate::keys::{ContextualTypeKey, MapKeyValue, ScopeKey, TypeKey};
use metro_common::{SourceSpan, TypeData, TypeId};

/// A value-producing callable: `Provides` or `Binds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableKind {
    Provides,
    Binds,
}

/// Multibinding participation of a provider or contributed binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultibindingKind {
    None,
    IntoSet,
    ElementsIntoSet,
    IntoMap(MapKeyValue),
}

#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: String,
    pub request: ContextualTypeKey,
    pub is_assisted: bool,
    pub assisted_id: String,
    pub span: SourceSpan,
}

/// A user-written factory callable on a graph or binding container.
#[derive(Debug, Clone)]
pub struct ProvidesDecl {
    /// The declaring graph or container type.
    pub owner: TypeData,
    pub name: String,
    pub kind: CallableKind,
    /// Key of the produced (for `Provides`) or aliased-to (for `Binds`)
    /// value.
    pub key: TypeKey,
    pub params: Vec<ParamDecl>,
    pub scope: ScopeKey,
    pub multibinding: MultibindingKind,
    pub is_static: bool,
    pub span: SourceSpan,
}

/// Explicit multibinding declaration: the collection may exist with zero
/// contributors iff `allow_empty`.
#[derive(Debug, Clone)]
pub struct MultibindsDecl {
    pub key: TypeKey,
    pub allow_empty: bool,
    pub span: SourceSpan,
}

/// A non-graph holder of providers, transitively includable.
#[derive(Debug, Clone)]
pub struct ContainerDecl {
    pub class: TypeId,
    pub type_data: TypeData,
    pub includes: Vec<TypeId>,
    pub providers: Vec<ProvidesDecl>,
    pub multibinds: Vec<MultibindsDecl>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberSiteKind {
    Field,
    Setter,
}

/// One `Inject`-annotated field or setter of a members-injection target.
#[derive(Debug, Clone)]
pub struct MemberSite {
    pub kind: MemberSiteKind,
    pub name: String,
    pub request: ContextualTypeKey,
    /// The class that declares the site; supertype sites inject before
    /// subtype sites.
    pub owner: TypeData,
    pub span: SourceSpan,
}

/// A class whose constructor is injected.
#[derive(Debug, Clone)]
pub struct InjectClassDecl {
    pub class: TypeId,
    pub type_data: TypeData,
    pub key: TypeKey,
    pub scope: ScopeKey,
    pub ctor_name: String,
    pub params: Vec<ParamDecl>,
    pub is_assisted: bool,
    pub members: Vec<MemberSite>,
    pub module_id: String,
    pub span: SourceSpan,
}

impl InjectClassDecl {
    pub fn assisted_params(&self) -> impl Iterator<Item = &ParamDecl> {
        self.params.iter().filter(|p| p.is_assisted)
    }

    pub fn provided_params(&self) -> impl Iterator<Item = &ParamDecl> {
        self.params.iter().filter(|p| !p.is_assisted)
    }
}

/// The generated-factory interface of an assisted injection group.
#[derive(Debug, Clone)]
pub struct AssistedFactoryDecl {
    pub class: TypeId,
    pub type_data: TypeData,
    /// Key under which the factory itself is requestable.
    pub key: TypeKey,
    /// Key of the assisted-injected target class.
    pub target: TypeKey,
    pub method_name: String,
    /// `(name, key, assisted identifier)` per factory method parameter.
    pub assisted_params: Vec<(String, TypeKey, String)>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct AccessorDecl {
    pub name: String,
    pub request: ContextualTypeKey,
    pub span: SourceSpan,
}

/// An `inject(target)` method exposed by a graph.
#[derive(Debug, Clone)]
pub struct InjectorDecl {
    pub name: String,
    pub target: TypeKey,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatorParamKind {
    /// Binds the argument value as an instance binding.
    Provides,
    /// Merges another graph or container as a binding source.
    Includes,
}

#[derive(Debug, Clone)]
pub struct CreatorParam {
    pub name: String,
    pub kind: CreatorParamKind,
    pub key: TypeKey,
    pub span: SourceSpan,
}

/// The graph's factory declaration: its single abstract method defines
/// the instance inputs.
#[derive(Debug, Clone)]
pub struct CreatorDecl {
    pub factory_type: TypeData,
    pub method_name: String,
    pub params: Vec<CreatorParam>,
    pub span: SourceSpan,
}

/// A graph entry point (`GraphRoot`) or child graph
/// (`GraphExtension`).
#[derive(Debug, Clone)]
pub struct GraphDecl {
    pub class: TypeId,
    pub type_data: TypeData,
    pub key: TypeKey,
    /// Primary + additional scopes, declaration order.
    pub scopes: Vec<ScopeKey>,
    pub is_extendable: bool,
    pub is_extension: bool,
    pub binding_containers: Vec<TypeId>,
    pub excludes: Vec<TypeId>,
    pub accessors: Vec<AccessorDecl>,
    pub injectors: Vec<InjectorDecl>,
    /// Providers declared directly on the graph type.
    pub providers: Vec<ProvidesDecl>,
    pub creator: Option<CreatorDecl>,
    pub module_id: String,
    pub span: SourceSpan,
}

impl GraphDecl {
    pub fn name(&self) -> &str {
        self.type_data.short_name()
    }
}
