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

//! The binding graph model.
//!
//! Bindings are a tagged sum stored in a vector and addressed by index;
//! the key map and the dependency records never hold pointers into the
//! host, so a graph is freely cacheable for the duration of the pass.

pub mod builder;
pub mod validator;

use crate::asm::nodes::{
    AccessorDecl, AssistedFactoryDecl, GraphDecl, InjectClassDecl, InjectorDecl, MemberSite,
    ProvidesDecl,
};
use crate::keys::{ContextualTypeKey, MapKeyValue, ScopeKey, TypeKey};
use indexmap::IndexMap;
use metro_common::{SourceSpan, TypeData, TypeId};
use std::collections::HashSet;
use std::rc::Rc;

/// Index of a binding within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingIdx(pub u32);

impl BindingIdx {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Where a dependency was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepLocation {
    Local(BindingIdx),
    /// Resolved in an ancestor graph; 1 is the direct parent.
    Ancestor(u32),
    /// Unresolved, but the request site declares a default value.
    Default,
}

/// One dependency site of a binding, after resolution.
#[derive(Debug, Clone)]
pub struct ResolvedDependency {
    pub request: ContextualTypeKey,
    /// Parameter or member name, for diagnostics.
    pub site: String,
    pub location: DepLocation,
}

#[derive(Debug, Clone)]
pub struct ProvidesBinding {
    pub key: TypeKey,
    pub decl: ProvidesDecl,
}

#[derive(Debug, Clone)]
pub struct ConstructorInjectBinding {
    pub key: TypeKey,
    pub decl: Rc<InjectClassDecl>,
}

/// A pure redirect; produces no code of its own.
#[derive(Debug, Clone)]
pub struct AliasBinding {
    pub key: TypeKey,
    pub target: TypeKey,
    pub scope: ScopeKey,
    pub description: String,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct SetContribution {
    /// Key of the binding producing this element (or element collection).
    pub target: TypeKey,
    /// True for `ElementsIntoSet` contributors producing a collection.
    pub collection: bool,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct MultiSetBinding {
    pub key: TypeKey,
    pub element_key: TypeKey,
    pub contributions: Vec<SetContribution>,
    pub allow_empty: bool,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct MapContribution {
    pub map_key: MapKeyValue,
    /// Key of the binding producing the value.
    pub target: TypeKey,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct MultiMapBinding {
    pub key: TypeKey,
    pub key_type: TypeData,
    pub value_key: TypeKey,
    /// True when the request was `Map<K, Provider<V>>`.
    pub value_provider: bool,
    pub contributions: Vec<MapContribution>,
    pub allow_empty: bool,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct AssistedFactoryBinding {
    pub key: TypeKey,
    pub decl: Rc<AssistedFactoryDecl>,
    pub target_decl: Rc<InjectClassDecl>,
}

#[derive(Debug, Clone)]
pub struct MembersInjectorBinding {
    pub key: TypeKey,
    pub target: TypeKey,
    pub target_type: TypeData,
    pub sites: Vec<MemberSite>,
}

#[derive(Debug, Clone)]
pub struct GraphExtensionLinkBinding {
    pub key: TypeKey,
    pub child: TypeId,
    /// Set when the link is exposed through the child's factory rather
    /// than a direct creation accessor.
    pub via_factory: bool,
}

/// A value handed in through the graph's factory.
#[derive(Debug, Clone)]
pub struct InstanceBinding {
    pub key: TypeKey,
    pub param_name: String,
    pub span: SourceSpan,
}

/// The unit of resolution.
#[derive(Debug, Clone)]
pub enum Binding {
    Provides(ProvidesBinding),
    ConstructorInject(ConstructorInjectBinding),
    Alias(AliasBinding),
    MultiSet(MultiSetBinding),
    MultiMap(MultiMapBinding),
    AssistedFactory(AssistedFactoryBinding),
    MembersInjector(MembersInjectorBinding),
    GraphExtensionLink(GraphExtensionLinkBinding),
    Instance(InstanceBinding),
}

impl Binding {
    pub fn key(&self) -> &TypeKey {
        match self {
            Binding::Provides(b) => &b.key,
            Binding::ConstructorInject(b) => &b.key,
            Binding::Alias(b) => &b.key,
            Binding::MultiSet(b) => &b.key,
            Binding::MultiMap(b) => &b.key,
            Binding::AssistedFactory(b) => &b.key,
            Binding::MembersInjector(b) => &b.key,
            Binding::GraphExtensionLink(b) => &b.key,
            Binding::Instance(b) => &b.key,
        }
    }

    pub fn scope(&self) -> ScopeKey {
        match self {
            Binding::Provides(b) => b.decl.scope.clone(),
            Binding::ConstructorInject(b) => b.decl.scope.clone(),
            Binding::Alias(b) => b.scope.clone(),
            _ => ScopeKey::unbounded(),
        }
    }

    pub fn span(&self) -> SourceSpan {
        match self {
            Binding::Provides(b) => b.decl.span.clone(),
            Binding::ConstructorInject(b) => b.decl.span.clone(),
            Binding::Alias(b) => b.span.clone(),
            Binding::MultiSet(b) => b.span.clone(),
            Binding::MultiMap(b) => b.span.clone(),
            Binding::AssistedFactory(b) => b.decl.span.clone(),
            Binding::MembersInjector(b) => b
                .sites
                .first()
                .map(|s| s.span.clone())
                .unwrap_or_default(),
            Binding::GraphExtensionLink(_) => SourceSpan::unknown(),
            Binding::Instance(b) => b.span.clone(),
        }
    }

    /// Human readable name used in request chains and duplicate reports.
    pub fn description(&self) -> String {
        match self {
            Binding::Provides(b) => format!(
                "{}.{} (provides)",
                b.decl.owner.canonical_string_path_without_args(),
                b.decl.name
            ),
            Binding::ConstructorInject(b) => {
                format!("{} (injected)", b.decl.type_data.canonical_string_path())
            }
            Binding::Alias(b) => b.description.clone(),
            Binding::MultiSet(b) => format!("{} (multibinding)", b.key.readable()),
            Binding::MultiMap(b) => format!("{} (multibinding)", b.key.readable()),
            Binding::AssistedFactory(b) => format!(
                "{} (assisted factory)",
                b.decl.type_data.canonical_string_path()
            ),
            Binding::MembersInjector(b) => {
                format!("{} (members injector)", b.target.readable())
            }
            Binding::GraphExtensionLink(b) => format!("{} (graph extension)", b.child),
            Binding::Instance(b) => format!("{} (bound instance)", b.key.readable()),
        }
    }

    /// Multibinding composites tolerate sibling declarations for the same
    /// key; everything else is exclusive per key.
    pub fn is_multibinding(&self) -> bool {
        matches!(self, Binding::MultiSet(_) | Binding::MultiMap(_))
    }
}

#[derive(Debug, Clone)]
pub enum RootRequest {
    Accessor(AccessorDecl),
    /// An `inject(target)` method; resolved through the synthesized
    /// members-injector key.
    Injector {
        decl: InjectorDecl,
        injector_key: TypeKey,
    },
    /// A graph extension that must be generated with this graph.
    Extension { key: TypeKey },
}

impl RootRequest {
    pub fn request_key(&self) -> TypeKey {
        match self {
            RootRequest::Accessor(a) => a.request.key.clone(),
            RootRequest::Injector { injector_key, .. } => injector_key.clone(),
            RootRequest::Extension { key } => key.clone(),
        }
    }

    pub fn description(&self, graph: &str) -> String {
        match self {
            RootRequest::Accessor(a) => format!("{}.{}", graph, a.name),
            RootRequest::Injector { decl, .. } => format!("{}.{}", graph, decl.name),
            RootRequest::Extension { key } => format!("{} (extension of {})", key, graph),
        }
    }

    pub fn span(&self) -> SourceSpan {
        match self {
            RootRequest::Accessor(a) => a.span.clone(),
            RootRequest::Injector { decl, .. } => decl.span.clone(),
            RootRequest::Extension { .. } => SourceSpan::unknown(),
        }
    }
}

/// Two non-multibinding declarations claimed the same key.
#[derive(Debug, Clone)]
pub struct DuplicateRecord {
    pub key: TypeKey,
    pub existing: String,
    pub incoming: String,
    pub existing_span: SourceSpan,
    pub incoming_span: SourceSpan,
}

/// Seal results: deterministic construction order and cycle back-edges.
#[derive(Debug, Clone, Default)]
pub struct SealData {
    /// Topological construction order over local bindings.
    pub order: Vec<BindingIdx>,
    /// Edges realized through delegate providers.
    pub back_edges: HashSet<(BindingIdx, BindingIdx)>,
    /// Stable ordinal per binding, indexed by binding index.
    pub ordinals: Vec<u32>,
}

/// The closed set of bindings for one graph root.
///
/// Mutable while the builder populates it; immutable once sealed.
#[derive(Debug)]
pub struct BindingGraph {
    pub decl: Rc<GraphDecl>,
    bindings: Vec<Binding>,
    by_key: IndexMap<TypeKey, BindingIdx>,
    deps: Vec<Vec<ResolvedDependency>>,
    pub root_requests: Vec<RootRequest>,
    /// Where each root request resolved, parallel to `root_requests`.
    pub root_locations: Vec<DepLocation>,
    pub duplicates: Vec<DuplicateRecord>,
    /// Child graph declarations to generate inside this graph.
    pub children: Vec<TypeId>,
    /// Scope sets of all ancestors, nearest first.
    pub ancestor_scopes: Vec<Vec<ScopeKey>>,
    /// Extendability of each ancestor, nearest first.
    pub ancestor_extendable: Vec<bool>,
    seal: Option<SealData>,
}

impl BindingGraph {
    pub fn new(
        decl: Rc<GraphDecl>,
        ancestor_scopes: Vec<Vec<ScopeKey>>,
        ancestor_extendable: Vec<bool>,
    ) -> Self {
        BindingGraph {
            decl,
            bindings: Vec::new(),
            by_key: IndexMap::new(),
            deps: Vec::new(),
            root_requests: Vec::new(),
            root_locations: Vec::new(),
            duplicates: Vec::new(),
            children: Vec::new(),
            ancestor_scopes,
            ancestor_extendable,
            seal: None,
        }
    }

    /// Registers a binding. A key collision with a non-multibinding
    /// binding is recorded for the validator and the existing binding
    /// wins.
    pub fn add_binding(&mut self, binding: Binding, deps: Vec<ResolvedDependency>) -> BindingIdx {
        debug_assert!(self.seal.is_none(), "graph is sealed");
        if let Some(existing_idx) = self.by_key.get(binding.key()) {
            let existing = &self.bindings[existing_idx.index()];
            self.duplicates.push(DuplicateRecord {
                key: binding.key().clone(),
                existing: existing.description(),
                incoming: binding.description(),
                existing_span: existing.span(),
                incoming_span: binding.span(),
            });
            return *existing_idx;
        }
        let idx = BindingIdx(self.bindings.len() as u32);
        self.by_key.insert(binding.key().clone(), idx);
        self.bindings.push(binding);
        self.deps.push(deps);
        idx
    }

    pub fn lookup(&self, key: &TypeKey) -> Option<BindingIdx> {
        self.by_key.get(key).copied()
    }

    pub fn binding(&self, idx: BindingIdx) -> &Binding {
        &self.bindings[idx.index()]
    }

    pub fn deps(&self, idx: BindingIdx) -> &[ResolvedDependency] {
        &self.deps[idx.index()]
    }

    pub fn set_deps(&mut self, idx: BindingIdx, deps: Vec<ResolvedDependency>) {
        debug_assert!(self.seal.is_none(), "graph is sealed");
        self.deps[idx.index()] = deps;
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings in registration order.
    pub fn bindings(&self) -> impl Iterator<Item = (BindingIdx, &Binding)> {
        self.bindings
            .iter()
            .enumerate()
            .map(|(i, b)| (BindingIdx(i as u32), b))
    }

    /// All keys that participate in the graph, in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &TypeKey> {
        self.by_key.keys()
    }

    pub fn is_sealed(&self) -> bool {
        self.seal.is_some()
    }

    pub fn seal_data(&self) -> Option<&SealData> {
        self.seal.as_ref()
    }

    pub(crate) fn install_seal(&mut self, seal: SealData) {
        self.seal = Some(seal);
    }

    /// The scope set visible to this graph: its own plus every
    /// ancestor's.
    pub fn visible_scopes(&self) -> Vec<ScopeKey> {
        let mut scopes = self.decl.scopes.clone();
        for ancestor in &self.ancestor_scopes {
            scopes.extend(ancestor.iter().cloned());
        }
        scopes
    }
}

/// The result of building one graph root: the graph itself, the
/// diagnostics its pipeline produced so far, and its transitively built
/// extensions.
#[derive(Debug)]
pub struct BuiltGraph {
    pub graph: BindingGraph,
    pub diagnostics: crate::diagnostics::DiagnosticsBuffer,
    pub children: Vec<BuiltGraph>,
}

/// Key under which a members injector for `target` is requestable.
pub fn members_injector_key(target: &TypeData) -> TypeKey {
    TypeKey::new(
        TypeData::global("metro::MembersInjector").with_args(vec![target.clone()]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_graph() -> BindingGraph {
        let type_data = TypeData::local("G", "app");
        let decl = Rc::new(GraphDecl {
            class: TypeId::of(&type_data),
            key: TypeKey::new(type_data.clone()),
            type_data,
            scopes: vec![ScopeKey::of(&TypeData::local("AppScope", "app"))],
            is_extendable: false,
            is_extension: false,
            binding_containers: Vec::new(),
            excludes: Vec::new(),
            accessors: Vec::new(),
            injectors: Vec::new(),
            providers: Vec::new(),
            creator: None,
            module_id: "app".to_owned(),
            span: SourceSpan::unknown(),
        });
        BindingGraph::new(
            decl,
            vec![vec![ScopeKey::of(&TypeData::local("RootScope", "app"))]],
            vec![true],
        )
    }

    fn instance(path: &str) -> Binding {
        Binding::Instance(InstanceBinding {
            key: TypeKey::new(TypeData::local(path, "app")),
            param_name: "value".to_owned(),
            span: SourceSpan::unknown(),
        })
    }

    #[test]
    fn colliding_keys_are_recorded_not_overwritten() {
        let mut graph = test_graph();
        let first = graph.add_binding(instance("Foo"), Vec::new());
        let second = graph.add_binding(instance("Foo"), Vec::new());
        assert_eq!(first, second);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.duplicates.len(), 1);
    }

    #[test]
    fn lookup_finds_bindings_by_key() {
        let mut graph = test_graph();
        let idx = graph.add_binding(instance("Foo"), Vec::new());
        let key = TypeKey::new(TypeData::local("Foo", "app"));
        assert_eq!(graph.lookup(&key), Some(idx));
        assert!(graph.lookup(&TypeKey::new(TypeData::local("Bar", "app"))).is_none());
    }

    #[test]
    fn visible_scopes_include_ancestors() {
        let graph = test_graph();
        let scopes = graph.visible_scopes();
        assert!(scopes.contains(&ScopeKey::of(&TypeData::local("AppScope", "app"))));
        assert!(scopes.contains(&ScopeKey::of(&TypeData::local("RootScope", "app"))));
    }
}
