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

//! Graph population.
//!
//! For each graph root the builder materializes bindings on demand,
//! starting from the root requests (accessors and injectors) and walking
//! dependencies. Lookup order per request: already-materialized local
//! binding, local sources (explicit providers, aliases, instance params,
//! constructor injection, multibinding synthesis), then the ancestor
//! chain. A child-local binding therefore supersedes its parent's.
//!
//! Graph extensions are built recursively while their ancestors are still
//! unsealed, so a child request may materialize bindings into an ancestor
//! (where the ancestor's sources declare them).

use crate::asm::markers::MarkerKind;
use crate::asm::nodes::*;
use crate::asm::AsmContext;
use crate::contributions::{ContributedKind, Contribution, ContributionCatalog};
use crate::diagnostics::{render_request_chain, DiagnosticKind, DiagnosticsBuffer};
use crate::graph::*;
use crate::keys::{ContextualTypeKey, MapKeyValue, ScopeKey, TypeKey, PROVIDER_PATH};
use crate::options::MetroOptions;
use indexmap::IndexMap;
use metro_common::{AnnotationData, AnnotationValue, SourceSpan, TypeData, TypeId};
use std::collections::HashSet;
use std::rc::Rc;

const VEC_PATH: &str = "std::vec::Vec";
const MAP_PATH: &str = "std::collections::HashMap";
const MEMBERS_INJECTOR_PATH: &str = "metro::MembersInjector";

/// Produces one element of a multibinding.
#[derive(Debug, Clone)]
enum Producer {
    Provides(ProvidesDecl),
    Alias {
        target: TypeKey,
        description: String,
        span: SourceSpan,
    },
}

impl Producer {
    fn description(&self) -> String {
        match self {
            Producer::Provides(decl) => format!(
                "{}.{}",
                decl.owner.canonical_string_path_without_args(),
                decl.name
            ),
            Producer::Alias { description, .. } => description.clone(),
        }
    }

    fn span(&self) -> SourceSpan {
        match self {
            Producer::Provides(decl) => decl.span.clone(),
            Producer::Alias { span, .. } => span.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct SetSource {
    producer: Producer,
    collection: bool,
}

#[derive(Debug, Clone)]
struct MapSource {
    map_key: MapKeyValue,
    producer: Producer,
}

#[derive(Debug, Clone)]
struct AliasSource {
    target: TypeKey,
    scope: ScopeKey,
    description: String,
    span: SourceSpan,
}

/// Everything a graph can materialize bindings from, indexed by key.
#[derive(Debug, Default)]
struct SourceIndex {
    providers: IndexMap<TypeKey, Vec<ProvidesDecl>>,
    aliases: IndexMap<TypeKey, Vec<AliasSource>>,
    set_contributions: IndexMap<TypeKey, Vec<SetSource>>,
    map_contributions: IndexMap<TypeKey, Vec<MapSource>>,
    multibinds: IndexMap<TypeKey, MultibindsDecl>,
    instances: IndexMap<TypeKey, InstanceBinding>,
    extensions: Vec<TypeId>,
}

impl SourceIndex {
    fn add_provides(&mut self, decl: ProvidesDecl, diagnostics: &mut DiagnosticsBuffer) {
        match (&decl.kind, decl.multibinding.clone()) {
            (CallableKind::Provides, MultibindingKind::None) => {
                self.providers.entry(decl.key.clone()).or_default().push(decl);
            }
            (CallableKind::Provides, MultibindingKind::IntoSet) => {
                self.set_contributions
                    .entry(decl.key.clone())
                    .or_default()
                    .push(SetSource {
                        producer: Producer::Provides(decl),
                        collection: false,
                    });
            }
            (CallableKind::Provides, MultibindingKind::ElementsIntoSet) => {
                let element = match element_of_collection(decl.key.type_data()) {
                    Some(element) => TypeKey::qualified(
                        element,
                        decl.key.qualifier().map(|q| q.annotation().clone()),
                    ),
                    None => {
                        diagnostics.error(
                            DiagnosticKind::IllegalTarget,
                            decl.span.clone(),
                            format!(
                                "ElementsIntoSet member {} must return a collection",
                                decl.name
                            ),
                        );
                        return;
                    }
                };
                self.set_contributions
                    .entry(element)
                    .or_default()
                    .push(SetSource {
                        producer: Producer::Provides(decl),
                        collection: true,
                    });
            }
            (CallableKind::Provides, MultibindingKind::IntoMap(map_key)) => {
                self.map_contributions
                    .entry(decl.key.clone())
                    .or_default()
                    .push(MapSource {
                        map_key,
                        producer: Producer::Provides(decl),
                    });
            }
            (CallableKind::Binds, multibinding) => {
                let target = decl.params[0].request.key.clone();
                let description = format!(
                    "{}.{} (binds)",
                    decl.owner.canonical_string_path_without_args(),
                    decl.name
                );
                match multibinding {
                    MultibindingKind::None => {
                        self.aliases
                            .entry(decl.key.clone())
                            .or_default()
                            .push(AliasSource {
                                target,
                                scope: decl.scope.clone(),
                                description,
                                span: decl.span.clone(),
                            });
                    }
                    MultibindingKind::IntoSet => {
                        self.set_contributions
                            .entry(decl.key.clone())
                            .or_default()
                            .push(SetSource {
                                producer: Producer::Alias {
                                    target,
                                    description,
                                    span: decl.span.clone(),
                                },
                                collection: false,
                            });
                    }
                    MultibindingKind::ElementsIntoSet => {
                        diagnostics.error(
                            DiagnosticKind::IllegalTarget,
                            decl.span.clone(),
                            format!("Binds member {} cannot be ElementsIntoSet", decl.name),
                        );
                    }
                    MultibindingKind::IntoMap(map_key) => {
                        self.map_contributions
                            .entry(decl.key.clone())
                            .or_default()
                            .push(MapSource {
                                map_key,
                                producer: Producer::Alias {
                                    target,
                                    description,
                                    span: decl.span.clone(),
                                },
                            });
                    }
                }
            }
        }
    }
}

struct Frame {
    graph: BindingGraph,
    sources: SourceIndex,
    diagnostics: DiagnosticsBuffer,
    /// Keys whose resolution already failed with a report.
    failed: HashSet<TypeKey>,
    /// Keys whose absence was already reported.
    missing_reported: HashSet<TypeKey>,
}

enum Ensured {
    /// Resolved this many frames up; 0 is the current frame.
    Found(u32),
    /// Resolution failed and a diagnostic was already recorded.
    Failed,
    Missing,
}

pub struct GraphBuilder<'a> {
    asm: &'a AsmContext<'a>,
    catalog: &'a ContributionCatalog<'a>,
    options: &'a MetroOptions,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        asm: &'a AsmContext<'a>,
        catalog: &'a ContributionCatalog<'a>,
        options: &'a MetroOptions,
    ) -> Self {
        GraphBuilder {
            asm,
            catalog,
            options,
        }
    }

    /// Builds the graph for `decl` and, recursively, every extension it
    /// links.
    pub fn build(&self, decl: Rc<GraphDecl>) -> BuiltGraph {
        let mut frames = Vec::new();
        self.build_frame(decl, &mut frames)
    }

    fn build_frame(&self, decl: Rc<GraphDecl>, frames: &mut Vec<Frame>) -> BuiltGraph {
        let ancestor_scopes: Vec<Vec<ScopeKey>> = frames
            .iter()
            .rev()
            .map(|f| f.graph.decl.scopes.clone())
            .collect();
        let ancestor_extendable: Vec<bool> = frames
            .iter()
            .rev()
            .map(|f| f.graph.decl.is_extendable)
            .collect();
        let mut diagnostics = DiagnosticsBuffer::new();
        let sources = self.collect_sources(&decl, &mut diagnostics);
        let frame = Frame {
            graph: BindingGraph::new(decl.clone(), ancestor_scopes, ancestor_extendable),
            sources,
            diagnostics,
            failed: HashSet::new(),
            missing_reported: HashSet::new(),
        };
        frames.push(frame);

        self.populate(frames);

        let child_ids = frames.last().expect("frame").graph.children.clone();
        let mut children = Vec::new();
        for child_id in child_ids {
            match self.asm.graph_decl(&child_id) {
                Ok(child_decl) => {
                    children.push(self.build_frame(child_decl, frames));
                }
                Err(errors) => {
                    let frame = frames.last_mut().expect("frame");
                    for error in errors.iter() {
                        frame.diagnostics.report(error.clone());
                    }
                }
            }
        }

        let frame = frames.pop().expect("frame");
        BuiltGraph {
            graph: frame.graph,
            diagnostics: frame.diagnostics,
            children,
        }
    }

    // ---- source collection ----------------------------------------------

    fn collect_sources(&self, decl: &GraphDecl, diagnostics: &mut DiagnosticsBuffer) -> SourceIndex {
        let mut sources = SourceIndex::default();

        for provider in &decl.providers {
            sources.add_provides(provider.clone(), diagnostics);
        }

        // Binding containers listed on the graph, expanded transitively
        // through their includes.
        let mut container_queue: Vec<(TypeId, Vec<TypeId>)> = decl
            .binding_containers
            .iter()
            .map(|id| (id.clone(), vec![id.clone()]))
            .collect();

        let (contributions, contribution_diagnostics) =
            self.catalog.for_graph(&decl.scopes, &decl.excludes);
        for diagnostic in contribution_diagnostics {
            diagnostics.report(diagnostic);
        }
        for contribution in &contributions {
            self.add_contribution(contribution, &mut sources, &mut container_queue, diagnostics);
        }

        let mut seen_containers = HashSet::new();
        while let Some((container_id, path)) = container_queue.pop() {
            if !seen_containers.insert(container_id.clone()) {
                continue;
            }
            let container = match self.asm.container_decl(&container_id) {
                Ok(container) => container,
                Err(errors) => {
                    for error in errors.iter() {
                        diagnostics.report(error.clone());
                    }
                    continue;
                }
            };
            for provider in &container.providers {
                sources.add_provides(provider.clone(), diagnostics);
            }
            for multibinds in &container.multibinds {
                sources
                    .multibinds
                    .entry(multibinds.key.clone())
                    .or_insert_with(|| multibinds.clone());
            }
            for include in &container.includes {
                if path.contains(include) {
                    let mut cycle: Vec<String> =
                        path.iter().map(|id| id.to_string()).collect();
                    cycle.push(include.to_string());
                    diagnostics.error(
                        DiagnosticKind::CycleDependencyOutsideGraph,
                        container.span.clone(),
                        format!(
                            "binding container include cycle: {}",
                            cycle.join(" -> ")
                        ),
                    );
                    continue;
                }
                let mut next_path = path.clone();
                next_path.push(include.clone());
                container_queue.push((include.clone(), next_path));
            }
        }

        // Creator inputs: Provides params bind instances; Includes params
        // bind the instance and merge its provider surface.
        if let Some(creator) = &decl.creator {
            for param in &creator.params {
                sources.instances.insert(
                    param.key.clone(),
                    InstanceBinding {
                        key: param.key.clone(),
                        param_name: param.name.clone(),
                        span: param.span.clone(),
                    },
                );
                if param.kind == CreatorParamKind::Includes {
                    self.add_included_surface(param, &mut sources, diagnostics);
                }
            }
        }

        sources
    }

    fn add_contribution(
        &self,
        contribution: &Contribution,
        sources: &mut SourceIndex,
        container_queue: &mut Vec<(TypeId, Vec<TypeId>)>,
        diagnostics: &mut DiagnosticsBuffer,
    ) {
        match &contribution.kind {
            ContributedKind::Container(container) => {
                container_queue.push((container.class.clone(), vec![container.class.clone()]));
            }
            ContributedKind::Binding(binding) => {
                let description = format!(
                    "{} (contributed binding)",
                    binding.impl_key.type_data().canonical_string_path()
                );
                match &binding.multibinding {
                    MultibindingKind::None => {
                        sources
                            .aliases
                            .entry(binding.bound_key.clone())
                            .or_default()
                            .push(AliasSource {
                                target: binding.impl_key.clone(),
                                scope: ScopeKey::unbounded(),
                                description,
                                span: binding.span.clone(),
                            });
                    }
                    MultibindingKind::IntoSet => {
                        sources
                            .set_contributions
                            .entry(binding.bound_key.clone())
                            .or_default()
                            .push(SetSource {
                                producer: Producer::Alias {
                                    target: binding.impl_key.clone(),
                                    description,
                                    span: binding.span.clone(),
                                },
                                collection: false,
                            });
                    }
                    MultibindingKind::IntoMap(map_key) => {
                        sources
                            .map_contributions
                            .entry(binding.bound_key.clone())
                            .or_default()
                            .push(MapSource {
                                map_key: map_key.clone(),
                                producer: Producer::Alias {
                                    target: binding.impl_key.clone(),
                                    description,
                                    span: binding.span.clone(),
                                },
                            });
                    }
                    MultibindingKind::ElementsIntoSet => {
                        diagnostics.error(
                            DiagnosticKind::IllegalTarget,
                            binding.span.clone(),
                            "a contributed class cannot be an ElementsIntoSet contribution",
                        );
                    }
                }
            }
            ContributedKind::Extension(child) => {
                if !sources.extensions.contains(child) {
                    sources.extensions.push(child.clone());
                }
            }
        }
    }

    /// Makes the providers of an `Includes` creator param visible. The
    /// included object's callables are invoked on the bound instance.
    fn add_included_surface(
        &self,
        param: &CreatorParam,
        sources: &mut SourceIndex,
        diagnostics: &mut DiagnosticsBuffer,
    ) {
        let id = TypeId::of(param.key.type_data());
        if let Ok(container) = self.asm.container_decl(&id) {
            for provider in &container.providers {
                let mut provider = provider.clone();
                provider.is_static = false;
                sources.add_provides(provider, diagnostics);
            }
            return;
        }
        if let Ok(graph) = self.asm.graph_decl(&id) {
            // Accessors of an included graph become providers backed by
            // the included instance.
            for accessor in &graph.accessors {
                if accessor.request.is_deferrable() {
                    continue;
                }
                let decl = ProvidesDecl {
                    owner: graph.type_data.clone(),
                    name: accessor.name.clone(),
                    kind: CallableKind::Provides,
                    key: accessor.request.key.clone(),
                    params: Vec::new(),
                    scope: ScopeKey::unbounded(),
                    multibinding: MultibindingKind::None,
                    is_static: false,
                    span: accessor.span.clone(),
                };
                sources.add_provides(decl, diagnostics);
            }
        }
    }

    // ---- population -----------------------------------------------------

    fn populate(&self, frames: &mut Vec<Frame>) {
        let decl = frames.last().expect("frame").graph.decl.clone();
        let graph_name = decl.type_data.canonical_string_path_without_args();

        // Instance bindings exist whether or not anything requests them.
        let instances: Vec<InstanceBinding> = frames
            .last()
            .expect("frame")
            .sources
            .instances
            .values()
            .cloned()
            .collect();
        for instance in instances {
            frames
                .last_mut()
                .expect("frame")
                .graph
                .add_binding(Binding::Instance(instance), Vec::new());
        }

        // Root requests: accessors first, then injectors.
        for accessor in &decl.accessors {
            let request = RootRequest::Accessor(accessor.clone());
            let chain = vec![request.description(&graph_name)];
            frames
                .last_mut()
                .expect("frame")
                .graph
                .root_requests
                .push(request);
            let location = self.require(frames, &accessor.request, &chain, &accessor.span);
            frames
                .last_mut()
                .expect("frame")
                .graph
                .root_locations
                .push(location.unwrap_or(DepLocation::Default));
        }
        for injector in &decl.injectors {
            let injector_key = members_injector_key(injector.target.type_data());
            let request = RootRequest::Injector {
                decl: injector.clone(),
                injector_key: injector_key.clone(),
            };
            let chain = vec![request.description(&graph_name)];
            frames
                .last_mut()
                .expect("frame")
                .graph
                .root_requests
                .push(request);
            let location = self.require(
                frames,
                &ContextualTypeKey::new(injector_key),
                &chain,
                &injector.span,
            );
            frames
                .last_mut()
                .expect("frame")
                .graph
                .root_locations
                .push(location.unwrap_or(DepLocation::Default));
        }

        // Contributed extensions are generated with the graph even when
        // no accessor exposes them.
        let contributed_extensions: Vec<TypeId> = frames
            .last()
            .expect("frame")
            .sources
            .extensions
            .clone();
        for child in contributed_extensions {
            let already_linked = frames
                .last()
                .expect("frame")
                .graph
                .children
                .contains(&child);
            if already_linked {
                continue;
            }
            let key = match self.asm.class(&child) {
                Some(class) => TypeKey::new(class.type_data.clone()),
                None => continue,
            };
            let frame = frames.last_mut().expect("frame");
            let idx = frame.graph.add_binding(
                Binding::GraphExtensionLink(GraphExtensionLinkBinding {
                    key: key.clone(),
                    child: child.clone(),
                    via_factory: false,
                }),
                Vec::new(),
            );
            frame.graph.children.push(child);
            frame.graph.root_requests.push(RootRequest::Extension { key });
            frame.graph.root_locations.push(DepLocation::Local(idx));
        }

        // Full-graph validation materializes every declared source so
        // unreachable bindings are resolved and checked too.
        if self.options.enable_full_binding_graph_validation {
            let keys: Vec<TypeKey> = {
                let sources = &frames.last().expect("frame").sources;
                sources
                    .providers
                    .keys()
                    .chain(sources.aliases.keys())
                    .cloned()
                    .collect()
            };
            let chain = vec![format!("{} (full graph validation)", graph_name)];
            for key in keys {
                self.require(
                    frames,
                    &ContextualTypeKey::new(key),
                    &chain,
                    &decl.span.clone(),
                );
            }
        }
    }

    /// Resolves one request, reporting a missing-binding diagnostic when
    /// it cannot be satisfied and has no default.
    fn require(
        &self,
        frames: &mut Vec<Frame>,
        request: &ContextualTypeKey,
        chain: &[String],
        span: &SourceSpan,
    ) -> Option<DepLocation> {
        let len = frames.len();
        match self.ensure(&mut frames[..len], &request.key, chain) {
            Ensured::Found(0) => {
                let idx = frames
                    .last()
                    .expect("frame")
                    .graph
                    .lookup(&request.key)
                    .expect("just ensured");
                Some(DepLocation::Local(idx))
            }
            Ensured::Found(depth) => Some(DepLocation::Ancestor(depth)),
            Ensured::Failed => None,
            Ensured::Missing => {
                if request.has_default {
                    return Some(DepLocation::Default);
                }
                let frame = frames.last_mut().expect("frame");
                if frame.missing_reported.insert(request.key.clone()) {
                    frame.diagnostics.error(
                        DiagnosticKind::MissingBinding,
                        span.clone(),
                        format!(
                            "missing bindings for {}{}",
                            request.key.readable(),
                            render_request_chain(chain)
                        ),
                    );
                }
                None
            }
        }
    }

    /// Core lookup. Returns how many frames up the key resolved.
    fn ensure(&self, frames: &mut [Frame], key: &TypeKey, chain: &[String]) -> Ensured {
        let level = frames.len() - 1;
        if frames[level].graph.lookup(key).is_some() {
            return Ensured::Found(0);
        }
        if frames[level].failed.contains(key) {
            return Ensured::Failed;
        }
        match self.materialize_local(frames, key, chain) {
            Ensured::Found(d) => return Ensured::Found(d),
            Ensured::Failed => {
                frames[level].failed.insert(key.clone());
                return Ensured::Failed;
            }
            Ensured::Missing => {}
        }
        if level > 0 {
            return match self.ensure(&mut frames[..level], key, chain) {
                Ensured::Found(depth) => Ensured::Found(depth + 1),
                other => other,
            };
        }
        Ensured::Missing
    }

    /// Attempts to materialize `key` from the current frame's sources.
    fn materialize_local(&self, frames: &mut [Frame], key: &TypeKey, chain: &[String]) -> Ensured {
        let level = frames.len() - 1;

        // Bound instances from the creator.
        if let Some(instance) = frames[level].sources.instances.get(key).cloned() {
            frames[level]
                .graph
                .add_binding(Binding::Instance(instance), Vec::new());
            return Ensured::Found(0);
        }

        // Explicit providers and aliases; the first candidate wins,
        // later ones are recorded as duplicates for the validator.
        let providers = frames[level]
            .sources
            .providers
            .get(key)
            .cloned()
            .unwrap_or_default();
        let aliases = frames[level]
            .sources
            .aliases
            .get(key)
            .cloned()
            .unwrap_or_default();
        if !providers.is_empty() || !aliases.is_empty() {
            let mut first_idx = None;
            for decl in providers {
                let binding = Binding::Provides(ProvidesBinding {
                    key: key.clone(),
                    decl: decl.clone(),
                });
                let description = binding.description();
                let idx = frames[level].graph.add_binding(binding, Vec::new());
                if first_idx.is_none() {
                    first_idx = Some(idx);
                    let deps = self.provides_deps(frames, &decl, &description, chain);
                    frames[level].graph.set_deps(idx, deps);
                }
            }
            for alias in aliases {
                let binding = Binding::Alias(AliasBinding {
                    key: key.clone(),
                    target: alias.target.clone(),
                    scope: alias.scope.clone(),
                    description: alias.description.clone(),
                    span: alias.span.clone(),
                });
                let idx = frames[level].graph.add_binding(binding, Vec::new());
                if first_idx.is_none() {
                    first_idx = Some(idx);
                    let child_chain = prepend(&alias.description, chain);
                    let request = ContextualTypeKey::new(alias.target.clone());
                    let location =
                        self.require_from(frames, &request, &child_chain, &alias.span);
                    let deps = vec![ResolvedDependency {
                        request,
                        site: alias.description.clone(),
                        location: location.unwrap_or(DepLocation::Default),
                    }];
                    frames[level].graph.set_deps(idx, deps);
                }
            }
            return Ensured::Found(0);
        }

        // Members injectors are synthesized from the target's sites.
        if key.type_data().path == MEMBERS_INJECTOR_PATH && key.qualifier().is_none() {
            return self.materialize_members_injector(frames, key, chain);
        }

        // Classes: constructor injection, assisted factories, graph
        // extensions, binding containers.
        if key.qualifier().is_none() {
            match self.materialize_class(frames, key, chain) {
                Ensured::Missing => {}
                other => return other,
            }
        }

        // Multibound collections.
        self.materialize_multibinding(frames, key, chain)
    }

    fn require_from(
        &self,
        frames: &mut [Frame],
        request: &ContextualTypeKey,
        chain: &[String],
        span: &SourceSpan,
    ) -> Option<DepLocation> {
        match self.ensure(frames, &request.key, chain) {
            Ensured::Found(0) => {
                let idx = frames
                    .last()
                    .expect("frame")
                    .graph
                    .lookup(&request.key)
                    .expect("just ensured");
                Some(DepLocation::Local(idx))
            }
            Ensured::Found(depth) => Some(DepLocation::Ancestor(depth)),
            Ensured::Failed => None,
            Ensured::Missing => {
                if request.has_default {
                    return Some(DepLocation::Default);
                }
                let frame = frames.last_mut().expect("frame");
                if frame.missing_reported.insert(request.key.clone()) {
                    frame.diagnostics.error(
                        DiagnosticKind::MissingBinding,
                        span.clone(),
                        format!(
                            "missing bindings for {}{}",
                            request.key.readable(),
                            render_request_chain(chain)
                        ),
                    );
                }
                None
            }
        }
    }

    fn provides_deps(
        &self,
        frames: &mut [Frame],
        decl: &ProvidesDecl,
        description: &str,
        chain: &[String],
    ) -> Vec<ResolvedDependency> {
        let child_chain = prepend(description, chain);
        let mut deps = Vec::new();
        if !decl.is_static {
            // Instance callables need their declaring object first.
            let owner_request = ContextualTypeKey::new(TypeKey::new(decl.owner.clone()));
            let location =
                self.require_from(frames, &owner_request, &child_chain, &decl.span);
            deps.push(ResolvedDependency {
                request: owner_request,
                site: "<receiver>".to_owned(),
                location: location.unwrap_or(DepLocation::Default),
            });
        }
        for param in &decl.params {
            let location = self.require_from(frames, &param.request, &child_chain, &param.span);
            deps.push(ResolvedDependency {
                request: param.request.clone(),
                site: param.name.clone(),
                location: location.unwrap_or(DepLocation::Default),
            });
        }
        deps
    }

    fn materialize_members_injector(
        &self,
        frames: &mut [Frame],
        key: &TypeKey,
        chain: &[String],
    ) -> Ensured {
        let level = frames.len() - 1;
        let Some(target_type) = key.type_data().args.first().cloned() else {
            return Ensured::Missing;
        };
        let Some(class) = self.asm.class(&TypeId::of(&target_type)).cloned() else {
            return Ensured::Missing;
        };
        let sites = self.asm.member_sites(&class);
        let binding = Binding::MembersInjector(MembersInjectorBinding {
            key: key.clone(),
            target: TypeKey::new(target_type.clone()),
            target_type,
            sites: sites.clone(),
        });
        let description = binding.description();
        let idx = frames[level].graph.add_binding(binding, Vec::new());
        let child_chain = prepend(&description, chain);
        let mut deps = Vec::new();
        for site in &sites {
            let location = self.require_from(frames, &site.request, &child_chain, &site.span);
            deps.push(ResolvedDependency {
                request: site.request.clone(),
                site: site.name.clone(),
                location: location.unwrap_or(DepLocation::Default),
            });
        }
        frames[level].graph.set_deps(idx, deps);
        Ensured::Found(0)
    }

    fn materialize_class(&self, frames: &mut [Frame], key: &TypeKey, chain: &[String]) -> Ensured {
        let level = frames.len() - 1;
        let id = TypeId::of(key.type_data());
        let Some(class) = self.asm.class(&id) else {
            return Ensured::Missing;
        };
        let markers = &self.asm.markers;

        // Graph extensions link a child graph. Direct creation only
        // works when the child's factory (if any) takes no inputs.
        if markers.has(&class.annotations, MarkerKind::GraphExtension) {
            if let Ok(child_decl) = self.asm.graph_decl(&id) {
                let takes_inputs = child_decl
                    .creator
                    .as_ref()
                    .map(|c| !c.params.is_empty())
                    .unwrap_or(false);
                if takes_inputs {
                    frames[level].diagnostics.error(
                        DiagnosticKind::ExtensionContract,
                        child_decl.span.clone(),
                        format!(
                            "{} requires creator inputs; expose its factory instead of the graph itself{}",
                            child_decl.type_data.readable(),
                            render_request_chain(chain)
                        ),
                    );
                    return Ensured::Failed;
                }
            }
            frames[level].graph.add_binding(
                Binding::GraphExtensionLink(GraphExtensionLinkBinding {
                    key: key.clone(),
                    child: id.clone(),
                    via_factory: false,
                }),
                Vec::new(),
            );
            if !frames[level].graph.children.contains(&id) {
                frames[level].graph.children.push(id);
            }
            return Ensured::Found(0);
        }
        if markers.has(&class.annotations, MarkerKind::GraphExtensionFactory) {
            let Some(child_path) = owner_path(&class.type_data) else {
                return Ensured::Missing;
            };
            let child_id = TypeId(child_path);
            if let Err(errors) = self.asm.graph_decl(&child_id) {
                for error in errors.iter() {
                    frames[level].diagnostics.report(error.clone());
                }
                return Ensured::Failed;
            }
            frames[level].graph.add_binding(
                Binding::GraphExtensionLink(GraphExtensionLinkBinding {
                    key: key.clone(),
                    child: child_id.clone(),
                    via_factory: true,
                }),
                Vec::new(),
            );
            if !frames[level].graph.children.contains(&child_id) {
                frames[level].graph.children.push(child_id);
            }
            return Ensured::Found(0);
        }

        // Assisted factories pair with their assisted-injected target.
        if markers.has(&class.annotations, MarkerKind::AssistedFactory) {
            if !self.options.generate_assisted_factories {
                return Ensured::Missing;
            }
            let decl = match self.asm.assisted_factory_decl(&id) {
                Ok(decl) => decl,
                Err(errors) => {
                    for error in errors.iter() {
                        frames[level].diagnostics.report(error.clone());
                    }
                    return Ensured::Failed;
                }
            };
            let target_decl = match self.asm.inject_class(&TypeId::of(decl.target.type_data())) {
                Ok(target) => match target.as_ref() {
                    Some(target) => Rc::new(target.clone()),
                    None => return Ensured::Failed,
                },
                Err(errors) => {
                    for error in errors.iter() {
                        frames[level].diagnostics.report(error.clone());
                    }
                    return Ensured::Failed;
                }
            };
            let binding = Binding::AssistedFactory(AssistedFactoryBinding {
                key: key.clone(),
                decl: decl.clone(),
                target_decl: target_decl.clone(),
            });
            let description = binding.description();
            let idx = frames[level].graph.add_binding(binding, Vec::new());
            let child_chain = prepend(&description, chain);
            let mut deps = Vec::new();
            for param in target_decl.provided_params() {
                let location =
                    self.require_from(frames, &param.request, &child_chain, &param.span);
                deps.push(ResolvedDependency {
                    request: param.request.clone(),
                    site: param.name.clone(),
                    location: location.unwrap_or(DepLocation::Default),
                });
            }
            frames[level].graph.set_deps(idx, deps);
            return Ensured::Found(0);
        }

        // Constructor injection.
        match self.asm.inject_class(&id) {
            Ok(inject) => match inject.as_ref() {
                Some(decl) => {
                    if decl.is_assisted {
                        frames[level].diagnostics.error(
                            DiagnosticKind::AssistedMapping,
                            decl.span.clone(),
                            format!(
                                "assisted-injected {} must be requested through its assisted factory{}",
                                decl.type_data.readable(),
                                render_request_chain(chain)
                            ),
                        );
                        return Ensured::Failed;
                    }
                    let decl = Rc::new(decl.clone());
                    let binding = Binding::ConstructorInject(ConstructorInjectBinding {
                        key: key.clone(),
                        decl: decl.clone(),
                    });
                    let description = binding.description();
                    let idx = frames[level].graph.add_binding(binding, Vec::new());
                    let child_chain = prepend(&description, chain);
                    let mut deps = Vec::new();
                    for param in &decl.params {
                        let location =
                            self.require_from(frames, &param.request, &child_chain, &param.span);
                        deps.push(ResolvedDependency {
                            request: param.request.clone(),
                            site: param.name.clone(),
                            location: location.unwrap_or(DepLocation::Default),
                        });
                    }
                    frames[level].graph.set_deps(idx, deps);
                    return Ensured::Found(0);
                }
                None => {
                    // Binding containers instantiate with their default
                    // constructor so instance callables have a receiver.
                    if markers.has(&class.annotations, MarkerKind::BindingContainer) {
                        let decl = Rc::new(InjectClassDecl {
                            class: id.clone(),
                            type_data: class.type_data.clone(),
                            key: key.clone(),
                            scope: ScopeKey::unbounded(),
                            ctor_name: "default".to_owned(),
                            params: Vec::new(),
                            is_assisted: false,
                            members: Vec::new(),
                            module_id: class.module_id.clone(),
                            span: class.span.clone(),
                        });
                        frames[level].graph.add_binding(
                            Binding::ConstructorInject(ConstructorInjectBinding {
                                key: key.clone(),
                                decl,
                            }),
                            Vec::new(),
                        );
                        return Ensured::Found(0);
                    }
                }
            },
            Err(errors) => {
                for error in errors.iter() {
                    frames[level].diagnostics.report(error.clone());
                }
                return Ensured::Failed;
            }
        }

        Ensured::Missing
    }

    fn materialize_multibinding(
        &self,
        frames: &mut [Frame],
        key: &TypeKey,
        chain: &[String],
    ) -> Ensured {
        let level = frames.len() - 1;
        let type_data = key.type_data().clone();
        let qualifier = key.qualifier().map(|q| q.annotation().clone());

        if type_data.path == VEC_PATH {
            let Some(element) = type_data.args.first().cloned() else {
                return Ensured::Missing;
            };
            let element_key = TypeKey::qualified(element, qualifier);
            let contributions = frames[level]
                .sources
                .set_contributions
                .get(&element_key)
                .cloned()
                .unwrap_or_default();
            let multibinds = frames[level]
                .sources
                .multibinds
                .get(key)
                .cloned();
            if contributions.is_empty() && multibinds.is_none() {
                return Ensured::Missing;
            }

            let mut set_contributions = Vec::new();
            for (i, source) in contributions.iter().enumerate() {
                let element_type = if source.collection {
                    type_data.clone()
                } else {
                    element_key.type_data().clone()
                };
                let unique = element_key_for(&element_type, &source.producer.description(), i);
                self.materialize_producer(frames, &unique, &source.producer, chain);
                set_contributions.push(SetContribution {
                    target: unique,
                    collection: source.collection,
                    span: source.producer.span(),
                });
            }

            let binding = Binding::MultiSet(MultiSetBinding {
                key: key.clone(),
                element_key,
                contributions: set_contributions.clone(),
                allow_empty: multibinds.map(|m| m.allow_empty).unwrap_or(false),
                span: SourceSpan::unknown(),
            });
            let deps = self.composite_deps(frames, set_contributions.iter().map(|c| &c.target));
            let idx = frames[level].graph.add_binding(binding, Vec::new());
            frames[level].graph.set_deps(idx, deps);
            return Ensured::Found(0);
        }

        if type_data.path == MAP_PATH {
            let (Some(declared_key_type), Some(mut value_type)) =
                (type_data.args.first().cloned(), type_data.args.get(1).cloned())
            else {
                return Ensured::Missing;
            };
            let value_provider = value_type.path == PROVIDER_PATH;
            if value_provider {
                let Some(inner) = value_type.args.first().cloned() else {
                    return Ensured::Missing;
                };
                value_type = inner;
            }
            let value_key = TypeKey::qualified(value_type, qualifier);
            let contributions = frames[level]
                .sources
                .map_contributions
                .get(&value_key)
                .cloned()
                .unwrap_or_default();
            let multibinds = frames[level]
                .sources
                .multibinds
                .get(key)
                .cloned();
            if contributions.is_empty() && multibinds.is_none() {
                return Ensured::Missing;
            }

            let mut map_contributions = Vec::new();
            for (i, source) in contributions.iter().enumerate() {
                let unique = element_key_for(
                    value_key.type_data(),
                    &source.producer.description(),
                    i,
                );
                self.materialize_producer(frames, &unique, &source.producer, chain);
                map_contributions.push(MapContribution {
                    map_key: source.map_key.clone(),
                    target: unique,
                    span: source.producer.span(),
                });
            }

            let binding = Binding::MultiMap(MultiMapBinding {
                key: key.clone(),
                key_type: declared_key_type,
                value_key,
                value_provider,
                contributions: map_contributions.clone(),
                allow_empty: multibinds.map(|m| m.allow_empty).unwrap_or(false),
                span: SourceSpan::unknown(),
            });
            let deps = self.composite_deps(frames, map_contributions.iter().map(|c| &c.target));
            let idx = frames[level].graph.add_binding(binding, Vec::new());
            frames[level].graph.set_deps(idx, deps);
            return Ensured::Found(0);
        }

        Ensured::Missing
    }

    /// Materializes one multibinding contributor under its unique key.
    fn materialize_producer(
        &self,
        frames: &mut [Frame],
        unique: &TypeKey,
        producer: &Producer,
        chain: &[String],
    ) {
        let level = frames.len() - 1;
        if frames[level].graph.lookup(unique).is_some() {
            return;
        }
        match producer {
            Producer::Provides(decl) => {
                let binding = Binding::Provides(ProvidesBinding {
                    key: unique.clone(),
                    decl: decl.clone(),
                });
                let description = binding.description();
                let idx = frames[level].graph.add_binding(binding, Vec::new());
                let deps = self.provides_deps(frames, decl, &description, chain);
                frames[level].graph.set_deps(idx, deps);
            }
            Producer::Alias {
                target,
                description,
                span,
            } => {
                let binding = Binding::Alias(AliasBinding {
                    key: unique.clone(),
                    target: target.clone(),
                    scope: ScopeKey::unbounded(),
                    description: description.clone(),
                    span: span.clone(),
                });
                let idx = frames[level].graph.add_binding(binding, Vec::new());
                let child_chain = prepend(description, chain);
                let request = ContextualTypeKey::new(target.clone());
                let location = self.require_from(frames, &request, &child_chain, span);
                frames[level].graph.set_deps(
                    idx,
                    vec![ResolvedDependency {
                        request,
                        site: description.clone(),
                        location: location.unwrap_or(DepLocation::Default),
                    }],
                );
            }
        }
    }

    fn composite_deps<'k>(
        &self,
        frames: &mut [Frame],
        targets: impl Iterator<Item = &'k TypeKey>,
    ) -> Vec<ResolvedDependency> {
        let graph = &frames[frames.len() - 1].graph;
        targets
            .map(|target| ResolvedDependency {
                request: ContextualTypeKey::new(target.clone()),
                site: "<contribution>".to_owned(),
                location: graph
                    .lookup(target)
                    .map(DepLocation::Local)
                    .unwrap_or(DepLocation::Default),
            })
            .collect()
    }
}

fn prepend(head: &str, chain: &[String]) -> Vec<String> {
    let mut result = Vec::with_capacity(chain.len() + 1);
    result.push(head.to_owned());
    result.extend(chain.iter().cloned());
    result
}

/// A unique key for a multibinding contributor: the element type plus a
/// synthetic discriminator qualifier.
fn element_key_for(element: &TypeData, description: &str, index: usize) -> TypeKey {
    let discriminator = AnnotationData::new(TypeData::global("metro::internal::Element"))
        .with_value(
            "value",
            AnnotationValue::Str(format!("{}#{}", description, index)),
        );
    TypeKey::qualified(element.clone(), Some(discriminator))
}

fn element_of_collection(type_data: &TypeData) -> Option<TypeData> {
    if type_data.path == VEC_PATH {
        type_data.args.first().cloned()
    } else {
        None
    }
}

/// `Child` for a nested `Child::Factory` declaration.
fn owner_path(type_data: &TypeData) -> Option<String> {
    let path = type_data.canonical_string_path_without_args();
    path.rsplit_once("::").map(|(owner, _)| owner.to_owned())
}
