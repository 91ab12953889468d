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

//! Sealing and validation.
//!
//! A built graph is sealed by sorting it: strongly connected components
//! are computed over the local dependency edges, cycles are either broken
//! along deferrable edges or reported, and the condensed component DAG
//! yields the deterministic construction order the emitter follows. All
//! recoverable problems are collected in the graph's buffer; only
//! internal invariant failures abort.

use crate::diagnostics::{DiagnosticKind, DiagnosticsBuffer, InternalError};
use crate::graph::{Binding, BindingGraph, BindingIdx, DepLocation, SealData};
use crate::options::MetroOptions;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet, VecDeque};

pub struct GraphValidator<'a> {
    options: &'a MetroOptions,
}

impl<'a> GraphValidator<'a> {
    pub fn new(options: &'a MetroOptions) -> Self {
        GraphValidator { options }
    }

    /// Seals `graph`, reporting problems into `diagnostics`. Sealing an
    /// already sealed graph is a no-op.
    pub fn seal(
        &self,
        graph: &mut BindingGraph,
        diagnostics: &mut DiagnosticsBuffer,
    ) -> Result<(), InternalError> {
        if graph.is_sealed() {
            return Ok(());
        }

        self.check_duplicates(graph, diagnostics);
        self.check_scopes(graph, diagnostics);
        self.check_aliases(graph, diagnostics);
        self.check_multibindings(graph, diagnostics);
        self.check_assisted(graph, diagnostics);
        if self.options.enable_full_binding_graph_validation {
            self.check_reachability(graph, diagnostics);
        }

        let seal = self.sort(graph, diagnostics)?;
        graph.install_seal(seal);
        Ok(())
    }

    fn check_duplicates(&self, graph: &BindingGraph, diagnostics: &mut DiagnosticsBuffer) {
        for duplicate in &graph.duplicates {
            diagnostics.report(
                crate::diagnostics::Diagnostic::new(
                    DiagnosticKind::DuplicateBinding,
                    duplicate.incoming_span.clone(),
                    format!(
                        "found duplicated bindings for {}, provided by:\n\t{}\n\t{}",
                        duplicate.key.readable(),
                        duplicate.existing,
                        duplicate.incoming
                    ),
                )
                .with_secondary_span(duplicate.existing_span.clone()),
            );
        }
    }

    /// A scoped binding's scope must come from this graph or an
    /// ancestor; depending on a non-extendable ancestor is an
    /// inheritance violation.
    fn check_scopes(&self, graph: &BindingGraph, diagnostics: &mut DiagnosticsBuffer) {
        let visible = graph.visible_scopes();
        for (idx, binding) in graph.bindings() {
            let scope = binding.scope();
            if !scope.is_unbounded() && !visible.contains(&scope) {
                diagnostics.error(
                    DiagnosticKind::ScopeMismatch,
                    binding.span(),
                    format!(
                        "{} is scoped to {} but {} only declares {}",
                        binding.description(),
                        scope,
                        graph.decl.type_data.readable(),
                        render_scopes(&visible),
                    ),
                );
            }
            for dep in graph.deps(idx) {
                if let DepLocation::Ancestor(depth) = dep.location {
                    if !self.ancestor_extendable(graph, depth) {
                        diagnostics.error(
                            DiagnosticKind::ScopeInheritanceViolation,
                            binding.span(),
                            format!(
                                "{} inherits {} from a parent graph that is not declared extendable",
                                binding.description(),
                                dep.request.key.readable()
                            ),
                        );
                    }
                }
            }
        }
        // Accessors re-exposing inherited bindings inherit too.
        for (request, location) in graph.root_requests.iter().zip(graph.root_locations.iter()) {
            if let DepLocation::Ancestor(depth) = location {
                if !self.ancestor_extendable(graph, *depth) {
                    diagnostics.error(
                        DiagnosticKind::ScopeInheritanceViolation,
                        request.span(),
                        format!(
                            "{} inherits {} from a parent graph that is not declared extendable",
                            request.description(graph.decl.name()),
                            request.request_key().readable()
                        ),
                    );
                }
            }
        }
    }

    fn ancestor_extendable(&self, graph: &BindingGraph, depth: u32) -> bool {
        graph
            .ancestor_extendable
            .get((depth - 1) as usize)
            .copied()
            .unwrap_or(false)
    }

    /// Alias chains must terminate in a non-alias binding.
    fn check_aliases(&self, graph: &BindingGraph, diagnostics: &mut DiagnosticsBuffer) {
        for (_, binding) in graph.bindings() {
            let Binding::Alias(alias) = binding else {
                continue;
            };
            let mut visited = HashSet::new();
            visited.insert(alias.key.clone());
            let mut chain = vec![alias.key.readable()];
            let mut current = alias.target.clone();
            loop {
                if !visited.insert(current.clone()) {
                    chain.push(current.readable());
                    diagnostics.error(
                        DiagnosticKind::AliasCycle,
                        alias.span.clone(),
                        format!("binds chain does not terminate: {}", chain.join(" -> ")),
                    );
                    break;
                }
                chain.push(current.readable());
                match graph.lookup(&current) {
                    Some(idx) => match graph.binding(idx) {
                        Binding::Alias(next) => current = next.target.clone(),
                        _ => break,
                    },
                    // Resolved in an ancestor; ancestors validate their
                    // own chains.
                    None => break,
                }
            }
        }
    }

    fn check_multibindings(&self, graph: &BindingGraph, diagnostics: &mut DiagnosticsBuffer) {
        for (_, binding) in graph.bindings() {
            match binding {
                Binding::MultiSet(set) => {
                    if set.contributions.is_empty() && !set.allow_empty {
                        diagnostics.error(
                            DiagnosticKind::EmptyMultibinding,
                            set.span.clone(),
                            format!(
                                "multibinding {} has no contributions and does not allow empty",
                                set.key.readable()
                            ),
                        );
                    }
                }
                Binding::MultiMap(map) => {
                    if map.contributions.is_empty() && !map.allow_empty {
                        diagnostics.error(
                            DiagnosticKind::EmptyMultibinding,
                            map.span.clone(),
                            format!(
                                "multibinding {} has no contributions and does not allow empty",
                                map.key.readable()
                            ),
                        );
                    }
                    let mut seen = HashSet::new();
                    for contribution in &map.contributions {
                        if !seen.insert(contribution.map_key.clone()) {
                            diagnostics.error(
                                DiagnosticKind::MultibindingKeyCollision,
                                contribution.span.clone(),
                                format!(
                                    "duplicated map key {} for {}",
                                    contribution.map_key,
                                    map.key.readable()
                                ),
                            );
                        }
                        let implied = contribution.map_key.key_type();
                        if implied.canonical_string_path_without_args()
                            != map.key_type.canonical_string_path_without_args()
                        {
                            diagnostics.error(
                                DiagnosticKind::MultibindingKeyCollision,
                                contribution.span.clone(),
                                format!(
                                    "map key {} has type {} but {} declares key type {}",
                                    contribution.map_key,
                                    implied.readable(),
                                    map.key.readable(),
                                    map.key_type.readable()
                                ),
                            );
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Invariant: the factory's assisted parameter set equals the
    /// constructor's, keyed by `(type, identifier)`, with no duplicates
    /// on either side. Assisted requests through `Lazy` never reach this
    /// far; the symbol model rejects them.
    fn check_assisted(&self, graph: &BindingGraph, diagnostics: &mut DiagnosticsBuffer) {
        for (_, binding) in graph.bindings() {
            let Binding::AssistedFactory(factory) = binding else {
                continue;
            };
            let mut factory_set = HashSet::new();
            for (name, key, id) in &factory.decl.assisted_params {
                if !factory_set.insert((key.readable(), id.clone())) {
                    diagnostics.error(
                        DiagnosticKind::AssistedMismatch,
                        factory.decl.span.clone(),
                        format!(
                            "duplicate assisted parameter ({}, \"{}\") on {} ({})",
                            key.readable(),
                            id,
                            factory.decl.type_data.readable(),
                            name
                        ),
                    );
                }
            }
            let mut target_set = HashSet::new();
            for param in factory.target_decl.assisted_params() {
                let entry = (param.request.key.readable(), param.assisted_id.clone());
                if !target_set.insert(entry) {
                    diagnostics.error(
                        DiagnosticKind::AssistedMismatch,
                        factory.target_decl.span.clone(),
                        format!(
                            "duplicate assisted parameter ({}, \"{}\") on {}",
                            param.request.key.readable(),
                            param.assisted_id,
                            factory.target_decl.type_data.readable()
                        ),
                    );
                }
            }
            if factory_set != target_set {
                diagnostics.error(
                    DiagnosticKind::AssistedMismatch,
                    factory.decl.span.clone(),
                    format!(
                        "assisted parameters of {} do not match the constructor of {}",
                        factory.decl.type_data.readable(),
                        factory.target_decl.type_data.readable()
                    ),
                );
            }
        }
    }

    /// With full-graph validation on, bindings no root request reaches
    /// are reported as warnings.
    fn check_reachability(&self, graph: &BindingGraph, diagnostics: &mut DiagnosticsBuffer) {
        let mut reachable = HashSet::new();
        let mut queue = VecDeque::new();
        for request in &graph.root_requests {
            if let Some(idx) = graph.lookup(&request.request_key()) {
                if reachable.insert(idx) {
                    queue.push_back(idx);
                }
            }
        }
        while let Some(idx) = queue.pop_front() {
            for dep in graph.deps(idx) {
                if let DepLocation::Local(to) = dep.location {
                    if reachable.insert(to) {
                        queue.push_back(to);
                    }
                }
            }
        }
        for (idx, binding) in graph.bindings() {
            if !reachable.contains(&idx) {
                diagnostics.warning(
                    DiagnosticKind::UnreachableBinding,
                    binding.span(),
                    format!("{} is never requested", binding.description()),
                );
            }
        }
    }

    // ---- topological sealing --------------------------------------------

    fn sort(
        &self,
        graph: &BindingGraph,
        diagnostics: &mut DiagnosticsBuffer,
    ) -> Result<SealData, InternalError> {
        let n = graph.len();
        let mut petgraph: DiGraph<u32, bool> = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..n).map(|i| petgraph.add_node(i as u32)).collect();
        for (idx, _) in graph.bindings() {
            for dep in graph.deps(idx) {
                if let DepLocation::Local(to) = dep.location {
                    if to.index() >= n {
                        return Err(InternalError::BadIndex(to.index()));
                    }
                    petgraph.add_edge(
                        nodes[idx.index()],
                        nodes[to.index()],
                        dep.request.wrapper.is_deferrable(),
                    );
                }
            }
        }

        let mut order = Vec::with_capacity(n);
        let mut back_edges = HashSet::new();

        // Tarjan returns components in reverse topological order:
        // dependencies come before their dependents, which is exactly
        // construction order.
        let components = petgraph::algo::tarjan_scc(&petgraph);
        for component in components {
            if component.len() == 1 {
                let node = component[0];
                let idx = BindingIdx(petgraph[node]);
                let self_edges: Vec<bool> = petgraph
                    .edges_connecting(node, node)
                    .map(|e| *e.weight())
                    .collect();
                if !self_edges.is_empty() {
                    if self_edges.iter().all(|deferrable| *deferrable) {
                        back_edges.insert((idx, idx));
                    } else {
                        diagnostics.error(
                            DiagnosticKind::SelfCycle,
                            graph.binding(idx).span(),
                            format!(
                                "{} depends directly on itself without a deferrable wrapper",
                                graph.binding(idx).description()
                            ),
                        );
                    }
                }
                order.push(idx);
                continue;
            }

            let members: HashSet<NodeIndex> = component.iter().copied().collect();
            // Deferrable edges inside the component become back edges;
            // the rest must form a DAG or the cycle is illegal.
            let mut eager_adjacency: HashMap<NodeIndex, Vec<NodeIndex>> = HashMap::new();
            for node in &component {
                for edge in petgraph.edges(*node) {
                    if !members.contains(&edge.target()) || edge.target() == *node {
                        continue;
                    }
                    if *edge.weight() {
                        back_edges.insert((
                            BindingIdx(petgraph[*node]),
                            BindingIdx(petgraph[edge.target()]),
                        ));
                    } else {
                        eager_adjacency.entry(*node).or_default().push(edge.target());
                    }
                }
            }

            if let Some(expanded) = kahn_expand(&component, &eager_adjacency, &petgraph) {
                order.extend(expanded);
            } else {
                let path = find_cycle(&component, &eager_adjacency);
                diagnostics.error(
                    DiagnosticKind::GraphCycle,
                    path.first()
                        .map(|n| graph.binding(BindingIdx(petgraph[*n])).span())
                        .unwrap_or_default(),
                    format!(
                        "cyclic dependency detected:\n{}",
                        render_cycle(&path, &petgraph, graph)
                    ),
                );
                // Keep a deterministic order so later stages stay
                // stable even for an invalid graph.
                let mut rest: Vec<BindingIdx> =
                    component.iter().map(|n| BindingIdx(petgraph[*n])).collect();
                rest.sort();
                order.extend(rest);
            }
        }

        let mut ordinals = vec![0u32; n];
        for (position, idx) in order.iter().enumerate() {
            ordinals[idx.index()] = position as u32;
        }

        Ok(SealData {
            order,
            back_edges,
            ordinals,
        })
    }
}

/// Expands one component in dependency order, breaking ties by
/// declaration order then key rendering. Returns `None` when the eager
/// edges alone are cyclic.
fn kahn_expand(
    component: &[NodeIndex],
    adjacency: &HashMap<NodeIndex, Vec<NodeIndex>>,
    petgraph: &DiGraph<u32, bool>,
) -> Option<Vec<BindingIdx>> {
    // Construction must start from bindings whose eager dependencies are
    // all outside the component, i.e. out-degree zero within it.
    let mut remaining_out: HashMap<NodeIndex, usize> = component
        .iter()
        .map(|n| (*n, adjacency.get(n).map(|v| v.len()).unwrap_or(0)))
        .collect();
    let mut reverse: HashMap<NodeIndex, Vec<NodeIndex>> = HashMap::new();
    for (from, targets) in adjacency {
        for to in targets {
            reverse.entry(*to).or_default().push(*from);
        }
    }

    let mut result = Vec::new();
    let mut done: HashSet<NodeIndex> = HashSet::new();
    while result.len() < component.len() {
        let mut ready: Vec<NodeIndex> = component
            .iter()
            .filter(|n| !done.contains(n) && remaining_out[n] == 0)
            .copied()
            .collect();
        if ready.is_empty() {
            return None;
        }
        ready.sort_by_key(|n| petgraph[*n]);
        let next = ready[0];
        done.insert(next);
        result.push(BindingIdx(petgraph[next]));
        if let Some(dependents) = reverse.get(&next) {
            for dependent in dependents {
                if let Some(count) = remaining_out.get_mut(dependent) {
                    *count -= 1;
                }
            }
        }
    }
    Some(result)
}

/// Finds one concrete cycle over the eager edges of a component.
fn find_cycle(
    component: &[NodeIndex],
    adjacency: &HashMap<NodeIndex, Vec<NodeIndex>>,
) -> Vec<NodeIndex> {
    let start = component[0];
    let mut stack = vec![start];
    let mut on_stack = HashSet::new();
    on_stack.insert(start);
    loop {
        let current = *stack.last().expect("stack");
        let next = adjacency
            .get(&current)
            .and_then(|targets| targets.first())
            .copied();
        match next {
            Some(next) if on_stack.contains(&next) => {
                let entry = stack.iter().position(|n| *n == next).unwrap_or(0);
                let mut path: Vec<NodeIndex> = stack[entry..].to_vec();
                path.push(next);
                return path;
            }
            Some(next) => {
                stack.push(next);
                on_stack.insert(next);
            }
            None => return stack,
        }
    }
}

fn render_cycle(
    path: &[NodeIndex],
    petgraph: &DiGraph<u32, bool>,
    graph: &BindingGraph,
) -> String {
    let mut out = String::new();
    for (i, node) in path.iter().enumerate() {
        let description = graph.binding(BindingIdx(petgraph[*node])).description();
        if i == 0 {
            out.push_str(&format!("*-- {}\n", description));
        } else if i == path.len() - 1 {
            out.push_str(&format!("*-> {}\n", description));
        } else {
            out.push_str(&format!("|   {}\n", description));
        }
    }
    out
}

fn render_scopes(scopes: &[crate::keys::ScopeKey]) -> String {
    if scopes.is_empty() {
        return "no scopes".to_owned();
    }
    scopes
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Whether an edge is realized through a delegate provider.
pub fn is_deferred_edge(graph: &BindingGraph, from: BindingIdx, to: BindingIdx) -> bool {
    graph
        .seal_data()
        .map(|seal| seal.back_edges.contains(&(from, to)))
        .unwrap_or(false)
}
