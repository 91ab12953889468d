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

//! Aggregation of scope contributions across compilation units.
//!
//! The host publishes `(type, scope)` hints for every contributing
//! declaration it knows about; this module resolves them into a stable,
//! deduplicated contribution set per scope. Collisions on the same type
//! key that `replaces`/`excludes` do not mediate are left for the graph
//! validator to report.

use crate::asm::markers::MarkerKind;
use crate::asm::nodes::{ContainerDecl, MultibindingKind};
use crate::asm::AsmContext;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::host::{ContributionHint, ContributionHintSource};
use crate::keys::{ScopeKey, TypeKey};
use itertools::Itertools;
use metro_common::{SourceSpan, TypeId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct ContributedBinding {
    /// The contributing class itself; constructor-injected.
    pub impl_key: TypeKey,
    /// The supertype the class is bound as, including any qualifier on
    /// the contributing class.
    pub bound_key: TypeKey,
    pub multibinding: MultibindingKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub enum ContributedKind {
    /// `ContributesTo`: the type's providers and binds merge into every
    /// graph of the scope.
    Container(Rc<ContainerDecl>),
    /// `ContributesBinding` and friends: a concrete class bound as a
    /// supertype, optionally into a multibinding.
    Binding(ContributedBinding),
    /// A `GraphExtension` linked to every graph of the scope.
    Extension(TypeId),
}

#[derive(Debug, Clone)]
pub struct Contribution {
    pub origin: TypeId,
    pub module_id: String,
    pub scope: ScopeKey,
    pub replaces: Vec<TypeId>,
    pub kind: ContributedKind,
}

/// The aggregate for one scope: contributions plus the diagnostics their
/// declarations produced. Computed once and cached.
#[derive(Debug, Default)]
pub struct ScopeContributions {
    pub contributions: Vec<Contribution>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ContributionCatalog<'a> {
    asm: &'a AsmContext<'a>,
    hints: Vec<ContributionHint>,
    cache: RefCell<HashMap<ScopeKey, Rc<ScopeContributions>>>,
}

impl<'a> ContributionCatalog<'a> {
    pub fn new(asm: &'a AsmContext<'a>, source: &dyn ContributionHintSource) -> Self {
        ContributionCatalog {
            asm,
            hints: source.hints(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// The stable contribution set for one scope.
    pub fn for_scope(&self, scope: &ScopeKey) -> Rc<ScopeContributions> {
        if let Some(cached) = self.cache.borrow().get(scope) {
            return cached.clone();
        }
        let computed = Rc::new(self.compute(scope));
        self.cache
            .borrow_mut()
            .insert(scope.clone(), computed.clone());
        computed
    }

    /// Contributions visible to one graph: the union over its scope set,
    /// minus its `excludes`.
    pub fn for_graph(
        &self,
        scopes: &[ScopeKey],
        excludes: &[TypeId],
    ) -> (Vec<Contribution>, Vec<Diagnostic>) {
        let mut contributions = Vec::new();
        let mut diagnostics = Vec::new();
        for scope in scopes {
            let scope_set = self.for_scope(scope);
            diagnostics.extend(scope_set.diagnostics.iter().cloned());
            contributions.extend(
                scope_set
                    .contributions
                    .iter()
                    .filter(|c| !excludes.contains(&c.origin))
                    .cloned(),
            );
        }
        (contributions, diagnostics)
    }

    fn compute(&self, scope: &ScopeKey) -> ScopeContributions {
        let mut result = ScopeContributions::default();
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for hint in self.hints.iter().filter(|h| h.scope == *scope) {
            // Hints are deduplicated by originating declaration across
            // compilation units.
            if !seen.insert(hint.type_id.clone()) {
                continue;
            }
            match self.build_contribution(&hint.type_id, scope) {
                Ok(Some(contribution)) => candidates.push(contribution),
                Ok(None) => {}
                Err(diagnostics) => result.diagnostics.extend(diagnostics),
            }
        }
        result.contributions = apply_replacements(candidates)
            .into_iter()
            .sorted_by(|a, b| {
                (a.module_id.as_str(), &a.origin).cmp(&(b.module_id.as_str(), &b.origin))
            })
            .collect();
        result
    }

    fn build_contribution(
        &self,
        id: &TypeId,
        scope: &ScopeKey,
    ) -> Result<Option<Contribution>, Vec<Diagnostic>> {
        let Some(class) = self.asm.class(id) else {
            // The hint names a declaration from a unit that is not on the
            // effective classpath; ignore it.
            return Ok(None);
        };
        let markers = &self.asm.markers;

        if let Some(annotation) = markers.find(&class.annotations, MarkerKind::ContributesTo) {
            let container = self.asm.container_decl(id).map_err(|e| e.to_vec())?;
            return Ok(Some(Contribution {
                origin: id.clone(),
                module_id: class.module_id.clone(),
                scope: scope.clone(),
                replaces: annotation.get_class_list("replaces").iter().map(TypeId::of).collect(),
                kind: ContributedKind::Container(container),
            }));
        }

        let binding_marker = [
            (MarkerKind::ContributesBinding, None),
            (MarkerKind::ContributesIntoSet, Some(MultibindingKind::IntoSet)),
            (MarkerKind::ContributesIntoMap, None),
        ]
        .into_iter()
        .find_map(|(kind, multi)| {
            markers
                .find(&class.annotations, kind)
                .map(|a| (kind, a, multi))
        });
        if let Some((kind, annotation, multi)) = binding_marker {
            let mut errors = Vec::new();
            let bound_type = match annotation.get_class("bindingType") {
                Some(t) => t.clone(),
                None => match &class.supertypes[..] {
                    [only] => only.clone(),
                    [] => {
                        errors.push(Diagnostic::new(
                            DiagnosticKind::NotAnnotated,
                            class.span.clone(),
                            format!(
                                "{} contributes a binding but has no supertype to bind",
                                class.type_data.readable()
                            ),
                        ));
                        return Err(errors);
                    }
                    _ => {
                        errors.push(Diagnostic::new(
                            DiagnosticKind::AnnotationConflict,
                            class.span.clone(),
                            format!(
                                "{} has multiple supertypes; specify bindingType explicitly",
                                class.type_data.readable()
                            ),
                        ));
                        return Err(errors);
                    }
                },
            };
            let multibinding = match kind {
                MarkerKind::ContributesIntoMap => match self.asm.map_key_of(&class.annotations) {
                    Some(map_key) => MultibindingKind::IntoMap(map_key),
                    None => {
                        errors.push(Diagnostic::new(
                            DiagnosticKind::NotAnnotated,
                            class.span.clone(),
                            format!(
                                "{} contributes into a map but has no map key annotation",
                                class.type_data.readable()
                            ),
                        ));
                        return Err(errors);
                    }
                },
                _ => multi.unwrap_or(MultibindingKind::None),
            };
            let qualifier = self
                .asm
                .qualifier_of(&class.annotations, &class.span)
                .map_err(|e| vec![e])?;
            return Ok(Some(Contribution {
                origin: id.clone(),
                module_id: class.module_id.clone(),
                scope: scope.clone(),
                replaces: annotation.get_class_list("replaces").iter().map(TypeId::of).collect(),
                kind: ContributedKind::Binding(ContributedBinding {
                    impl_key: TypeKey::new(class.type_data.clone()),
                    bound_key: TypeKey::qualified(bound_type, qualifier),
                    multibinding,
                    span: class.span.clone(),
                }),
            }));
        }

        if markers.has(&class.annotations, MarkerKind::GraphExtension) {
            return Ok(Some(Contribution {
                origin: id.clone(),
                module_id: class.module_id.clone(),
                scope: scope.clone(),
                replaces: Vec::new(),
                kind: ContributedKind::Extension(id.clone()),
            }));
        }

        Ok(Some(Contribution {
            origin: id.clone(),
            module_id: class.module_id.clone(),
            scope: scope.clone(),
            replaces: Vec::new(),
            kind: ContributedKind::Container(self.asm.container_decl(id).map_err(|e| e.to_vec())?),
        }))
    }
}

/// Removes every contribution whose origin appears in the transitive
/// `replaces` closure of the candidate set.
pub fn apply_replacements(candidates: Vec<Contribution>) -> Vec<Contribution> {
    let mut replaces_by_origin: HashMap<TypeId, HashSet<TypeId>> = HashMap::new();
    for candidate in &candidates {
        replaces_by_origin
            .entry(candidate.origin.clone())
            .or_default()
            .extend(candidate.replaces.iter().cloned());
    }
    // Transitive closure: replacing a replacer also replaces what it
    // replaced.
    loop {
        let mut changed = false;
        let snapshot = replaces_by_origin.clone();
        for targets in replaces_by_origin.values_mut() {
            let indirect: HashSet<TypeId> = targets
                .iter()
                .filter_map(|t| snapshot.get(t))
                .flat_map(|s| s.iter().cloned())
                .collect();
            for t in indirect {
                changed |= targets.insert(t);
            }
        }
        if !changed {
            break;
        }
    }
    let replaced: HashSet<&TypeId> = replaces_by_origin.values().flatten().collect();
    candidates
        .iter()
        .filter(|c| !replaced.contains(&c.origin))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use metro_common::TypeData;

    fn contribution(origin: &str, replaces: Vec<&str>) -> Contribution {
        Contribution {
            origin: TypeId(origin.to_owned()),
            module_id: "app".to_owned(),
            scope: ScopeKey::unbounded(),
            replaces: replaces.into_iter().map(|r| TypeId(r.to_owned())).collect(),
            kind: ContributedKind::Binding(ContributedBinding {
                impl_key: TypeKey::new(TypeData::local(origin, "app")),
                bound_key: TypeKey::new(TypeData::local("Iface", "app")),
                multibinding: MultibindingKind::None,
                span: SourceSpan::unknown(),
            }),
        }
    }

    fn origins(contributions: &[Contribution]) -> Vec<String> {
        contributions.iter().map(|c| c.origin.0.clone()).collect()
    }

    #[test]
    fn replaces_removes_the_target() {
        let retained = apply_replacements(vec![
            contribution("::app::Real", vec!["::app::Fake"]),
            contribution("::app::Fake", vec![]),
        ]);
        assert_eq!(origins(&retained), vec!["::app::Real"]);
    }

    #[test]
    fn replaces_closure_is_transitive() {
        let retained = apply_replacements(vec![
            contribution("::app::A", vec!["::app::B"]),
            contribution("::app::B", vec!["::app::C"]),
            contribution("::app::C", vec![]),
        ]);
        assert_eq!(origins(&retained), vec!["::app::A"]);
    }

    #[test]
    fn unrelated_contributions_are_retained() {
        let retained = apply_replacements(vec![
            contribution("::app::A", vec![]),
            contribution("::app::B", vec![]),
        ]);
        assert_eq!(retained.len(), 2);
    }
}
