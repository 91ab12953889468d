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

use crate::options::{CustomAnnotations, MetroOptions};
use lazy_static::lazy_static;
use metro_common::AnnotationData;
use std::collections::{HashMap, HashSet};

/// The abstract marker vocabulary. Concrete annotation paths map onto
/// these kinds; everything downstream of the symbol model only sees the
/// kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    GraphRoot,
    GraphFactory,
    GraphExtension,
    GraphExtensionFactory,
    ContributesTo,
    ContributesBinding,
    ContributesIntoSet,
    ContributesIntoMap,
    Inject,
    AssistedInject,
    Assisted,
    AssistedFactory,
    Provides,
    Binds,
    Includes,
    IntoSet,
    IntoMap,
    ElementsIntoSet,
    Multibinds,
    Scope,
    Qualifier,
    MapKey,
    BindingContainer,
}

lazy_static! {
    /// The built-in annotation set shipped with the runtime crate.
    static ref BUILT_IN: Vec<(&'static str, MarkerKind)> = vec![
        ("metro::GraphRoot", MarkerKind::GraphRoot),
        ("metro::GraphRoot::Factory", MarkerKind::GraphFactory),
        ("metro::GraphExtension", MarkerKind::GraphExtension),
        ("metro::GraphExtension::Factory", MarkerKind::GraphExtensionFactory),
        ("metro::ContributesTo", MarkerKind::ContributesTo),
        ("metro::ContributesBinding", MarkerKind::ContributesBinding),
        ("metro::ContributesIntoSet", MarkerKind::ContributesIntoSet),
        ("metro::ContributesIntoMap", MarkerKind::ContributesIntoMap),
        ("metro::Inject", MarkerKind::Inject),
        ("metro::AssistedInject", MarkerKind::AssistedInject),
        ("metro::Assisted", MarkerKind::Assisted),
        ("metro::AssistedFactory", MarkerKind::AssistedFactory),
        ("metro::Provides", MarkerKind::Provides),
        ("metro::Binds", MarkerKind::Binds),
        ("metro::Includes", MarkerKind::Includes),
        ("metro::IntoSet", MarkerKind::IntoSet),
        ("metro::IntoMap", MarkerKind::IntoMap),
        ("metro::ElementsIntoSet", MarkerKind::ElementsIntoSet),
        ("metro::Multibinds", MarkerKind::Multibinds),
        ("metro::Scope", MarkerKind::Scope),
        ("metro::Qualifier", MarkerKind::Qualifier),
        ("metro::MapKey", MarkerKind::MapKey),
        ("metro::BindingContainer", MarkerKind::BindingContainer),
    ];

    /// JSR-330 / Dagger equivalents, recognized when
    /// `allowJavaAnnotations` is set. Equivalence is semantic: a foreign
    /// marker behaves exactly like the built-in it maps to.
    static ref JAVA_DIALECT: Vec<(&'static str, MarkerKind)> = vec![
        ("javax::inject::Inject", MarkerKind::Inject),
        ("jakarta::inject::Inject", MarkerKind::Inject),
        ("javax::inject::Qualifier", MarkerKind::Qualifier),
        ("jakarta::inject::Qualifier", MarkerKind::Qualifier),
        ("javax::inject::Scope", MarkerKind::Scope),
        ("jakarta::inject::Scope", MarkerKind::Scope),
        ("dagger::Component", MarkerKind::GraphRoot),
        ("dagger::Component::Factory", MarkerKind::GraphFactory),
        ("dagger::Subcomponent", MarkerKind::GraphExtension),
        ("dagger::Subcomponent::Factory", MarkerKind::GraphExtensionFactory),
        ("dagger::Module", MarkerKind::BindingContainer),
        ("dagger::Provides", MarkerKind::Provides),
        ("dagger::Binds", MarkerKind::Binds),
        ("dagger::multibindings::IntoSet", MarkerKind::IntoSet),
        ("dagger::multibindings::IntoMap", MarkerKind::IntoMap),
        ("dagger::multibindings::ElementsIntoSet", MarkerKind::ElementsIntoSet),
        ("dagger::multibindings::Multibinds", MarkerKind::Multibinds),
        ("dagger::assisted::AssistedInject", MarkerKind::AssistedInject),
        ("dagger::assisted::Assisted", MarkerKind::Assisted),
        ("dagger::assisted::AssistedFactory", MarkerKind::AssistedFactory),
        ("dagger::MapKey", MarkerKind::MapKey),
    ];

    /// Foreign annotations that are themselves scopes or qualifiers
    /// rather than meta-markers. Their declarations are not part of the
    /// compilation, so they are recognized by path.
    static ref JAVA_SCOPES: Vec<&'static str> =
        vec!["javax::inject::Singleton", "jakarta::inject::Singleton"];
    static ref JAVA_QUALIFIERS: Vec<&'static str> =
        vec!["javax::inject::Named", "jakarta::inject::Named"];
}

/// The recognized annotation set, fixed at construction from the
/// options.
#[derive(Debug, Clone)]
pub struct MarkerSet {
    by_path: HashMap<String, MarkerKind>,
    /// Concrete scope annotations known without consulting their
    /// declarations.
    known_scopes: HashSet<String>,
    /// Concrete qualifier annotations known without consulting their
    /// declarations.
    known_qualifiers: HashSet<String>,
}

impl MarkerSet {
    pub fn from_options(options: &MetroOptions) -> Self {
        let mut by_path: HashMap<String, MarkerKind> = BUILT_IN
            .iter()
            .map(|(path, kind)| ((*path).to_owned(), *kind))
            .collect();
        let mut known_scopes = HashSet::new();
        let mut known_qualifiers = HashSet::new();

        if options.allow_java_annotations {
            for (path, kind) in JAVA_DIALECT.iter() {
                by_path.insert((*path).to_owned(), *kind);
            }
            known_scopes.extend(JAVA_SCOPES.iter().map(|p| (*p).to_owned()));
            known_qualifiers.extend(JAVA_QUALIFIERS.iter().map(|p| (*p).to_owned()));
        }

        let custom = &options.custom_annotations;
        let mut add = |paths: &Vec<String>, kind: MarkerKind| {
            for path in paths {
                by_path.insert(path.clone(), kind);
            }
        };
        add(&custom.include_graph_root, MarkerKind::GraphRoot);
        add(&custom.include_inject, MarkerKind::Inject);
        add(&custom.include_provides, MarkerKind::Provides);
        add(&custom.include_binds, MarkerKind::Binds);
        add(&custom.include_map_key, MarkerKind::MapKey);
        add(&custom.include_contributes_to, MarkerKind::ContributesTo);
        add(
            &custom.include_contributes_binding,
            MarkerKind::ContributesBinding,
        );
        add(&custom.include_assisted, MarkerKind::Assisted);
        add(&custom.include_assisted_inject, MarkerKind::AssistedInject);
        add(&custom.include_assisted_factory, MarkerKind::AssistedFactory);
        add(&custom.include_into_set, MarkerKind::IntoSet);
        add(&custom.include_into_map, MarkerKind::IntoMap);
        add(&custom.include_multibinds, MarkerKind::Multibinds);
        add(&custom.include_binding_container, MarkerKind::BindingContainer);
        known_scopes.extend(custom.include_scope.iter().cloned());
        known_qualifiers.extend(custom.include_qualifier.iter().cloned());

        MarkerSet {
            by_path,
            known_scopes,
            known_qualifiers,
        }
    }

    pub fn kind_of(&self, annotation: &AnnotationData) -> Option<MarkerKind> {
        self.by_path.get(&annotation.type_data.path).copied()
    }

    pub fn find<'a>(
        &self,
        annotations: &'a [AnnotationData],
        kind: MarkerKind,
    ) -> Option<&'a AnnotationData> {
        annotations.iter().find(|a| self.kind_of(a) == Some(kind))
    }

    pub fn has(&self, annotations: &[AnnotationData], kind: MarkerKind) -> bool {
        self.find(annotations, kind).is_some()
    }

    pub fn is_known_scope(&self, path: &str) -> bool {
        self.known_scopes.contains(path)
    }

    pub fn is_known_qualifier(&self, path: &str) -> bool {
        self.known_qualifiers.contains(path)
    }
}
