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

//! The annotation & symbol model.
//!
//! Presents host declarations as a uniform dependency injection model.
//! Entities are built lazily on first reference and cached by [`TypeId`];
//! a declaration with shape errors caches its diagnostics instead, so
//! every graph that touches it sees the same report.

pub mod markers;
pub mod nodes;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::host::TypeOracle;
use crate::keys::{ContextualTypeKey, MapKeyValue, ScopeKey, TypeKey, LAZY_PATH};
use crate::options::MetroOptions;
use markers::{MarkerKind, MarkerSet};
use metro_common::{
    AnnotationData, AnnotationValue, ClassSymbol, FunctionSymbol, SourceSpan, SymbolIndex,
    TypeData, TypeId, Visibility,
};
use nodes::*;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type AsmResult<T> = Result<Rc<T>, Rc<Vec<Diagnostic>>>;

pub struct AsmContext<'a> {
    symbols: &'a SymbolIndex,
    oracle: &'a dyn TypeOracle,
    pub markers: MarkerSet,
    graphs: RefCell<HashMap<TypeId, AsmResult<GraphDecl>>>,
    containers: RefCell<HashMap<TypeId, AsmResult<ContainerDecl>>>,
    inject_classes: RefCell<HashMap<TypeId, AsmResult<Option<InjectClassDecl>>>>,
    assisted_factories: RefCell<HashMap<TypeId, AsmResult<AssistedFactoryDecl>>>,
}

impl<'a> AsmContext<'a> {
    pub fn new(
        symbols: &'a SymbolIndex,
        oracle: &'a dyn TypeOracle,
        options: &MetroOptions,
    ) -> Self {
        AsmContext {
            symbols,
            oracle,
            markers: MarkerSet::from_options(options),
            graphs: RefCell::new(HashMap::new()),
            containers: RefCell::new(HashMap::new()),
            inject_classes: RefCell::new(HashMap::new()),
            assisted_factories: RefCell::new(HashMap::new()),
        }
    }

    pub fn symbols(&self) -> &SymbolIndex {
        self.symbols
    }

    pub fn oracle(&self) -> &dyn TypeOracle {
        self.oracle
    }

    pub fn class(&self, id: &TypeId) -> Option<&ClassSymbol> {
        self.symbols.get(id)
    }

    /// Graph entry points declared in the current compilation unit, in
    /// declaration order.
    pub fn graph_roots(&self) -> Vec<TypeId> {
        self.symbols
            .classes()
            .filter(|class| self.markers.has(&class.annotations, MarkerKind::GraphRoot))
            .map(|class| class.type_id())
            .collect()
    }

    pub fn is_graph_extension(&self, id: &TypeId) -> bool {
        self.class(id)
            .map(|class| {
                self.markers
                    .has(&class.annotations, MarkerKind::GraphExtension)
            })
            .unwrap_or(false)
    }

    // ---- graphs ---------------------------------------------------------

    pub fn graph_decl(&self, id: &TypeId) -> AsmResult<GraphDecl> {
        if let Some(cached) = self.graphs.borrow().get(id) {
            return cached.clone();
        }
        let result = self
            .build_graph_decl(id)
            .map(Rc::new)
            .map_err(Rc::new);
        self.graphs.borrow_mut().insert(id.clone(), result.clone());
        result
    }

    fn build_graph_decl(&self, id: &TypeId) -> Result<GraphDecl, Vec<Diagnostic>> {
        let class = self.class(id).ok_or_else(|| {
            vec![Diagnostic::new(
                DiagnosticKind::MissingBinding,
                SourceSpan::unknown(),
                format!("unknown graph type {}", id),
            )]
        })?;
        let mut errors = Vec::new();

        let root_annotation = self.markers.find(&class.annotations, MarkerKind::GraphRoot);
        let extension_annotation = self
            .markers
            .find(&class.annotations, MarkerKind::GraphExtension);
        let annotation = match (root_annotation, extension_annotation) {
            (Some(_), Some(_)) => {
                errors.push(Diagnostic::new(
                    DiagnosticKind::AnnotationConflict,
                    class.span.clone(),
                    format!(
                        "{} is annotated as both a graph root and a graph extension",
                        class.type_data.readable()
                    ),
                ));
                return Err(errors);
            }
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => {
                errors.push(Diagnostic::new(
                    DiagnosticKind::NotAnnotated,
                    class.span.clone(),
                    format!("{} is not a graph declaration", class.type_data.readable()),
                ));
                return Err(errors);
            }
        };
        let is_extension = extension_annotation.is_some();

        if !class.is_abstract() {
            errors.push(Diagnostic::new(
                DiagnosticKind::IllegalTarget,
                class.span.clone(),
                format!(
                    "graph declaration {} must be an interface or abstract type",
                    class.type_data.readable()
                ),
            ));
        }

        let mut scopes = Vec::new();
        if let Some(scope_class) = annotation.get_class("scope") {
            scopes.push(ScopeKey::of(scope_class));
        }
        for additional in annotation.get_class_list("additionalScopes") {
            let key = ScopeKey::of(&additional);
            if !scopes.contains(&key) {
                scopes.push(key);
            }
        }

        let is_extendable = annotation.get_bool("isExtendable").unwrap_or(false);
        let binding_containers = annotation
            .get_class_list("bindingContainers")
            .iter()
            .map(TypeId::of)
            .collect();
        let excludes = annotation
            .get_class_list("excludes")
            .iter()
            .map(TypeId::of)
            .collect();

        let mut accessors = Vec::new();
        let mut injectors = Vec::new();
        for method in class.abstract_methods() {
            if method.params.is_empty() {
                if is_unit(&method.return_type) {
                    errors.push(Diagnostic::new(
                        DiagnosticKind::ExtensionContract,
                        method.span.clone(),
                        format!("accessor {} must return a value", method.name),
                    ));
                    continue;
                }
                let qualifier = match self.qualifier_of(&method.annotations, &method.span) {
                    Ok(q) => q,
                    Err(e) => {
                        errors.push(e);
                        None
                    }
                };
                accessors.push(AccessorDecl {
                    name: method.name.clone(),
                    request: ContextualTypeKey::from_request(&method.return_type, qualifier, false),
                    span: method.span.clone(),
                });
            } else if method.params.len() == 1 && is_unit(&method.return_type) {
                injectors.push(InjectorDecl {
                    name: method.name.clone(),
                    target: TypeKey::new(method.params[0].type_data.clone()),
                    span: method.span.clone(),
                });
            } else {
                errors.push(Diagnostic::new(
                    DiagnosticKind::ExtensionContract,
                    method.span.clone(),
                    format!(
                        "accessor {} on {} must have no parameters",
                        method.name,
                        class.type_data.readable()
                    ),
                ));
            }
        }

        let providers = self.provides_decls(class, &mut errors);
        let creator = self.creator_decl(class, is_extension, &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(GraphDecl {
            class: id.clone(),
            type_data: class.type_data.clone(),
            key: TypeKey::new(class.type_data.clone()),
            scopes,
            is_extendable,
            is_extension,
            binding_containers,
            excludes,
            accessors,
            injectors,
            providers,
            creator,
            module_id: class.module_id.clone(),
            span: class.span.clone(),
        })
    }

    fn creator_decl(
        &self,
        class: &ClassSymbol,
        is_extension: bool,
        errors: &mut Vec<Diagnostic>,
    ) -> Option<CreatorDecl> {
        let factory_kind = if is_extension {
            MarkerKind::GraphExtensionFactory
        } else {
            MarkerKind::GraphFactory
        };
        let factory = class
            .nested
            .iter()
            .find(|nested| self.markers.has(&nested.annotations, factory_kind))?;

        if !factory.is_abstract() {
            errors.push(Diagnostic::new(
                DiagnosticKind::CreatorContract,
                factory.span.clone(),
                format!(
                    "graph factory {} must be an interface or abstract type",
                    factory.type_data.readable()
                ),
            ));
            return None;
        }
        let abstract_methods: Vec<&FunctionSymbol> = factory.abstract_methods().collect();
        if abstract_methods.len() != 1 {
            errors.push(Diagnostic::new(
                DiagnosticKind::CreatorContract,
                factory.span.clone(),
                format!(
                    "graph factory {} must declare exactly one abstract method",
                    factory.type_data.readable()
                ),
            ));
            return None;
        }
        let method = abstract_methods[0];
        if method.return_type.canonical_string_path_without_args()
            != class.type_data.canonical_string_path_without_args()
        {
            errors.push(Diagnostic::new(
                DiagnosticKind::CreatorContract,
                method.span.clone(),
                format!(
                    "graph factory method {} must return {}",
                    method.name,
                    class.type_data.readable()
                ),
            ));
        }

        let mut params = Vec::new();
        for param in &method.params {
            let provides = self.markers.has(&param.annotations, MarkerKind::Provides);
            let includes = self.markers.has(&param.annotations, MarkerKind::Includes);
            let kind = match (provides, includes) {
                (true, false) => CreatorParamKind::Provides,
                (false, true) => CreatorParamKind::Includes,
                (true, true) => {
                    errors.push(Diagnostic::new(
                        DiagnosticKind::CreatorContract,
                        method.span.clone(),
                        format!(
                            "creator parameter {} cannot be both Provides and Includes",
                            param.name
                        ),
                    ));
                    continue;
                }
                (false, false) => {
                    errors.push(Diagnostic::new(
                        DiagnosticKind::CreatorContract,
                        method.span.clone(),
                        format!(
                            "creator parameter {} must be marked Provides or Includes",
                            param.name
                        ),
                    ));
                    continue;
                }
            };
            let qualifier = match self.qualifier_of(&param.annotations, &method.span) {
                Ok(q) => q,
                Err(e) => {
                    errors.push(e);
                    None
                }
            };
            params.push(CreatorParam {
                name: param.name.clone(),
                kind,
                key: TypeKey::qualified(param.type_data.clone(), qualifier),
                span: method.span.clone(),
            });
        }

        Some(CreatorDecl {
            factory_type: factory.type_data.clone(),
            method_name: method.name.clone(),
            params,
            span: factory.span.clone(),
        })
    }

    // ---- providers ------------------------------------------------------

    /// `Provides` and `Binds` callables declared on `class`.
    pub fn provides_decls(
        &self,
        class: &ClassSymbol,
        errors: &mut Vec<Diagnostic>,
    ) -> Vec<ProvidesDecl> {
        let mut result = Vec::new();
        for method in &class.methods {
            let kind = if self.markers.has(&method.annotations, MarkerKind::Provides) {
                if self.markers.has(&method.annotations, MarkerKind::Binds) {
                    errors.push(Diagnostic::new(
                        DiagnosticKind::AnnotationConflict,
                        method.span.clone(),
                        format!("{} cannot be both Provides and Binds", method.name),
                    ));
                    continue;
                }
                CallableKind::Provides
            } else if self.markers.has(&method.annotations, MarkerKind::Binds) {
                CallableKind::Binds
            } else {
                continue;
            };

            if method.visibility == Visibility::Private {
                errors.push(Diagnostic::new(
                    DiagnosticKind::VisibilityViolation,
                    method.span.clone(),
                    format!(
                        "{}.{} must be visible to generated code",
                        class.type_data.readable(),
                        method.name
                    ),
                ));
                continue;
            }

            match kind {
                CallableKind::Provides => {
                    if method.is_abstract {
                        errors.push(Diagnostic::new(
                            DiagnosticKind::IllegalTarget,
                            method.span.clone(),
                            format!("Provides member {} must have a body", method.name),
                        ));
                        continue;
                    }
                }
                CallableKind::Binds => {
                    if !method.is_abstract {
                        errors.push(Diagnostic::new(
                            DiagnosticKind::IllegalTarget,
                            method.span.clone(),
                            format!("Binds member {} must be abstract", method.name),
                        ));
                        continue;
                    }
                    if method.params.len() != 1 {
                        errors.push(Diagnostic::new(
                            DiagnosticKind::IllegalTarget,
                            method.span.clone(),
                            format!("Binds member {} must take exactly one parameter", method.name),
                        ));
                        continue;
                    }
                    let source = &method.params[0].type_data;
                    if !self.oracle.is_subtype(source, &method.return_type) {
                        errors.push(Diagnostic::new(
                            DiagnosticKind::IllegalTarget,
                            method.span.clone(),
                            format!(
                                "Binds member {}: {} does not conform to {}",
                                method.name,
                                source.readable(),
                                method.return_type.readable()
                            ),
                        ));
                        continue;
                    }
                }
            }

            let qualifier = match self.qualifier_of(&method.annotations, &method.span) {
                Ok(q) => q,
                Err(e) => {
                    errors.push(e);
                    None
                }
            };
            let scope = match self.scope_of(&method.annotations, &method.span) {
                Ok(s) => s,
                Err(e) => {
                    errors.push(e);
                    ScopeKey::unbounded()
                }
            };
            let multibinding = match self.multibinding_of(&method.annotations, &method.span) {
                Ok(m) => m,
                Err(e) => {
                    errors.push(e);
                    MultibindingKind::None
                }
            };

            let mut params = Vec::new();
            for param in &method.params {
                let param_qualifier = match self.qualifier_of(&param.annotations, &method.span) {
                    Ok(q) => q,
                    Err(e) => {
                        errors.push(e);
                        None
                    }
                };
                params.push(ParamDecl {
                    name: param.name.clone(),
                    request: ContextualTypeKey::from_request(
                        &param.type_data,
                        param_qualifier,
                        param.has_default,
                    ),
                    is_assisted: false,
                    assisted_id: String::new(),
                    span: method.span.clone(),
                });
            }

            result.push(ProvidesDecl {
                owner: class.type_data.clone(),
                name: method.name.clone(),
                kind,
                key: TypeKey::qualified(method.return_type.clone(), qualifier),
                params,
                scope,
                multibinding,
                is_static: method.is_static,
                span: method.span.clone(),
            });
        }
        result
    }

    // ---- binding containers ---------------------------------------------

    pub fn container_decl(&self, id: &TypeId) -> AsmResult<ContainerDecl> {
        if let Some(cached) = self.containers.borrow().get(id) {
            return cached.clone();
        }
        let result = self
            .build_container_decl(id)
            .map(Rc::new)
            .map_err(Rc::new);
        self.containers
            .borrow_mut()
            .insert(id.clone(), result.clone());
        result
    }

    fn build_container_decl(&self, id: &TypeId) -> Result<ContainerDecl, Vec<Diagnostic>> {
        let class = self.class(id).ok_or_else(|| {
            vec![Diagnostic::new(
                DiagnosticKind::MissingBinding,
                SourceSpan::unknown(),
                format!("unknown binding container {}", id),
            )]
        })?;
        let mut errors = Vec::new();

        let includes = self
            .markers
            .find(&class.annotations, MarkerKind::BindingContainer)
            .map(|annotation| {
                annotation
                    .get_class_list("includes")
                    .iter()
                    .map(TypeId::of)
                    .collect()
            })
            .unwrap_or_default();

        let providers = self.provides_decls(class, &mut errors);
        let mut multibinds = Vec::new();
        for method in class.abstract_methods() {
            let Some(annotation) = self.markers.find(&method.annotations, MarkerKind::Multibinds)
            else {
                continue;
            };
            let qualifier = match self.qualifier_of(&method.annotations, &method.span) {
                Ok(q) => q,
                Err(e) => {
                    errors.push(e);
                    None
                }
            };
            multibinds.push(MultibindsDecl {
                key: TypeKey::qualified(method.return_type.clone(), qualifier),
                allow_empty: annotation.get_bool("allowEmpty").unwrap_or(false),
                span: method.span.clone(),
            });
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ContainerDecl {
            class: id.clone(),
            type_data: class.type_data.clone(),
            includes,
            providers,
            multibinds,
            span: class.span.clone(),
        })
    }

    // ---- constructor injection ------------------------------------------

    /// The injectable view of a class: `Ok(None)` when the class exists
    /// but declares no injected constructor.
    pub fn inject_class(&self, id: &TypeId) -> AsmResult<Option<InjectClassDecl>> {
        if let Some(cached) = self.inject_classes.borrow().get(id) {
            return cached.clone();
        }
        let result = self
            .build_inject_class(id)
            .map(Rc::new)
            .map_err(Rc::new);
        self.inject_classes
            .borrow_mut()
            .insert(id.clone(), result.clone());
        result
    }

    fn build_inject_class(&self, id: &TypeId) -> Result<Option<InjectClassDecl>, Vec<Diagnostic>> {
        let Some(class) = self.class(id) else {
            return Ok(None);
        };
        let mut errors = Vec::new();

        let class_inject = self.markers.find(&class.annotations, MarkerKind::Inject);
        let injected_ctors: Vec<_> = class
            .constructors
            .iter()
            .filter(|ctor| {
                self.markers.has(&ctor.annotations, MarkerKind::Inject)
                    || self.markers.has(&ctor.annotations, MarkerKind::AssistedInject)
            })
            .collect();

        if class_inject.is_some() && !injected_ctors.is_empty() {
            errors.push(Diagnostic::new(
                DiagnosticKind::AnnotationConflict,
                class.span.clone(),
                format!(
                    "{} is annotated Inject on both the class and a constructor",
                    class.type_data.readable()
                ),
            ));
            return Err(errors);
        }
        if injected_ctors.len() > 1 {
            errors.push(Diagnostic::new(
                DiagnosticKind::AnnotationConflict,
                class.span.clone(),
                format!(
                    "{} declares more than one injected constructor",
                    class.type_data.readable()
                ),
            ));
            return Err(errors);
        }

        let ctor = if let Some(ctor) = injected_ctors.first() {
            Some(*ctor)
        } else if class_inject.is_some() {
            // Class-level Inject requires an unambiguous constructor.
            if class.constructors.len() > 1 {
                errors.push(Diagnostic::new(
                    DiagnosticKind::AnnotationConflict,
                    class.span.clone(),
                    format!(
                        "{} is Inject but has multiple constructors",
                        class.type_data.readable()
                    ),
                ));
                return Err(errors);
            }
            class.constructors.first()
        } else {
            return Ok(None);
        };

        if class.is_abstract() {
            errors.push(Diagnostic::new(
                DiagnosticKind::IllegalTarget,
                class.span.clone(),
                format!(
                    "{} cannot be constructor-injected: it is abstract",
                    class.type_data.readable()
                ),
            ));
        }
        if class.visibility == Visibility::Private {
            errors.push(Diagnostic::new(
                DiagnosticKind::VisibilityViolation,
                class.span.clone(),
                format!(
                    "{} is not visible to generated code",
                    class.type_data.readable()
                ),
            ));
        }

        let is_assisted = ctor
            .map(|c| self.markers.has(&c.annotations, MarkerKind::AssistedInject))
            .unwrap_or(false);

        let scope = match self.scope_of(&class.annotations, &class.span) {
            Ok(s) => s,
            Err(e) => {
                errors.push(e);
                ScopeKey::unbounded()
            }
        };
        if is_assisted && !scope.is_unbounded() {
            errors.push(Diagnostic::new(
                DiagnosticKind::IllegalTarget,
                class.span.clone(),
                format!(
                    "assisted-injected {} cannot be scoped",
                    class.type_data.readable()
                ),
            ));
        }

        let mut params = Vec::new();
        let mut ctor_name = String::from("new");
        if let Some(ctor) = ctor {
            if !ctor.ctor_name.is_empty() {
                ctor_name = ctor.ctor_name.clone();
            }
            for param in &ctor.params {
                let assisted_annotation = self.markers.find(&param.annotations, MarkerKind::Assisted);
                if assisted_annotation.is_some() && !is_assisted {
                    errors.push(Diagnostic::new(
                        DiagnosticKind::AnnotationConflict,
                        ctor.span.clone(),
                        format!(
                            "parameter {} of {} is Assisted but the constructor is not AssistedInject",
                            param.name,
                            class.type_data.readable()
                        ),
                    ));
                }
                let qualifier = match self.qualifier_of(&param.annotations, &ctor.span) {
                    Ok(q) => q,
                    Err(e) => {
                        errors.push(e);
                        None
                    }
                };
                params.push(ParamDecl {
                    name: param.name.clone(),
                    request: ContextualTypeKey::from_request(
                        &param.type_data,
                        qualifier,
                        param.has_default,
                    ),
                    is_assisted: assisted_annotation.is_some(),
                    assisted_id: assisted_annotation
                        .and_then(|a| a.get_str("value"))
                        .unwrap_or("")
                        .to_owned(),
                    span: ctor.span.clone(),
                });
            }
        }

        let members = self.member_sites(class);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Some(InjectClassDecl {
            class: id.clone(),
            type_data: class.type_data.clone(),
            key: TypeKey::new(class.type_data.clone()),
            scope,
            ctor_name,
            params,
            is_assisted,
            members,
            module_id: class.module_id.clone(),
            span: class.span.clone(),
        }))
    }

    /// `Inject` fields and setters of `class` and its supertypes,
    /// supertype sites first.
    pub fn member_sites(&self, class: &ClassSymbol) -> Vec<MemberSite> {
        let mut result = Vec::new();
        for supertype in self.oracle.supertypes(&class.type_data) {
            if let Some(super_class) = self.class(&TypeId::of(&supertype)) {
                result.extend(self.member_sites(super_class));
            }
        }
        for field in &class.fields {
            if !self.markers.has(&field.annotations, MarkerKind::Inject) {
                continue;
            }
            let qualifier = self
                .qualifier_of(&field.annotations, &field.span)
                .unwrap_or(None);
            result.push(MemberSite {
                kind: MemberSiteKind::Field,
                name: field.name.clone(),
                request: ContextualTypeKey::from_request(&field.type_data, qualifier, false),
                owner: class.type_data.clone(),
                span: field.span.clone(),
            });
        }
        for method in &class.methods {
            if !self.markers.has(&method.annotations, MarkerKind::Inject) {
                continue;
            }
            if method.params.len() != 1 || !is_unit(&method.return_type) {
                continue;
            }
            let param = &method.params[0];
            let qualifier = self
                .qualifier_of(&param.annotations, &method.span)
                .unwrap_or(None);
            result.push(MemberSite {
                kind: MemberSiteKind::Setter,
                name: method.name.clone(),
                request: ContextualTypeKey::from_request(&param.type_data, qualifier, false),
                owner: class.type_data.clone(),
                span: method.span.clone(),
            });
        }
        result
    }

    // ---- assisted factories ---------------------------------------------

    pub fn assisted_factory_decl(&self, id: &TypeId) -> AsmResult<AssistedFactoryDecl> {
        if let Some(cached) = self.assisted_factories.borrow().get(id) {
            return cached.clone();
        }
        let result = self
            .build_assisted_factory(id)
            .map(Rc::new)
            .map_err(Rc::new);
        self.assisted_factories
            .borrow_mut()
            .insert(id.clone(), result.clone());
        result
    }

    fn build_assisted_factory(&self, id: &TypeId) -> Result<AssistedFactoryDecl, Vec<Diagnostic>> {
        let class = self.class(id).ok_or_else(|| {
            vec![Diagnostic::new(
                DiagnosticKind::AssistedMapping,
                SourceSpan::unknown(),
                format!("unknown assisted factory {}", id),
            )]
        })?;
        let mut errors = Vec::new();

        if !class.is_abstract() {
            errors.push(Diagnostic::new(
                DiagnosticKind::AssistedMapping,
                class.span.clone(),
                format!(
                    "assisted factory {} must be an interface or abstract type",
                    class.type_data.readable()
                ),
            ));
        }
        let abstract_methods: Vec<&FunctionSymbol> = class.abstract_methods().collect();
        if abstract_methods.len() != 1 {
            errors.push(Diagnostic::new(
                DiagnosticKind::AssistedMapping,
                class.span.clone(),
                format!(
                    "assisted factory {} must declare exactly one abstract method",
                    class.type_data.readable()
                ),
            ));
            return Err(errors);
        }
        let method = abstract_methods[0];

        let mut assisted_params = Vec::new();
        for param in &method.params {
            if param.type_data.path == LAZY_PATH {
                errors.push(Diagnostic::new(
                    DiagnosticKind::AssistedLazyWrap,
                    method.span.clone(),
                    format!(
                        "assisted parameter {} cannot be wrapped in Lazy",
                        param.name
                    ),
                ));
                continue;
            }
            let identifier = self
                .markers
                .find(&param.annotations, MarkerKind::Assisted)
                .and_then(|a| a.get_str("value"))
                .unwrap_or("")
                .to_owned();
            assisted_params.push((
                param.name.clone(),
                TypeKey::new(param.type_data.clone()),
                identifier,
            ));
        }

        let target = TypeKey::new(method.return_type.clone());
        match self.inject_class(&TypeId::of(&method.return_type)) {
            Ok(decl) if decl.as_ref().as_ref().map(|d| d.is_assisted).unwrap_or(false) => {}
            Ok(_) => {
                errors.push(Diagnostic::new(
                    DiagnosticKind::AssistedMapping,
                    method.span.clone(),
                    format!(
                        "assisted factory {} must return an assisted-injected type, got {}",
                        class.type_data.readable(),
                        method.return_type.readable()
                    ),
                ));
            }
            Err(nested) => errors.extend(nested.iter().cloned()),
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(AssistedFactoryDecl {
            class: id.clone(),
            type_data: class.type_data.clone(),
            key: TypeKey::new(class.type_data.clone()),
            target,
            method_name: method.name.clone(),
            assisted_params,
            span: class.span.clone(),
        })
    }

    // ---- annotation classification --------------------------------------

    /// The qualifier on a declaration site, if any. More than one is a
    /// conflict.
    pub fn qualifier_of(
        &self,
        annotations: &[AnnotationData],
        span: &SourceSpan,
    ) -> Result<Option<AnnotationData>, Diagnostic> {
        let qualifiers: Vec<&AnnotationData> = annotations
            .iter()
            .filter(|a| self.is_qualifier_annotation(a))
            .collect();
        match qualifiers.len() {
            0 => Ok(None),
            1 => Ok(Some(qualifiers[0].clone())),
            _ => Err(Diagnostic::new(
                DiagnosticKind::AnnotationConflict,
                span.clone(),
                format!(
                    "multiple qualifiers on one declaration: {}",
                    qualifiers
                        .iter()
                        .map(|q| q.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            )),
        }
    }

    /// The scope marker on a declaration site; `Unbounded` when absent.
    pub fn scope_of(
        &self,
        annotations: &[AnnotationData],
        span: &SourceSpan,
    ) -> Result<ScopeKey, Diagnostic> {
        let scopes: Vec<&AnnotationData> = annotations
            .iter()
            .filter(|a| self.is_scope_annotation(a))
            .collect();
        match scopes.len() {
            0 => Ok(ScopeKey::unbounded()),
            1 => Ok(ScopeKey::of_annotation(scopes[0])),
            _ => Err(Diagnostic::new(
                DiagnosticKind::AnnotationConflict,
                span.clone(),
                format!(
                    "multiple scopes on one declaration: {}",
                    scopes
                        .iter()
                        .map(|s| s.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            )),
        }
    }

    fn multibinding_of(
        &self,
        annotations: &[AnnotationData],
        span: &SourceSpan,
    ) -> Result<MultibindingKind, Diagnostic> {
        let into_set = self.markers.has(annotations, MarkerKind::IntoSet);
        let elements = self.markers.has(annotations, MarkerKind::ElementsIntoSet);
        let into_map = self.markers.has(annotations, MarkerKind::IntoMap);
        let count = [into_set, elements, into_map].iter().filter(|b| **b).count();
        if count > 1 {
            return Err(Diagnostic::new(
                DiagnosticKind::AnnotationConflict,
                span.clone(),
                "at most one multibinding marker may be present",
            ));
        }
        if into_set {
            return Ok(MultibindingKind::IntoSet);
        }
        if elements {
            return Ok(MultibindingKind::ElementsIntoSet);
        }
        if into_map {
            let map_key = self.map_key_of(annotations).ok_or_else(|| {
                Diagnostic::new(
                    DiagnosticKind::NotAnnotated,
                    span.clone(),
                    "IntoMap contribution requires a map key annotation",
                )
            })?;
            return Ok(MultibindingKind::IntoMap(map_key));
        }
        Ok(MultibindingKind::None)
    }

    /// Extracts the map key value from a `MapKey`-meta-annotated
    /// annotation on the site.
    pub fn map_key_of(&self, annotations: &[AnnotationData]) -> Option<MapKeyValue> {
        for annotation in annotations {
            if !self.is_map_key_annotation(annotation) {
                continue;
            }
            let value = annotation.get("value")?;
            return match value {
                AnnotationValue::Str(s) => Some(MapKeyValue::Str(s.clone())),
                AnnotationValue::Int(i) => Some(MapKeyValue::Int(*i)),
                AnnotationValue::Bool(b) => Some(MapKeyValue::Bool(*b)),
                AnnotationValue::ClassLiteral(t) => Some(MapKeyValue::ClassLiteral(t.clone())),
                AnnotationValue::EnumEntry(t, entry) => {
                    Some(MapKeyValue::EnumEntry(t.clone(), entry.clone()))
                }
                _ => None,
            };
        }
        None
    }

    fn is_qualifier_annotation(&self, annotation: &AnnotationData) -> bool {
        if self.markers.is_known_qualifier(&annotation.type_data.path) {
            return true;
        }
        self.is_meta_annotated(annotation, MarkerKind::Qualifier)
    }

    fn is_scope_annotation(&self, annotation: &AnnotationData) -> bool {
        if self.markers.is_known_scope(&annotation.type_data.path) {
            return true;
        }
        self.is_meta_annotated(annotation, MarkerKind::Scope)
    }

    fn is_map_key_annotation(&self, annotation: &AnnotationData) -> bool {
        self.is_meta_annotated(annotation, MarkerKind::MapKey)
    }

    /// Whether the annotation's own declaration carries the given
    /// meta-marker.
    fn is_meta_annotated(&self, annotation: &AnnotationData, kind: MarkerKind) -> bool {
        self.class(&TypeId::of(&annotation.type_data))
            .map(|decl| self.markers.has(&decl.annotations, kind))
            .unwrap_or(false)
    }
}

pub fn is_unit(type_data: &TypeData) -> bool {
    type_data.path.is_empty() || type_data.path == "()"
}
