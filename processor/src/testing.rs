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

//! In-memory host frontend for tests.
//!
//! Builds symbol trees programmatically, the way a real frontend adapter
//! would lower them, so pipelines can run end to end without a compiler.

use crate::host::{ContributionHint, ContributionHintSource, HostFrontend, TypeOracle};
use crate::keys::ScopeKey;
use metro_common::{
    AnnotationData, ClassKind, ClassSymbol, ConstructorSymbol, FieldSymbol, FunctionSymbol,
    ParameterSymbol, SourceSpan, SymbolIndex, TypeData, Visibility,
};
use std::cell::Cell;
use std::collections::HashMap;

// ---- type shorthands ----------------------------------------------------

/// A type declared in the test compilation unit.
pub fn app(path: &str) -> TypeData {
    TypeData::local(path, "app")
}

pub fn global(path: &str) -> TypeData {
    TypeData::global(path)
}

pub fn string_type() -> TypeData {
    TypeData::global("std::string::String")
}

pub fn int_type() -> TypeData {
    TypeData::primitive("i64")
}

pub fn unit_type() -> TypeData {
    TypeData::default()
}

pub fn provider_of(inner: TypeData) -> TypeData {
    TypeData::global("metro::Provider").with_args(vec![inner])
}

pub fn lazy_of(inner: TypeData) -> TypeData {
    TypeData::global("metro::Lazy").with_args(vec![inner])
}

pub fn vec_of(inner: TypeData) -> TypeData {
    TypeData::global("std::vec::Vec").with_args(vec![inner])
}

pub fn map_of(key: TypeData, value: TypeData) -> TypeData {
    TypeData::global("std::collections::HashMap").with_args(vec![key, value])
}

pub fn rc_of(inner: TypeData) -> TypeData {
    TypeData::global("std::rc::Rc").with_args(vec![inner])
}

pub fn ann(path: &str) -> AnnotationData {
    AnnotationData::new(global(path))
}

// ---- symbol builders ----------------------------------------------------

pub struct ClassBuilder {
    symbol: ClassSymbol,
}

pub fn class(type_data: TypeData) -> ClassBuilder {
    ClassBuilder {
        symbol: ClassSymbol {
            kind: ClassKind::Concrete,
            module_id: "app".to_owned(),
            span: SourceSpan::new("app.rs", 1, 1),
            type_data,
            ..Default::default()
        },
    }
}

impl ClassBuilder {
    pub fn interface(mut self) -> Self {
        self.symbol.kind = ClassKind::Interface;
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.symbol.kind = ClassKind::Abstract;
        self
    }

    pub fn annotation_class(mut self) -> Self {
        self.symbol.kind = ClassKind::Annotation;
        self
    }

    pub fn private(mut self) -> Self {
        self.symbol.visibility = Visibility::Private;
        self
    }

    pub fn in_module(mut self, module_id: &str) -> Self {
        self.symbol.module_id = module_id.to_owned();
        self
    }

    pub fn at(mut self, file: &str, line: u32) -> Self {
        self.symbol.span = SourceSpan::new(file, line, 1);
        self
    }

    pub fn annotate(mut self, annotation: AnnotationData) -> Self {
        self.symbol.annotations.push(annotation);
        self
    }

    pub fn supertype(mut self, supertype: TypeData) -> Self {
        self.symbol.supertypes.push(supertype);
        self
    }

    pub fn ctor(mut self, ctor: ConstructorSymbol) -> Self {
        self.symbol.constructors.push(ctor);
        self
    }

    /// Adds an `Inject`-annotated constructor named `new`.
    pub fn inject_ctor(self, params: Vec<ParameterSymbol>) -> Self {
        self.annotated_ctor(params, ann("metro::Inject"))
    }

    /// Adds an `AssistedInject`-annotated constructor named `new`.
    pub fn assisted_ctor(self, params: Vec<ParameterSymbol>) -> Self {
        self.annotated_ctor(params, ann("metro::AssistedInject"))
    }

    fn annotated_ctor(mut self, params: Vec<ParameterSymbol>, marker: AnnotationData) -> Self {
        self.symbol.constructors.push(ConstructorSymbol {
            params,
            annotations: vec![marker],
            ctor_name: "new".to_owned(),
            span: self.symbol.span.clone(),
            ..Default::default()
        });
        self
    }

    pub fn method(mut self, method: FunctionSymbol) -> Self {
        self.symbol.methods.push(method);
        self
    }

    pub fn field(mut self, field: FieldSymbol) -> Self {
        self.symbol.fields.push(field);
        self
    }

    pub fn nested(mut self, nested: ClassSymbol) -> Self {
        self.symbol.nested.push(nested);
        self
    }

    pub fn build(self) -> ClassSymbol {
        self.symbol
    }
}

pub struct MethodBuilder {
    symbol: FunctionSymbol,
}

pub fn method(name: &str, return_type: TypeData) -> MethodBuilder {
    MethodBuilder {
        symbol: FunctionSymbol {
            name: name.to_owned(),
            return_type,
            is_static: true,
            span: SourceSpan::new("app.rs", 1, 1),
            ..Default::default()
        },
    }
}

/// An abstract accessor-style method.
pub fn accessor(name: &str, return_type: TypeData) -> MethodBuilder {
    MethodBuilder {
        symbol: FunctionSymbol {
            name: name.to_owned(),
            return_type,
            is_abstract: true,
            is_static: false,
            span: SourceSpan::new("app.rs", 1, 1),
            ..Default::default()
        },
    }
}

impl MethodBuilder {
    pub fn annotate(mut self, annotation: AnnotationData) -> Self {
        self.symbol.annotations.push(annotation);
        self
    }

    pub fn abstract_method(mut self) -> Self {
        self.symbol.is_abstract = true;
        self.symbol.is_static = false;
        self
    }

    pub fn instance_method(mut self) -> Self {
        self.symbol.is_static = false;
        self
    }

    pub fn private(mut self) -> Self {
        self.symbol.visibility = Visibility::Private;
        self
    }

    pub fn param(mut self, param: ParameterSymbol) -> Self {
        self.symbol.params.push(param);
        self
    }

    pub fn at(mut self, file: &str, line: u32) -> Self {
        self.symbol.span = SourceSpan::new(file, line, 1);
        self
    }

    pub fn build(self) -> FunctionSymbol {
        self.symbol
    }
}

pub fn param(name: &str, type_data: TypeData) -> ParameterSymbol {
    ParameterSymbol {
        name: name.to_owned(),
        type_data,
        ..Default::default()
    }
}

pub fn annotated_param(
    name: &str,
    type_data: TypeData,
    annotations: Vec<AnnotationData>,
) -> ParameterSymbol {
    ParameterSymbol {
        name: name.to_owned(),
        type_data,
        annotations,
        ..Default::default()
    }
}

pub fn defaulted_param(name: &str, type_data: TypeData) -> ParameterSymbol {
    ParameterSymbol {
        name: name.to_owned(),
        type_data,
        has_default: true,
        ..Default::default()
    }
}

/// Declaration of a user scope marker annotation.
pub fn scope_annotation_class(path: &str) -> ClassSymbol {
    class(app(path))
        .annotation_class()
        .annotate(ann("metro::Scope"))
        .build()
}

/// Declaration of a user qualifier annotation.
pub fn qualifier_annotation_class(path: &str) -> ClassSymbol {
    class(app(path))
        .annotation_class()
        .annotate(ann("metro::Qualifier"))
        .build()
}

/// Declaration of a user map key annotation.
pub fn map_key_annotation_class(path: &str) -> ClassSymbol {
    class(app(path))
        .annotation_class()
        .annotate(ann("metro::MapKey"))
        .build()
}

// ---- the host -----------------------------------------------------------

#[derive(Default)]
pub struct MapOracle {
    supertypes: HashMap<String, Vec<TypeData>>,
}

impl TypeOracle for MapOracle {
    fn supertypes(&self, t: &TypeData) -> Vec<TypeData> {
        self.supertypes
            .get(&t.canonical_string_path_without_args())
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Default)]
pub struct StaticHints {
    hints: Vec<ContributionHint>,
}

impl ContributionHintSource for StaticHints {
    fn hints(&self) -> Vec<ContributionHint> {
        self.hints.clone()
    }
}

/// A complete in-memory host.
#[derive(Default)]
pub struct TestHost {
    symbols: SymbolIndex,
    oracle: MapOracle,
    hints: StaticHints,
    cancelled: Cell<bool>,
}

impl TestHost {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_class(&mut self, symbol: ClassSymbol) -> &mut Self {
        // Supertype edges feed the oracle so Binds conformance and
        // member-site walks work in tests.
        if !symbol.supertypes.is_empty() {
            self.oracle.supertypes.insert(
                symbol.type_data.canonical_string_path_without_args(),
                symbol.supertypes.clone(),
            );
        }
        self.symbols.add_class(symbol);
        self
    }

    /// Publishes a contribution hint for a class in this unit.
    pub fn hint(&mut self, contributed: TypeData, scope: &TypeData) -> &mut Self {
        self.hints.hints.push(ContributionHint {
            type_id: metro_common::TypeId::of(&contributed),
            scope: ScopeKey::of(scope),
        });
        self
    }

    pub fn cancel(&self) {
        self.cancelled.set(true);
    }
}

impl HostFrontend for TestHost {
    fn symbols(&self) -> &SymbolIndex {
        &self.symbols
    }

    fn oracle(&self) -> &dyn TypeOracle {
        &self.oracle
    }

    fn contribution_hints(&self) -> &dyn ContributionHintSource {
        &self.hints
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}
