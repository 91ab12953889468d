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

use crate::annotations::AnnotationData;
use crate::span::SourceSpan;
use crate::type_data::TypeData;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identity of a declaration: its canonical path without generic
/// arguments.
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Clone, Default)]
pub struct TypeId(pub String);

impl TypeId {
    pub fn of(type_data: &TypeData) -> TypeId {
        TypeId(type_data.canonical_string_path_without_args())
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone)]
pub enum Visibility {
    Public,
    Crate,
    Private,
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Public
    }
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone)]
pub enum ClassKind {
    Concrete,
    Abstract,
    Interface,
    Object,
    Annotation,
    Enum,
}

impl Default for ClassKind {
    fn default() -> Self {
        ClassKind::Concrete
    }
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Default)]
pub struct ParameterSymbol {
    pub name: String,
    pub type_data: TypeData,
    pub annotations: Vec<AnnotationData>,
    pub has_default: bool,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Default)]
pub struct ConstructorSymbol {
    pub params: Vec<ParameterSymbol>,
    pub annotations: Vec<AnnotationData>,
    pub visibility: Visibility,
    /// Name of the constructor function in generated calls.
    pub ctor_name: String,
    pub span: SourceSpan,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Default)]
pub struct FieldSymbol {
    pub name: String,
    pub type_data: TypeData,
    pub annotations: Vec<AnnotationData>,
    pub visibility: Visibility,
    pub mutable: bool,
    pub span: SourceSpan,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Default)]
pub struct FunctionSymbol {
    pub name: String,
    pub params: Vec<ParameterSymbol>,
    pub return_type: TypeData,
    pub annotations: Vec<AnnotationData>,
    pub is_abstract: bool,
    pub is_static: bool,
    pub visibility: Visibility,
    pub span: SourceSpan,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Default)]
pub struct ClassSymbol {
    pub kind: ClassKind,
    pub type_data: TypeData,
    /// Stable identifier of the compilation unit that declared this class.
    pub module_id: String,
    pub supertypes: Vec<TypeData>,
    pub constructors: Vec<ConstructorSymbol>,
    pub fields: Vec<FieldSymbol>,
    pub methods: Vec<FunctionSymbol>,
    pub nested: Vec<ClassSymbol>,
    pub annotations: Vec<AnnotationData>,
    pub visibility: Visibility,
    pub span: SourceSpan,
}

impl ClassSymbol {
    pub fn type_id(&self) -> TypeId {
        TypeId::of(&self.type_data)
    }

    pub fn annotation(&self, path: &str) -> Option<&AnnotationData> {
        self.annotations
            .iter()
            .find(|a| a.type_data.path == path)
    }

    pub fn abstract_methods(&self) -> impl Iterator<Item = &FunctionSymbol> {
        self.methods.iter().filter(|m| m.is_abstract)
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self.kind, ClassKind::Abstract | ClassKind::Interface)
    }
}

/// All class symbols the host lowered for one compilation unit, keyed by
/// declaration identity. Nested classes are indexed too.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SymbolIndex {
    classes: Vec<ClassSymbol>,
    by_id: HashMap<TypeId, usize>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_class(&mut self, class: ClassSymbol) {
        let id = class.type_id();
        let index = self.classes.len();
        self.classes.push(class);
        self.by_id.insert(id, index);
        // Index nested declarations by their own identity as well.
        let nested: Vec<ClassSymbol> = self.classes[index].nested.clone();
        for nested_class in nested {
            self.add_class(nested_class);
        }
    }

    pub fn get(&self, id: &TypeId) -> Option<&ClassSymbol> {
        self.by_id.get(id).map(|index| &self.classes[*index])
    }

    /// Top-level iteration order is declaration order, which keeps
    /// downstream processing deterministic.
    pub fn classes(&self) -> impl Iterator<Item = &ClassSymbol> {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn merge_from(&mut self, other: &SymbolIndex) {
        for class in &other.classes {
            if !self.by_id.contains_key(&class.type_id()) {
                self.add_class(class.clone());
            }
        }
    }
}
