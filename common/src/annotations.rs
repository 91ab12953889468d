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

use crate::type_data::TypeData;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An annotation attached to a declaration, with its literal arguments.
///
/// [`canonicalize`](Self::canonicalize) sorts arguments by name so
/// structural equality (and therefore qualifier identity) is plain list
/// equality.
#[derive(Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Clone, Default)]
pub struct AnnotationData {
    pub type_data: TypeData,
    pub values: Vec<AnnotationArg>,
}

#[derive(Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Clone)]
pub struct AnnotationArg {
    pub name: String,
    pub value: AnnotationValue,
}

#[derive(Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Clone)]
pub enum AnnotationValue {
    Bool(bool),
    Int(i64),
    Str(String),
    ClassLiteral(TypeData),
    EnumEntry(TypeData, String),
    Annotation(AnnotationData),
    Array(Vec<AnnotationValue>),
}

impl AnnotationData {
    pub fn new(type_data: TypeData) -> Self {
        AnnotationData {
            type_data,
            values: Vec::new(),
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, value: AnnotationValue) -> Self {
        self.values.push(AnnotationArg {
            name: name.into(),
            value,
        });
        self
    }

    pub fn canonicalize(&mut self) {
        self.values.sort_by(|a, b| a.name.cmp(&b.name));
        for arg in &mut self.values {
            arg.value.canonicalize();
        }
    }

    pub fn canonicalized(mut self) -> Self {
        self.canonicalize();
        self
    }

    pub fn get(&self, name: &str) -> Option<&AnnotationValue> {
        self.values
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| &arg.value)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(AnnotationValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(AnnotationValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_class(&self, name: &str) -> Option<&TypeData> {
        match self.get(name) {
            Some(AnnotationValue::ClassLiteral(t)) => Some(t),
            _ => None,
        }
    }

    /// Reads a class-literal array argument; a single class literal is
    /// accepted as a one-element array.
    pub fn get_class_list(&self, name: &str) -> Vec<TypeData> {
        match self.get(name) {
            Some(AnnotationValue::Array(values)) => values
                .iter()
                .filter_map(|v| match v {
                    AnnotationValue::ClassLiteral(t) => Some(t.clone()),
                    _ => None,
                })
                .collect(),
            Some(AnnotationValue::ClassLiteral(t)) => vec![t.clone()],
            _ => Vec::new(),
        }
    }
}

impl AnnotationValue {
    fn canonicalize(&mut self) {
        match self {
            AnnotationValue::Annotation(inner) => inner.canonicalize(),
            AnnotationValue::Array(values) => {
                for value in values {
                    value.canonicalize();
                }
            }
            _ => {}
        }
    }
}

impl fmt::Display for AnnotationData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.type_data.canonical_string_path())?;
        if self.values.is_empty() {
            return Ok(());
        }
        write!(f, "(")?;
        for (i, arg) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} = {}", arg.name, arg.value)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationValue::Bool(b) => write!(f, "{}", b),
            AnnotationValue::Int(i) => write!(f, "{}", i),
            AnnotationValue::Str(s) => write!(f, "\"{}\"", s),
            AnnotationValue::ClassLiteral(t) => write!(f, "{}", t.canonical_string_path()),
            AnnotationValue::EnumEntry(t, entry) => {
                write!(f, "{}::{}", t.canonical_string_path(), entry)
            }
            AnnotationValue::Annotation(a) => write!(f, "{}", a),
            AnnotationValue::Array(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_sorts_arguments_by_name() {
        let a = AnnotationData::new(TypeData::global("metro::Named"))
            .with_value("z", AnnotationValue::Int(1))
            .with_value("a", AnnotationValue::Bool(true))
            .canonicalized();
        let names: Vec<&str> = a.values.iter().map(|arg| arg.name.as_str()).collect();
        assert_eq!(names, vec!["a", "z"]);
    }

    #[test]
    fn canonical_annotations_compare_structurally() {
        let left = AnnotationData::new(TypeData::global("metro::Named"))
            .with_value("value", AnnotationValue::Str("db".into()))
            .with_value("shared", AnnotationValue::Bool(false))
            .canonicalized();
        let right = AnnotationData::new(TypeData::global("metro::Named"))
            .with_value("shared", AnnotationValue::Bool(false))
            .with_value("value", AnnotationValue::Str("db".into()))
            .canonicalized();
        assert_eq!(left, right);
    }

    #[test]
    fn class_list_accepts_single_literal() {
        let a = AnnotationData::new(TypeData::global("metro::ContributesTo")).with_value(
            "replaces",
            AnnotationValue::ClassLiteral(TypeData::global("app::Fake")),
        );
        assert_eq!(a.get_class_list("replaces").len(), 1);
    }

    #[test]
    fn display_renders_arguments() {
        let a = AnnotationData::new(TypeData::global("metro::Named"))
            .with_value("value", AnnotationValue::Str("db".into()));
        assert_eq!(a.to_string(), "@::metro::Named(value = \"db\")");
    }
}
