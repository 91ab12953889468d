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

//! The symbol model crossing the host compiler boundary.
//!
//! A host frontend adapter lowers the compiler's typed declarations into
//! this model once per compilation unit; the processor consumes it and
//! never touches host symbols directly. Everything here is plain serde
//! data so contribution hints and symbol summaries can be persisted
//! between compilation units.

pub mod annotations;
pub mod span;
pub mod symbols;
pub mod type_data;

pub use annotations::{AnnotationArg, AnnotationData, AnnotationValue};
pub use span::SourceSpan;
pub use symbols::{
    ClassKind, ClassSymbol, ConstructorSymbol, FieldSymbol, FunctionSymbol, ParameterSymbol,
    SymbolIndex, TypeId, Visibility,
};
pub use type_data::{TypeData, TypeRoot};
