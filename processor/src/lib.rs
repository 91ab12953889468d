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

//! The metro binding graph resolver and code generator.
//!
//! The processor receives an analyzed symbol tree from a host compiler
//! frontend, discovers dependency injection declarations, aggregates
//! scope contributions across compilation units, builds and validates a
//! binding graph per graph root, and emits the factory and graph
//! implementation code as token streams the host writes into its IR.
//!
//! Entry point: [`orchestrator::Orchestrator::run`].

#[macro_use]
mod log;

pub mod asm;
pub mod contributions;
pub mod diagnostics;
pub mod emit;
pub mod graph;
pub mod host;
pub mod keys;
pub mod options;
pub mod orchestrator;
pub mod reports;
pub mod testing;
pub mod trace;

pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticsBuffer, Severity};
pub use options::MetroOptions;
pub use orchestrator::{Orchestrator, RunResult};
