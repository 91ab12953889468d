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

use metro_common::SourceSpan;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

/// The error taxonomy. Every user-visible problem maps to exactly one
/// kind; the kind determines the stable diagnostic code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    // Declaration shape.
    NotAnnotated,
    AnnotationConflict,
    VisibilityViolation,
    IllegalTarget,
    // Resolution.
    MissingBinding,
    DuplicateBinding,
    AliasCycle,
    GraphCycle,
    SelfCycle,
    EmptyMultibinding,
    MultibindingKeyCollision,
    // Scoping.
    ScopeMismatch,
    ScopeInheritanceViolation,
    // Assisted injection.
    AssistedMismatch,
    AssistedLazyWrap,
    AssistedMapping,
    // Graph and creator shape.
    ExtensionContract,
    CreatorContract,
    CycleDependencyOutsideGraph,
    // Reachability warnings.
    UnreachableBinding,
    // Invariant failures.
    Internal,
}

impl DiagnosticKind {
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::NotAnnotated => "METRO_NOT_ANNOTATED",
            DiagnosticKind::AnnotationConflict => "METRO_ANNOTATION_CONFLICT",
            DiagnosticKind::VisibilityViolation => "METRO_VISIBILITY_VIOLATION",
            DiagnosticKind::IllegalTarget => "METRO_ILLEGAL_TARGET",
            DiagnosticKind::MissingBinding => "METRO_MISSING_BINDING",
            DiagnosticKind::DuplicateBinding => "METRO_DUPLICATE_BINDING",
            DiagnosticKind::AliasCycle => "METRO_ALIAS_CYCLE",
            DiagnosticKind::GraphCycle => "METRO_GRAPH_DEPENDENCY_CYCLE",
            DiagnosticKind::SelfCycle => "METRO_SELF_CYCLE",
            DiagnosticKind::EmptyMultibinding => "METRO_EMPTY_MULTIBINDING",
            DiagnosticKind::MultibindingKeyCollision => "METRO_MULTIBINDING_KEY_COLLISION",
            DiagnosticKind::ScopeMismatch => "METRO_SCOPE_MISMATCH",
            DiagnosticKind::ScopeInheritanceViolation => "METRO_SCOPE_INHERITANCE_VIOLATION",
            DiagnosticKind::AssistedMismatch => "METRO_ASSISTED_MISMATCH",
            DiagnosticKind::AssistedLazyWrap => "METRO_ASSISTED_LAZY_WRAP",
            DiagnosticKind::AssistedMapping => "METRO_ASSISTED_MAPPING",
            DiagnosticKind::ExtensionContract => "METRO_EXTENSION_CONTRACT",
            DiagnosticKind::CreatorContract => "METRO_CREATOR_CONTRACT",
            DiagnosticKind::CycleDependencyOutsideGraph => "METRO_INCLUDE_CYCLE",
            DiagnosticKind::UnreachableBinding => "METRO_UNREACHABLE_BINDING",
            DiagnosticKind::Internal => "METRO_INTERNAL",
        }
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            DiagnosticKind::UnreachableBinding => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub primary_span: SourceSpan,
    pub secondary_spans: Vec<SourceSpan>,
    pub code: &'static str,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, span: SourceSpan, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            primary_span: span,
            secondary_spans: Vec::new(),
            code: kind.code(),
        }
    }

    pub fn with_secondary_span(mut self, span: SourceSpan) -> Self {
        self.secondary_spans.push(span);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{}[{}]: {} ({})",
            severity, self.code, self.message, self.primary_span
        )
    }
}

/// Per-graph diagnostic collection.
///
/// Recoverable problems accumulate here and are flushed to the host sink
/// together once the graph's validation finishes; nothing escapes as a
/// panic across the plugin boundary.
#[derive(Debug, Default)]
pub struct DiagnosticsBuffer {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticsBuffer {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, kind: DiagnosticKind, span: SourceSpan, message: impl Into<String>) {
        self.report(Diagnostic::new(kind, span, message));
    }

    pub fn warning(&mut self, kind: DiagnosticKind, span: SourceSpan, message: impl Into<String>) {
        let mut diagnostic = Diagnostic::new(kind, span, message);
        diagnostic.severity = Severity::Warning;
        self.report(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

/// Internal invariant failures. These abort the current graph (and only
/// the current graph) instead of being collected.
#[derive(Debug, thiserror::Error)]
pub enum InternalError {
    #[error("binding for {0} lost its key during sealing")]
    LostKey(String),
    #[error("graph {0} validated before it was populated")]
    NotPopulated(String),
    #[error("binding index {0} out of bounds")]
    BadIndex(usize),
    #[error("stage panicked: {0}")]
    Panic(String),
}

/// Renders the `requested by:` chain attached to resolution errors, root
/// request first.
pub fn render_request_chain(chain: &[String]) -> String {
    if chain.is_empty() {
        return String::new();
    }
    format!("\nrequested by: {}", chain.join("\nrequested by: "))
}
