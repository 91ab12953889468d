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

//! The boundary to the host compiler.
//!
//! The processor never talks to compiler internals; a frontend adapter
//! implements these traits over the host's symbol tables and the
//! orchestrator consumes them. All lookups are synchronous over data the
//! host has already resolved.

use crate::diagnostics::Diagnostic;
use crate::keys::ScopeKey;
use metro_common::{SymbolIndex, TypeData, TypeId};

/// Type relations the host resolves for the processor.
pub trait TypeOracle {
    /// Direct supertypes of `t`, substituted for `t`'s arguments.
    fn supertypes(&self, t: &TypeData) -> Vec<TypeData>;

    fn is_subtype(&self, a: &TypeData, b: &TypeData) -> bool {
        if a.canonical_string_path_without_args() == b.canonical_string_path_without_args() {
            return true;
        }
        self.supertypes(a).iter().any(|s| self.is_subtype(s, b))
    }

    /// Replaces type parameters (by name) inside `t`.
    fn substitute(&self, t: &TypeData, substitutions: &[(String, TypeData)]) -> TypeData {
        substitute_type(t, substitutions)
    }
}

pub fn substitute_type(t: &TypeData, substitutions: &[(String, TypeData)]) -> TypeData {
    if let Some((_, replacement)) = substitutions.iter().find(|(name, _)| *name == t.path) {
        return replacement.clone();
    }
    let mut result = t.clone();
    result.args = t
        .args
        .iter()
        .map(|arg| substitute_type(arg, substitutions))
        .collect();
    result
}

/// One cross-module contribution record published by the host's indexing
/// mechanism (for example synthetic marker declarations in a dedicated
/// package).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionHint {
    pub type_id: TypeId,
    pub scope: ScopeKey,
}

/// Lookup service for contributions across the current and upstream
/// compilation units. Lookups must be idempotent; the processor caches
/// aggregated results per scope.
pub trait ContributionHintSource {
    fn hints(&self) -> Vec<ContributionHint>;
}

/// A hint source with no upstream contributions.
pub struct NoHints;

impl ContributionHintSource for NoHints {
    fn hints(&self) -> Vec<ContributionHint> {
        Vec::new()
    }
}

/// Where finished diagnostics go. The processor flushes each graph's
/// buffer here after that graph's validation completes.
pub trait DiagnosticSink {
    fn accept(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn accept(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Everything the orchestrator needs from the host for one compilation
/// pass.
pub trait HostFrontend {
    fn symbols(&self) -> &SymbolIndex;
    fn oracle(&self) -> &dyn TypeOracle;
    fn contribution_hints(&self) -> &dyn ContributionHintSource;

    /// Cooperative cancellation, polled at stage boundaries.
    fn is_cancelled(&self) -> bool {
        false
    }
}
