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

#![allow(dead_code)]

use metro_processor::diagnostics::Diagnostic;
use metro_processor::emit::EmittedArtifact;
use metro_processor::orchestrator::{Orchestrator, RunResult};
use metro_processor::testing::TestHost;
use metro_processor::MetroOptions;

pub fn run(host: &TestHost) -> (RunResult, Vec<Diagnostic>) {
    run_with(host, MetroOptions::default())
}

pub fn run_with(host: &TestHost, options: MetroOptions) -> (RunResult, Vec<Diagnostic>) {
    let mut sink = Vec::new();
    let result = Orchestrator::new(host, options).run(&mut sink);
    (result, sink)
}

pub fn artifact<'a>(result: &'a RunResult, name: &str) -> &'a EmittedArtifact {
    result
        .artifacts
        .iter()
        .find(|a| a.name == name)
        .unwrap_or_else(|| {
            panic!(
                "no artifact named {}; have: {:?}",
                name,
                result.artifacts.iter().map(|a| &a.name).collect::<Vec<_>>()
            )
        })
}

/// Token stream rendered without whitespace, for robust containment
/// assertions.
pub fn rendered(artifact: &EmittedArtifact) -> String {
    artifact.tokens.to_string().replace(' ', "")
}

pub fn codes(diagnostics: &[Diagnostic]) -> Vec<&'static str> {
    diagnostics.iter().map(|d| d.code).collect()
}

pub fn error_codes(diagnostics: &[Diagnostic]) -> Vec<&'static str> {
    diagnostics
        .iter()
        .filter(|d| d.severity == metro_processor::Severity::Error)
        .map(|d| d.code)
        .collect()
}
