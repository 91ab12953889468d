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

//! The per-compilation driver.
//!
//! For each graph root discovered in the current unit the orchestrator
//! runs symbol normalization, contribution aggregation, graph building
//! (which recursively builds extensions), validation and emission. A
//! graph with any error emits nothing; other graphs continue. Panics
//! inside a stage are trapped and surfaced as internal diagnostics, so
//! nothing unwinds across the plugin boundary.

use crate::asm::AsmContext;
use crate::contributions::ContributionCatalog;
use crate::diagnostics::{Diagnostic, DiagnosticKind, InternalError};
use crate::emit::{self, EmittedArtifact};
use crate::graph::builder::GraphBuilder;
use crate::graph::validator::GraphValidator;
use crate::graph::BuiltGraph;
use crate::host::{DiagnosticSink, HostFrontend};
use crate::options::MetroOptions;
use crate::reports::{self, KeysReport};
use crate::trace::Tracer;
use backtrace::Backtrace;
use metro_common::SourceSpan;
use std::cell::RefCell;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;

thread_local! {
    static LAST_PANIC: RefCell<Option<TrappedPanic>> = const { RefCell::new(None) };
}

struct TrappedPanic {
    message: String,
    backtrace: Backtrace,
}

#[derive(Debug, Default)]
pub struct RunResult {
    pub artifacts: Vec<EmittedArtifact>,
    /// Graph roots that emitted successfully, in processing order.
    pub emitted_graphs: Vec<String>,
    pub cancelled: bool,
}

enum GraphOutcome {
    Done {
        artifacts: Vec<EmittedArtifact>,
        key_reports: Vec<KeysReport>,
        diagnostics: Vec<Diagnostic>,
        emitted: bool,
        graph_name: String,
    },
    DeclErrors(Vec<Diagnostic>),
    Cancelled,
}

pub struct Orchestrator<'h> {
    host: &'h dyn HostFrontend,
    options: MetroOptions,
    tracer: Tracer,
}

impl<'h> Orchestrator<'h> {
    pub fn new(host: &'h dyn HostFrontend, options: MetroOptions) -> Self {
        let tracer = Tracer::new(options.tracing);
        Orchestrator {
            host,
            options,
            tracer,
        }
    }

    pub fn run(&mut self, sink: &mut dyn DiagnosticSink) -> RunResult {
        let mut result = RunResult::default();
        if !self.options.enabled {
            return result;
        }

        let asm = AsmContext::new(self.host.symbols(), self.host.oracle(), &self.options);
        let catalog = ContributionCatalog::new(&asm, self.host.contribution_hints());
        let builder = GraphBuilder::new(&asm, &catalog, &self.options);
        let validator = GraphValidator::new(&self.options);

        let mut key_reports = Vec::new();
        let mut emitted_names: HashSet<String> = HashSet::new();

        for root in asm.graph_roots() {
            if self.host.is_cancelled() {
                result.cancelled = true;
                break;
            }
            let label = root
                .0
                .rsplit("::")
                .next()
                .unwrap_or(root.0.as_str())
                .to_owned();
            self.tracer.start(label.clone());

            let host = self.host;
            let options = &self.options;
            let tracer = &mut self.tracer;
            let outcome = trap_panics(AssertUnwindSafe(|| {
                run_graph(&asm, &builder, &validator, host, options, tracer, &root)
            }));
            self.tracer.stop();

            match outcome {
                Ok(GraphOutcome::Done {
                    artifacts,
                    key_reports: graph_key_reports,
                    diagnostics,
                    emitted,
                    graph_name,
                }) => {
                    for diagnostic in diagnostics {
                        sink.accept(diagnostic);
                    }
                    key_reports.extend(graph_key_reports);
                    if emitted {
                        result.emitted_graphs.push(graph_name);
                        for artifact in artifacts {
                            // Shared targets (e.g. one injected class used
                            // by two graphs) emit a single factory.
                            if emitted_names.insert(artifact.name.clone()) {
                                result.artifacts.push(artifact);
                            }
                        }
                    }
                }
                Ok(GraphOutcome::DeclErrors(diagnostics)) => {
                    for diagnostic in diagnostics {
                        sink.accept(diagnostic);
                    }
                }
                Ok(GraphOutcome::Cancelled) => {
                    result.cancelled = true;
                    break;
                }
                Err(internal) => {
                    sink.accept(Diagnostic::new(
                        DiagnosticKind::Internal,
                        SourceSpan::unknown(),
                        format!("metro processor failed on {}: {}", label, internal),
                    ));
                }
            }
        }

        if let Some(dir) = self.options.reports_dir.clone() {
            if let Err(error) = reports::write_reports(&dir, &self.tracer, &key_reports) {
                debug_log!(self.options, "cannot write reports: {:#}", error);
            }
        }

        result
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }
}

fn run_graph(
    asm: &AsmContext<'_>,
    builder: &GraphBuilder<'_>,
    validator: &GraphValidator<'_>,
    host: &dyn HostFrontend,
    options: &MetroOptions,
    tracer: &mut Tracer,
    root: &metro_common::TypeId,
) -> GraphOutcome {
    let decl = match asm.graph_decl(root) {
        Ok(decl) => decl,
        Err(errors) => return GraphOutcome::DeclErrors(errors.to_vec()),
    };
    let graph_name = decl.name().to_owned();

    tracer.start("build");
    let mut built = builder.build(decl);
    tracer.stop();
    if host.is_cancelled() {
        return GraphOutcome::Cancelled;
    }

    tracer.start("validate");
    let seal_result = seal_tree(validator, &mut built);
    tracer.stop();
    if host.is_cancelled() {
        return GraphOutcome::Cancelled;
    }

    let mut diagnostics = Vec::new();
    let mut has_errors = false;
    collect_diagnostics(&mut built, &mut diagnostics, &mut has_errors);

    if let Err(internal) = seal_result {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::Internal,
            SourceSpan::unknown(),
            format!("validation of {} aborted: {}", graph_name, internal),
        ));
        return GraphOutcome::Done {
            artifacts: Vec::new(),
            key_reports: Vec::new(),
            diagnostics,
            emitted: false,
            graph_name,
        };
    }

    let mut key_reports = Vec::new();
    collect_key_reports(&built, &mut key_reports);

    // Any error anywhere in the tree suppresses the whole root's output:
    // a parent cannot stand without its extensions.
    tracer.start("emit");
    let artifacts = if has_errors {
        Vec::new()
    } else {
        match emit::emit_tree(&built) {
            Ok(artifacts) => artifacts,
            Err(internal) => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::Internal,
                    SourceSpan::unknown(),
                    format!("emission of {} aborted: {}", graph_name, internal),
                ));
                has_errors = true;
                Vec::new()
            }
        }
    };
    tracer.stop();
    debug_log!(
        options,
        "{}: {} bindings, {} artifacts",
        graph_name,
        built.graph.len(),
        artifacts.len()
    );

    GraphOutcome::Done {
        artifacts,
        key_reports,
        diagnostics,
        emitted: !has_errors,
        graph_name,
    }
}

fn seal_tree(validator: &GraphValidator<'_>, built: &mut BuiltGraph) -> Result<(), InternalError> {
    validator.seal(&mut built.graph, &mut built.diagnostics)?;
    for child in &mut built.children {
        seal_tree(validator, child)?;
    }
    Ok(())
}

fn collect_diagnostics(built: &mut BuiltGraph, out: &mut Vec<Diagnostic>, has_errors: &mut bool) {
    *has_errors |= built.diagnostics.has_errors();
    out.extend(built.diagnostics.take());
    for child in &mut built.children {
        collect_diagnostics(child, out, has_errors);
    }
}

fn collect_key_reports(built: &BuiltGraph, out: &mut Vec<KeysReport>) {
    out.push(KeysReport {
        graph: built.graph.decl.name().to_owned(),
        keys: built.graph.keys().map(|k| k.readable()).collect(),
    });
    for child in &built.children {
        collect_key_reports(child, out);
    }
}

/// Runs a stage with a panic trap; a panic becomes an internal error
/// instead of crossing the plugin boundary.
fn trap_panics<R>(f: AssertUnwindSafe<impl FnOnce() -> R>) -> Result<R, String> {
    LAST_PANIC.with(|cell| cell.borrow_mut().take());
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|info| {
        LAST_PANIC.with(|cell| {
            *cell.borrow_mut() = Some(TrappedPanic {
                message: info.to_string(),
                backtrace: Backtrace::new(),
            });
        });
    }));
    let outcome = std::panic::catch_unwind(f);
    std::panic::set_hook(previous_hook);
    match outcome {
        Ok(value) => Ok(value),
        Err(_) => {
            let trapped = LAST_PANIC.with(|cell| cell.borrow_mut().take());
            Err(match trapped {
                Some(panic) => format!("{}\n{:?}", panic.message, panic.backtrace),
                None => "unknown panic".to_owned(),
            })
        }
    }
}
