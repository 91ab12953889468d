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

mod common;

use common::*;
use metro_common::{AnnotationValue, TypeId};
use metro_processor::asm::AsmContext;
use metro_processor::contributions::ContributionCatalog;
use metro_processor::graph::builder::GraphBuilder;
use metro_processor::graph::validator::GraphValidator;
use metro_processor::host::HostFrontend;
use metro_processor::testing::*;
use metro_processor::MetroOptions;

fn text_graph_host() -> TestHost {
    let mut host = TestHost::new();
    host.add_class(
        class(app("TextContainer"))
            .annotate(ann("metro::BindingContainer"))
            .method(
                method("provide_text", string_type())
                    .annotate(ann("metro::Provides"))
                    .build(),
            )
            .method(
                method("provide_unused", int_type())
                    .annotate(ann("metro::Provides"))
                    .build(),
            )
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot").with_value(
                "bindingContainers",
                AnnotationValue::Array(vec![AnnotationValue::ClassLiteral(app("TextContainer"))]),
            ))
            .method(accessor("text", string_type()).build())
            .build(),
    );
    host
}

#[test]
fn reports_are_written_when_configured() {
    let dir = std::env::temp_dir().join("metro-pipeline-reports");
    let _ = std::fs::remove_dir_all(&dir);
    let host = text_graph_host();
    let options = MetroOptions {
        reports_dir: Some(dir.clone()),
        tracing: true,
        ..Default::default()
    };
    let (result, diagnostics) = run_with(&host, options);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    assert!(!result.artifacts.is_empty());

    let keys = std::fs::read_to_string(dir.join("keys-populated-AppGraph.txt")).unwrap();
    assert!(keys.contains("::std::string::String"), "{}", keys);

    let timings = std::fs::read_to_string(dir.join("timings.csv")).unwrap();
    assert!(timings.starts_with("graph,stage,duration_ms"));
    assert!(timings.contains("AppGraph,build,"), "{}", timings);
    assert!(timings.contains("AppGraph,validate,"), "{}", timings);
    assert!(timings.contains("AppGraph,emit,"), "{}", timings);

    let trace = std::fs::read_to_string(dir.join("traceLog.txt")).unwrap();
    assert!(trace.contains("AppGraph:"), "{}", trace);
    assert!(trace.contains("  build:"), "{}", trace);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn full_graph_validation_warns_about_unreachable_bindings() {
    let host = text_graph_host();
    let options = MetroOptions {
        enable_full_binding_graph_validation: true,
        ..Default::default()
    };
    let (result, diagnostics) = run_with(&host, options);
    // Warnings do not suppress emission.
    assert!(!result.artifacts.is_empty());
    assert!(
        diagnostics
            .iter()
            .any(|d| d.code == "METRO_UNREACHABLE_BINDING" && d.message.contains("provide_unused")),
        "{:?}",
        diagnostics
    );
}

#[test]
fn default_mode_skips_unreachable_bindings_entirely() {
    let host = text_graph_host();
    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    // The unused provider is never materialized, so no factory exists.
    assert!(!result
        .artifacts
        .iter()
        .any(|a| a.name == "TextContainer_provide_unusedMetroFactory"));
}

#[test]
fn java_dialect_markers_work_when_enabled() {
    let mut host = TestHost::new();
    host.add_class(
        class(app("TextModule"))
            .annotate(ann("dagger::Module"))
            .method(
                method("provide_text", string_type())
                    .annotate(ann("dagger::Provides"))
                    .build(),
            )
            .build(),
    );
    host.add_class(
        class(app("AppComponent"))
            .interface()
            .annotate(ann("dagger::Component").with_value(
                "bindingContainers",
                AnnotationValue::Array(vec![AnnotationValue::ClassLiteral(app("TextModule"))]),
            ))
            .method(accessor("text", string_type()).build())
            .build(),
    );

    // Unrecognized without the flag: no graph roots at all.
    let (result, diagnostics) = run(&host);
    assert!(result.artifacts.is_empty());
    assert!(diagnostics.is_empty());

    let options = MetroOptions {
        allow_java_annotations: true,
        ..Default::default()
    };
    let (result, diagnostics) = run_with(&host, options);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    assert!(result.artifacts.iter().any(|a| a.name == "AppComponentMetroGraph"));
}

#[test]
fn revalidating_a_sealed_graph_adds_nothing() {
    let host = text_graph_host();
    let options = MetroOptions::default();
    let asm = AsmContext::new(host.symbols(), host.oracle(), &options);
    let catalog = ContributionCatalog::new(&asm, host.contribution_hints());
    let builder = GraphBuilder::new(&asm, &catalog, &options);
    let validator = GraphValidator::new(&options);

    let decl = asm
        .graph_decl(&TypeId("::app::AppGraph".to_owned()))
        .expect("graph decl");
    let mut built = builder.build(decl);
    validator
        .seal(&mut built.graph, &mut built.diagnostics)
        .unwrap();
    assert!(built.graph.is_sealed());
    let diagnostics_before = built.diagnostics.len();

    validator
        .seal(&mut built.graph, &mut built.diagnostics)
        .unwrap();
    assert_eq!(built.diagnostics.len(), diagnostics_before);
}

#[test]
fn one_bad_graph_does_not_block_the_others() {
    let mut host = text_graph_host();
    host.add_class(
        class(app("BrokenGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot"))
            .method(accessor("missing", app("Nowhere")).build())
            .build(),
    );
    let (result, diagnostics) = run(&host);
    assert_eq!(error_codes(&diagnostics), vec!["METRO_MISSING_BINDING"]);
    assert_eq!(result.emitted_graphs, vec!["AppGraph"]);
    assert!(result.artifacts.iter().any(|a| a.name == "AppGraphMetroGraph"));
    assert!(!result.artifacts.iter().any(|a| a.name == "BrokenGraphMetroGraph"));
}

#[test]
fn container_include_cycles_are_reported() {
    let mut host = TestHost::new();
    host.add_class(
        class(app("ModuleA"))
            .annotate(ann("metro::BindingContainer").with_value(
                "includes",
                AnnotationValue::Array(vec![AnnotationValue::ClassLiteral(app("ModuleB"))]),
            ))
            .build(),
    );
    host.add_class(
        class(app("ModuleB"))
            .annotate(ann("metro::BindingContainer").with_value(
                "includes",
                AnnotationValue::Array(vec![AnnotationValue::ClassLiteral(app("ModuleA"))]),
            ))
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot").with_value(
                "bindingContainers",
                AnnotationValue::Array(vec![AnnotationValue::ClassLiteral(app("ModuleA"))]),
            ))
            .build(),
    );
    let (result, diagnostics) = run(&host);
    assert!(result.artifacts.is_empty());
    assert!(
        error_codes(&diagnostics).contains(&"METRO_INCLUDE_CYCLE"),
        "{:?}",
        diagnostics
    );
}

#[test]
fn declaration_shape_errors_surface_through_the_sink() {
    let mut host = TestHost::new();
    host.add_class(
        class(app("BadContainer"))
            .annotate(ann("metro::BindingContainer"))
            .method(
                method("abstract_provides", string_type())
                    .abstract_method()
                    .annotate(ann("metro::Provides"))
                    .build(),
            )
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot").with_value(
                "bindingContainers",
                AnnotationValue::Array(vec![AnnotationValue::ClassLiteral(app("BadContainer"))]),
            ))
            .build(),
    );
    let (result, diagnostics) = run(&host);
    assert!(result.artifacts.is_empty());
    assert!(
        error_codes(&diagnostics).contains(&"METRO_ILLEGAL_TARGET"),
        "{:?}",
        diagnostics
    );
}
