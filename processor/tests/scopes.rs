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
use metro_common::AnnotationValue;
use metro_processor::testing::*;

fn singleton_host(graph_declares_scope: bool) -> TestHost {
    let mut host = TestHost::new();
    host.add_class(scope_annotation_class("Singleton"));
    host.add_class(
        class(app("Foo"))
            .annotate(metro_common::AnnotationData::new(app("Singleton")))
            .inject_ctor(vec![])
            .build(),
    );
    let mut graph = class(app("AppGraph"))
        .interface()
        .method(accessor("foo", app("Foo")).build());
    graph = if graph_declares_scope {
        graph.annotate(
            ann("metro::GraphRoot")
                .with_value("scope", AnnotationValue::ClassLiteral(app("Singleton"))),
        )
    } else {
        graph.annotate(ann("metro::GraphRoot"))
    };
    host.add_class(graph.build());
    host
}

#[test]
fn scoped_binding_is_memoized_per_graph_instance() {
    let host = singleton_host(true);
    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    let graph = rendered(artifact(&result, "AppGraphMetroGraph"));
    assert!(graph.contains("::metro::SingleCheck::new("), "{}", graph);
}

#[test]
fn unscoped_binding_is_not_memoized() {
    let mut host = TestHost::new();
    host.add_class(class(app("Foo")).inject_ctor(vec![]).build());
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot"))
            .method(accessor("foo", app("Foo")).build())
            .build(),
    );
    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    let graph = rendered(artifact(&result, "AppGraphMetroGraph"));
    assert!(!graph.contains("SingleCheck"), "{}", graph);
}

#[test]
fn scope_not_declared_by_the_graph_is_an_error() {
    let host = singleton_host(false);
    let (result, diagnostics) = run(&host);
    assert!(result.artifacts.is_empty());
    assert_eq!(error_codes(&diagnostics), vec!["METRO_SCOPE_MISMATCH"]);
    assert!(diagnostics[0].message.contains("::app::Singleton"));
}

#[test]
fn additional_scopes_also_admit_bindings() {
    let mut host = TestHost::new();
    host.add_class(scope_annotation_class("Singleton"));
    host.add_class(scope_annotation_class("AppScope"));
    host.add_class(
        class(app("Foo"))
            .annotate(metro_common::AnnotationData::new(app("Singleton")))
            .inject_ctor(vec![])
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(
                ann("metro::GraphRoot")
                    .with_value("scope", AnnotationValue::ClassLiteral(app("AppScope")))
                    .with_value(
                        "additionalScopes",
                        AnnotationValue::Array(vec![AnnotationValue::ClassLiteral(app(
                            "Singleton",
                        ))]),
                    ),
            )
            .method(accessor("foo", app("Foo")).build())
            .build(),
    );
    let (_, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
}

#[test]
fn scoped_provider_accessor_shares_the_memoizing_provider() {
    let mut host = TestHost::new();
    host.add_class(scope_annotation_class("Singleton"));
    host.add_class(
        class(app("Foo"))
            .annotate(metro_common::AnnotationData::new(app("Singleton")))
            .inject_ctor(vec![])
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(
                ann("metro::GraphRoot")
                    .with_value("scope", AnnotationValue::ClassLiteral(app("Singleton"))),
            )
            .method(accessor("foo", app("Foo")).build())
            .method(accessor("foo_provider", provider_of(app("Foo"))).build())
            .build(),
    );
    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    let graph = rendered(artifact(&result, "AppGraphMetroGraph"));
    // Both accessors read the same field; the provider accessor clones
    // the memoizing provider instead of wrapping a fresh one.
    assert!(graph.contains("fnfoo_provider(&self)->::std::rc::Rc<dyn::metro::Provider<::app::Foo>>"), "{}", graph);
    assert_eq!(graph.matches("SingleCheck::new").count(), 1, "{}", graph);
}
