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
use metro_processor::testing::*;

/// `A` depends on `Provider<B>`, `B` depends on `A` and a bound
/// instance. The cycle is legal because one edge is deferrable.
fn cyclic_host(deferrable: bool) -> TestHost {
    let mut host = TestHost::new();
    let b_request = if deferrable {
        provider_of(app("B"))
    } else {
        app("B")
    };
    host.add_class(
        class(app("A"))
            .inject_ctor(vec![param("b", b_request)])
            .build(),
    );
    host.add_class(
        class(app("B"))
            .inject_ctor(vec![param("a", app("A")), param("msg", string_type())])
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot"))
            .method(accessor("a", app("A")).build())
            .nested(
                class(app("AppGraph::Factory"))
                    .interface()
                    .annotate(ann("metro::GraphRoot::Factory"))
                    .method(
                        accessor("create", app("AppGraph"))
                            .param(annotated_param(
                                "msg",
                                string_type(),
                                vec![ann("metro::Provides")],
                            ))
                            .build(),
                    )
                    .build(),
            )
            .build(),
    );
    host
}

#[test]
fn provider_wrapped_cycle_is_broken_with_a_delegate() {
    let host = cyclic_host(true);
    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);

    let graph = rendered(artifact(&result, "AppGraphMetroGraph"));
    assert!(graph.contains("::metro::DelegateProvider"), "{}", graph);
    assert!(graph.contains(".set_delegate("), "{}", graph);
    // The graph factory method takes the bound instance.
    assert!(graph.contains("pubfncreate(msg:::std::string::String,)->Self"), "{}", graph);
    assert!(graph.contains("::metro::InstanceFactory::new(msg)"));

    // A receives B through the delegate provider.
    let a_factory = rendered(artifact(&result, "AMetroFactory"));
    assert!(a_factory.contains("::metro::Provider<::app::B>"), "{}", a_factory);
    assert!(a_factory.contains(".clone()"));
}

#[test]
fn eager_cycle_is_an_error_with_the_full_path() {
    let host = cyclic_host(false);
    let (result, diagnostics) = run(&host);
    assert!(result.artifacts.is_empty());
    assert_eq!(error_codes(&diagnostics), vec!["METRO_GRAPH_DEPENDENCY_CYCLE"]);
    let message = &diagnostics[0].message;
    assert!(message.contains("cyclic dependency detected"), "{}", message);
    assert!(message.contains("::app::A (injected)"), "{}", message);
    assert!(message.contains("::app::B (injected)"), "{}", message);
}

#[test]
fn provider_self_cycle_is_legal() {
    let mut host = TestHost::new();
    host.add_class(
        class(app("Foo"))
            .inject_ctor(vec![param("next", provider_of(app("Foo")))])
            .build(),
    );
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
    assert!(graph.contains("::metro::DelegateProvider"), "{}", graph);
}

#[test]
fn eager_self_cycle_is_an_error() {
    let mut host = TestHost::new();
    host.add_class(
        class(app("Foo"))
            .inject_ctor(vec![param("next", app("Foo"))])
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot"))
            .method(accessor("foo", app("Foo")).build())
            .build(),
    );
    let (result, diagnostics) = run(&host);
    assert!(result.artifacts.is_empty());
    assert_eq!(error_codes(&diagnostics), vec!["METRO_SELF_CYCLE"]);
}

#[test]
fn lazy_wrapped_cycle_is_also_deferrable() {
    let mut host = TestHost::new();
    host.add_class(
        class(app("A"))
            .inject_ctor(vec![param("b", lazy_of(app("B")))])
            .build(),
    );
    host.add_class(
        class(app("B"))
            .inject_ctor(vec![param("a", app("A"))])
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot"))
            .method(accessor("a", app("A")).build())
            .build(),
    );
    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    let a_factory = rendered(artifact(&result, "AMetroFactory"));
    assert!(a_factory.contains("::metro::Lazy::new("), "{}", a_factory);
}
