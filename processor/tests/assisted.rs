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

/// `Bar` takes an assisted `n` and an injected `Dep`; `BarFactory`
/// supplies `n` at call time.
fn assisted_host(factory_param_type: metro_common::TypeData) -> TestHost {
    let mut host = TestHost::new();
    host.add_class(class(app("Dep")).inject_ctor(vec![]).build());
    host.add_class(
        class(app("Bar"))
            .assisted_ctor(vec![
                annotated_param("n", int_type(), vec![ann("metro::Assisted")]),
                param("dep", app("Dep")),
            ])
            .build(),
    );
    host.add_class(
        class(app("BarFactory"))
            .interface()
            .annotate(ann("metro::AssistedFactory"))
            .method(
                accessor("create", app("Bar"))
                    .param(param("n", factory_param_type))
                    .build(),
            )
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot"))
            .method(accessor("factory", app("BarFactory")).build())
            .method(accessor("dep", app("Dep")).build())
            .build(),
    );
    host
}

#[test]
fn assisted_factory_mixes_call_time_and_injected_arguments() {
    let host = assisted_host(int_type());
    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);

    let factory = rendered(artifact(&result, "BarMetroFactory"));
    assert!(factory.contains("pubfncreate(&self,n:i64,)->::app::Bar"), "{}", factory);
    // Constructor order: assisted n first, then the injected dep.
    assert!(factory.contains("::app::Bar::new(n,self.provider_0_dep.get())"), "{}", factory);

    let factory_impl = rendered(artifact(&result, "BarFactoryImpl"));
    assert!(factory_impl.contains("impl::app::BarFactoryforBarFactoryImpl"), "{}", factory_impl);
    assert!(factory_impl.contains("self.factory.create(n)"), "{}", factory_impl);

    let graph = rendered(artifact(&result, "AppGraphMetroGraph"));
    assert!(graph.contains("fnfactory(&self)->BarFactoryImpl"), "{}", graph);
    assert!(graph.contains("BarFactoryImpl{factory:BarMetroFactory::new("), "{}", graph);
}

#[test]
fn mismatched_assisted_parameters_are_an_error() {
    let host = assisted_host(string_type());
    let (result, diagnostics) = run(&host);
    assert!(result.artifacts.is_empty());
    assert_eq!(error_codes(&diagnostics), vec!["METRO_ASSISTED_MISMATCH"]);
}

#[test]
fn assisted_type_requested_directly_is_an_error() {
    let mut host = TestHost::new();
    host.add_class(class(app("Dep")).inject_ctor(vec![]).build());
    host.add_class(
        class(app("Bar"))
            .assisted_ctor(vec![
                annotated_param("n", int_type(), vec![ann("metro::Assisted")]),
                param("dep", app("Dep")),
            ])
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot"))
            .method(accessor("bar", app("Bar")).build())
            .build(),
    );
    let (result, diagnostics) = run(&host);
    assert!(result.artifacts.is_empty());
    assert_eq!(error_codes(&diagnostics), vec!["METRO_ASSISTED_MAPPING"]);
    assert!(diagnostics[0]
        .message
        .contains("must be requested through its assisted factory"));
}

#[test]
fn lazy_wrapped_assisted_parameter_is_an_error() {
    let mut host = TestHost::new();
    host.add_class(class(app("Dep")).inject_ctor(vec![]).build());
    host.add_class(
        class(app("Bar"))
            .assisted_ctor(vec![
                annotated_param("n", int_type(), vec![ann("metro::Assisted")]),
                param("dep", app("Dep")),
            ])
            .build(),
    );
    host.add_class(
        class(app("BarFactory"))
            .interface()
            .annotate(ann("metro::AssistedFactory"))
            .method(
                accessor("create", app("Bar"))
                    .param(param("n", lazy_of(int_type())))
                    .build(),
            )
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot"))
            .method(accessor("factory", app("BarFactory")).build())
            .build(),
    );
    let (_, diagnostics) = run(&host);
    assert!(error_codes(&diagnostics).contains(&"METRO_ASSISTED_LAZY_WRAP"), "{:?}", diagnostics);
}

#[test]
fn assisted_identifiers_pair_parameters_of_the_same_type() {
    let mut host = TestHost::new();
    let assisted = |id: &str| {
        ann("metro::Assisted").with_value(
            "value",
            metro_common::AnnotationValue::Str(id.to_owned()),
        )
    };
    host.add_class(
        class(app("Range"))
            .assisted_ctor(vec![
                annotated_param("low", int_type(), vec![assisted("low")]),
                annotated_param("high", int_type(), vec![assisted("high")]),
            ])
            .build(),
    );
    host.add_class(
        class(app("RangeFactory"))
            .interface()
            .annotate(ann("metro::AssistedFactory"))
            .method(
                accessor("create", app("Range"))
                    .param(annotated_param("high", int_type(), vec![assisted("high")]))
                    .param(annotated_param("low", int_type(), vec![assisted("low")]))
                    .build(),
            )
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot"))
            .method(accessor("factory", app("RangeFactory")).build())
            .build(),
    );
    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    let factory = rendered(artifact(&result, "RangeMetroFactory"));
    // Identifiers, not positions, decide which argument feeds which
    // constructor parameter.
    assert!(factory.contains("::app::Range::new(low,high)"), "{}", factory);
    assert!(factory.contains("pubfncreate(&self,high:i64,low:i64,)"), "{}", factory);
}
