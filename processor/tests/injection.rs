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
use metro_common::{AnnotationValue, FieldSymbol};
use metro_processor::testing::*;

#[test]
fn members_injector_covers_fields_and_setters_supertype_first() {
    let mut host = TestHost::new();
    host.add_class(class(app("Logger")).inject_ctor(vec![]).build());
    host.add_class(class(app("Clock")).inject_ctor(vec![]).build());
    host.add_class(
        class(app("BaseScreen"))
            .field(FieldSymbol {
                name: "logger".to_owned(),
                type_data: app("Logger"),
                annotations: vec![ann("metro::Inject")],
                mutable: true,
                ..Default::default()
            })
            .build(),
    );
    host.add_class(
        class(app("HomeScreen"))
            .supertype(app("BaseScreen"))
            .method(
                method("set_clock", unit_type())
                    .instance_method()
                    .annotate(ann("metro::Inject"))
                    .param(param("clock", app("Clock")))
                    .build(),
            )
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot"))
            .method(
                accessor("inject", unit_type())
                    .param(param("target", app("HomeScreen")))
                    .build(),
            )
            .build(),
    );

    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);

    let injector = rendered(artifact(&result, "HomeScreenMembersInjector"));
    assert!(injector.contains("impl::metro::MembersInjector<::app::HomeScreen>"), "{}", injector);
    let logger_at = injector.find("target.logger=").expect("field site");
    let clock_at = injector.find("target.set_clock(").expect("setter site");
    assert!(logger_at < clock_at, "supertype sites inject first:\n{}", injector);

    let graph = rendered(artifact(&result, "AppGraphMetroGraph"));
    assert!(graph.contains("fninject(&self,target:&mut::app::HomeScreen)"), "{}", graph);
    assert!(graph.contains("HomeScreenMembersInjector::new("), "{}", graph);
    assert!(graph.contains(".inject_members(target)"), "{}", graph);
}

#[test]
fn qualifiers_split_bindings_of_the_same_type() {
    let mut host = TestHost::new();
    host.add_class(qualifier_annotation_class("Named"));
    let named = |value: &str| {
        metro_common::AnnotationData::new(app("Named"))
            .with_value("value", AnnotationValue::Str(value.to_owned()))
    };
    host.add_class(
        class(app("UrlContainer"))
            .annotate(ann("metro::BindingContainer"))
            .method(
                method("prod_url", string_type())
                    .annotate(ann("metro::Provides"))
                    .annotate(named("prod"))
                    .build(),
            )
            .method(
                method("dev_url", string_type())
                    .annotate(ann("metro::Provides"))
                    .annotate(named("dev"))
                    .build(),
            )
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot").with_value(
                "bindingContainers",
                AnnotationValue::Array(vec![AnnotationValue::ClassLiteral(app("UrlContainer"))]),
            ))
            .method(accessor("prod", string_type()).annotate(named("prod")).build())
            .method(accessor("dev", string_type()).annotate(named("dev")).build())
            .build(),
    );
    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    assert!(result.artifacts.iter().any(|a| a.name == "UrlContainer_prod_urlMetroFactory"));
    assert!(result.artifacts.iter().any(|a| a.name == "UrlContainer_dev_urlMetroFactory"));
}

#[test]
fn unqualified_request_does_not_match_a_qualified_binding() {
    let mut host = TestHost::new();
    host.add_class(qualifier_annotation_class("Named"));
    host.add_class(
        class(app("UrlContainer"))
            .annotate(ann("metro::BindingContainer"))
            .method(
                method("prod_url", string_type())
                    .annotate(ann("metro::Provides"))
                    .annotate(
                        metro_common::AnnotationData::new(app("Named"))
                            .with_value("value", AnnotationValue::Str("prod".to_owned())),
                    )
                    .build(),
            )
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot").with_value(
                "bindingContainers",
                AnnotationValue::Array(vec![AnnotationValue::ClassLiteral(app("UrlContainer"))]),
            ))
            .method(accessor("url", string_type()).build())
            .build(),
    );
    let (_, diagnostics) = run(&host);
    assert_eq!(error_codes(&diagnostics), vec!["METRO_MISSING_BINDING"]);
}

#[test]
fn included_object_backs_instance_providers() {
    let mut host = TestHost::new();
    host.add_class(class(app("Client")).interface().build());
    host.add_class(
        class(app("HttpModule"))
            .annotate(ann("metro::BindingContainer"))
            .method(
                method("provide_client", app("Client"))
                    .instance_method()
                    .annotate(ann("metro::Provides"))
                    .build(),
            )
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot"))
            .method(accessor("client", app("Client")).build())
            .nested(
                class(app("AppGraph::Factory"))
                    .interface()
                    .annotate(ann("metro::GraphRoot::Factory"))
                    .method(
                        accessor("create", app("AppGraph"))
                            .param(annotated_param(
                                "http",
                                app("HttpModule"),
                                vec![ann("metro::Includes")],
                            ))
                            .build(),
                    )
                    .build(),
            )
            .build(),
    );
    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);

    let graph = rendered(artifact(&result, "AppGraphMetroGraph"));
    assert!(graph.contains("pubfncreate(http:::app::HttpModule,)->Self"), "{}", graph);
    assert!(graph.contains("::metro::InstanceFactory::new(http)"), "{}", graph);

    // The provider invokes the method on the included instance.
    let factory = rendered(artifact(&result, "HttpModule_provide_clientMetroFactory"));
    assert!(factory.contains(".provide_client()"), "{}", factory);
}

#[test]
fn defaulted_parameter_without_a_binding_uses_the_default() {
    let mut host = TestHost::new();
    host.add_class(
        class(app("Widget"))
            .inject_ctor(vec![defaulted_param("size", int_type())])
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot"))
            .method(accessor("widget", app("Widget")).build())
            .build(),
    );
    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    let factory = rendered(artifact(&result, "WidgetMetroFactory"));
    assert!(factory.contains("::std::default::Default::default()"), "{}", factory);
}

#[test]
fn binds_alias_forwards_to_the_implementation() {
    let mut host = TestHost::new();
    host.add_class(class(app("Repo")).interface().build());
    host.add_class(
        class(app("DbRepo"))
            .supertype(app("Repo"))
            .inject_ctor(vec![])
            .build(),
    );
    host.add_class(
        class(app("RepoContainer"))
            .annotate(ann("metro::BindingContainer"))
            .method(
                method("bind_repo", app("Repo"))
                    .abstract_method()
                    .annotate(ann("metro::Binds"))
                    .param(param("impl_", app("DbRepo")))
                    .build(),
            )
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot").with_value(
                "bindingContainers",
                AnnotationValue::Array(vec![AnnotationValue::ClassLiteral(app("RepoContainer"))]),
            ))
            .method(accessor("repo", app("Repo")).build())
            .build(),
    );
    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);

    // A pure alias produces no factory of its own; the accessor reads
    // the implementation's provider directly.
    assert!(!result.artifacts.iter().any(|a| a.name.contains("bind_repo")));
    let graph = rendered(artifact(&result, "AppGraphMetroGraph"));
    assert!(graph.contains("fnrepo(&self)->::app::Repo"), "{}", graph);
    assert!(graph.contains("inject_0_dbrepo"), "{}", graph);
}

#[test]
fn binds_parameter_must_conform_to_the_return_type() {
    let mut host = TestHost::new();
    host.add_class(class(app("Repo")).interface().build());
    host.add_class(class(app("Unrelated")).inject_ctor(vec![]).build());
    host.add_class(
        class(app("RepoContainer"))
            .annotate(ann("metro::BindingContainer"))
            .method(
                method("bind_repo", app("Repo"))
                    .abstract_method()
                    .annotate(ann("metro::Binds"))
                    .param(param("impl_", app("Unrelated")))
                    .build(),
            )
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot").with_value(
                "bindingContainers",
                AnnotationValue::Array(vec![AnnotationValue::ClassLiteral(app("RepoContainer"))]),
            ))
            .method(accessor("repo", app("Repo")).build())
            .build(),
    );
    let (_, diagnostics) = run(&host);
    assert!(
        error_codes(&diagnostics).contains(&"METRO_ILLEGAL_TARGET"),
        "{:?}",
        diagnostics
    );
}
