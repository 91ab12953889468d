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

/// One contributed class and one `IntoSet` provider feed `Vec<Cache>`.
fn cache_set_host() -> TestHost {
    let mut host = TestHost::new();
    host.add_class(scope_annotation_class("AppScope"));
    host.add_class(class(app("Cache")).interface().build());
    host.add_class(
        class(app("CacheImpl"))
            .supertype(app("Cache"))
            .annotate(ann("metro::ContributesIntoSet").with_value(
                "scope",
                AnnotationValue::ClassLiteral(app("AppScope")),
            ))
            .inject_ctor(vec![])
            .build(),
    );
    host.add_class(
        class(app("CacheContainer"))
            .annotate(ann("metro::BindingContainer"))
            .method(
                method("other_cache", app("Cache"))
                    .annotate(ann("metro::Provides"))
                    .annotate(ann("metro::IntoSet"))
                    .build(),
            )
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(
                ann("metro::GraphRoot")
                    .with_value("scope", AnnotationValue::ClassLiteral(app("AppScope")))
                    .with_value(
                        "bindingContainers",
                        AnnotationValue::Array(vec![AnnotationValue::ClassLiteral(app(
                            "CacheContainer",
                        ))]),
                    ),
            )
            .method(accessor("caches", vec_of(app("Cache"))).build())
            .build(),
    );
    host.hint(app("CacheImpl"), &app("AppScope"));
    host
}

#[test]
fn set_collects_both_contributions() {
    let host = cache_set_host();
    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);

    let graph = rendered(artifact(&result, "AppGraphMetroGraph"));
    assert!(graph.contains("::metro::SetFactory::builder()"), "{}", graph);
    assert_eq!(graph.matches(".add_provider(").count(), 2, "{}", graph);
    assert!(graph.contains("fncaches(&self)->::std::vec::Vec<::app::Cache>"), "{}", graph);

    // The contributed class still gets a plain constructor factory.
    let impl_factory = rendered(artifact(&result, "CacheImplMetroFactory"));
    assert!(impl_factory.contains("::app::CacheImpl::new()"), "{}", impl_factory);
}

#[test]
fn elements_into_set_adds_a_collection_provider() {
    let mut host = TestHost::new();
    host.add_class(class(app("Cache")).interface().build());
    host.add_class(
        class(app("CacheContainer"))
            .annotate(ann("metro::BindingContainer"))
            .method(
                method("defaults", vec_of(app("Cache")))
                    .annotate(ann("metro::Provides"))
                    .annotate(ann("metro::ElementsIntoSet"))
                    .build(),
            )
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot").with_value(
                "bindingContainers",
                AnnotationValue::Array(vec![AnnotationValue::ClassLiteral(app("CacheContainer"))]),
            ))
            .method(accessor("caches", vec_of(app("Cache"))).build())
            .build(),
    );
    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    let graph = rendered(artifact(&result, "AppGraphMetroGraph"));
    assert!(graph.contains(".add_collection_provider("), "{}", graph);
}

fn map_host(second_key: &str) -> TestHost {
    let mut host = TestHost::new();
    host.add_class(map_key_annotation_class("StringKey"));
    host.add_class(class(app("Handler")).interface().build());
    let string_key = |value: &str| {
        metro_common::AnnotationData::new(app("StringKey"))
            .with_value("value", AnnotationValue::Str(value.to_owned()))
    };
    host.add_class(
        class(app("HandlerContainer"))
            .annotate(ann("metro::BindingContainer"))
            .method(
                method("get_handler", app("Handler"))
                    .annotate(ann("metro::Provides"))
                    .annotate(ann("metro::IntoMap"))
                    .annotate(string_key("get"))
                    .build(),
            )
            .method(
                method("post_handler", app("Handler"))
                    .annotate(ann("metro::Provides"))
                    .annotate(ann("metro::IntoMap"))
                    .annotate(string_key(second_key))
                    .build(),
            )
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot").with_value(
                "bindingContainers",
                AnnotationValue::Array(vec![AnnotationValue::ClassLiteral(app(
                    "HandlerContainer",
                ))]),
            ))
            .method(accessor("handlers", map_of(string_type(), app("Handler"))).build())
            .build(),
    );
    host
}

#[test]
fn map_collects_keyed_contributions() {
    let host = map_host("post");
    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    let graph = rendered(artifact(&result, "AppGraphMetroGraph"));
    assert!(graph.contains("::metro::MapFactory::builder()"), "{}", graph);
    assert!(graph.contains(".put(\"get\".to_owned()"), "{}", graph);
    assert!(graph.contains(".put(\"post\".to_owned()"), "{}", graph);
}

#[test]
fn duplicate_map_key_is_an_error() {
    let host = map_host("get");
    let (result, diagnostics) = run(&host);
    assert!(result.artifacts.is_empty());
    assert_eq!(error_codes(&diagnostics), vec!["METRO_MULTIBINDING_KEY_COLLISION"]);
    assert!(diagnostics[0].message.contains("\"get\""));
}

#[test]
fn map_of_providers_uses_the_provider_factory() {
    let mut host = map_host("post");
    host.add_class(
        class(app("LazyGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot").with_value(
                "bindingContainers",
                AnnotationValue::Array(vec![AnnotationValue::ClassLiteral(app(
                    "HandlerContainer",
                ))]),
            ))
            .method(
                accessor(
                    "handlers",
                    map_of(string_type(), provider_of(app("Handler"))),
                )
                .build(),
            )
            .build(),
    );
    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    let graph = rendered(artifact(&result, "LazyGraphMetroGraph"));
    assert!(graph.contains("::metro::MapProviderFactory::builder()"), "{}", graph);
}

fn multibinds_host(allow_empty: bool) -> TestHost {
    let mut host = TestHost::new();
    host.add_class(class(app("Cache")).interface().build());
    host.add_class(
        class(app("CacheContainer"))
            .annotate(ann("metro::BindingContainer"))
            .method(
                accessor("caches", vec_of(app("Cache")))
                    .annotate(
                        ann("metro::Multibinds")
                            .with_value("allowEmpty", AnnotationValue::Bool(allow_empty)),
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
                AnnotationValue::Array(vec![AnnotationValue::ClassLiteral(app("CacheContainer"))]),
            ))
            .method(accessor("caches", vec_of(app("Cache"))).build())
            .build(),
    );
    host
}

#[test]
fn empty_multibinding_with_allow_empty_succeeds() {
    let host = multibinds_host(true);
    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    let graph = rendered(artifact(&result, "AppGraphMetroGraph"));
    assert!(graph.contains("::metro::SetFactory::builder().build()"), "{}", graph);
}

#[test]
fn empty_multibinding_without_allow_empty_is_an_error() {
    let host = multibinds_host(false);
    let (result, diagnostics) = run(&host);
    assert!(result.artifacts.is_empty());
    assert_eq!(error_codes(&diagnostics), vec!["METRO_EMPTY_MULTIBINDING"]);
}
