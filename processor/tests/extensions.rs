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

/// Parent provides a count; the child extension exposes it.
fn parent_child_host(extendable: bool) -> TestHost {
    let mut host = TestHost::new();
    host.add_class(
        class(app("CountContainer"))
            .annotate(ann("metro::BindingContainer"))
            .method(
                method("provide_count", int_type())
                    .annotate(ann("metro::Provides"))
                    .build(),
            )
            .build(),
    );
    host.add_class(
        class(app("ChildGraph"))
            .interface()
            .annotate(ann("metro::GraphExtension"))
            .method(accessor("count", int_type()).build())
            .build(),
    );
    let mut annotation = ann("metro::GraphRoot").with_value(
        "bindingContainers",
        AnnotationValue::Array(vec![AnnotationValue::ClassLiteral(app("CountContainer"))]),
    );
    if extendable {
        annotation = annotation.with_value("isExtendable", AnnotationValue::Bool(true));
    }
    host.add_class(
        class(app("ParentGraph"))
            .interface()
            .annotate(annotation)
            .method(accessor("create_child", app("ChildGraph")).build())
            .build(),
    );
    host
}

#[test]
fn child_inherits_parent_bindings() {
    let host = parent_child_host(true);
    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);

    // The parent materializes the count binding even though no parent
    // accessor uses it, so the child shares one provider.
    let parent = rendered(artifact(&result, "ParentGraphMetroGraph"));
    assert!(parent.contains("fncreate_child(&self)->ChildGraphImpl"), "{}", parent);
    assert!(parent.contains("ChildGraphImpl::create("), "{}", parent);

    let child = rendered(artifact(&result, "ChildGraphImpl"));
    assert!(child.contains("inherited_0_i64"), "{}", child);
    assert!(child.contains("fncount(&self)->i64"), "{}", child);
    assert!(child.contains("self.inherited_0_i64.get()"), "{}", child);
}

#[test]
fn non_extendable_parent_is_an_inheritance_violation() {
    let host = parent_child_host(false);
    let (result, diagnostics) = run(&host);
    assert!(result.artifacts.is_empty());
    assert!(
        error_codes(&diagnostics).contains(&"METRO_SCOPE_INHERITANCE_VIOLATION"),
        "{:?}",
        diagnostics
    );
}

#[test]
fn child_local_binding_supersedes_the_parent() {
    let mut host = parent_child_host(true);
    // Replace the child with one that declares its own count container.
    host.add_class(
        class(app("ChildCountContainer"))
            .annotate(ann("metro::BindingContainer"))
            .method(
                method("provide_count", int_type())
                    .annotate(ann("metro::Provides"))
                    .build(),
            )
            .build(),
    );
    host.add_class(
        class(app("OverridingChild"))
            .interface()
            .annotate(ann("metro::GraphExtension").with_value(
                "bindingContainers",
                AnnotationValue::Array(vec![AnnotationValue::ClassLiteral(app(
                    "ChildCountContainer",
                ))]),
            ))
            .method(accessor("count", int_type()).build())
            .build(),
    );
    host.add_class(
        class(app("OverridingParent"))
            .interface()
            .annotate(
                ann("metro::GraphRoot")
                    .with_value("isExtendable", AnnotationValue::Bool(true))
                    .with_value(
                        "bindingContainers",
                        AnnotationValue::Array(vec![AnnotationValue::ClassLiteral(app(
                            "CountContainer",
                        ))]),
                    ),
            )
            .method(accessor("create_child", app("OverridingChild")).build())
            .build(),
    );
    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    let child = rendered(artifact(&result, "OverridingChildImpl"));
    // Resolved locally: no inherited provider field.
    assert!(!child.contains("inherited_"), "{}", child);
    assert!(child.contains("ChildCountContainer_provide_count"), "{}", child);
}

#[test]
fn extension_factory_forwards_creator_arguments() {
    let mut host = TestHost::new();
    host.add_class(
        class(app("SessionGraph"))
            .interface()
            .annotate(ann("metro::GraphExtension"))
            .method(accessor("user", string_type()).build())
            .nested(
                class(app("SessionGraph::Factory"))
                    .interface()
                    .annotate(ann("metro::GraphExtension::Factory"))
                    .method(
                        accessor("create", app("SessionGraph"))
                            .param(annotated_param(
                                "user",
                                string_type(),
                                vec![ann("metro::Provides")],
                            ))
                            .build(),
                    )
                    .build(),
            )
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot").with_value(
                "isExtendable",
                AnnotationValue::Bool(true),
            ))
            .method(accessor("session_factory", app("SessionGraph::Factory")).build())
            .build(),
    );
    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);

    let parent = rendered(artifact(&result, "AppGraphMetroGraph"));
    assert!(parent.contains("fnsession_factory(&self)->SessionGraphFactoryImpl"), "{}", parent);

    let factory_impl = rendered(artifact(&result, "SessionGraphFactoryImpl"));
    assert!(factory_impl.contains("impl::app::SessionGraph::FactoryforSessionGraphFactoryImpl"), "{}", factory_impl);
    assert!(factory_impl.contains("SessionGraphImpl::create(user)"), "{}", factory_impl);

    let child = rendered(artifact(&result, "SessionGraphImpl"));
    assert!(child.contains("pubfncreate(user:::std::string::String,)->Self"), "{}", child);
    assert!(child.contains("::metro::InstanceFactory::new(user)"), "{}", child);
}

#[test]
fn direct_accessor_to_input_taking_extension_is_an_error() {
    let mut host = TestHost::new();
    host.add_class(
        class(app("SessionGraph"))
            .interface()
            .annotate(ann("metro::GraphExtension"))
            .method(accessor("user", string_type()).build())
            .nested(
                class(app("SessionGraph::Factory"))
                    .interface()
                    .annotate(ann("metro::GraphExtension::Factory"))
                    .method(
                        accessor("create", app("SessionGraph"))
                            .param(annotated_param(
                                "user",
                                string_type(),
                                vec![ann("metro::Provides")],
                            ))
                            .build(),
                    )
                    .build(),
            )
            .build(),
    );
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(ann("metro::GraphRoot").with_value(
                "isExtendable",
                AnnotationValue::Bool(true),
            ))
            .method(accessor("session", app("SessionGraph")).build())
            .build(),
    );
    let (result, diagnostics) = run(&host);
    assert!(result.artifacts.is_empty());
    assert!(
        error_codes(&diagnostics).contains(&"METRO_EXTENSION_CONTRACT"),
        "{:?}",
        diagnostics
    );
}

#[test]
fn contributed_extension_is_generated_without_an_accessor() {
    let mut host = TestHost::new();
    host.add_class(scope_annotation_class("AppScope"));
    host.add_class(
        class(app("DebugGraph"))
            .interface()
            .annotate(ann("metro::GraphExtension").with_value(
                "scope",
                AnnotationValue::ClassLiteral(app("DebugScope")),
            ))
            .build(),
    );
    host.add_class(scope_annotation_class("DebugScope"));
    host.add_class(
        class(app("AppGraph"))
            .interface()
            .annotate(
                ann("metro::GraphRoot")
                    .with_value("scope", AnnotationValue::ClassLiteral(app("AppScope")))
                    .with_value("isExtendable", AnnotationValue::Bool(true)),
            )
            .build(),
    );
    host.hint(app("DebugGraph"), &app("AppScope"));
    let (result, diagnostics) = run(&host);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    assert!(result.artifacts.iter().any(|a| a.name == "DebugGraphImpl"));
}
