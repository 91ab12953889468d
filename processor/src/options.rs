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

use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;

/// Processor configuration handed over by the build-tool integration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetroOptions {
    pub enabled: bool,
    pub debug: bool,
    pub reports_dir: Option<PathBuf>,
    /// Also resolve and validate bindings no root request reaches.
    pub enable_full_binding_graph_validation: bool,
    pub custom_annotations: CustomAnnotations,
    /// Recognize the JSR-330/Dagger annotation family as equivalents of
    /// the built-in markers.
    pub allow_java_annotations: bool,
    pub tracing: bool,
    pub generate_assisted_factories: bool,
}

impl Default for MetroOptions {
    fn default() -> Self {
        MetroOptions {
            enabled: true,
            debug: false,
            reports_dir: None,
            enable_full_binding_graph_validation: false,
            custom_annotations: Default::default(),
            allow_java_annotations: false,
            tracing: false,
            generate_assisted_factories: true,
        }
    }
}

impl MetroOptions {
    /// Parses the options object from the host's JSON configuration
    /// blob. Unknown keys are ignored so newer build integrations can
    /// talk to older processors.
    pub fn from_json(json: &str) -> anyhow::Result<MetroOptions> {
        serde_json::from_str(json).with_context(|| "cannot parse metro options")
    }
}

/// Additional annotation paths recognized as markers, by marker kind.
///
/// Paths are canonical without a leading `::`, e.g.
/// `"my_di::annotations::AppScope"`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomAnnotations {
    pub include_graph_root: Vec<String>,
    pub include_inject: Vec<String>,
    pub include_provides: Vec<String>,
    pub include_binds: Vec<String>,
    pub include_scope: Vec<String>,
    pub include_qualifier: Vec<String>,
    pub include_map_key: Vec<String>,
    pub include_contributes_to: Vec<String>,
    pub include_contributes_binding: Vec<String>,
    pub include_assisted: Vec<String>,
    pub include_assisted_inject: Vec<String>,
    pub include_assisted_factory: Vec<String>,
    pub include_into_set: Vec<String>,
    pub include_into_map: Vec<String>,
    pub include_multibinds: Vec<String>,
    pub include_binding_container: Vec<String>,
}
