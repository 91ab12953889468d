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

//! Optional report files written under the configured `reportsDir`.

use crate::trace::Tracer;
use anyhow::Context;
use std::fs;
use std::path::Path;

/// The keys that participated in one graph, for
/// `keys-populated-<Graph>.txt`.
#[derive(Debug, Clone)]
pub struct KeysReport {
    pub graph: String,
    pub keys: Vec<String>,
}

pub fn write_reports(
    dir: &Path,
    tracer: &Tracer,
    key_reports: &[KeysReport],
) -> anyhow::Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("cannot create reports dir {}", dir.display()))?;
    if tracer.is_enabled() {
        fs::write(dir.join("timings.csv"), tracer.to_csv())
            .with_context(|| "cannot write timings.csv")?;
        fs::write(dir.join("traceLog.txt"), tracer.to_text())
            .with_context(|| "cannot write traceLog.txt")?;
    }
    for report in key_reports {
        let mut keys = report.keys.clone();
        keys.sort();
        let mut content = keys.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        fs::write(
            dir.join(format!("keys-populated-{}.txt", report.graph)),
            content,
        )
        .with_context(|| format!("cannot write keys report for {}", report.graph))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_sorted_key_lists() {
        let dir = std::env::temp_dir().join("metro-reports-test");
        let _ = fs::remove_dir_all(&dir);
        let tracer = Tracer::new(true);
        write_reports(
            &dir,
            &tracer,
            &[KeysReport {
                graph: "AppGraph".into(),
                keys: vec!["::b::B".into(), "::a::A".into()],
            }],
        )
        .unwrap();
        let written = fs::read_to_string(dir.join("keys-populated-AppGraph.txt")).unwrap();
        assert_eq!(written, "::a::A\n::b::B\n");
        assert!(dir.join("timings.csv").exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
