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

use std::time::Instant;

#[derive(Debug)]
struct TraceEvent {
    label: String,
    parent: Option<usize>,
    depth: usize,
    started: Instant,
    duration_ms: Option<u128>,
}

/// Hierarchical stage timer.
///
/// Each pipeline stage is bracketed by [`start`](Tracer::start) /
/// [`stop`](Tracer::stop); nesting follows the call structure. The
/// recorded tree renders as `timings.csv` rows and as an indented text
/// log. A disabled tracer records nothing.
#[derive(Debug, Default)]
pub struct Tracer {
    enabled: bool,
    events: Vec<TraceEvent>,
    stack: Vec<usize>,
}

impl Tracer {
    pub fn new(enabled: bool) -> Self {
        Tracer {
            enabled,
            events: Vec::new(),
            stack: Vec::new(),
        }
    }

    pub fn start(&mut self, label: impl Into<String>) {
        if !self.enabled {
            return;
        }
        let event = TraceEvent {
            label: label.into(),
            parent: self.stack.last().copied(),
            depth: self.stack.len(),
            started: Instant::now(),
            duration_ms: None,
        };
        self.events.push(event);
        self.stack.push(self.events.len() - 1);
    }

    pub fn stop(&mut self) {
        if !self.enabled {
            return;
        }
        if let Some(index) = self.stack.pop() {
            let event = &mut self.events[index];
            event.duration_ms = Some(event.started.elapsed().as_millis());
        }
    }

    /// `graph,stage,duration_ms` rows. Stage rows are depth-1 events,
    /// attributed to their enclosing depth-0 (graph) event.
    pub fn to_csv(&self) -> String {
        let mut out = String::from("graph,stage,duration_ms\n");
        for event in &self.events {
            if event.depth != 1 {
                continue;
            }
            let graph = event
                .parent
                .map(|p| self.events[p].label.as_str())
                .unwrap_or("");
            out.push_str(&format!(
                "{},{},{}\n",
                graph,
                event.label,
                event.duration_ms.unwrap_or(0)
            ));
        }
        out
    }

    /// Indented human readable timing tree.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&"  ".repeat(event.depth));
            out.push_str(&format!(
                "{}: {} ms\n",
                event.label,
                event.duration_ms.unwrap_or(0)
            ));
        }
        out
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_nested_stages() {
        let mut tracer = Tracer::new(true);
        tracer.start("AppGraph");
        tracer.start("build");
        tracer.stop();
        tracer.start("validate");
        tracer.stop();
        tracer.stop();

        let csv = tracer.to_csv();
        assert!(csv.starts_with("graph,stage,duration_ms\n"));
        assert!(csv.contains("AppGraph,build,"));
        assert!(csv.contains("AppGraph,validate,"));

        let text = tracer.to_text();
        assert!(text.contains("AppGraph: "));
        assert!(text.contains("  build: "));
    }

    #[test]
    fn disabled_tracer_records_nothing() {
        let mut tracer = Tracer::new(false);
        tracer.start("AppGraph");
        tracer.stop();
        assert_eq!(tracer.to_csv(), "graph,stage,duration_ms\n");
        assert!(tracer.to_text().is_empty());
    }
}
