//! Performance marks around compilation.
//!
//! Instrumentation is best-effort: a measure over unknown marks is dropped silently and
//! nothing here can fail a mount.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub trait Instrumentation {
    fn mark(&self, label: &str);
    fn measure(&self, name: &str, start_label: &str, end_label: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInstrumentation;

impl Instrumentation for NoopInstrumentation {
    fn mark(&self, _label: &str) {}
    fn measure(&self, _name: &str, _start_label: &str, _end_label: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement {
    pub name: String,
    pub duration: Duration,
}

/// In-process timeline keyed by mark label.
#[derive(Debug, Default)]
pub struct Timeline {
    marks: RefCell<HashMap<String, Instant>>,
    measurements: RefCell<Vec<Measurement>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn measurements(&self) -> Vec<Measurement> {
        self.measurements.borrow().clone()
    }

    pub fn has_mark(&self, label: &str) -> bool {
        self.marks.borrow().contains_key(label)
    }
}

impl Instrumentation for Timeline {
    fn mark(&self, label: &str) {
        self.marks.borrow_mut().insert(label.to_string(), Instant::now());
    }

    fn measure(&self, name: &str, start_label: &str, end_label: &str) {
        let mut marks = self.marks.borrow_mut();
        let (start, end) = match (marks.get(start_label), marks.get(end_label)) {
            (Some(start), Some(end)) => (*start, *end),
            _ => {
                tracing::trace!(target: "template_mount", name, start_label, end_label, "measure skipped: missing mark");
                return;
            }
        };
        // Marks are consumed by the measure so the next compile starts clean.
        marks.remove(start_label);
        marks.remove(end_label);

        let duration = end.saturating_duration_since(start);
        tracing::debug!(target: "template_mount", name, ?duration, "measure");
        self.measurements.borrow_mut().push(Measurement {
            name: name.to_string(),
            duration,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_consumes_marks() {
        let timeline = Timeline::new();
        timeline.mark("compile");
        timeline.mark("compile end");
        timeline.measure("<App> compile", "compile", "compile end");

        let measured = timeline.measurements();
        assert_eq!(measured.len(), 1);
        assert_eq!(measured[0].name, "<App> compile");
        assert!(!timeline.has_mark("compile"));
        assert!(!timeline.has_mark("compile end"));
    }

    #[test]
    fn test_measure_without_marks_is_ignored() {
        let timeline = Timeline::new();
        timeline.mark("compile");
        timeline.measure("x", "compile", "never marked");
        assert!(timeline.measurements().is_empty());
        assert!(timeline.has_mark("compile"));
    }
}
