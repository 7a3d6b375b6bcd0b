//! Diagnostic sink for non-fatal warnings raised while mounting.
//!
//! Every "degrade gracefully" branch reports here and then carries on. The sink never
//! decides control flow.

use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: String,
    pub level: DiagnosticLevel,
    pub message: String,
    /// Formatted name of the component the diagnostic was raised for, e.g. `<App>`.
    pub component: Option<String>,
}

impl Diagnostic {
    pub fn warning(code: &str, message: impl Into<String>, component: Option<&str>) -> Self {
        Diagnostic {
            code: code.to_string(),
            level: DiagnosticLevel::Warning,
            message: message.into(),
            component: component.map(str::to_string),
        }
    }

    pub fn error(code: &str, message: impl Into<String>, component: Option<&str>) -> Self {
        Diagnostic {
            level: DiagnosticLevel::Error,
            ..Self::warning(code, message, component)
        }
    }
}

pub trait DiagnosticSink {
    fn emit(&self, diagnostic: Diagnostic);
}

/// Front for a sink that drops everything in production builds.
#[derive(Clone)]
pub struct Reporter {
    sink: Rc<dyn DiagnosticSink>,
    silent: bool,
}

impl Reporter {
    pub fn new(sink: Rc<dyn DiagnosticSink>, production: bool) -> Self {
        Reporter {
            sink,
            silent: production,
        }
    }

    pub fn warn(&self, code: &str, message: impl Into<String>, component: Option<&str>) {
        if !self.silent {
            self.sink.emit(Diagnostic::warning(code, message, component));
        }
    }

    pub fn error(&self, code: &str, message: impl Into<String>, component: Option<&str>) {
        if !self.silent {
            self.sink.emit(Diagnostic::error(code, message, component));
        }
    }
}

/// Default sink: forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        let component = diagnostic.component.as_deref().unwrap_or("<Root>");
        match diagnostic.level {
            DiagnosticLevel::Warning => tracing::warn!(
                target: "template_mount",
                code = %diagnostic.code,
                component,
                "{}",
                diagnostic.message
            ),
            DiagnosticLevel::Error => tracing::error!(
                target: "template_mount",
                code = %diagnostic.code,
                component,
                "{}",
                diagnostic.message
            ),
        }
    }
}

/// Keeps diagnostics in memory. Used by embedders that surface warnings themselves.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: RefCell<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.borrow().clone()
    }

    pub fn codes(&self) -> Vec<String> {
        self.entries.borrow().iter().map(|d| d.code.clone()).collect()
    }

    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, diagnostic: Diagnostic) {
        self.entries.borrow_mut().push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_collects_in_order() {
        let sink = MemorySink::new();
        sink.emit(Diagnostic::warning("A", "first", None));
        sink.emit(Diagnostic::error("B", "second", Some("<App>")));

        assert_eq!(sink.codes(), vec!["A".to_string(), "B".to_string()]);
        let taken = sink.take();
        assert_eq!(taken[1].level, DiagnosticLevel::Error);
        assert_eq!(taken[1].component.as_deref(), Some("<App>"));
        assert!(sink.is_empty());
    }

    #[derive(Clone, Default)]
    struct CapturedLog(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLog {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn test_tracing_sink_forwards_levels_and_fields() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            TracingSink.emit(Diagnostic::warning(
                "W-MOUNT-ROOT",
                "Do not mount to <html> or <body>",
                Some("<App>"),
            ));
            TracingSink.emit(Diagnostic::error("E-TEMPLATE-INVALID", "invalid template option: 42", None));
        });

        let lines: Vec<String> = log.contents().lines().map(str::to_string).collect();
        assert_eq!(lines.len(), 2, "{:?}", lines);

        assert!(lines[0].contains("WARN"));
        assert!(lines[0].contains("template_mount"));
        assert!(lines[0].contains("Do not mount to <html> or <body>"));
        assert!(lines[0].contains("code=W-MOUNT-ROOT"));
        assert!(lines[0].contains("<App>"));

        assert!(lines[1].contains("ERROR"));
        assert!(lines[1].contains("code=E-TEMPLATE-INVALID"));
        assert!(lines[1].contains("<Root>"));
    }

    #[test]
    fn test_reporter_is_silent_in_production() {
        let sink = Rc::new(MemorySink::new());
        Reporter::new(sink.clone(), true).warn("A", "dropped", None);
        assert!(sink.is_empty());
        Reporter::new(sink.clone(), false).error("B", "kept", None);
        assert_eq!(sink.codes(), vec!["B".to_string()]);
    }
}
