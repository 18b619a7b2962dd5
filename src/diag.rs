use std::cell::RefCell;

use thiserror::Error;

use crate::source::{FileId, TextRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// One reported problem, anchored at its spelled location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: FileId,
    pub range: TextRange,
    pub severity: Severity,
    pub message: String,
}

/// Receives diagnostics as the front-end produces them. The front-end never
/// depends on the sink's reaction; compilation continues regardless.
pub trait DiagnosticSink {
    fn report(&self, file: FileId, range: TextRange, severity: Severity, message: String);
}

/// Sink that keeps every diagnostic, in report order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.borrow().is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, file: FileId, range: TextRange, severity: Severity, message: String) {
        self.diagnostics.borrow_mut().push(Diagnostic { file, range, severity, message });
    }
}

/// Sink that drops everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&self, _file: FileId, _range: TextRange, _severity: Severity, _message: String) {}
}

/// Failures of the compilation entry points themselves. Everything the
/// front-end can recover from is a [`Diagnostic`] instead.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("main source file not found: {path}")]
    MainFileNotFound { path: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::TextPosition;

    #[test]
    fn collecting_sink_keeps_report_order() {
        let sink = CollectingSink::new();
        let range = TextRange::collapsed(TextPosition::new(0, 0));
        sink.report(FileId::from_user_index(0), range, Severity::Error, "first".into());
        sink.report(FileId::from_user_index(0), range, Severity::Warning, "second".into());

        let diags = sink.take();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].message, "first");
        assert_eq!(diags[1].severity, Severity::Warning);
    }

    #[test]
    fn errors_order_above_warnings() {
        assert!(Severity::Error > Severity::Warning);
    }
}
