//! Collector for accumulating diagnostics while checking a document.

use crate::error::{Diagnostic, ParseError};

/// Accumulates diagnostics so one pass over a document reports every bad
/// line, not just the first.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity().is_error())
    }

    /// Warnings alone do not fail the document; they are handed back.
    /// A failing document lists its errors before its warnings.
    pub fn finish(mut self) -> Result<Vec<Diagnostic>, ParseError> {
        if self.has_errors() {
            self.diagnostics
                .sort_by_key(|diagnostic| diagnostic.severity().is_warning());
            return Err(self.diagnostics.into());
        }
        Ok(self.diagnostics)
    }
}
