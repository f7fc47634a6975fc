//! Error types for Novaflow operations.
//!
//! [`RenderError`] is what a render host displays when a session fails.
//! [`NovaflowError`] wraps everything that can go wrong in a one-shot
//! pipeline run, such as the CLI's.

use std::io;

use thiserror::Error;

use novaflow_parser::error::ParseError;

/// A recoverable failure surfaced to the render host.
///
/// The display strings are shown to users verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The markup did not pass the engine's syntax check.
    #[error("Invalid syntax: {0}")]
    Parse(String),

    /// The engine failed to produce a usable graphic.
    #[error("Failed to render chart: {0}")]
    Render(String),
}

impl RenderError {
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}

/// The main error type for Novaflow operations.
///
/// # Diagnostic Variants
///
/// The `Parse` variant keeps the source the diagnostics point into, so
/// callers can render source snippets for each error.
#[derive(Debug, Error)]
pub enum NovaflowError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{err}")]
    Parse { err: ParseError, src: String },

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input error: {0}")]
    Input(String),
}

impl NovaflowError {
    /// Create a new `Parse` error with the associated source code.
    pub fn new_parse_error(err: ParseError, src: impl Into<String>) -> Self {
        Self::Parse {
            err,
            src: src.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_messages() {
        assert_eq!(
            RenderError::Parse("unexpected `]`".to_string()).to_string(),
            "Invalid syntax: unexpected `]`"
        );
        assert_eq!(
            RenderError::Render("empty output".to_string()).to_string(),
            "Failed to render chart: empty output"
        );
        assert!(RenderError::Parse(String::new()).is_parse());
        assert!(!RenderError::Render(String::new()).is_parse());
    }

    #[test]
    fn test_render_error_is_transparent() {
        let err = NovaflowError::from(RenderError::Render("boom".to_string()));
        assert_eq!(err.to_string(), "Failed to render chart: boom");
    }
}
