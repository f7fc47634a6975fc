//! Error and diagnostic system for the Novaflow syntax checker.
//!
//! Errors are reported as [`Diagnostic`]s carrying an [`ErrorCode`], a
//! severity, labeled source spans, and optional help text. The parser keeps
//! going after a bad statement, so one [`ParseError`] may hold several
//! diagnostics.
//!
//! # Example
//!
//! ```
//! # use novaflow_parser::error::{Diagnostic, ErrorCode};
//! # use novaflow_parser::Span;
//!
//! let diag = Diagnostic::error("unclosed subgraph `api`")
//!     .with_code(ErrorCode::E102)
//!     .with_label(Span::new(40..52), "opened here")
//!     .with_help("add a matching `end` line");
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod parse_error;
mod severity;

pub(crate) use collector::DiagnosticCollector;

pub use diagnostic::Diagnostic;
pub use error_code::ErrorCode;
pub use label::Label;
pub use parse_error::ParseError;
pub use severity::Severity;
