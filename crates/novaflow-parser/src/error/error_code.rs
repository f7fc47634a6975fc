//! Error codes for the Novaflow diagnostic system.
//!
//! Error codes are organized by phase:
//! - `E0xx` - Document errors (header and diagram kind)
//! - `E1xx` - Statement errors

use std::fmt;

/// Error codes for categorizing diagnostic errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Document Errors (E0xx)
    // =========================================================================
    /// Empty document.
    ///
    /// The markup contains nothing but whitespace and comments.
    E001,

    /// Unknown diagram type.
    ///
    /// The first statement is not a recognized diagram declaration.
    E002,

    /// Unsupported diagram type.
    ///
    /// The diagram type is recognized but cannot be checked or rendered.
    E003,

    /// Invalid direction.
    ///
    /// The direction after `graph` or `flowchart` is not one of
    /// `TB`, `TD`, `BT`, `RL` or `LR`.
    E004,

    // =========================================================================
    // Statement Errors (E1xx)
    // =========================================================================
    /// Unexpected input.
    ///
    /// The statement does not match any node, link, or directive form.
    E100,

    /// Unterminated label.
    ///
    /// A node shape or edge label was opened but never closed.
    E101,

    /// Unclosed subgraph.
    ///
    /// A `subgraph` block has no matching `end`.
    E102,

    /// Unexpected `end`.
    ///
    /// An `end` line appears outside of any `subgraph` block.
    E103,
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E003 => "E003",
            ErrorCode::E004 => "E004",
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E102 => "E102",
            ErrorCode::E103 => "E103",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "empty document",
            ErrorCode::E002 => "unknown diagram type",
            ErrorCode::E003 => "unsupported diagram type",
            ErrorCode::E004 => "invalid direction",
            ErrorCode::E100 => "unexpected input",
            ErrorCode::E101 => "unterminated label",
            ErrorCode::E102 => "unclosed subgraph",
            ErrorCode::E103 => "unexpected `end`",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
