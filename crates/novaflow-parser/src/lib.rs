//! # Novaflow Parser
//!
//! Syntax checker for the flowchart dialect rendered by Novaflow's built-in
//! engine. The checker detects the diagram kind, parses flowchart statements
//! into a [`Flowchart`](ast::Flowchart), and reports problems as rich
//! [`Diagnostic`](error::Diagnostic)s with error codes and source spans.
//!
//! ## Usage
//!
//! ```
//! # use novaflow_parser::{parse, error::ParseError};
//!
//! fn main() -> Result<(), ParseError> {
//!     let chart = parse("graph LR\n    A[Start] --> B{Ready?}\n    B -->|yes| C")?;
//!     assert_eq!(chart.nodes.len(), 3);
//!     assert_eq!(chart.edges.len(), 2);
//!     Ok(())
//! }
//! ```

pub mod ast;
pub mod error;
mod kind;
mod parser;
mod span;

pub use kind::DiagramKind;
pub use span::Span;

use log::debug;

use ast::Flowchart;
use error::{Diagnostic, ErrorCode, ParseError};

/// Parse markup into a flowchart.
///
/// # Errors
///
/// Returns a [`ParseError`] when the markup is empty, is not a flowchart, or
/// contains statements that do not parse.
pub fn parse(source: &str) -> Result<Flowchart, ParseError> {
    let chart = parser::parse_flowchart(source)?;
    debug!(
        nodes = chart.nodes.len(),
        edges = chart.edges.len(),
        subgraphs = chart.subgraphs.len();
        "Parsed flowchart"
    );
    Ok(chart)
}

/// Check that markup is syntactically acceptable without keeping the tree.
///
/// Returns the detected diagram kind on success.
///
/// # Errors
///
/// Returns a [`ParseError`] for unknown or unsupported diagram kinds and for
/// any syntax error in a flowchart.
pub fn check_syntax(source: &str) -> Result<DiagramKind, ParseError> {
    match DiagramKind::detect(source) {
        Some(DiagramKind::Flowchart) => parse(source).map(|_| DiagramKind::Flowchart),
        Some(kind) => {
            let (offset, line) = kind::first_significant_line(source).unwrap_or((0, ""));
            let keyword_len = line.split_whitespace().next().map_or(0, str::len);
            Err(Diagnostic::error(format!("unsupported diagram type `{kind}`"))
                .with_code(ErrorCode::E003)
                .with_label(Span::new(offset..offset + keyword_len), "declared here")
                .with_help("only `graph` and `flowchart` diagrams can be rendered")
                .into())
        }
        // The flowchart parser reports empty and unknown documents.
        None => parse(source).map(|_| DiagramKind::Flowchart),
    }
}
