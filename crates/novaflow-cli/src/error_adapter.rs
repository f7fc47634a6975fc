//! Miette reports for [`NovaflowError`].
//!
//! A parse error becomes one report per parser diagnostic, each pointing
//! into the sanitized markup. Every other error becomes a single plain
//! report with a `novaflow::*` code.

use std::{error::Error, fmt};

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, Severity, SourceCode, SourceSpan};

use novaflow::NovaflowError;
use novaflow_parser::{Span, error::Diagnostic};

/// One renderable report.
#[derive(Debug)]
pub enum Reportable<'a> {
    /// A parser diagnostic and the markup its spans index into.
    Diagnostic { diag: &'a Diagnostic, src: &'a str },
    /// An error without source locations.
    Error(&'a NovaflowError),
}

/// Split `err` into the reports to print, in order.
pub fn to_reportables(err: &NovaflowError) -> Vec<Reportable<'_>> {
    let NovaflowError::Parse { err: parse_err, src } = err else {
        return vec![Reportable::Error(err)];
    };

    parse_err
        .diagnostics()
        .iter()
        .map(|diag| Reportable::Diagnostic { diag, src })
        .collect()
}

fn plain_code(err: &NovaflowError) -> Option<&'static str> {
    match err {
        NovaflowError::Io(_) => Some("novaflow::io"),
        NovaflowError::Parse { .. } => None,
        NovaflowError::Render(_) => Some("novaflow::render"),
        NovaflowError::Config(_) => Some("novaflow::config"),
        NovaflowError::Input(_) => Some("novaflow::input"),
    }
}

fn to_source_span(span: Span) -> SourceSpan {
    SourceSpan::new(span.start().into(), span.len())
}

impl fmt::Display for Reportable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Diagnostic { diag, .. } => f.write_str(diag.message()),
            Self::Error(err) => write!(f, "{err}"),
        }
    }
}

impl Error for Reportable<'_> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Diagnostic { .. } => None,
            Self::Error(err) => err.source(),
        }
    }
}

impl MietteDiagnostic for Reportable<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Self::Diagnostic { diag, .. } => diag
                .code()
                .map(|code| Box::new(code) as Box<dyn fmt::Display + 'a>),
            Self::Error(err) => {
                plain_code(err).map(|code| Box::new(code) as Box<dyn fmt::Display + 'a>)
            }
        }
    }

    fn severity(&self) -> Option<Severity> {
        match self {
            Self::Diagnostic { diag, .. } if diag.severity().is_warning() => {
                Some(Severity::Warning)
            }
            _ => Some(Severity::Error),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Self::Diagnostic { diag, .. } => diag
                .help()
                .map(|help| Box::new(help) as Box<dyn fmt::Display + 'a>),
            Self::Error(NovaflowError::Render(_)) => Some(Box::new("edit the markup and run again")),
            Self::Error(_) => None,
        }
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        match self {
            Self::Diagnostic { src, .. } => Some(src as &dyn SourceCode),
            Self::Error(_) => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let Self::Diagnostic { diag, .. } = self else {
            return None;
        };
        if diag.labels().is_empty() {
            return None;
        }

        Some(Box::new(diag.labels().iter().map(|label| {
            let text = Some(label.message().to_string());
            let span = to_source_span(label.span());
            if label.is_primary() {
                LabeledSpan::new_primary_with_span(text, span)
            } else {
                LabeledSpan::new_with_span(text, span)
            }
        })))
    }
}

#[cfg(test)]
mod tests {
    use novaflow::RenderError;
    use novaflow_parser::error::{ErrorCode, ParseError};

    use super::*;

    #[test]
    fn test_one_report_per_diagnostic() {
        let diags = vec![
            Diagnostic::error("unterminated label")
                .with_code(ErrorCode::E101)
                .with_label(Span::new(13..14), "opened here"),
            Diagnostic::error("unexpected `end`")
                .with_code(ErrorCode::E103)
                .with_label(Span::new(20..23), "no open subgraph")
                .with_help("remove this line"),
        ];
        let err =
            NovaflowError::new_parse_error(ParseError::from(diags), "graph TD\n    A[x\n   end");

        let reports = to_reportables(&err);

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].to_string(), "unterminated label");
        assert_eq!(
            reports[0].code().map(|c| c.to_string()).as_deref(),
            Some("E101")
        );
        assert!(reports[0].source_code().is_some());
        assert_eq!(
            reports[1].help().map(|h| h.to_string()).as_deref(),
            Some("remove this line")
        );
    }

    #[test]
    fn test_secondary_labels() {
        let diag = Diagnostic::warning("ignored statement")
            .with_label(Span::new(0..5), "primary")
            .with_secondary_label(Span::new(6..8), "secondary");
        let report = Reportable::Diagnostic {
            diag: &diag,
            src: "graph TD",
        };

        assert_eq!(report.severity(), Some(Severity::Warning));

        let labels: Vec<_> = report.labels().unwrap().collect();
        assert_eq!(labels.len(), 2);
        assert!(labels[0].primary());
        assert_eq!(labels[1].label(), Some("secondary"));
        assert!(!labels[1].primary());
    }

    #[test]
    fn test_render_error_is_plain() {
        let err = NovaflowError::from(RenderError::Render("no output".to_string()));

        let reports = to_reportables(&err);
        assert_eq!(reports.len(), 1);
        assert!(matches!(reports[0], Reportable::Error(_)));
        assert_eq!(reports[0].to_string(), "Failed to render chart: no output");
        assert_eq!(
            reports[0].code().map(|c| c.to_string()).as_deref(),
            Some("novaflow::render")
        );
        assert!(reports[0].labels().is_none());
    }
}
