//! Diagram kind detection.
//!
//! The kind is decided by the first significant line of the markup. Blank
//! lines, `%%` comments and `%%{init: ...}%%` directives are skipped.

use std::fmt;

/// Every diagram family the detector recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramKind {
    Flowchart,
    Sequence,
    Class,
    State,
    Gantt,
    Er,
    Mindmap,
    Pie,
    Journey,
    Timeline,
    GitGraph,
}

impl DiagramKind {
    /// Detect the kind from the markup's first significant line.
    ///
    /// Returns `None` when the markup is empty or the header is not a known
    /// diagram declaration.
    pub fn detect(source: &str) -> Option<Self> {
        let (_, line) = first_significant_line(source)?;
        Self::from_header(line)
    }

    /// Classify a single header line.
    pub fn from_header(line: &str) -> Option<Self> {
        let keyword = line
            .split(|c: char| c.is_whitespace() || c == ';')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        let kind = match keyword.as_str() {
            "graph" | "flowchart" | "flowchart-elk" => Self::Flowchart,
            "sequencediagram" => Self::Sequence,
            "classdiagram" | "classdiagram-v2" => Self::Class,
            "statediagram" | "statediagram-v2" => Self::State,
            "gantt" => Self::Gantt,
            "erdiagram" => Self::Er,
            "mindmap" => Self::Mindmap,
            "pie" => Self::Pie,
            "journey" => Self::Journey,
            "timeline" => Self::Timeline,
            "gitgraph" => Self::GitGraph,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flowchart => "flowchart",
            Self::Sequence => "sequence",
            Self::Class => "class",
            Self::State => "state",
            Self::Gantt => "gantt",
            Self::Er => "er",
            Self::Mindmap => "mindmap",
            Self::Pie => "pie",
            Self::Journey => "journey",
            Self::Timeline => "timeline",
            Self::GitGraph => "gitgraph",
        }
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the byte offset and trimmed text of the first line that is not
/// blank, a comment, or an init directive.
pub(crate) fn first_significant_line(source: &str) -> Option<(usize, &str)> {
    let mut offset = 0;
    for raw_line in source.split_inclusive('\n') {
        let line_start = offset;
        offset += raw_line.len();

        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with("%%") {
            continue;
        }
        let leading = raw_line.len() - raw_line.trim_start().len();
        return Some((line_start + leading, trimmed));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_flowchart_headers() {
        assert_eq!(DiagramKind::detect("graph TD\nA-->B"), Some(DiagramKind::Flowchart));
        assert_eq!(DiagramKind::detect("flowchart LR"), Some(DiagramKind::Flowchart));
        assert_eq!(DiagramKind::detect("graph"), Some(DiagramKind::Flowchart));
        assert_eq!(DiagramKind::detect("graph;A-->B"), Some(DiagramKind::Flowchart));
    }

    #[test]
    fn test_detect_skips_comments_and_directives() {
        let source = "\n%% generated\n%%{init: {'theme': 'dark'}}%%\n  sequenceDiagram\n";
        assert_eq!(DiagramKind::detect(source), Some(DiagramKind::Sequence));
    }

    #[test]
    fn test_detect_other_kinds() {
        assert_eq!(DiagramKind::detect("gantt\ntitle Plan"), Some(DiagramKind::Gantt));
        assert_eq!(DiagramKind::detect("erDiagram"), Some(DiagramKind::Er));
        assert_eq!(DiagramKind::detect("stateDiagram-v2"), Some(DiagramKind::State));
        assert_eq!(DiagramKind::detect("gitGraph"), Some(DiagramKind::GitGraph));
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(DiagramKind::detect(""), None);
        assert_eq!(DiagramKind::detect("%% only a comment"), None);
        assert_eq!(DiagramKind::detect("grahp TD"), None);
    }

    #[test]
    fn test_first_significant_line_offset() {
        let source = "\n  %% c\n   graph TD\n";
        let (offset, line) = first_significant_line(source).unwrap();
        assert_eq!(line, "graph TD");
        assert_eq!(&source[offset..offset + 5], "graph");
    }
}
