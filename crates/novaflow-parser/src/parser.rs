//! Flowchart syntax checker.
//!
//! The document is processed one statement at a time. Statements are
//! separated by newlines or `;` outside brackets and quotes. Each statement
//! is either a directive handled here (`subgraph`, `end`, `direction`,
//! styling lines) or a node chain parsed with winnow:
//!
//! ```text
//! chain  := group (link group)*
//! group  := node ('&' node)*
//! node   := id shape? (':::' class)?
//! link   := token ('|' text '|')?  |  '--' text token  |  '==' text token
//! ```
//!
//! A failing statement adds a diagnostic and parsing continues with the next
//! one, so a single pass reports every bad line.

use log::{debug, trace};
use winnow::{
    Parser as _,
    ascii::space0,
    combinator::{alt, cut_err, delimited, opt, preceded, repeat, separated, terminated},
    error::{ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location, Stream},
    token::{literal, take_till, take_until, take_while},
};

use crate::{
    ast::{ArrowHead, Direction, Edge, Flowchart, LinkStyle, Node, NodeShape, Stroke, Subgraph},
    error::{Diagnostic, DiagnosticCollector, ErrorCode, ParseError},
    kind::{DiagramKind, first_significant_line},
    span::Span,
};

/// Detail attached to winnow errors via `.context()`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SyntaxContext {
    code: ErrorCode,
    message: &'static str,
    help: Option<String>,
    /// Statement-relative start of the error span, when known.
    start: Option<usize>,
}

impl SyntaxContext {
    fn unterminated(start: usize, close: &str) -> Self {
        Self {
            code: ErrorCode::E101,
            message: "unterminated label",
            help: Some(format!("close the label with `{close}`")),
            start: Some(start),
        }
    }

    fn missing_target() -> Self {
        Self {
            code: ErrorCode::E100,
            message: "expected a node after the link",
            help: Some("every link needs a node on both ends: `A --> B`".to_string()),
            start: None,
        }
    }
}

type Input<'a> = LocatingSlice<&'a str>;
type PResult<O> = ModalResult<O, ContextError<SyntaxContext>>;

/// Node shape delimiters, longest opener first.
const SHAPES: [(&str, &str, NodeShape); 10] = [
    ("(((", ")))", NodeShape::Circle),
    ("((", "))", NodeShape::Circle),
    ("([", "])", NodeShape::Stadium),
    ("(", ")", NodeShape::Rounded),
    ("[[", "]]", NodeShape::Subroutine),
    ("[(", ")]", NodeShape::Cylinder),
    ("[", "]", NodeShape::Rectangle),
    ("{{", "}}", NodeShape::Hexagon),
    ("{", "}", NodeShape::Diamond),
    (">", "]", NodeShape::Asymmetric),
];

/// Directives that are accepted but have no effect on structure.
const IGNORED_DIRECTIVES: [&str; 7] = [
    "style",
    "classDef",
    "class",
    "linkStyle",
    "click",
    "accTitle",
    "accDescr",
];

/// A node as written in one statement.
#[derive(Debug, Clone, PartialEq)]
struct NodeRef {
    id: String,
    shape: Option<(NodeShape, String)>,
    class: Option<String>,
    span: Span,
}

#[derive(Debug, Clone, PartialEq)]
struct Link {
    style: LinkStyle,
    label: Option<String>,
    span: Span,
}

#[derive(Debug, Clone, PartialEq)]
struct Chain {
    first: Vec<NodeRef>,
    links: Vec<(Link, Vec<NodeRef>)>,
}

fn identifier<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_').parse_next(input)
}

fn quoted<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    delimited((space0, '"'), take_till(0.., '"'), ('"', space0)).parse_next(input)
}

/// Label text up to and including the closing delimiter.
fn shape_label(input: &mut Input<'_>, close: &'static str) -> PResult<String> {
    let text = alt((
        quoted.map(str::to_string),
        take_until(0.., close).map(|text: &str| text.trim().to_string()),
    ))
    .parse_next(input)?;
    literal(close).parse_next(input)?;
    Ok(text)
}

fn node_shape(input: &mut Input<'_>) -> PResult<Option<(NodeShape, String)>> {
    let start = input.current_token_start();
    for (open, close, shape) in SHAPES {
        if opt(literal(open)).parse_next(input)?.is_some() {
            let label = cut_err(|input: &mut Input<'_>| shape_label(input, close))
                .context(SyntaxContext::unterminated(start, close))
                .parse_next(input)?;
            return Ok(Some((shape, label)));
        }
    }
    Ok(None)
}

fn node_ref(input: &mut Input<'_>) -> PResult<NodeRef> {
    let start = input.current_token_start();
    let id = identifier.parse_next(input)?;
    let shape = node_shape(input)?;
    let class = opt(preceded(":::", identifier)).parse_next(input)?;
    let end = input.current_token_start();

    Ok(NodeRef {
        id: id.to_string(),
        shape,
        class: class.map(str::to_string),
        span: Span::new(start..end),
    })
}

fn node_group(input: &mut Input<'_>) -> PResult<Vec<NodeRef>> {
    separated(1.., node_ref, (space0, '&', space0)).parse_next(input)
}

const fn style(stroke: Stroke, head: ArrowHead, bidirectional: bool) -> LinkStyle {
    LinkStyle {
        stroke,
        head,
        bidirectional,
    }
}

fn dashes<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    take_while(2.., '-').parse_next(input)
}

/// A bare link token such as `-->`, `-.->` or `==>`.
fn link_token(input: &mut Input<'_>) -> PResult<LinkStyle> {
    alt((
        ('<', take_while(2.., '-'), '>').value(style(Stroke::Normal, ArrowHead::Arrow, true)),
        ('<', take_while(2.., '='), '>').value(style(Stroke::Thick, ArrowHead::Arrow, true)),
        ('<', '-', take_while(1.., '.'), '-', '>')
            .value(style(Stroke::Dotted, ArrowHead::Arrow, true)),
        ('-', take_while(1.., '.'), '-', '>').value(style(Stroke::Dotted, ArrowHead::Arrow, false)),
        ('-', take_while(1.., '.'), '-').value(style(Stroke::Dotted, ArrowHead::None, false)),
        (take_while(2.., '='), '>').value(style(Stroke::Thick, ArrowHead::Arrow, false)),
        take_while(3.., '=').value(style(Stroke::Thick, ArrowHead::None, false)),
        take_while(3.., '~').value(style(Stroke::Invisible, ArrowHead::None, false)),
        (dashes, '>').value(style(Stroke::Normal, ArrowHead::Arrow, false)),
        (dashes, 'x').value(style(Stroke::Normal, ArrowHead::Cross, false)),
        (dashes, 'o').value(style(Stroke::Normal, ArrowHead::Circle, false)),
        take_while(3.., '-').value(style(Stroke::Normal, ArrowHead::None, false)),
    ))
    .parse_next(input)
}

fn edge_text(text: &str) -> Option<String> {
    let text = text.trim().trim_matches('"').trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Links with inline text: `-- text -->`, `== text ==>`, `-. text .->`.
fn link_with_text(input: &mut Input<'_>) -> PResult<(LinkStyle, Option<String>)> {
    alt((
        preceded("--", (take_until(1.., "--"), link_token))
            .verify(|(text, _): &(&str, LinkStyle)| edge_text(text).is_some())
            .map(|(text, style)| (style, edge_text(text))),
        preceded("==", (take_until(1.., "=="), link_token))
            .verify(|(text, _): &(&str, LinkStyle)| edge_text(text).is_some())
            .map(|(text, style)| (style, edge_text(text))),
        preceded("-.", (terminated(take_until(1.., ".-"), ".-"), opt('>')))
            .verify(|(text, _): &(&str, Option<char>)| edge_text(text).is_some())
            .map(|(text, head)| {
                let head = if head.is_some() {
                    ArrowHead::Arrow
                } else {
                    ArrowHead::None
                };
                (style(Stroke::Dotted, head, false), edge_text(text))
            }),
    ))
    .parse_next(input)
}

fn pipe_label(input: &mut Input<'_>) -> PResult<Option<String>> {
    let start = input.current_token_start();
    preceded(
        '|',
        cut_err(terminated(take_till(0.., '|'), '|'))
            .context(SyntaxContext::unterminated(start, "|")),
    )
    .map(edge_text)
    .parse_next(input)
}

fn link(input: &mut Input<'_>) -> PResult<Link> {
    let ((style, text), range) = alt((link_token.map(|style| (style, None)), link_with_text))
        .with_span()
        .parse_next(input)?;
    let pipe = opt(preceded(space0, pipe_label)).parse_next(input)?;

    Ok(Link {
        style,
        label: pipe.flatten().or(text),
        span: Span::new(range),
    })
}

fn chain(input: &mut Input<'_>) -> PResult<Chain> {
    let first = node_group(input)?;
    let links = repeat(
        0..,
        (
            delimited(space0, link, space0),
            cut_err(node_group).context(SyntaxContext::missing_target()),
        ),
    )
    .parse_next(input)?;

    Ok(Chain { first, links })
}

/// Parse one chain statement, requiring it to consume the whole text.
fn chain_statement(text: &str) -> Result<Chain, Diagnostic> {
    let mut input = LocatingSlice::new(text);
    match chain(&mut input) {
        Ok(parsed) => {
            let _ = space0::<_, ErrMode<ContextError<SyntaxContext>>>(&mut input);
            let position = input.current_token_start();
            let rest = input.finish();
            if rest.is_empty() {
                Ok(parsed)
            } else {
                Err(Diagnostic::error(format!("unexpected `{}`", rest.trim()))
                    .with_code(ErrorCode::E100)
                    .with_label(Span::new(position..text.len()), "not a node or link")
                    .with_help("statements are node chains like `A[Label] --> B`"))
            }
        }
        Err(err) => {
            let position = input.current_token_start();
            Err(convert_err_mode(err, position, text.len()))
        }
    }
}

/// Convert a winnow error into a statement-relative diagnostic.
fn convert_err_mode(
    err: ErrMode<ContextError<SyntaxContext>>,
    error_pos: usize,
    statement_len: usize,
) -> Diagnostic {
    let context_error = match err {
        ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => ctx,
        ErrMode::Incomplete(_) => ContextError::new(),
    };

    if let Some(SyntaxContext {
        code,
        message,
        help,
        start,
    }) = context_error.context().next()
    {
        let start = start.unwrap_or(error_pos);
        let end = statement_len.max(start + 1);
        let mut diag = Diagnostic::error(*message)
            .with_code(*code)
            .with_label(Span::new(start..end), code.description());
        if let Some(help) = help {
            diag = diag.with_help(help.clone());
        }
        return diag;
    }

    let end = statement_len.max(error_pos + 1);
    Diagnostic::error("unexpected input")
        .with_code(ErrorCode::E100)
        .with_label(Span::new(error_pos..end), ErrorCode::E100.description())
        .with_help("statements are node chains like `A[Label] --> B`")
}

/// Split a line into statements at `;` outside brackets and quotes.
///
/// Returns trimmed, non-empty statements with their offset into `line`.
fn split_statements(line: &str) -> Vec<(usize, &str)> {
    let mut statements = Vec::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut start = 0;

    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '[' | '(' | '{' if !in_quotes => depth += 1,
            ']' | ')' | '}' if !in_quotes => depth = depth.saturating_sub(1),
            ';' if !in_quotes && depth == 0 => {
                push_statement(&mut statements, line, start, idx);
                start = idx + 1;
            }
            _ => {}
        }
    }
    push_statement(&mut statements, line, start, line.len());
    statements
}

fn push_statement<'a>(statements: &mut Vec<(usize, &'a str)>, line: &'a str, start: usize, end: usize) {
    let piece = &line[start..end];
    let trimmed = piece.trim_start();
    let leading = piece.len() - trimmed.len();
    let trimmed = trimmed.trim_end();
    if !trimmed.is_empty() {
        statements.push((start + leading, trimmed));
    }
}

fn first_word(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    }
}

/// Accumulates the flowchart while statements are processed.
struct FlowchartBuilder {
    chart: Flowchart,
    open: Vec<Subgraph>,
    diagnostics: DiagnosticCollector,
    anonymous_subgraphs: usize,
}

impl FlowchartBuilder {
    fn new() -> Self {
        Self {
            chart: Flowchart::default(),
            open: Vec::new(),
            diagnostics: DiagnosticCollector::new(),
            anonymous_subgraphs: 0,
        }
    }

    fn header(&mut self, text: &str, offset: usize) {
        let mut words = text.split_whitespace();
        let keyword = words.next().unwrap_or_default();

        match DiagramKind::from_header(keyword) {
            Some(DiagramKind::Flowchart) => {}
            Some(kind) => {
                self.diagnostics.emit(
                    Diagnostic::error(format!("unsupported diagram type `{kind}`"))
                        .with_code(ErrorCode::E003)
                        .with_label(Span::new(offset..offset + keyword.len()), "declared here")
                        .with_help("only `graph` and `flowchart` diagrams can be rendered"),
                );
                return;
            }
            None => {
                self.diagnostics.emit(
                    Diagnostic::error(format!("unknown diagram type `{keyword}`"))
                        .with_code(ErrorCode::E002)
                        .with_label(
                            Span::new(offset..offset + keyword.len()),
                            ErrorCode::E002.description(),
                        )
                        .with_help("start the diagram with `graph TD` or `flowchart LR`"),
                );
                return;
            }
        }

        let Some(token) = words.next() else {
            return;
        };
        let token_offset = offset + text.find(token).unwrap_or_default();
        match Direction::from_token(token) {
            Some(direction) => self.chart.direction = direction,
            None => self.diagnostics.emit(
                Diagnostic::error(format!("invalid direction `{token}`"))
                    .with_code(ErrorCode::E004)
                    .with_label(
                        Span::new(token_offset..token_offset + token.len()),
                        ErrorCode::E004.description(),
                    )
                    .with_help("use one of `TB`, `TD`, `BT`, `RL` or `LR`"),
            ),
        }

        if let Some(extra) = words.next() {
            let extra_offset = offset + text.rfind(extra).unwrap_or_default();
            self.diagnostics.emit(
                Diagnostic::error(format!("unexpected `{extra}` after the diagram declaration"))
                    .with_code(ErrorCode::E100)
                    .with_label(Span::new(extra_offset..offset + text.len()), "unexpected input")
                    .with_help("put statements on their own line or after `;`"),
            );
        }
    }

    fn statement(&mut self, text: &str, offset: usize) {
        let span = Span::new(offset..offset + text.len());
        let (keyword, rest) = first_word(text);

        match keyword {
            "subgraph" => self.open_subgraph(rest, span),
            "end" if rest.is_empty() => self.close_subgraph(span),
            "direction" => self.direction(rest, span),
            directive if IGNORED_DIRECTIVES.contains(&directive) && !rest.is_empty() => {
                trace!(directive; "Ignoring styling directive");
                self.diagnostics.emit(
                    Diagnostic::warning(format!("`{directive}` has no effect on the layout"))
                        .with_label(Span::new(offset..offset + directive.len()), "ignored")
                        .with_help("styling and interaction directives are not rendered"),
                );
            }
            _ => match chain_statement(text) {
                Ok(chain) => self.apply_chain(chain, offset),
                Err(diagnostic) => self.diagnostics.emit(diagnostic.offset_labels(offset)),
            },
        }
    }

    fn open_subgraph(&mut self, rest: &str, span: Span) {
        let (id, title) = if rest.is_empty() {
            self.anonymous_subgraphs += 1;
            let id = format!("subgraph{}", self.anonymous_subgraphs);
            (id.clone(), id)
        } else if let Some((id, title)) = split_id_title(rest) {
            (id.to_string(), title.to_string())
        } else {
            let title = rest.trim_matches('"').trim();
            (title.to_string(), title.to_string())
        };

        debug!(id = id.as_str(); "Opening subgraph");
        self.open.push(Subgraph {
            id,
            title,
            direction: None,
            nodes: Vec::new(),
            span,
        });
    }

    fn close_subgraph(&mut self, span: Span) {
        match self.open.pop() {
            Some(subgraph) => self.chart.subgraphs.push(subgraph),
            None => self.diagnostics.emit(
                Diagnostic::error("`end` without a matching `subgraph`")
                    .with_code(ErrorCode::E103)
                    .with_label(span, ErrorCode::E103.description())
                    .with_help("remove this line or open a block with `subgraph`"),
            ),
        }
    }

    fn direction(&mut self, token: &str, span: Span) {
        match Direction::from_token(token) {
            Some(direction) => {
                if let Some(subgraph) = self.open.last_mut() {
                    subgraph.direction = Some(direction);
                }
            }
            None => self.diagnostics.emit(
                Diagnostic::error(format!("invalid direction `{token}`"))
                    .with_code(ErrorCode::E004)
                    .with_label(span, ErrorCode::E004.description())
                    .with_help("use one of `TB`, `TD`, `BT`, `RL` or `LR`"),
            ),
        }
    }

    fn register(&mut self, node: NodeRef, offset: usize) -> String {
        let span = node.span.offset(offset);
        let is_new = !self.chart.nodes.contains_key(&node.id);
        let entry = self
            .chart
            .nodes
            .entry(node.id.clone())
            .or_insert_with(|| Node::bare(node.id.clone(), span));

        if let Some((shape, label)) = node.shape {
            entry.shape = shape;
            if !label.is_empty() {
                entry.label = label;
            }
        }
        if let Some(class) = node.class {
            entry.classes.push(class);
        }

        if is_new {
            if let Some(subgraph) = self.open.last_mut() {
                subgraph.nodes.push(node.id.clone());
            }
        }
        node.id
    }

    fn apply_chain(&mut self, chain: Chain, offset: usize) {
        let mut sources: Vec<String> = chain
            .first
            .into_iter()
            .map(|node| self.register(node, offset))
            .collect();

        for (link, targets) in chain.links {
            let targets: Vec<String> = targets
                .into_iter()
                .map(|node| self.register(node, offset))
                .collect();

            for from in &sources {
                for to in &targets {
                    self.chart.edges.push(Edge {
                        from: from.clone(),
                        to: to.clone(),
                        label: link.label.clone(),
                        style: link.style,
                        span: link.span.offset(offset),
                    });
                }
            }
            sources = targets;
        }
    }

    fn finish(mut self, source_len: usize) -> Result<Flowchart, ParseError> {
        while let Some(subgraph) = self.open.pop() {
            self.diagnostics.emit(
                Diagnostic::error(format!("unclosed subgraph `{}`", subgraph.id))
                    .with_code(ErrorCode::E102)
                    .with_label(subgraph.span, "opened here")
                    .with_secondary_label(
                        Span::new(source_len..source_len),
                        "document ends here",
                    )
                    .with_help("add a matching `end` line"),
            );
        }

        let warnings = self.diagnostics.finish()?;
        for warning in warnings {
            debug!(warning = warning.to_string(); "Syntax warning");
        }
        Ok(self.chart)
    }
}

/// Split `id[Title]` or a bare `id` into its parts.
fn split_id_title(text: &str) -> Option<(&str, &str)> {
    let id_len = text
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    if id_len == 0 {
        return None;
    }

    let (id, rest) = text.split_at(id_len);
    let rest = rest.trim();
    if rest.is_empty() {
        return Some((id, id));
    }

    let title = rest.strip_prefix('[')?.strip_suffix(']')?;
    Some((id, title.trim().trim_matches('"')))
}

/// Parse a flowchart document.
///
/// # Errors
///
/// Returns a [`ParseError`] holding one diagnostic per bad statement, plus
/// one per unclosed subgraph.
pub fn parse_flowchart(source: &str) -> Result<Flowchart, ParseError> {
    let Some((header_offset, _)) = first_significant_line(source) else {
        return Err(Diagnostic::error("the document is empty")
            .with_code(ErrorCode::E001)
            .with_label(Span::new(0..source.len()), ErrorCode::E001.description())
            .with_help("start the diagram with `graph TD` or `flowchart LR`")
            .into());
    };

    let mut builder = FlowchartBuilder::new();
    let mut seen_header = false;
    let mut offset = 0;

    for raw_line in source.split_inclusive('\n') {
        let line_start = offset;
        offset += raw_line.len();

        let line = raw_line.trim_end_matches(['\n', '\r']);
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with("%%") {
            continue;
        }

        for (statement_offset, statement) in split_statements(line) {
            let absolute = line_start + statement_offset;
            if !seen_header {
                debug_assert!(absolute >= header_offset);
                seen_header = true;
                builder.header(statement, absolute);
                if builder.diagnostics.has_errors() {
                    // Without a flowchart header the statements have no grammar.
                    return builder.finish(source.len());
                }
            } else {
                builder.statement(statement, absolute);
            }
        }
    }

    if !seen_header {
        builder.diagnostics.emit(
            Diagnostic::error("the document has no diagram declaration")
                .with_code(ErrorCode::E001)
                .with_label(Span::new(0..source.len()), ErrorCode::E001.description())
                .with_help("start the diagram with `graph TD` or `flowchart LR`"),
        );
    }

    builder.finish(source.len())
}
