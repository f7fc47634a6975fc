//! Best-effort repair of generated diagram markup.
//!
//! Language models routinely wrap diagram source in Markdown code fences and
//! emit a handful of recurring syntax slips. [`sanitize`] strips the fences,
//! trims the text, and then runs an ordered catalog of [`RewriteRule`]s over
//! it. Each rule is a named regular expression with a replacement, so the
//! catalog can be tested rule by rule and extended as new malformed patterns
//! show up.
//!
//! Sanitization never fails. It also never guarantees valid output: the rules
//! only repair patterns that are known to occur.
//!
//! # Example
//!
//! ```
//! # use novaflow_core::sanitize::sanitize;
//! let cleaned = sanitize("```mermaid\ngraph LR\n    title Plan\n    A-->B\n```");
//! assert_eq!(cleaned, "graph LR\n    A --> B");
//! ```

use std::{borrow::Cow, sync::LazyLock};

use log::{trace, warn};
use regex::Regex;

use crate::markup::SanitizedMarkup;

/// Upper bound on rewrite passes before giving up on reaching a fixed point.
const MAX_PASSES: usize = 16;

static LEADING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```\w*\n?").expect("leading fence pattern is valid"));

static TRAILING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n?```$").expect("trailing fence pattern is valid"));

static RULES: LazyLock<Vec<RewriteRule>> = LazyLock::new(|| {
    vec![
        // Some grammars reject a title directly under the graph declaration.
        RewriteRule::new(
            "title-after-declaration",
            r"(?m)^((?:graph|flowchart)[ \t]+\w+)[ \t]*\n[ \t]*title[ \t][^\n]*$",
            "${1}",
        ),
        // Flowcharts have no title statement at all.
        RewriteRule::new(
            "stray-title",
            r"(?m)^[ \t]*title[ \t][^\n]*(?:\n|\z)",
            "",
        ),
        // `graph LR_Start[Go]` is a declaration glued to its first node.
        RewriteRule::new(
            "direction-join",
            r"(?m)^(graph|flowchart)[ \t]+(TB|TD|BT|RL|LR)_([A-Za-z0-9_]+)",
            "${1} ${2}\n    ${3}",
        ),
        // `Start_Process[Label]` becomes `Start[Process Label]`.
        RewriteRule::new(
            "identifier-label-underscore",
            r"([A-Za-z0-9]+)_([A-Za-z0-9_]+)\[",
            "${1}[${2} ",
        ),
        // `--->`, `-->--^` and unspaced arrows collapse to ` --> `.
        // Bidirectional `<-->` and sequence `-->>` are left alone. The
        // character after the arrow is captured and written back.
        RewriteRule::new(
            "arrow-spacing",
            r"(?m)(^|[^<\-\s]|\b)[ \t]*-{2,}>(?:[ \t]*-+\^?)?[ \t]*([^>\s]|$)",
            "${1} --> ${2}",
        ),
        RewriteRule::new(
            "standalone-node-indent",
            r"(?m)^[ \t]*([A-Za-z0-9]+)\[([^\]\n]+)\][ \t]*$",
            "    ${1}[${2}]",
        ),
        RewriteRule::new(
            "standalone-connection-indent",
            r"(?m)^[ \t]*([A-Za-z0-9]+)[ \t]*-->[ \t]*([A-Za-z0-9]+)[ \t]*$",
            "    ${1} --> ${2}",
        ),
        // Keep at most one blank line between statements.
        RewriteRule::new("blank-line-collapse", r"\n(?:[ \t]*\n){2,}", "\n\n"),
    ]
});

/// A single find-and-replace repair applied over the whole markup.
#[derive(Debug)]
pub struct RewriteRule {
    name: &'static str,
    regex: Regex,
    replacement: &'static str,
}

impl RewriteRule {
    fn new(name: &'static str, pattern: &str, replacement: &'static str) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).expect("rewrite rule pattern is valid"),
            replacement,
        }
    }

    /// Name used in logs and to look the rule up with [`rule`].
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The regular expression this rule matches.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Apply the rule to every match in `text`.
    ///
    /// Returns [`Cow::Borrowed`] when nothing matched.
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        self.regex.replace_all(text, self.replacement)
    }
}

/// The ordered rule catalog. Later rules rely on the normalization done by
/// earlier ones.
pub fn rules() -> &'static [RewriteRule] {
    &RULES
}

/// Look up a rule by name.
pub fn rule(name: &str) -> Option<&'static RewriteRule> {
    rules().iter().find(|rule| rule.name == name)
}

/// Strip surrounding code fences and whitespace.
///
/// A leading fence is three backticks, an optional language tag, and an
/// optional newline. A trailing fence is an optional newline followed by
/// three backticks. Fences are stripped repeatedly, so nested wrappers are
/// removed as well.
pub fn strip_fences(text: &str) -> &str {
    let mut current = text.trim();
    loop {
        let without_leading = LEADING_FENCE
            .find(current)
            .map_or(current, |m| &current[m.end()..]);
        let without_trailing = TRAILING_FENCE
            .find(without_leading)
            .map_or(without_leading, |m| &without_leading[..m.start()]);
        let next = without_trailing.trim();

        if next.len() == current.len() {
            return current;
        }
        current = next;
    }
}

/// Clean raw diagram markup.
///
/// Fence stripping and the rule catalog are re-applied until the text stops
/// changing, which makes the function idempotent:
/// `sanitize(sanitize(x)) == sanitize(x)`.
///
/// Returns an empty [`SanitizedMarkup`] when there is nothing left to render.
pub fn sanitize(raw: &str) -> SanitizedMarkup {
    let mut current = sanitize_pass(raw);

    let mut converged = false;
    for _ in 1..MAX_PASSES {
        let next = sanitize_pass(&current);
        if next == current {
            converged = true;
            break;
        }
        current = next;
    }

    if !converged {
        warn!(passes = MAX_PASSES; "Markup rewrites did not settle; using last pass");
    }

    trace!(raw, cleaned = current.as_str(); "Sanitized markup");

    SanitizedMarkup::new(current)
}

fn sanitize_pass(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    let stripped = strip_fences(&normalized);
    if stripped.is_empty() {
        return String::new();
    }

    let mut cleaned = stripped.to_string();
    for rule in rules() {
        if let Cow::Owned(rewritten) = rule.apply(&cleaned) {
            trace!(rule = rule.name; "Rewrite rule matched");
            cleaned = rewritten;
        }
    }

    cleaned.trim().to_string()
}
