//! Rendered graphics and the containers that display them.
//!
//! A rendering engine produces SVG text. [`SvgGraphic::from_markup`] turns
//! that text into a [`GraphicHandle`]: it locates the root `<svg>` element,
//! records its intrinsic size, and rewrites the root style so the graphic
//! scales to fit whatever container it is attached to.

use std::{collections::BTreeMap, fmt, sync::LazyLock};

use log::debug;
use regex::Regex;
use thiserror::Error;

use crate::geometry::Size;

/// Size used when the root element declares neither dimensions nor a viewBox.
pub const DEFAULT_SIZE: Size = Size::new(800.0, 600.0);

/// Style applied to every root `<svg>` element.
pub const RESPONSIVE_STYLE: &str =
    "max-width: 100%; height: auto; display: block; margin: 0 auto; background-color: transparent;";

static ROOT_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<svg\b([^>]*?)(/?)>").expect("root tag pattern is valid")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("attribute pattern is valid")
});

/// A display surface owned by the host application.
///
/// Containers are cleared at the start of every render session, so at most
/// one graphic is attached at a time.
pub trait Container: Send {
    /// Remove everything currently displayed.
    fn clear(&mut self);

    /// Append rendered content under the given element id.
    fn append(&mut self, element_id: &str, content: &str);

    fn is_empty(&self) -> bool;
}

/// Handle to a successfully rendered diagram.
pub trait GraphicHandle: fmt::Debug + Send + Sync {
    /// Unique id of the rendered element.
    fn element_id(&self) -> &str;

    /// Append the graphic to `container`.
    fn attach_to(&self, container: &mut dyn Container);

    /// Size the graphic declares for itself, before any scaling.
    fn intrinsic_size(&self) -> Size;

    /// Standalone serialization suitable for export.
    fn serialize(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphicError {
    #[error("Failed to generate SVG from chart code")]
    EmptyOutput,

    #[error("SVG element not found after rendering")]
    MissingRoot,
}

/// An SVG document with a normalized root element.
#[derive(Debug, Clone)]
pub struct SvgGraphic {
    element_id: String,
    markup: String,
    size: Size,
}

impl SvgGraphic {
    /// Wrap engine output, normalizing the root `<svg>` element.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicError::EmptyOutput`] when the engine produced no text
    /// and [`GraphicError::MissingRoot`] when there is no `<svg>` element.
    pub fn from_markup(element_id: impl Into<String>, markup: &str) -> Result<Self, GraphicError> {
        let element_id = element_id.into();
        if markup.trim().is_empty() {
            return Err(GraphicError::EmptyOutput);
        }

        let captures = ROOT_TAG.captures(markup).ok_or(GraphicError::MissingRoot)?;
        let root = captures.get(0).ok_or(GraphicError::MissingRoot)?;
        let self_closing = captures.get(2).is_some_and(|m| !m.as_str().is_empty());

        let mut attributes = parse_attributes(captures.get(1).map_or("", |m| m.as_str()));
        let size = intrinsic_size(&attributes);

        attributes.insert("style".to_string(), RESPONSIVE_STYLE.to_string());
        attributes
            .entry("id".to_string())
            .or_insert_with(|| element_id.clone());

        let mut normalized = String::with_capacity(markup.len() + RESPONSIVE_STYLE.len());
        normalized.push_str(&markup[..root.start()]);
        normalized.push_str(&build_root_tag(&attributes, self_closing));
        normalized.push_str(&markup[root.end()..]);

        debug!(
            element_id = element_id.as_str(),
            width = size.width(),
            height = size.height();
            "Normalized SVG root element"
        );

        Ok(Self {
            element_id,
            markup: normalized,
            size,
        })
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }
}

impl GraphicHandle for SvgGraphic {
    fn element_id(&self) -> &str {
        &self.element_id
    }

    fn attach_to(&self, container: &mut dyn Container) {
        container.append(&self.element_id, &self.markup);
    }

    fn intrinsic_size(&self) -> Size {
        self.size
    }

    fn serialize(&self) -> String {
        self.markup.clone()
    }
}

fn parse_attributes(source: &str) -> BTreeMap<String, String> {
    ATTRIBUTE
        .captures_iter(source)
        .filter_map(|captures| {
            let name = captures.get(1)?.as_str().to_string();
            let value = captures.get(2).or_else(|| captures.get(3))?;
            Some((name, value.as_str().to_string()))
        })
        .collect()
}

fn build_root_tag(attributes: &BTreeMap<String, String>, self_closing: bool) -> String {
    let mut tag = String::from("<svg");
    for (name, value) in attributes {
        tag.push(' ');
        tag.push_str(name);
        tag.push_str("=\"");
        tag.push_str(&value.replace('"', "&quot;"));
        tag.push('"');
    }
    tag.push_str(if self_closing { "/>" } else { ">" });
    tag
}

/// Dimensions come from `width`/`height`, then the `viewBox`, then
/// [`DEFAULT_SIZE`].
fn intrinsic_size(attributes: &BTreeMap<String, String>) -> Size {
    let width = attributes.get("width").and_then(|v| parse_length(v));
    let height = attributes.get("height").and_then(|v| parse_length(v));
    if let (Some(width), Some(height)) = (width, height) {
        return Size::new(width, height);
    }

    if let Some(size) = attributes.get("viewBox").and_then(|v| parse_view_box(v)) {
        return size;
    }

    DEFAULT_SIZE
}

fn parse_length(value: &str) -> Option<f32> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    number
        .parse::<f32>()
        .ok()
        .filter(|n| n.is_finite() && *n > 0.0)
}

fn parse_view_box(value: &str) -> Option<Size> {
    let numbers: Vec<f32> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(str::parse::<f32>)
        .collect::<Result<_, _>>()
        .ok()?;

    match numbers.as_slice() {
        [_, _, width, height] if *width > 0.0 && *height > 0.0 => Some(Size::new(*width, *height)),
        _ => None,
    }
}
