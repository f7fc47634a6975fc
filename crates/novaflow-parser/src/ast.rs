//! Flowchart syntax tree.
//!
//! Node and edge spans are byte ranges into the markup that was parsed.

use std::fmt;

use indexmap::IndexMap;

use crate::span::Span;

/// Flow direction of a flowchart or subgraph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// `TB` or `TD`.
    #[default]
    TopBottom,
    BottomTop,
    LeftRight,
    RightLeft,
}

impl Direction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "TB" | "TD" => Some(Self::TopBottom),
            "BT" => Some(Self::BottomTop),
            "LR" => Some(Self::LeftRight),
            "RL" => Some(Self::RightLeft),
            _ => None,
        }
    }

    /// Returns true when ranks stack vertically.
    pub fn is_vertical(self) -> bool {
        matches!(self, Self::TopBottom | Self::BottomTop)
    }

    /// Returns true when ranks run against the reading order.
    pub fn is_reversed(self) -> bool {
        matches!(self, Self::BottomTop | Self::RightLeft)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TopBottom => "TB",
            Self::BottomTop => "BT",
            Self::LeftRight => "LR",
            Self::RightLeft => "RL",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outline of a node, chosen by its bracket pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NodeShape {
    /// `A[text]`, or a bare `A`.
    #[default]
    Rectangle,
    /// `A(text)`
    Rounded,
    /// `A([text])`
    Stadium,
    /// `A[[text]]`
    Subroutine,
    /// `A[(text)]`
    Cylinder,
    /// `A((text))`
    Circle,
    /// `A{text}`
    Diamond,
    /// `A{{text}}`
    Hexagon,
    /// `A>text]`
    Asymmetric,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub shape: NodeShape,
    pub classes: Vec<String>,
    pub span: Span,
}

impl Node {
    /// A node with its id as the label, as created by a bare reference.
    pub fn bare(id: impl Into<String>, span: Span) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            shape: NodeShape::default(),
            classes: Vec::new(),
            span,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Stroke {
    #[default]
    Normal,
    Dotted,
    Thick,
    Invisible,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ArrowHead {
    None,
    #[default]
    Arrow,
    Cross,
    Circle,
}

/// The connector between two nodes, without its endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LinkStyle {
    pub stroke: Stroke,
    pub head: ArrowHead,
    /// `<-->` draws a head at both ends.
    pub bidirectional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
    pub style: LinkStyle,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subgraph {
    pub id: String,
    pub title: String,
    pub direction: Option<Direction>,
    /// Ids of nodes first referenced inside this block, in order.
    pub nodes: Vec<String>,
    pub span: Span,
}

/// A parsed flowchart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Flowchart {
    pub direction: Direction,
    /// Nodes in first-reference order.
    pub nodes: IndexMap<String, Node>,
    pub edges: Vec<Edge>,
    pub subgraphs: Vec<Subgraph>,
}

impl Flowchart {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
