//! Layered layout for flowcharts.
//!
//! Nodes are ranked by the longest path that reaches them, then each rank is
//! laid out as a row (vertical flow) or a column (horizontal flow).

use std::collections::HashMap;

use log::{debug, trace};
use petgraph::{
    algo::toposort,
    graph::{DiGraph, NodeIndex},
};

use novaflow_core::geometry::{Bounds, Point, Size};
use novaflow_parser::ast::{Direction, Edge, Flowchart, Node, NodeShape, Subgraph};

/// Height of the band reserved for a subgraph title.
const SUBGRAPH_TITLE_HEIGHT: f32 = 22.0;

/// A node with its final center and size.
#[derive(Debug)]
pub struct PlacedNode<'a> {
    pub node: &'a Node,
    pub center: Point,
    pub size: Size,
}

impl PlacedNode<'_> {
    pub fn bounds(&self) -> Bounds {
        Bounds::centered(self.center, self.size)
    }

    /// Point where a line from the center toward `target` leaves the outline.
    pub fn boundary_toward(&self, target: Point) -> Point {
        let delta = target - self.center;
        let (dx, dy) = (delta.x(), delta.y());
        if dx.abs() < f32::EPSILON && dy.abs() < f32::EPSILON {
            return self.center;
        }

        let half_width = self.size.width() / 2.0;
        let half_height = self.size.height() / 2.0;

        let scale = match self.node.shape {
            NodeShape::Circle => half_width / dx.hypot(dy),
            NodeShape::Diamond => 1.0 / (dx.abs() / half_width + dy.abs() / half_height),
            _ => {
                let sx = if dx.abs() > f32::EPSILON { half_width / dx.abs() } else { f32::INFINITY };
                let sy = if dy.abs() > f32::EPSILON { half_height / dy.abs() } else { f32::INFINITY };
                sx.min(sy)
            }
        };

        self.center + Point::new(dx * scale, dy * scale)
    }
}

/// An edge with the points where it meets its endpoints' outlines.
#[derive(Debug)]
pub struct RoutedEdge<'a> {
    pub edge: &'a Edge,
    pub start: Point,
    pub end: Point,
}

#[derive(Debug)]
pub struct SubgraphFrame<'a> {
    pub subgraph: &'a Subgraph,
    pub bounds: Bounds,
}

/// Result of laying out a flowchart.
#[derive(Debug)]
pub struct Layout<'a> {
    nodes: Vec<PlacedNode<'a>>,
    edges: Vec<RoutedEdge<'a>>,
    frames: Vec<SubgraphFrame<'a>>,
    size: Size,
}

impl<'a> Layout<'a> {
    pub fn nodes(&self) -> &[PlacedNode<'a>] {
        &self.nodes
    }

    pub fn edges(&self) -> &[RoutedEdge<'a>] {
        &self.edges
    }

    pub fn frames(&self) -> &[SubgraphFrame<'a>] {
        &self.frames
    }

    /// Total canvas size, padding included.
    pub fn size(&self) -> Size {
        self.size
    }
}

/// Layered flowchart layout engine.
pub struct Engine {
    padding: f32,
    node_spacing: f32,
    rank_spacing: f32,
    font_size: f32,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            padding: 35.0,
            node_spacing: 50.0,
            rank_spacing: 50.0,
            font_size: 14.0,
        }
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the margin around the whole drawing
    pub fn set_padding(&mut self, padding: f32) -> &mut Self {
        self.padding = padding;
        self
    }

    /// Set the gap between nodes that share a rank
    pub fn set_node_spacing(&mut self, spacing: f32) -> &mut Self {
        self.node_spacing = spacing;
        self
    }

    /// Set the gap between consecutive ranks
    pub fn set_rank_spacing(&mut self, spacing: f32) -> &mut Self {
        self.rank_spacing = spacing;
        self
    }

    /// Set the font size node widths are estimated with
    pub fn set_font_size(&mut self, font_size: f32) -> &mut Self {
        self.font_size = font_size;
        self
    }

    pub fn calculate<'a>(&self, chart: &'a Flowchart) -> Layout<'a> {
        let (graph, indices) = build_graph(chart);
        let ranks = assign_ranks(&graph);
        let layers = group_by_rank(&graph, &ranks);

        let sizes: Vec<Size> = graph
            .node_indices()
            .map(|idx| self.node_size(graph[idx]))
            .collect();

        let centers = self.position_layers(&layers, &sizes, chart.direction);

        let nodes: Vec<PlacedNode<'a>> = graph
            .node_indices()
            .map(|idx| PlacedNode {
                node: graph[idx],
                center: centers[idx.index()],
                size: sizes[idx.index()],
            })
            .collect();

        let edges = chart
            .edges
            .iter()
            .filter_map(|edge| {
                let from = &nodes[indices.get(edge.from.as_str())?.index()];
                let to = &nodes[indices.get(edge.to.as_str())?.index()];
                Some(RoutedEdge {
                    edge,
                    start: from.boundary_toward(to.center),
                    end: to.boundary_toward(from.center),
                })
            })
            .collect();

        let frames: Vec<SubgraphFrame<'a>> = chart
            .subgraphs
            .iter()
            .filter_map(|subgraph| {
                let bounds = subgraph
                    .nodes
                    .iter()
                    .filter_map(|id| indices.get(id.as_str()))
                    .map(|idx| nodes[idx.index()].bounds())
                    .reduce(Bounds::union)?;
                let frame = bounds.inflate(self.node_spacing / 3.0);
                let title = Bounds::centered(
                    Point::new(frame.min_x(), frame.min_y() - SUBGRAPH_TITLE_HEIGHT / 2.0),
                    Size::new(0.0, SUBGRAPH_TITLE_HEIGHT),
                );
                Some(SubgraphFrame {
                    subgraph,
                    bounds: frame.union(title),
                })
            })
            .collect();

        let mut layout = Layout {
            nodes,
            edges,
            frames,
            size: Size::default(),
        };
        self.normalize(&mut layout);

        debug!(
            nodes = layout.nodes.len(),
            ranks = layers.len(),
            width = layout.size.width(),
            height = layout.size.height();
            "Flowchart layout calculated"
        );

        layout
    }

    /// Estimated size of a node's outline.
    fn node_size(&self, node: &Node) -> Size {
        let char_width = self.font_size * 4.0 / 7.0;
        let longest_line = node
            .label
            .lines()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        let line_count = node.label.lines().count().max(1);

        let width = (longest_line as f32 * char_width + 30.0).max(80.0);
        let height = 40.0 + (line_count - 1) as f32 * self.font_size * 1.2;

        match node.shape {
            NodeShape::Circle => {
                let diameter = width.max(height);
                Size::new(diameter, diameter)
            }
            NodeShape::Diamond => Size::new(width + 30.0, height + 30.0),
            NodeShape::Hexagon | NodeShape::Asymmetric => Size::new(width + 20.0, height),
            _ => Size::new(width, height),
        }
    }

    /// Place every layer along the flow axis and center it across it.
    fn position_layers(
        &self,
        layers: &[Vec<NodeIndex>],
        sizes: &[Size],
        direction: Direction,
    ) -> Vec<Point> {
        let vertical = direction.is_vertical();
        // (along the flow, across the flow)
        let extent = |size: Size| {
            if vertical {
                (size.height(), size.width())
            } else {
                (size.width(), size.height())
            }
        };

        let mut centers = vec![Point::default(); sizes.len()];
        let mut flow_pos = 0.0;

        for layer in layers {
            let thickness = layer
                .iter()
                .map(|idx| extent(sizes[idx.index()]).0)
                .fold(0.0_f32, f32::max);
            let span: f32 = layer.iter().map(|idx| extent(sizes[idx.index()]).1).sum::<f32>()
                + self.node_spacing * layer.len().saturating_sub(1) as f32;

            let flow_center = flow_pos + thickness / 2.0;
            let mut cross_pos = -span / 2.0;
            for idx in layer {
                let across = extent(sizes[idx.index()]).1;
                let cross_center = cross_pos + across / 2.0;
                let along = if direction.is_reversed() { -flow_center } else { flow_center };

                centers[idx.index()] = if vertical {
                    Point::new(cross_center, along)
                } else {
                    Point::new(along, cross_center)
                };
                cross_pos += across + self.node_spacing;
            }

            flow_pos += thickness + self.rank_spacing;
        }

        centers
    }

    /// Shift everything so the drawing starts at the padding offset.
    fn normalize(&self, layout: &mut Layout<'_>) {
        let content = layout
            .nodes
            .iter()
            .map(PlacedNode::bounds)
            .chain(layout.frames.iter().map(|frame| frame.bounds))
            .reduce(Bounds::union);

        let Some(content) = content else {
            layout.size = Size::new(self.padding * 2.0, self.padding * 2.0);
            return;
        };

        let shift = Point::new(self.padding, self.padding) - content.origin();
        for node in &mut layout.nodes {
            node.center = node.center + shift;
        }
        for edge in &mut layout.edges {
            edge.start = edge.start + shift;
            edge.end = edge.end + shift;
        }
        for frame in &mut layout.frames {
            frame.bounds = frame.bounds.translate(shift);
        }

        layout.size = Size::new(
            content.width() + self.padding * 2.0,
            content.height() + self.padding * 2.0,
        );
    }
}

fn build_graph(chart: &Flowchart) -> (DiGraph<&Node, ()>, HashMap<&str, NodeIndex>) {
    let mut graph = DiGraph::new();
    let mut indices = HashMap::new();

    for (id, node) in &chart.nodes {
        indices.insert(id.as_str(), graph.add_node(node));
    }

    for edge in &chart.edges {
        if edge.from == edge.to {
            continue;
        }
        if let (Some(&from), Some(&to)) = (
            indices.get(edge.from.as_str()),
            indices.get(edge.to.as_str()),
        ) {
            graph.add_edge(from, to, ());
        }
    }

    (graph, indices)
}

/// Longest-path rank of every node.
///
/// Cyclic graphs have no topological order; ranks are then relaxed a bounded
/// number of times, which keeps them below the node count.
fn assign_ranks(graph: &DiGraph<&Node, ()>) -> Vec<usize> {
    let node_count = graph.node_count();
    let mut ranks = vec![0; node_count];

    match toposort(graph, None) {
        Ok(order) => {
            for idx in order {
                let rank = graph
                    .neighbors_directed(idx, petgraph::Direction::Incoming)
                    .map(|pred| ranks[pred.index()] + 1)
                    .max()
                    .unwrap_or(0);
                ranks[idx.index()] = rank;
            }
        }
        Err(cycle) => {
            trace!(node:? = cycle.node_id(); "Flowchart has a cycle, relaxing ranks");
            for _ in 0..node_count {
                let mut changed = false;
                for edge in graph.raw_edges() {
                    let candidate = ranks[edge.source().index()] + 1;
                    if candidate > ranks[edge.target().index()] && candidate < node_count {
                        ranks[edge.target().index()] = candidate;
                        changed = true;
                    }
                }
                if !changed {
                    break;
                }
            }
        }
    }

    ranks
}

fn group_by_rank(graph: &DiGraph<&Node, ()>, ranks: &[usize]) -> Vec<Vec<NodeIndex>> {
    let layer_count = ranks.iter().max().map_or(0, |max| max + 1);
    let mut layers = vec![Vec::new(); layer_count];
    for idx in graph.node_indices() {
        layers[ranks[idx.index()]].push(idx);
    }
    layers
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;

    fn chart(source: &str) -> Flowchart {
        novaflow_parser::parse(source).unwrap()
    }

    fn center_of(layout: &Layout<'_>, id: &str) -> Point {
        layout
            .nodes()
            .iter()
            .find(|placed| placed.node.id == id)
            .map(|placed| placed.center)
            .unwrap()
    }

    #[test]
    fn test_ranks_follow_longest_path() {
        let chart = chart("graph TD\n    A --> B --> C\n    A --> C");
        let (graph, indices) = build_graph(&chart);
        let ranks = assign_ranks(&graph);

        assert_eq!(ranks[indices["A"].index()], 0);
        assert_eq!(ranks[indices["B"].index()], 1);
        assert_eq!(ranks[indices["C"].index()], 2);
    }

    #[test]
    fn test_cycles_are_bounded() {
        let chart = chart("graph TD\n    A --> B --> C --> A");
        let (graph, _) = build_graph(&chart);
        let ranks = assign_ranks(&graph);

        assert!(ranks.iter().all(|&rank| rank < 3));
    }

    #[test]
    fn test_top_down_flows_downward() {
        let chart = chart("graph TD\n    A --> B");
        let layout = Engine::new().calculate(&chart);

        let a = center_of(&layout, "A");
        let b = center_of(&layout, "B");
        assert!(b.y() > a.y());
        assert_approx_eq!(f32, a.x(), b.x());
    }

    #[test]
    fn test_direction_controls_axis() {
        let lr = chart("graph LR\n    A --> B");
        let layout = Engine::new().calculate(&lr);
        assert!(center_of(&layout, "B").x() > center_of(&layout, "A").x());

        let bt = chart("graph BT\n    A --> B");
        let layout = Engine::new().calculate(&bt);
        assert!(center_of(&layout, "B").y() < center_of(&layout, "A").y());
    }

    #[test]
    fn test_spacing_settings() {
        let chart = chart("graph TD\n    A --> B\n    A --> C");
        let gaps = |node_spacing: f32, rank_spacing: f32| {
            let mut engine = Engine::new();
            engine
                .set_node_spacing(node_spacing)
                .set_rank_spacing(rank_spacing);
            let layout = engine.calculate(&chart);
            let (a, b, c) = (
                center_of(&layout, "A"),
                center_of(&layout, "B"),
                center_of(&layout, "C"),
            );
            ((c.x() - b.x()).abs(), b.y() - a.y())
        };

        let (across, along) = gaps(50.0, 50.0);
        let (wide_across, wide_along) = gaps(100.0, 80.0);
        assert_approx_eq!(f32, wide_across - across, 50.0, epsilon = 0.001);
        assert_approx_eq!(f32, wide_along - along, 30.0, epsilon = 0.001);
    }

    #[test]
    fn test_layout_starts_at_padding() {
        let chart = chart("graph TD\n    A[Start]");
        let mut engine = Engine::new();
        engine.set_padding(10.0);
        let layout = engine.calculate(&chart);

        let bounds = layout.nodes()[0].bounds();
        assert_approx_eq!(f32, bounds.min_x(), 10.0);
        assert_approx_eq!(f32, bounds.min_y(), 10.0);
        assert_approx_eq!(f32, layout.size().width(), 80.0 + 20.0);
        assert_approx_eq!(f32, layout.size().height(), 40.0 + 20.0);
    }

    #[test]
    fn test_edges_meet_node_outlines() {
        let chart = chart("graph TD\n    A --> B");
        let layout = Engine::new().calculate(&chart);
        let edge = &layout.edges()[0];

        let a = layout.nodes()[0].bounds();
        let b = layout.nodes()[1].bounds();
        assert_approx_eq!(f32, edge.start.y(), a.max_y(), epsilon = 0.01);
        assert_approx_eq!(f32, edge.end.y(), b.min_y(), epsilon = 0.01);
    }

    #[test]
    fn test_subgraph_frame_contains_members() {
        let chart = chart("graph LR\n    subgraph s [Group]\n        A --> B\n    end\n    B --> C");
        let layout = Engine::new().calculate(&chart);

        let frame = &layout.frames()[0];
        for id in ["A", "B"] {
            let center = center_of(&layout, id);
            assert!(center.x() > frame.bounds.min_x() && center.x() < frame.bounds.max_x());
        }
        assert!(center_of(&layout, "C").x() > frame.bounds.max_x());
    }
}
