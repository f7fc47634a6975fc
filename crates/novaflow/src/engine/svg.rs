//! SVG emission for laid-out flowcharts.

use svg::{
    Document,
    node::{
        Text as TextNode,
        element::{
            Circle, Definitions, Group, Line, Marker, Path, Polygon, Rectangle, Style, TSpan,
            Text,
        },
    },
};

use novaflow_core::geometry::{Bounds, Point, Size};
use novaflow_parser::ast::{ArrowHead, NodeShape, Stroke};

use super::layout::{Layout, PlacedNode, RoutedEdge, SubgraphFrame};
use crate::config::{EngineOptions, Theme};

/// Colors used for one theme.
#[derive(Debug, Clone, Copy)]
struct Palette {
    node_fill: &'static str,
    node_stroke: &'static str,
    text: &'static str,
    edge: &'static str,
    label_background: &'static str,
    frame_fill: &'static str,
    frame_stroke: &'static str,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Default => Self {
                node_fill: "#ECECFF",
                node_stroke: "#9370DB",
                text: "#333333",
                edge: "#333333",
                label_background: "#E8E8E8",
                frame_fill: "#FFFFDE",
                frame_stroke: "#AAAA33",
            },
            Theme::Dark => Self {
                node_fill: "#1F2020",
                node_stroke: "#CCCCCC",
                text: "#E0E0E0",
                edge: "#D3D3D3",
                label_background: "#585858",
                frame_fill: "#2B2B2B",
                frame_stroke: "#888888",
            },
            Theme::Forest => Self {
                node_fill: "#CDE498",
                node_stroke: "#13540C",
                text: "#000000",
                edge: "#008000",
                label_background: "#E8E8E8",
                frame_fill: "#CDE498",
                frame_stroke: "#6EAA49",
            },
            Theme::Neutral => Self {
                node_fill: "#EEEEEE",
                node_stroke: "#999999",
                text: "#333333",
                edge: "#666666",
                label_background: "#FFFFFF",
                frame_fill: "#FFFFFF",
                frame_stroke: "#AAAAAA",
            },
        }
    }
}

/// Renders a [`Layout`] into a standalone SVG document.
pub struct Svg<'o> {
    element_id: String,
    options: &'o EngineOptions,
    palette: Palette,
}

impl<'o> Svg<'o> {
    pub fn new(element_id: impl Into<String>, options: &'o EngineOptions) -> Self {
        Self {
            element_id: element_id.into(),
            options,
            palette: Palette::for_theme(options.theme()),
        }
    }

    pub fn render(&self, layout: &Layout<'_>) -> Document {
        let size = layout.size();

        let mut doc = Document::new()
            .set("id", self.element_id.as_str())
            .set("viewBox", format!("0 0 {} {}", size.width(), size.height()))
            .set("role", "graphics-document document")
            .set("aria-roledescription", "flowchart");

        doc = if self.options.flowchart().use_max_width() {
            doc.set("width", "100%")
                .set("style", format!("max-width: {}px;", size.width()))
        } else {
            doc.set("width", size.width()).set("height", size.height())
        };

        doc = doc.add(self.style_sheet()).add(self.marker_definitions());

        let mut frames = Group::new().set("class", "subgraphs");
        for frame in layout.frames() {
            frames = frames.add(self.render_frame(frame));
        }

        let mut edges = Group::new().set("class", "edgePaths");
        let mut labels = Group::new().set("class", "edgeLabels");
        for edge in layout.edges() {
            if let Some(path) = self.render_edge(edge) {
                edges = edges.add(path);
            }
            if let Some(label) = self.render_edge_label(edge) {
                labels = labels.add(label);
            }
        }

        let mut nodes = Group::new().set("class", "nodes");
        for node in layout.nodes() {
            nodes = nodes.add(self.render_node(node));
        }

        doc.add(frames).add(edges).add(labels).add(nodes)
    }

    fn marker_id(&self, name: &str) -> String {
        format!("{}-{name}", self.element_id)
    }

    fn style_sheet(&self) -> Style {
        Style::new(format!(
            "#{id} {{ font-family: {font}; font-size: {size}px; fill: {text}; }}",
            id = self.element_id,
            font = self.options.font_family(),
            size = self.options.font_size(),
            text = self.palette.text,
        ))
    }

    fn marker_definitions(&self) -> Definitions {
        let edge = self.palette.edge;

        let arrow_end = Marker::new()
            .set("id", self.marker_id("arrow-end"))
            .set("viewBox", "0 0 10 10")
            .set("refX", 9)
            .set("refY", 5)
            .set("markerWidth", 8)
            .set("markerHeight", 8)
            .set("orient", "auto")
            .add(Path::new().set("d", "M 0 0 L 10 5 L 0 10 z").set("fill", edge));

        let arrow_start = Marker::new()
            .set("id", self.marker_id("arrow-start"))
            .set("viewBox", "0 0 10 10")
            .set("refX", 1)
            .set("refY", 5)
            .set("markerWidth", 8)
            .set("markerHeight", 8)
            .set("orient", "auto")
            .add(Path::new().set("d", "M 10 0 L 0 5 L 10 10 z").set("fill", edge));

        let cross = Marker::new()
            .set("id", self.marker_id("cross-end"))
            .set("viewBox", "0 0 10 10")
            .set("refX", 5)
            .set("refY", 5)
            .set("markerWidth", 10)
            .set("markerHeight", 10)
            .set("orient", "auto")
            .add(
                Path::new()
                    .set("d", "M 1 1 L 9 9 M 1 9 L 9 1")
                    .set("stroke", edge)
                    .set("stroke-width", 2),
            );

        let circle = Marker::new()
            .set("id", self.marker_id("circle-end"))
            .set("viewBox", "0 0 10 10")
            .set("refX", 9)
            .set("refY", 5)
            .set("markerWidth", 8)
            .set("markerHeight", 8)
            .set("orient", "auto")
            .add(
                Circle::new()
                    .set("cx", 5)
                    .set("cy", 5)
                    .set("r", 4)
                    .set("fill", edge),
            );

        Definitions::new()
            .add(arrow_end)
            .add(arrow_start)
            .add(cross)
            .add(circle)
    }

    fn render_frame(&self, frame: &SubgraphFrame<'_>) -> Group {
        let bounds = frame.bounds;
        let rect = Rectangle::new()
            .set("x", bounds.min_x())
            .set("y", bounds.min_y())
            .set("width", bounds.width())
            .set("height", bounds.height())
            .set("fill", self.palette.frame_fill)
            .set("stroke", self.palette.frame_stroke)
            .set("stroke-width", 1);

        let title = Text::new(frame.subgraph.title.as_str())
            .set("x", bounds.min_x() + bounds.width() / 2.0)
            .set("y", bounds.min_y() + 15.0)
            .set("text-anchor", "middle");

        Group::new()
            .set("class", "cluster")
            .set("id", format!("{}-{}", self.element_id, frame.subgraph.id))
            .add(rect)
            .add(title)
    }

    fn render_edge(&self, routed: &RoutedEdge<'_>) -> Option<Line> {
        let style = routed.edge.style;
        if style.stroke == Stroke::Invisible {
            return None;
        }

        let mut line = Line::new()
            .set("x1", routed.start.x())
            .set("y1", routed.start.y())
            .set("x2", routed.end.x())
            .set("y2", routed.end.y())
            .set("stroke", self.palette.edge)
            .set("fill", "none");

        line = match style.stroke {
            Stroke::Thick => line.set("stroke-width", 3.5),
            Stroke::Dotted => line.set("stroke-width", 2).set("stroke-dasharray", "3,3"),
            _ => line.set("stroke-width", 2),
        };

        let end_marker = match style.head {
            ArrowHead::Arrow => Some("arrow-end"),
            ArrowHead::Cross => Some("cross-end"),
            ArrowHead::Circle => Some("circle-end"),
            ArrowHead::None => None,
        };
        if let Some(marker) = end_marker {
            line = line.set("marker-end", format!("url(#{})", self.marker_id(marker)));
        }
        if style.bidirectional {
            line = line.set("marker-start", format!("url(#{})", self.marker_id("arrow-start")));
        }

        Some(line)
    }

    fn render_edge_label(&self, routed: &RoutedEdge<'_>) -> Option<Group> {
        let label = routed.edge.label.as_deref()?;
        let center = routed.start.lerp_half(routed.end);

        let font_size = self.options.font_size();
        let size = Size::new(
            label.chars().count() as f32 * font_size * 4.0 / 7.0 + 8.0,
            font_size + 8.0,
        );
        let corner = Bounds::centered(center, size).origin();

        let background = Rectangle::new()
            .set("x", corner.x())
            .set("y", corner.y())
            .set("width", size.width())
            .set("height", size.height())
            .set("fill", self.palette.label_background)
            .set("rx", 3.0);

        Some(
            Group::new()
                .set("class", "edgeLabel")
                .add(background)
                .add(self.centered_text(center, label)),
        )
    }

    fn render_node(&self, placed: &PlacedNode<'_>) -> Group {
        let outline = self.outline(placed);
        Group::new()
            .set("class", "node")
            .set("id", format!("{}-{}", self.element_id, placed.node.id))
            .add(outline)
            .add(self.centered_text(placed.center, &placed.node.label))
    }

    fn outline(&self, placed: &PlacedNode<'_>) -> Box<dyn svg::Node> {
        let bounds = placed.bounds();
        let (x, y, w, h) = (bounds.min_x(), bounds.min_y(), bounds.width(), bounds.height());
        let center = placed.center;

        let rect = |rx: f32| {
            Rectangle::new()
                .set("x", x)
                .set("y", y)
                .set("width", w)
                .set("height", h)
                .set("rx", rx)
        };

        match placed.node.shape {
            NodeShape::Rectangle => Box::new(self.paint(rect(0.0))),
            NodeShape::Rounded => Box::new(self.paint(rect(5.0))),
            NodeShape::Stadium => Box::new(self.paint(rect(h / 2.0))),
            NodeShape::Subroutine => {
                let inner = format!("M {} {y} V {} M {} {y} V {}", x + 8.0, y + h, x + w - 8.0, y + h);
                Box::new(
                    Group::new()
                        .add(self.paint(rect(0.0)))
                        .add(Path::new().set("d", inner).set("stroke", self.palette.node_stroke)),
                )
            }
            NodeShape::Cylinder => {
                let ry = (h / 8.0).min(10.0);
                let d = format!(
                    "M {x} {top} A {rx} {ry} 0 0 0 {right} {top} A {rx} {ry} 0 0 0 {x} {top} V {bottom} A {rx} {ry} 0 0 0 {right} {bottom} V {top}",
                    top = y + ry,
                    bottom = y + h - ry,
                    right = x + w,
                    rx = w / 2.0,
                );
                Box::new(self.paint(Path::new().set("d", d)))
            }
            NodeShape::Circle => Box::new(
                self.paint(
                    Circle::new()
                        .set("cx", center.x())
                        .set("cy", center.y())
                        .set("r", w / 2.0),
                ),
            ),
            NodeShape::Diamond => Box::new(self.paint(polygon(&[
                Point::new(center.x(), y),
                Point::new(x + w, center.y()),
                Point::new(center.x(), y + h),
                Point::new(x, center.y()),
            ]))),
            NodeShape::Hexagon => {
                let inset = h / 4.0;
                Box::new(self.paint(polygon(&[
                    Point::new(x + inset, y),
                    Point::new(x + w - inset, y),
                    Point::new(x + w, center.y()),
                    Point::new(x + w - inset, y + h),
                    Point::new(x + inset, y + h),
                    Point::new(x, center.y()),
                ])))
            }
            NodeShape::Asymmetric => {
                let notch = h / 2.0;
                Box::new(self.paint(polygon(&[
                    Point::new(x, y),
                    Point::new(x + w, y),
                    Point::new(x + w, y + h),
                    Point::new(x, y + h),
                    Point::new(x + notch, center.y()),
                ])))
            }
        }
    }

    fn paint<T: svg::Node>(&self, mut element: T) -> T {
        element.assign("fill", self.palette.node_fill);
        element.assign("stroke", self.palette.node_stroke);
        element.assign("stroke-width", 1);
        element
    }

    fn centered_text(&self, position: Point, content: &str) -> Text {
        let lines: Vec<&str> = content.lines().collect();
        let line_height = self.options.font_size() * 1.2;
        let first_dy = -(lines.len().saturating_sub(1) as f32) * line_height / 2.0;

        let mut text = Text::new("")
            .set("x", position.x())
            .set("y", position.y())
            .set("text-anchor", "middle")
            .set("dominant-baseline", "central")
            .set("fill", self.palette.text);

        for (i, line) in lines.into_iter().enumerate() {
            let dy = if i == 0 { first_dy } else { line_height };
            text = text.add(
                TSpan::new("")
                    .set("x", position.x())
                    .set("dy", dy)
                    .add(TextNode::new(line)),
            );
        }

        text
    }
}

fn polygon(points: &[Point]) -> Polygon {
    let points = points
        .iter()
        .map(|p| format!("{},{}", p.x(), p.y()))
        .collect::<Vec<_>>()
        .join(" ");
    Polygon::new().set("points", points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::layout::Engine;

    fn render(source: &str, options: &EngineOptions) -> String {
        let chart = novaflow_parser::parse(source).unwrap();
        let layout = Engine::new().calculate(&chart);
        Svg::new("chart-1", options).render(&layout).to_string()
    }

    #[test]
    fn test_root_carries_element_id() {
        let svg = render("graph TD\n    A --> B", &EngineOptions::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"id="chart-1""#));
        assert!(svg.contains("viewBox"));
    }

    #[test]
    fn test_shapes_and_labels_are_drawn() {
        let svg = render(
            "graph LR\n    A[Start] -->|proceed| B{Check}\n    B --> C((Done))",
            &EngineOptions::default(),
        );
        assert!(svg.contains("Start"));
        assert!(svg.contains("<polygon"));
        assert!(svg.contains("<circle"));
        assert!(svg.contains("proceed"));
        assert!(svg.contains("url(#chart-1-arrow-end)"));
    }

    #[test]
    fn test_link_styles() {
        let svg = render("graph LR\n    A -.-> B\n    B ~~~ C\n    C <--> D", &EngineOptions::default());
        assert!(svg.contains("stroke-dasharray"));
        assert!(svg.contains("url(#chart-1-arrow-start)"));
        assert_eq!(svg.matches("<line").count(), 2);
    }

    #[test]
    fn test_theme_colors() {
        let dark = EngineOptions::default().with_theme(Theme::Dark);
        let svg = render("graph TD\n    A", &dark);
        assert!(svg.contains("#1F2020"));
    }

    #[test]
    fn test_subgraph_frame_is_drawn() {
        let svg = render(
            "graph TD\n    subgraph api [Public API]\n        A\n    end",
            &EngineOptions::default(),
        );
        assert!(svg.contains("Public API"));
        assert!(svg.contains(r#"id="chart-1-api""#));
    }
}
