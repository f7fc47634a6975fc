//! Configuration types for Novaflow chart rendering.
//!
//! All types implement [`serde::Deserialize`] with every field defaulted, so a
//! configuration file only needs the keys it changes.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining engine and renderer settings.
//! - [`EngineOptions`] - One-time engine configuration: theme, font, and
//!   per-diagram-type layout hints.
//! - [`RendererConfig`] - Settings for the render state machine.
//!
//! # Example
//!
//! ```
//! # use novaflow::config::{AppConfig, Theme};
//! let config = AppConfig::default();
//! assert_eq!(config.engine().theme(), Theme::Default);
//! assert_eq!(config.renderer().debounce().as_millis(), 300);
//! ```

use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    engine: EngineOptions,

    #[serde(default)]
    renderer: RendererConfig,
}

impl AppConfig {
    pub fn new(engine: EngineOptions, renderer: RendererConfig) -> Self {
        Self { engine, renderer }
    }

    pub fn engine(&self) -> &EngineOptions {
        &self.engine
    }

    pub fn renderer(&self) -> &RendererConfig {
        &self.renderer
    }
}

/// Color theme applied by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Dark,
    Forest,
    Neutral,
}

/// Edge curve interpolation for flowcharts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Curve {
    #[default]
    Basis,
    Linear,
}

/// Options handed to the diagram engine once per process.
///
/// See [`ensure_engine_configured`](crate::engine::ensure_engine_configured).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    theme: Theme,
    font_family: String,
    font_size: f32,
    flowchart: FlowchartOptions,
    gantt: GanttOptions,
    sequence: WidthOptions,
    er: WidthOptions,
    mindmap: WidthOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_size: 14.0,
            flowchart: FlowchartOptions::default(),
            gantt: GanttOptions::default(),
            sequence: WidthOptions::default(),
            er: WidthOptions::default(),
            mindmap: WidthOptions::default(),
        }
    }
}

const DEFAULT_FONT_FAMILY: &str = "Inter, system-ui, sans-serif";

impl EngineOptions {
    /// Replace the theme, keeping every other option.
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn font_family(&self) -> &str {
        &self.font_family
    }

    /// Base font size in pixels.
    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    pub fn flowchart(&self) -> &FlowchartOptions {
        &self.flowchart
    }

    pub fn gantt(&self) -> &GanttOptions {
        &self.gantt
    }

    pub fn sequence(&self) -> &WidthOptions {
        &self.sequence
    }

    pub fn er(&self) -> &WidthOptions {
        &self.er
    }

    pub fn mindmap(&self) -> &WidthOptions {
        &self.mindmap
    }
}

/// Flowchart layout hints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FlowchartOptions {
    use_max_width: bool,
    html_labels: bool,
    curve: Curve,
}

impl Default for FlowchartOptions {
    fn default() -> Self {
        Self {
            use_max_width: true,
            html_labels: true,
            curve: Curve::default(),
        }
    }
}

impl FlowchartOptions {
    /// When set, the graphic scales down to the container width.
    pub fn use_max_width(&self) -> bool {
        self.use_max_width
    }

    pub fn html_labels(&self) -> bool {
        self.html_labels
    }

    pub fn curve(&self) -> Curve {
        self.curve
    }
}

/// Gantt layout hints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GanttOptions {
    use_max_width: bool,
    font_size: f32,
    font_family: String,
    grid_line_start_padding: f32,
}

impl Default for GanttOptions {
    fn default() -> Self {
        Self {
            use_max_width: true,
            font_size: 12.0,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            grid_line_start_padding: 350.0,
        }
    }
}

impl GanttOptions {
    pub fn use_max_width(&self) -> bool {
        self.use_max_width
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    pub fn font_family(&self) -> &str {
        &self.font_family
    }

    pub fn grid_line_start_padding(&self) -> f32 {
        self.grid_line_start_padding
    }
}

/// Layout hints for diagram types that only control width scaling.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WidthOptions {
    use_max_width: bool,
}

impl Default for WidthOptions {
    fn default() -> Self {
        Self {
            use_max_width: true,
        }
    }
}

impl WidthOptions {
    pub fn use_max_width(&self) -> bool {
        self.use_max_width
    }
}

/// Settings for [`DiagramRenderer`](crate::renderer::DiagramRenderer).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Delay before a render session starts sanitizing, in milliseconds.
    debounce_ms: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

impl RendererConfig {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce_ms: u64::try_from(debounce.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_defaults() {
        let options = EngineOptions::default();

        assert_eq!(options.theme(), Theme::Default);
        assert_eq!(options.font_family(), "Inter, system-ui, sans-serif");
        assert_eq!(options.font_size(), 14.0);
        assert!(options.flowchart().use_max_width());
        assert!(options.flowchart().html_labels());
        assert_eq!(options.flowchart().curve(), Curve::Basis);
        assert_eq!(options.gantt().font_size(), 12.0);
        assert_eq!(options.gantt().grid_line_start_padding(), 350.0);
        assert!(options.sequence().use_max_width());
        assert!(options.er().use_max_width());
        assert!(options.mindmap().use_max_width());
    }

    #[test]
    fn test_renderer_debounce() {
        assert_eq!(RendererConfig::default().debounce(), Duration::from_millis(300));
        assert_eq!(
            RendererConfig::new(Duration::from_millis(25)).debounce(),
            Duration::from_millis(25)
        );
    }

    #[test]
    fn test_theme_builder() {
        let options = EngineOptions::default().with_theme(Theme::Dark);
        assert_eq!(options.theme(), Theme::Dark);
        assert_eq!(options.font_size(), 14.0);
    }
}
