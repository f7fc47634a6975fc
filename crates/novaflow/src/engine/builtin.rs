use async_trait::async_trait;
use log::{debug, trace};

use super::{DiagramEngine, EngineError, RenderedMarkup, layout, svg::Svg};
use crate::config::EngineOptions;

/// Flowchart engine backed by `novaflow-parser`.
///
/// Syntax checks and renders run inline; neither call suspends.
#[derive(Debug, Clone, Default)]
pub struct BuiltinEngine {
    padding: Option<f32>,
    node_spacing: Option<f32>,
    rank_spacing: Option<f32>,
}

impl BuiltinEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the margin around rendered charts.
    pub fn with_padding(mut self, padding: f32) -> Self {
        self.padding = Some(padding);
        self
    }

    /// Override the gap between nodes of the same rank.
    pub fn with_node_spacing(mut self, spacing: f32) -> Self {
        self.node_spacing = Some(spacing);
        self
    }

    /// Override the gap between ranks.
    pub fn with_rank_spacing(mut self, spacing: f32) -> Self {
        self.rank_spacing = Some(spacing);
        self
    }
}

#[async_trait]
impl DiagramEngine for BuiltinEngine {
    async fn check_syntax(&self, markup: &str) -> Result<(), EngineError> {
        let kind = novaflow_parser::check_syntax(markup)?;
        trace!(kind:% = kind; "Syntax check passed");
        Ok(())
    }

    async fn render(
        &self,
        element_id: &str,
        markup: &str,
        options: &EngineOptions,
    ) -> Result<RenderedMarkup, EngineError> {
        let chart = novaflow_parser::parse(markup)?;

        let mut engine = layout::Engine::new();
        engine.set_font_size(options.font_size());
        if let Some(padding) = self.padding {
            engine.set_padding(padding);
        }
        if let Some(spacing) = self.node_spacing {
            engine.set_node_spacing(spacing);
        }
        if let Some(spacing) = self.rank_spacing {
            engine.set_rank_spacing(spacing);
        }
        let layout = engine.calculate(&chart);

        let document = Svg::new(element_id, options).render(&layout);
        let svg = document.to_string();

        debug!(element_id = element_id, bytes = svg.len(); "Rendered flowchart");
        Ok(RenderedMarkup::new(svg))
    }
}
