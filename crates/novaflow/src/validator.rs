//! Syntax pre-check ahead of a full render.

use std::sync::Arc;

use log::debug;

use crate::{engine::DiagramEngine, error::RenderError};

/// Confirms markup parses before the renderer commits to a render.
///
/// The markup is passed to the engine as is.
#[derive(Clone)]
pub struct DiagramValidator {
    engine: Arc<dyn DiagramEngine>,
}

impl DiagramValidator {
    pub fn new(engine: Arc<dyn DiagramEngine>) -> Self {
        Self { engine }
    }

    /// Check `markup` against the engine's grammar.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Parse`] carrying the engine's message.
    pub async fn validate(&self, markup: &str) -> Result<(), RenderError> {
        self.engine.check_syntax(markup).await.map_err(|err| {
            debug!(err:% = err; "Markup failed syntax check");
            RenderError::Parse(err.to_string())
        })
    }
}
