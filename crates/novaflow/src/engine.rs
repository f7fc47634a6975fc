//! The diagram engine seam.
//!
//! A [`DiagramEngine`] checks markup syntax and turns markup into SVG text.
//! Both operations are asynchronous: they are the only points where a render
//! session yields. [`BuiltinEngine`] implements the trait for flowcharts.

mod builtin;
mod layout;
mod svg;

pub use builtin::BuiltinEngine;

use std::sync::OnceLock;

use async_trait::async_trait;
use log::{debug, info};
use thiserror::Error;

use novaflow_parser::error::ParseError;

use crate::config::EngineOptions;

static ENGINE_OPTIONS: OnceLock<EngineOptions> = OnceLock::new();

/// Configure the engine for this process and return the active options.
///
/// The first call stores `options`. Later calls are no-ops that return the
/// options stored by the first call, so this can sit at the top of every
/// render path.
///
/// # Examples
///
/// ```
/// use novaflow::{config::EngineOptions, engine::ensure_engine_configured};
///
/// let first = ensure_engine_configured(&EngineOptions::default());
/// let again = ensure_engine_configured(&EngineOptions::default());
/// assert!(std::ptr::eq(first, again));
/// ```
pub fn ensure_engine_configured(options: &EngineOptions) -> &'static EngineOptions {
    let mut initialized = false;
    let active = ENGINE_OPTIONS.get_or_init(|| {
        initialized = true;
        options.clone()
    });

    if initialized {
        info!(
            theme:? = active.theme(),
            font_family = active.font_family();
            "Diagram engine configured"
        );
    } else if active != options {
        debug!("Diagram engine already configured, ignoring new options");
    }

    active
}

/// Failure reported by a [`DiagramEngine`].
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error(transparent)]
    Syntax(#[from] ParseError),

    #[error("{0}")]
    Failed(String),
}

/// Engine output for one render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMarkup {
    svg: String,
}

impl RenderedMarkup {
    pub fn new(svg: impl Into<String>) -> Self {
        Self { svg: svg.into() }
    }

    pub fn svg(&self) -> &str {
        &self.svg
    }

    pub fn into_svg(self) -> String {
        self.svg
    }
}

/// A diagram rendering engine.
///
/// Implementations must tolerate being called concurrently for different
/// element ids.
#[async_trait]
pub trait DiagramEngine: Send + Sync {
    /// Check that `markup` parses, without rendering it.
    async fn check_syntax(&self, markup: &str) -> Result<(), EngineError>;

    /// Render `markup` into SVG whose root element carries `element_id`.
    async fn render(
        &self,
        element_id: &str,
        markup: &str,
        options: &EngineOptions,
    ) -> Result<RenderedMarkup, EngineError>;
}
