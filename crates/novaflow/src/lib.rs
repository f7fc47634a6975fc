//! Novaflow - render LLM-generated diagram markup.
//!
//! Generated markup is often slightly malformed. Novaflow repairs the common
//! mistakes, checks the result against the engine's grammar, and renders it
//! into a host container, keeping only the newest result when renders
//! overlap.
//!
//! # Pipeline
//!
//! raw markup -> [`sanitize`](sanitize::sanitize) -> [`DiagramValidator`]
//! -> [`DiagramEngine::render`](engine::DiagramEngine::render) ->
//! [`RenderHost`](host::RenderHost)
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use novaflow::{
//!     DiagramRenderer, SessionOutcome,
//!     config::AppConfig,
//!     engine::BuiltinEngine,
//!     host::MemoryHost,
//!     session::Phase,
//! };
//!
//! let host = Arc::new(MemoryHost::new());
//! let renderer = DiagramRenderer::new(
//!     Arc::new(BuiltinEngine::new()),
//!     host.clone(),
//!     AppConfig::default(),
//! );
//!
//! let runtime = tokio::runtime::Builder::new_current_thread()
//!     .enable_time()
//!     .build()
//!     .unwrap();
//! let outcome = runtime.block_on(renderer.render("```mermaid\ngraph TD\n  A[Start] --> B[End]\n```"));
//!
//! assert_eq!(outcome, SessionOutcome::Applied(Phase::Done));
//! assert!(host.last_outcome().unwrap().is_success());
//! ```

pub mod config;
pub mod engine;
pub mod host;
pub mod session;

mod error;
mod renderer;
mod validator;

pub use novaflow_core::{geometry, graphic, markup, sanitize};

pub use error::{NovaflowError, RenderError};
pub use renderer::{DiagramRenderer, SessionOutcome};
pub use validator::DiagramValidator;
