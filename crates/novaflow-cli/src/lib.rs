//! CLI logic for the Novaflow chart renderer.
//!
//! The binary reads raw markup, pushes it through a [`DiagramRenderer`]
//! backed by the built-in engine and an in-memory host, and writes what the
//! host ends up displaying.

pub mod error_adapter;

mod args;
mod config;
mod response;

pub use args::Args;
pub use response::GenerationResponse;

use std::{fs, io, sync::Arc, time::Duration};

use log::{info, warn};

use novaflow::{
    DiagramRenderer, NovaflowError, RenderError, SessionOutcome,
    config::{AppConfig, RendererConfig},
    engine::BuiltinEngine,
    host::{MemoryHost, RenderOutcome},
    markup::RawMarkup,
    sanitize::sanitize,
};

/// Run the Novaflow CLI application
///
/// # Errors
///
/// Returns `NovaflowError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Malformed generation responses
/// - Syntax errors, with diagnostics against the sanitized markup
/// - Rendering errors
pub fn run(args: &Args) -> Result<(), NovaflowError> {
    info!(
        input_path = args.input,
        output_path = args.output;
        "Processing chart"
    );

    let app_config = config::load_config(args.config.as_ref())?;
    let raw = read_markup(args)?;

    if args.sanitize_only {
        let sanitized = sanitize(raw.as_str());
        fs::write(&args.output, sanitized.as_str())?;
        info!(output_file = args.output; "Sanitized markup written");
        return Ok(());
    }

    match render_chart(raw, &app_config)? {
        Some(svg) => {
            fs::write(&args.output, svg)?;
            info!(output_file = args.output; "SVG exported successfully");
        }
        None => info!("No chart to display"),
    }

    Ok(())
}

fn read_markup(args: &Args) -> Result<RawMarkup, NovaflowError> {
    let source = if args.reads_stdin() {
        io::read_to_string(io::stdin())?
    } else {
        fs::read_to_string(&args.input)?
    };

    if !args.json {
        return Ok(RawMarkup::from(source));
    }

    let response = GenerationResponse::from_json(&source)?;
    if let Some(warning) = response.warning() {
        warn!(warning; "Generation response carried a warning");
    }
    Ok(response.into_markup())
}

/// Render `raw` once and return the serialized graphic, or `None` when
/// there is nothing to display.
fn render_chart(raw: RawMarkup, app_config: &AppConfig) -> Result<Option<String>, NovaflowError> {
    // A single render never overlaps another, so skip the debounce delay.
    let config = AppConfig::new(
        app_config.engine().clone(),
        RendererConfig::new(Duration::ZERO),
    );
    let host = Arc::new(MemoryHost::new());
    let renderer = DiagramRenderer::new(Arc::new(BuiltinEngine::new()), host.clone(), config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let outcome = runtime.block_on(renderer.render(raw));

    if !matches!(outcome, SessionOutcome::Applied(phase) if phase.is_terminal()) {
        return Err(NovaflowError::Input(format!(
            "render session ended without a result: {outcome:?}"
        )));
    }

    match host.last_outcome() {
        Some(RenderOutcome::Success { handle, .. }) => Ok(Some(handle.serialize())),
        Some(RenderOutcome::Failure { error, markup }) => Err(failure_to_error(error, markup)),
        Some(RenderOutcome::Empty) | None => Ok(None),
    }
}

/// Prefer the parser's diagnostics over the flattened message so the
/// report can point into the markup.
fn failure_to_error(error: RenderError, markup: String) -> NovaflowError {
    if error.is_parse() {
        if let Err(err) = novaflow_parser::check_syntax(&markup) {
            return NovaflowError::new_parse_error(err, markup);
        }
    }
    error.into()
}
