//! The render state machine.
//!
//! [`DiagramRenderer`] drives one host region through
//! `Idle -> Sanitizing -> Validating -> Rendering -> {Done, Failed}`.
//!
//! Render calls may overlap. Each call takes a fresh [`SessionToken`], and a
//! session only writes to the host while its token is the newest one, so the
//! last invocation wins regardless of the order engine calls resolve in.
//! Tokens are issued and checked under the region lock; hosts must not call
//! back into the renderer from their callbacks.

use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex;

use novaflow_core::{
    graphic::{GraphicHandle, SvgGraphic},
    markup::{RawMarkup, SanitizedMarkup},
    sanitize::sanitize,
};

use crate::{
    config::{AppConfig, EngineOptions, RendererConfig},
    engine::{DiagramEngine, ensure_engine_configured},
    error::RenderError,
    host::{RenderHost, RenderOutcome},
    session::{Phase, RenderSession, SessionToken, TokenCounter},
    validator::DiagramValidator,
};

/// What became of one render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The session's result reached the host; carries the terminal phase.
    Applied(Phase),

    /// A newer invocation started first; the result was discarded.
    Superseded,

    /// The host went away; nothing was written.
    HostUnavailable,
}

#[derive(Debug, Default)]
struct Region {
    phase: Phase,
    last_raw: Option<RawMarkup>,
}

/// Sanitizes, validates, and renders markup into a [`RenderHost`].
pub struct DiagramRenderer {
    engine: Arc<dyn DiagramEngine>,
    validator: DiagramValidator,
    host: Arc<dyn RenderHost>,
    engine_options: EngineOptions,
    config: RendererConfig,
    tokens: TokenCounter,
    region: Mutex<Region>,
}

impl DiagramRenderer {
    pub fn new(
        engine: Arc<dyn DiagramEngine>,
        host: Arc<dyn RenderHost>,
        config: AppConfig,
    ) -> Self {
        Self {
            validator: DiagramValidator::new(Arc::clone(&engine)),
            engine,
            host,
            engine_options: config.engine().clone(),
            config: config.renderer().clone(),
            tokens: TokenCounter::new(),
            region: Mutex::new(Region::default()),
        }
    }

    /// Phase of the newest session.
    pub fn phase(&self) -> Phase {
        self.region.lock().phase
    }

    /// Token of the newest session, if any render has started.
    pub fn current_token(&self) -> Option<SessionToken> {
        self.tokens.latest()
    }

    /// Render `raw` into the host.
    ///
    /// The call waits out the configured debounce delay first. If another
    /// render starts meanwhile, this one ends as
    /// [`SessionOutcome::Superseded`] without touching the engine.
    pub async fn render(&self, raw: impl Into<RawMarkup>) -> SessionOutcome {
        let session = self.start(raw.into());

        let debounce = self.config.debounce();
        if !debounce.is_zero() {
            tokio::time::sleep(debounce).await;
            if !self.tokens.is_current(session.token()) {
                debug!(token:% = session.token(); "Render superseded during debounce");
                return SessionOutcome::Superseded;
            }
        }

        self.run(session).await
    }

    /// Render the last raw markup again.
    ///
    /// Returns `None` unless the newest session failed. The original raw
    /// markup is reused, not its sanitized form.
    pub async fn retry(&self) -> Option<SessionOutcome> {
        let raw = {
            let region = self.region.lock();
            if region.phase != Phase::Failed {
                debug!(phase:% = region.phase; "Nothing to retry");
                return None;
            }
            region.last_raw.clone()?
        };

        info!("Retrying render");
        let session = self.start(raw);
        Some(self.run(session).await)
    }

    /// Invalidate any in-flight session and return the region to idle.
    ///
    /// Called when the host is being torn down.
    pub fn detach(&self) {
        let mut region = self.region.lock();
        let token = self.tokens.issue();
        region.phase = Phase::Idle;
        info!(token:% = token; "Renderer detached from host");
    }

    fn start(&self, raw: RawMarkup) -> RenderSession {
        let mut region = self.region.lock();
        let token = self.tokens.issue();
        region.last_raw = Some(raw.clone());
        region.phase = Phase::Idle;

        if self.host.is_attached() {
            self.host.phase_changed(token, Phase::Idle);
        }
        debug!(token:% = token, bytes = raw.as_str().len(); "Render session started");

        RenderSession::new(token, raw)
    }

    async fn run(&self, mut session: RenderSession) -> SessionOutcome {
        match self.drive(&mut session).await {
            Ok(outcome) | Err(outcome) => outcome,
        }
    }

    /// Runs the pipeline; `Err` carries an early exit.
    async fn drive(&self, session: &mut RenderSession) -> Result<SessionOutcome, SessionOutcome> {
        let options = ensure_engine_configured(&self.engine_options);

        self.enter(session, Phase::Sanitizing)?;
        let sanitized = sanitize(session.raw().as_str());
        if sanitized.is_empty() {
            debug!(token:% = session.token(); "No chart to display");
            return Ok(self.conclude(session, Phase::Done, RenderOutcome::Empty));
        }

        self.enter(session, Phase::Validating)?;
        let validation = self.validator.validate(sanitized.as_str()).await;
        self.ensure_current(session)?;
        if let Err(err) = validation {
            return Ok(self.fail(session, err, &sanitized));
        }

        self.enter(session, Phase::Rendering)?;
        let element_id = session.token().element_id();
        let rendered = self
            .engine
            .render(&element_id, sanitized.as_str(), options)
            .await;
        self.ensure_current(session)?;

        let graphic = rendered
            .map_err(|err| RenderError::Render(err.to_string()))
            .and_then(|rendered| {
                SvgGraphic::from_markup(element_id, rendered.svg())
                    .map_err(|err| RenderError::Render(err.to_string()))
            });

        let outcome = match graphic {
            Ok(graphic) => {
                let size = graphic.intrinsic_size();
                RenderOutcome::Success {
                    handle: Arc::new(graphic),
                    width: size.width(),
                    height: size.height(),
                    export_ready: !size.is_degenerate(),
                }
            }
            Err(err) => return Ok(self.fail(session, err, &sanitized)),
        };

        Ok(self.conclude(session, Phase::Done, outcome))
    }

    fn ensure_current(&self, session: &RenderSession) -> Result<(), SessionOutcome> {
        if self.tokens.is_current(session.token()) {
            return Ok(());
        }
        debug!(
            token:% = session.token(),
            phase:% = session.phase();
            "Discarding result of superseded session"
        );
        Err(SessionOutcome::Superseded)
    }

    /// Move the current session into a non-terminal phase.
    ///
    /// Entering `Sanitizing` clears the container first.
    fn enter(&self, session: &mut RenderSession, phase: Phase) -> Result<(), SessionOutcome> {
        let mut region = self.region.lock();
        self.ensure_current(session)?;

        if phase == Phase::Sanitizing
            && self.host.with_container(&mut |container| container.clear()).is_err()
        {
            warn!(token:% = session.token(); "Render host unavailable, skipping render");
            region.phase = Phase::Idle;
            return Err(SessionOutcome::HostUnavailable);
        }

        if !session.advance(phase) {
            warn!(from:% = session.phase(), to:% = phase; "Ignoring invalid phase transition");
            return Ok(());
        }
        region.phase = phase;
        self.host.phase_changed(session.token(), phase);
        debug!(token:% = session.token(), phase:% = phase; "Render phase changed");

        Ok(())
    }

    fn fail(
        &self,
        session: &mut RenderSession,
        err: RenderError,
        sanitized: &SanitizedMarkup,
    ) -> SessionOutcome {
        warn!(token:% = session.token(), err:% = err; "Render failed");
        let outcome = RenderOutcome::Failure {
            error: err,
            markup: sanitized.as_str().to_string(),
        };
        self.conclude(session, Phase::Failed, outcome)
    }

    /// Apply a terminal outcome to the host if the session is still current.
    fn conclude(
        &self,
        session: &mut RenderSession,
        phase: Phase,
        outcome: RenderOutcome,
    ) -> SessionOutcome {
        let mut region = self.region.lock();
        if let Err(superseded) = self.ensure_current(session) {
            return superseded;
        }

        let attached = self.host.is_attached()
            && outcome.handle().is_none_or(|handle| {
                self.host
                    .with_container(&mut |container| handle.attach_to(container))
                    .is_ok()
            });
        if !attached {
            warn!(token:% = session.token(); "Render host unavailable, dropping result");
            region.phase = Phase::Idle;
            return SessionOutcome::HostUnavailable;
        }

        session.advance(phase);
        region.phase = phase;
        self.host.phase_changed(session.token(), phase);
        debug!(token:% = session.token(), phase:% = phase; "Render phase changed");
        self.host.notify(outcome);

        SessionOutcome::Applied(phase)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{engine::BuiltinEngine, host::MemoryHost};

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap()
            .block_on(future)
    }

    fn renderer(host: Arc<MemoryHost>) -> DiagramRenderer {
        let config = AppConfig::new(
            EngineOptions::default(),
            RendererConfig::new(Duration::ZERO),
        );
        DiagramRenderer::new(Arc::new(BuiltinEngine::new()), host, config)
    }

    #[test]
    fn test_initial_state() {
        let renderer = renderer(Arc::new(MemoryHost::new()));
        assert_eq!(renderer.phase(), Phase::Idle);
        assert_eq!(renderer.current_token(), None);
    }

    #[test]
    fn test_retry_requires_failure() {
        let host = Arc::new(MemoryHost::new());
        let renderer = renderer(Arc::clone(&host));

        assert_eq!(block_on(renderer.retry()), None);

        let outcome = block_on(renderer.render("graph TD\n    A --> B"));
        assert_eq!(outcome, SessionOutcome::Applied(Phase::Done));
        assert_eq!(block_on(renderer.retry()), None);
    }

    #[test]
    fn test_detach_returns_to_idle() {
        let host = Arc::new(MemoryHost::new());
        let renderer = renderer(Arc::clone(&host));

        block_on(renderer.render("graph TD\n    A[Start"));
        assert_eq!(renderer.phase(), Phase::Failed);

        renderer.detach();
        assert_eq!(renderer.phase(), Phase::Idle);
        assert_eq!(block_on(renderer.retry()), None);
    }
}
