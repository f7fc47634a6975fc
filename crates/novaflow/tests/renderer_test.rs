//! State machine tests for `DiagramRenderer`.
//!
//! `GatedEngine` holds selected render calls until the test releases them,
//! which lets a test resolve engine calls in any order.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use novaflow::{
    DiagramRenderer, SessionOutcome,
    config::{AppConfig, EngineOptions, RendererConfig},
    engine::{BuiltinEngine, DiagramEngine, EngineError, RenderedMarkup},
    graphic::Container,
    host::{MemoryHost, RenderHost, RenderOutcome},
    sanitize::sanitize,
    session::Phase,
};

struct Gate {
    entered: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

#[derive(Default)]
struct GatedEngine {
    gates: Mutex<HashMap<String, Gate>>,
    checked: Mutex<Vec<String>>,
    rendered: Mutex<Vec<String>>,
    failures_left: AtomicUsize,
}

impl GatedEngine {
    /// Hold renders of `raw` (after sanitizing) until released.
    ///
    /// Returns a receiver that fires once the render call has started, and
    /// the sender that lets it finish.
    fn gate(&self, raw: &str) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (entered_tx, entered_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        self.gates.lock().insert(
            sanitize(raw).into_string(),
            Gate {
                entered: entered_tx,
                release: release_rx,
            },
        );
        (entered_rx, release_tx)
    }

    fn fail_next_renders(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    fn checked(&self) -> Vec<String> {
        self.checked.lock().clone()
    }

    fn rendered(&self) -> Vec<String> {
        self.rendered.lock().clone()
    }
}

#[async_trait]
impl DiagramEngine for GatedEngine {
    async fn check_syntax(&self, markup: &str) -> Result<(), EngineError> {
        self.checked.lock().push(markup.to_string());
        if markup.contains("INVALID") {
            return Err(EngineError::Failed("unexpected token INVALID".to_string()));
        }
        Ok(())
    }

    async fn render(
        &self,
        element_id: &str,
        markup: &str,
        _options: &EngineOptions,
    ) -> Result<RenderedMarkup, EngineError> {
        self.rendered.lock().push(markup.to_string());

        let gate = self.gates.lock().remove(markup);
        if let Some(gate) = gate {
            let _ = gate.entered.send(());
            let _ = gate.release.await;
        }

        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed || markup.contains("BROKEN") {
            return Err(EngineError::Failed("engine crashed".to_string()));
        }

        if markup.contains("BLANK") {
            return Ok(RenderedMarkup::new(""));
        }

        Ok(RenderedMarkup::new(format!(
            r#"<svg id="{element_id}" width="120" height="60"><text>{}</text></svg>"#,
            markup.lines().count()
        )))
    }
}

fn config(debounce: Duration) -> AppConfig {
    AppConfig::new(EngineOptions::default(), RendererConfig::new(debounce))
}

fn setup(engine: Arc<GatedEngine>) -> (Arc<MemoryHost>, DiagramRenderer) {
    let host = Arc::new(MemoryHost::new());
    let renderer = DiagramRenderer::new(engine, host.clone(), config(Duration::ZERO));
    (host, renderer)
}

fn displayed_ids(host: &MemoryHost) -> Vec<String> {
    host.container()
        .map(|container| {
            container
                .children()
                .iter()
                .map(|(id, _)| id.clone())
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_valid_markup_renders() {
    let engine = Arc::new(GatedEngine::default());
    let (host, renderer) = setup(engine.clone());

    let outcome = renderer.render("graph TD\n    A --> B").await;

    assert_eq!(outcome, SessionOutcome::Applied(Phase::Done));
    assert_eq!(renderer.phase(), Phase::Done);

    let token = renderer.current_token().unwrap();
    assert_eq!(
        host.phases_for(token),
        [
            Phase::Idle,
            Phase::Sanitizing,
            Phase::Validating,
            Phase::Rendering,
            Phase::Done
        ]
    );

    let outcomes = host.outcomes();
    assert_eq!(outcomes.len(), 1);
    match &outcomes[0] {
        RenderOutcome::Success {
            handle,
            width,
            height,
            export_ready,
        } => {
            assert_eq!(handle.element_id(), token.element_id());
            assert_eq!(*width, 120.0);
            assert_eq!(*height, 60.0);
            assert!(*export_ready);
        }
        other => panic!("expected success, got {other:?}"),
    }
    assert_eq!(displayed_ids(&host), [token.element_id()]);
}

#[tokio::test]
async fn test_invalid_markup_fails_once() {
    let engine = Arc::new(GatedEngine::default());
    let (host, renderer) = setup(engine.clone());

    let outcome = renderer.render("graph TD\n    INVALID").await;

    assert_eq!(outcome, SessionOutcome::Applied(Phase::Failed));
    let token = renderer.current_token().unwrap();
    assert_eq!(
        host.phases_for(token),
        [Phase::Idle, Phase::Sanitizing, Phase::Validating, Phase::Failed]
    );

    let outcomes = host.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(
        outcomes[0].message().as_deref(),
        Some("Invalid syntax: unexpected token INVALID")
    );
    assert!(engine.rendered().is_empty());
    assert!(displayed_ids(&host).is_empty());
}

#[tokio::test]
async fn test_empty_markup_skips_validation() {
    let engine = Arc::new(GatedEngine::default());
    let (host, renderer) = setup(engine.clone());

    for raw in ["", "   \n\t", "```\n\n```", "```mermaid\n```"] {
        let outcome = renderer.render(raw).await;
        assert_eq!(outcome, SessionOutcome::Applied(Phase::Done), "{raw:?}");
        assert!(matches!(host.last_outcome(), Some(RenderOutcome::Empty)));
    }

    let token = renderer.current_token().unwrap();
    assert_eq!(
        host.phases_for(token),
        [Phase::Idle, Phase::Sanitizing, Phase::Done]
    );
    assert!(engine.checked().is_empty());
    assert!(engine.rendered().is_empty());
}

#[tokio::test]
async fn test_stale_result_is_discarded() {
    let engine = Arc::new(GatedEngine::default());
    let (host, renderer) = setup(engine.clone());

    let (entered_a, release_a) = engine.gate("graph TD\n    A --> B");

    let (a, b) = tokio::join!(renderer.render("graph TD\n    A --> B"), async {
        entered_a.await.unwrap();
        let b = renderer.render("graph LR\n    C --> D\n    D --> E").await;
        release_a.send(()).unwrap();
        b
    });

    assert_eq!(a, SessionOutcome::Superseded);
    assert_eq!(b, SessionOutcome::Applied(Phase::Done));

    let outcomes = host.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(
        outcomes[0].handle().unwrap().element_id(),
        "novaflow-2"
    );
    assert_eq!(displayed_ids(&host), ["novaflow-2"]);
    assert_eq!(renderer.phase(), Phase::Done);
}

#[tokio::test]
async fn test_out_of_order_resolution_keeps_newest() {
    let engine = Arc::new(GatedEngine::default());
    let (host, renderer) = setup(engine.clone());

    let (entered_a, release_a) = engine.gate("graph TD\n    A --> B");
    let (entered_b, release_b) = engine.gate("graph TD\n    BROKEN --> C");
    let (a_done_tx, a_done_rx) = oneshot::channel();

    let (a, b, ()) = tokio::join!(
        async {
            let a = renderer.render("graph TD\n    A --> B").await;
            a_done_tx.send(()).unwrap();
            a
        },
        async {
            entered_a.await.unwrap();
            renderer.render("graph TD\n    BROKEN --> C").await
        },
        async {
            // The older session resolves first, then the newer one fails.
            entered_b.await.unwrap();
            release_a.send(()).unwrap();
            a_done_rx.await.unwrap();
            release_b.send(()).unwrap();
        }
    );

    assert_eq!(a, SessionOutcome::Superseded);
    assert_eq!(b, SessionOutcome::Applied(Phase::Failed));

    let outcomes = host.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(
        outcomes[0].message().as_deref(),
        Some("Failed to render chart: engine crashed")
    );
    assert!(displayed_ids(&host).is_empty());
}

#[tokio::test]
async fn test_container_is_cleared_on_new_session() {
    let engine = Arc::new(GatedEngine::default());
    let (host, renderer) = setup(engine.clone());

    renderer.render("graph TD\n    A --> B").await;
    assert_eq!(displayed_ids(&host).len(), 1);

    renderer.render("graph TD\n    INVALID").await;
    assert!(displayed_ids(&host).is_empty());
}

#[tokio::test]
async fn test_unusable_output_is_a_render_failure() {
    let engine = Arc::new(GatedEngine::default());
    let (host, renderer) = setup(engine.clone());

    let outcome = renderer.render("graph TD\n    BLANK").await;

    assert_eq!(outcome, SessionOutcome::Applied(Phase::Failed));
    let token = renderer.current_token().unwrap();
    assert_eq!(
        host.phases_for(token),
        [
            Phase::Idle,
            Phase::Sanitizing,
            Phase::Validating,
            Phase::Rendering,
            Phase::Failed
        ]
    );
    assert_eq!(
        host.last_outcome().unwrap().message().as_deref(),
        Some("Failed to render chart: Failed to generate SVG from chart code")
    );
}

#[tokio::test]
async fn test_retry_reuses_raw_markup() {
    let engine = Arc::new(GatedEngine::default());
    let (host, renderer) = setup(engine.clone());
    engine.fail_next_renders(1);

    let raw = "```\ngraph LR\n    title Release\n    A-->B\n```";
    let outcome = renderer.render(raw).await;
    assert_eq!(outcome, SessionOutcome::Applied(Phase::Failed));
    assert_eq!(
        host.last_outcome().unwrap().message().as_deref(),
        Some("Failed to render chart: engine crashed")
    );

    let retried = renderer.retry().await;
    assert_eq!(retried, Some(SessionOutcome::Applied(Phase::Done)));

    let rendered = engine.rendered();
    assert_eq!(rendered.len(), 2);
    assert_eq!(rendered[0], rendered[1]);
    assert_eq!(rendered[1], sanitize(raw).as_str());
    assert_eq!(host.outcomes().len(), 2);

    let token = renderer.current_token().unwrap();
    assert_eq!(host.phases_for(token)[0], Phase::Idle);
    assert_eq!(renderer.retry().await, None);
}

#[tokio::test]
async fn test_detach_discards_in_flight_session() {
    let engine = Arc::new(GatedEngine::default());
    let (host, renderer) = setup(engine.clone());

    let (entered, release) = engine.gate("graph TD\n    A --> B");

    let (outcome, ()) = tokio::join!(renderer.render("graph TD\n    A --> B"), async {
        entered.await.unwrap();
        renderer.detach();
        host.tear_down();
        release.send(()).unwrap();
    });

    assert_eq!(outcome, SessionOutcome::Superseded);
    assert_eq!(renderer.phase(), Phase::Idle);
    assert!(host.outcomes().is_empty());
}

#[tokio::test]
async fn test_host_teardown_is_a_no_op() {
    let engine = Arc::new(GatedEngine::default());
    let (host, renderer) = setup(engine.clone());

    let (entered, release) = engine.gate("graph TD\n    A --> B");

    let (outcome, ()) = tokio::join!(renderer.render("graph TD\n    A --> B"), async {
        entered.await.unwrap();
        host.tear_down();
        release.send(()).unwrap();
    });
    assert_eq!(outcome, SessionOutcome::HostUnavailable);
    assert!(host.outcomes().is_empty());
    assert_eq!(renderer.phase(), Phase::Idle);

    // A torn down host is never written to.
    let outcome = renderer.render("graph TD\n    C --> D").await;
    assert_eq!(outcome, SessionOutcome::HostUnavailable);
    assert!(host.outcomes().is_empty());
    assert_eq!(renderer.phase(), Phase::Idle);
    assert_eq!(engine.checked().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_debounce_skips_superseded_input() {
    let engine = Arc::new(GatedEngine::default());
    let host = Arc::new(MemoryHost::new());
    let renderer = DiagramRenderer::new(
        engine.clone(),
        host.clone(),
        config(Duration::from_millis(300)),
    );

    let (first, second) = tokio::join!(renderer.render("graph TD\n    A"), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        renderer.render("graph TD\n    A --> B").await
    });

    assert_eq!(first, SessionOutcome::Superseded);
    assert_eq!(second, SessionOutcome::Applied(Phase::Done));
    assert_eq!(engine.checked(), ["graph TD\n    A --> B"]);
    assert_eq!(host.outcomes().len(), 1);
}

#[tokio::test]
async fn test_builtin_engine_end_to_end() {
    let host = Arc::new(MemoryHost::new());
    let renderer = DiagramRenderer::new(
        Arc::new(BuiltinEngine::new()),
        host.clone(),
        config(Duration::ZERO),
    );

    let raw = "```mermaid\ngraph TD\n  A[Start] --> B[End]\n```";
    assert_eq!(sanitize(raw), "graph TD\n  A[Start] --> B[End]");

    let outcome = renderer.render(raw).await;
    assert_eq!(outcome, SessionOutcome::Applied(Phase::Done));

    let last = host.last_outcome().unwrap();
    let RenderOutcome::Success {
        handle,
        export_ready,
        ..
    } = &last
    else {
        panic!("expected success, got {last:?}");
    };
    assert!(*export_ready);

    let svg = handle.serialize();
    assert!(svg.contains("max-width: 100%; height: auto;"));
    assert!(svg.contains("Start"));
    assert!(svg.contains("End"));

    let container = host.container().unwrap();
    assert!(!container.is_empty());
    assert_eq!(container.children()[0].1, svg);
}

#[tokio::test]
async fn test_builtin_engine_reports_syntax_errors() {
    let host = Arc::new(MemoryHost::new());
    let renderer = DiagramRenderer::new(
        Arc::new(BuiltinEngine::new()),
        host.clone(),
        config(Duration::ZERO),
    );

    let outcome = renderer.render("sequenceDiagram\n    Alice->>Bob: hi").await;
    assert_eq!(outcome, SessionOutcome::Applied(Phase::Failed));

    let message = host.last_outcome().unwrap().message().unwrap().to_string();
    assert!(message.starts_with("Invalid syntax: "), "{message}");
    assert!(message.contains("unsupported diagram type"), "{message}");
}

#[test]
fn test_host_is_object_safe() {
    let host: Arc<dyn RenderHost> = Arc::new(MemoryHost::new());
    host.with_container(&mut |container: &mut dyn Container| {
        container.append("g", "<svg/>")
    })
    .unwrap();
    assert!(host.is_attached());
}
