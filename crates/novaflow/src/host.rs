//! The render host contract and an in-memory host.
//!
//! A [`RenderHost`] owns the container a diagram is displayed in. The
//! renderer writes to the container and reports phases and outcomes back;
//! the host decides how loading, errors, and the retry control look.

use std::{fmt, sync::Arc};

use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use novaflow_core::graphic::{Container, GraphicHandle};

use crate::{
    error::RenderError,
    session::{Phase, SessionToken},
};

/// The host's mount point is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("render host is unavailable")]
pub struct HostUnavailable;

/// Terminal result of one render session, as delivered to the host.
#[derive(Clone)]
pub enum RenderOutcome {
    Success {
        handle: Arc<dyn GraphicHandle>,
        width: f32,
        height: f32,
        /// The handle can be serialized for export.
        export_ready: bool,
    },

    /// The markup was empty; there is nothing to display.
    Empty,

    Failure {
        /// Its display string is shown next to a retry control.
        error: RenderError,
        markup: String,
    },
}

impl RenderOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    pub fn error(&self) -> Option<&RenderError> {
        match self {
            Self::Failure { error, .. } => Some(error),
            _ => None,
        }
    }

    /// The user-facing message of a failure.
    pub fn message(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }

    pub fn handle(&self) -> Option<&Arc<dyn GraphicHandle>> {
        match self {
            Self::Success { handle, .. } => Some(handle),
            _ => None,
        }
    }
}

impl fmt::Debug for RenderOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success {
                handle,
                width,
                height,
                export_ready,
            } => f
                .debug_struct("Success")
                .field("element_id", &handle.element_id())
                .field("width", width)
                .field("height", height)
                .field("export_ready", export_ready)
                .finish(),
            Self::Empty => f.write_str("Empty"),
            Self::Failure { error, markup } => f
                .debug_struct("Failure")
                .field("error", error)
                .field("markup", markup)
                .finish(),
        }
    }
}

/// The UI surface a [`DiagramRenderer`](crate::renderer::DiagramRenderer)
/// draws into.
pub trait RenderHost: Send + Sync {
    /// Returns false once the host has been torn down.
    fn is_attached(&self) -> bool;

    /// Run `f` against the mount point.
    ///
    /// # Errors
    ///
    /// Returns [`HostUnavailable`] when the mount point is gone.
    fn with_container(
        &self,
        f: &mut dyn FnMut(&mut dyn Container),
    ) -> Result<(), HostUnavailable>;

    /// Called when the current session enters a new phase.
    fn phase_changed(&self, token: SessionToken, phase: Phase);

    /// Called once per session that reaches a terminal phase.
    fn notify(&self, outcome: RenderOutcome);
}

/// A container that keeps appended content in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryContainer {
    children: Vec<(String, String)>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(element_id, content)` pairs in append order.
    pub fn children(&self) -> &[(String, String)] {
        &self.children
    }
}

impl Container for MemoryContainer {
    fn clear(&mut self) {
        self.children.clear();
    }

    fn append(&mut self, element_id: &str, content: &str) {
        self.children
            .push((element_id.to_string(), content.to_string()));
    }

    fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// An in-memory [`RenderHost`] that records everything it is told.
///
/// Used by the CLI, and by tests to observe phase sequences and
/// notifications.
#[derive(Debug)]
pub struct MemoryHost {
    container: RwLock<Option<MemoryContainer>>,
    phases: Mutex<Vec<(SessionToken, Phase)>>,
    outcomes: Mutex<Vec<RenderOutcome>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            container: RwLock::new(Some(MemoryContainer::new())),
            phases: Mutex::new(Vec::new()),
            outcomes: Mutex::new(Vec::new()),
        }
    }

    /// Drop the mount point. Later container access fails.
    pub fn tear_down(&self) {
        *self.container.write() = None;
    }

    /// Snapshot of the container, or `None` after teardown.
    pub fn container(&self) -> Option<MemoryContainer> {
        self.container.read().clone()
    }

    pub fn phases(&self) -> Vec<(SessionToken, Phase)> {
        self.phases.lock().clone()
    }

    /// Phases reported for one session, in order.
    pub fn phases_for(&self, token: SessionToken) -> Vec<Phase> {
        self.phases
            .lock()
            .iter()
            .filter(|(t, _)| *t == token)
            .map(|(_, phase)| *phase)
            .collect()
    }

    pub fn outcomes(&self) -> Vec<RenderOutcome> {
        self.outcomes.lock().clone()
    }

    pub fn last_outcome(&self) -> Option<RenderOutcome> {
        self.outcomes.lock().last().cloned()
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderHost for MemoryHost {
    fn is_attached(&self) -> bool {
        self.container.read().is_some()
    }

    fn with_container(
        &self,
        f: &mut dyn FnMut(&mut dyn Container),
    ) -> Result<(), HostUnavailable> {
        let mut guard = self.container.write();
        let container = guard.as_mut().ok_or(HostUnavailable)?;
        f(container);
        Ok(())
    }

    fn phase_changed(&self, token: SessionToken, phase: Phase) {
        self.phases.lock().push((token, phase));
    }

    fn notify(&self, outcome: RenderOutcome) {
        self.outcomes.lock().push(outcome);
    }
}

#[cfg(test)]
mod tests {
    use novaflow_core::graphic::SvgGraphic;

    use super::*;

    #[test]
    fn test_container_round_trip() {
        let host = MemoryHost::new();
        assert!(host.is_attached());

        host.with_container(&mut |container| container.append("g1", "<svg/>"))
            .unwrap();
        assert_eq!(host.container().unwrap().children().len(), 1);

        host.with_container(&mut |container| container.clear()).unwrap();
        assert!(host.container().unwrap().is_empty());
    }

    #[test]
    fn test_teardown_makes_host_unavailable() {
        let host = MemoryHost::new();
        host.tear_down();

        assert!(!host.is_attached());
        assert!(host.container().is_none());
        assert_eq!(
            host.with_container(&mut |_| {}).unwrap_err(),
            HostUnavailable
        );
    }

    #[test]
    fn test_outcome_accessors() {
        let graphic = SvgGraphic::from_markup("g1", "<svg width=\"10\" height=\"20\"/>").unwrap();
        let success = RenderOutcome::Success {
            handle: Arc::new(graphic),
            width: 10.0,
            height: 20.0,
            export_ready: true,
        };
        assert!(success.is_success());
        assert_eq!(success.handle().unwrap().element_id(), "g1");
        assert!(format!("{success:?}").contains("g1"));

        let failure = RenderOutcome::Failure {
            error: RenderError::Parse("oops".to_string()),
            markup: "graph TD\nA[".to_string(),
        };
        assert!(failure.is_failure());
        assert_eq!(failure.message().as_deref(), Some("Invalid syntax: oops"));
        assert!(failure.error().unwrap().is_parse());
        assert!(RenderOutcome::Empty.message().is_none());
    }
}
