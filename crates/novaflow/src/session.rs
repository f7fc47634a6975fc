//! Render sessions and their phases.
//!
//! Every render invocation gets a [`SessionToken`] from a monotonically
//! increasing counter. A session may only touch the host while its token is
//! the newest one issued for the region.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use novaflow_core::markup::RawMarkup;

/// Identifies one render invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionToken(u64);

impl SessionToken {
    pub fn value(self) -> u64 {
        self.0
    }

    /// Id given to the graphic element this session renders.
    pub fn element_id(self) -> String {
        format!("novaflow-{}", self.0)
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues tokens for one host region.
#[derive(Debug, Default)]
pub struct TokenCounter {
    last: AtomicU64,
}

impl TokenCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token newer than every token issued before.
    pub fn issue(&self) -> SessionToken {
        SessionToken(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// The newest token issued so far, if any.
    pub fn latest(&self) -> Option<SessionToken> {
        match self.last.load(Ordering::SeqCst) {
            0 => None,
            n => Some(SessionToken(n)),
        }
    }

    pub fn is_current(&self, token: SessionToken) -> bool {
        self.last.load(Ordering::SeqCst) == token.0
    }
}

/// Where a render session is in the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    #[default]
    Idle,
    Sanitizing,
    Validating,
    Rendering,
    Done,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true when a session may move from `self` to `next`.
    ///
    /// Any phase may return to `Idle` when the host detaches.
    pub fn can_advance_to(self, next: Phase) -> bool {
        use Phase::*;

        matches!(
            (self, next),
            (Idle | Done | Failed, Sanitizing)
                | (Sanitizing, Validating | Done)
                | (Validating, Rendering | Failed)
                | (Rendering, Done | Failed)
                | (_, Idle)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Sanitizing => "sanitizing",
            Self::Validating => "validating",
            Self::Rendering => "rendering",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one render attempt.
#[derive(Debug, Clone)]
pub struct RenderSession {
    token: SessionToken,
    raw: RawMarkup,
    phase: Phase,
}

impl RenderSession {
    pub fn new(token: SessionToken, raw: RawMarkup) -> Self {
        Self {
            token,
            raw,
            phase: Phase::Idle,
        }
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub fn raw(&self) -> &RawMarkup {
        &self.raw
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Move to `next`, returning false and staying put if the move is not
    /// allowed.
    pub fn advance(&mut self, next: Phase) -> bool {
        if !self.phase.can_advance_to(next) {
            return false;
        }
        self.phase = next;
        true
    }
}
