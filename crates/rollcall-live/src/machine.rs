//! The client-side session state machine.
//!
//! Pure and synchronous: no timers, no I/O, and the current time is always
//! passed in. The presenter actor drives it; tests drive it directly.
//!
//! ```text
//!             ┌──────── poll: Some(unexpired) ────────┐
//!             │                                       ▼
//! Loading ──→ NoSession ←── poll: None ─────────── Active
//!    │            ▲                                   │
//!    │            └──────── poll: None ─────────── Expired ←─ tick(now >= expires_at)
//!    └──(failure)──→ Error
//! ```
//!
//! Poll responses can arrive out of order (each poll is its own task), so
//! every poll carries a sequence number from [`SessionMachine::begin_poll`]
//! and anything at or below the last applied sequence is discarded.

use rollcall_protocol::{Session, SessionId};

/// What the screen should show about the class's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionView {
    /// No live lecture.
    NoSession,
    /// A session is open; the QR symbol should be visible.
    Active {
        session_id: SessionId,
        payload: String,
        expires_at_ms: u64,
    },
    /// The last known session ran out. The next poll will say what is next.
    Expired { session_id: SessionId },
}

/// Where the screen is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// No poll has answered yet.
    Loading,
    Ready(SessionView),
    /// The first poll failed, or failures persisted long enough to stop
    /// trusting the last known view.
    Error { reason: String },
}

/// Whether a poll outcome changed the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Applied,
    /// An answer to an older poll than one already applied. Ignored.
    Stale,
}

/// Render model for the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub phase: Phase,
    /// Whole seconds until expiry, rounded up. Only while `Active`.
    pub seconds_left: Option<u64>,
    /// Transient warning ("couldn't refresh") shown over a still-valid view.
    pub banner: Option<String>,
    pub consecutive_failures: u32,
    /// Sequence number of the last poll outcome applied.
    pub applied_seq: u64,
}

impl Snapshot {
    /// The current view, if the machine is `Ready`.
    pub fn view(&self) -> Option<&SessionView> {
        match &self.phase {
            Phase::Ready(view) => Some(view),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.view(), Some(SessionView::Active { .. }))
    }
}

/// Tracks the class's session as seen from one screen.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    phase: Phase,
    banner: Option<String>,
    next_seq: u64,
    applied_seq: u64,
    consecutive_failures: u32,
    clear_after_failures: u32,
}

impl SessionMachine {
    /// Creates a machine in `Loading` that clears its view after
    /// `clear_after_failures` consecutive failed polls (minimum 2).
    pub fn new(clear_after_failures: u32) -> Self {
        Self {
            phase: Phase::Loading,
            banner: None,
            next_seq: 0,
            applied_seq: 0,
            consecutive_failures: 0,
            clear_after_failures: clear_after_failures.max(2),
        }
    }

    /// Hands out the sequence number for a poll about to be sent.
    pub fn begin_poll(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Applies a successful poll. `None` means the class has no session.
    pub fn apply_response(&mut self, seq: u64, session: Option<Session>, now_ms: u64) -> PollOutcome {
        if seq <= self.applied_seq {
            tracing::debug!(seq, applied = self.applied_seq, "stale poll response dropped");
            return PollOutcome::Stale;
        }
        self.applied_seq = seq;
        self.consecutive_failures = 0;
        self.banner = None;

        let view = match session {
            None => SessionView::NoSession,
            Some(s) if s.is_expired_at(now_ms) => SessionView::Expired {
                session_id: s.session_id,
            },
            Some(s) => SessionView::Active {
                session_id: s.session_id,
                payload: s.payload,
                expires_at_ms: s.expires_at_ms,
            },
        };
        self.phase = Phase::Ready(view);
        PollOutcome::Applied
    }

    /// Applies a failed poll.
    ///
    /// While still `Loading` the failure is shown at once. Otherwise the last
    /// view is kept under a banner until the failures reach the configured
    /// limit.
    pub fn apply_failure(&mut self, seq: u64, reason: impl Into<String>) -> PollOutcome {
        if seq <= self.applied_seq {
            tracing::debug!(seq, applied = self.applied_seq, "stale poll failure dropped");
            return PollOutcome::Stale;
        }
        self.applied_seq = seq;
        self.consecutive_failures += 1;
        let reason = reason.into();

        match self.phase {
            Phase::Loading | Phase::Error { .. } => {
                self.banner = None;
                self.phase = Phase::Error { reason };
            }
            Phase::Ready(_) if self.consecutive_failures >= self.clear_after_failures => {
                tracing::warn!(
                    failures = self.consecutive_failures,
                    "poll keeps failing, clearing view"
                );
                self.banner = None;
                self.phase = Phase::Error { reason };
            }
            Phase::Ready(_) => {
                self.banner = Some(reason);
            }
        }
        PollOutcome::Applied
    }

    /// Local clock check. Moves `Active` to `Expired` once `now_ms` reaches
    /// the expiry. Returns `true` if that happened.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        let Phase::Ready(SessionView::Active {
            session_id,
            expires_at_ms,
            ..
        }) = &self.phase
        else {
            return false;
        };
        if now_ms < *expires_at_ms {
            return false;
        }
        let session_id = session_id.clone();
        tracing::info!(%session_id, "session expired locally");
        self.phase = Phase::Ready(SessionView::Expired { session_id });
        true
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Builds the render model at `now_ms`.
    pub fn snapshot(&self, now_ms: u64) -> Snapshot {
        let seconds_left = match &self.phase {
            Phase::Ready(SessionView::Active { expires_at_ms, .. }) => {
                Some(expires_at_ms.saturating_sub(now_ms).div_ceil(1000))
            }
            _ => None,
        };
        Snapshot {
            phase: self.phase.clone(),
            seconds_left,
            banner: self.banner.clone(),
            consecutive_failures: self.consecutive_failures,
            applied_seq: self.applied_seq,
        }
    }
}
