//! Registry configuration and the per-session bookkeeping entry.

use rollcall_protocol::{Session, SessionId, UserId};
use tracing::warn;

// ---------------------------------------------------------------------------
// RegistryConfig
// ---------------------------------------------------------------------------

/// Bounds on the sessions a teacher may open.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Shortest allowed session, in minutes.
    pub min_duration_minutes: u32,
    /// Longest allowed session, in minutes.
    pub max_duration_minutes: u32,
    /// Duration used when a caller passes 0 ("use the default").
    pub default_duration_minutes: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            min_duration_minutes: 1,
            max_duration_minutes: 240,
            default_duration_minutes: 120,
        }
    }
}

impl RegistryConfig {
    /// Fix inconsistent bounds. A zero minimum is raised to 1 (a session
    /// must have `expires_at > issued_at`), `max` is raised to `min`, and the
    /// default is clamped into range.
    pub fn validated(mut self) -> Self {
        if self.min_duration_minutes == 0 {
            warn!("min_duration_minutes is 0, raising to 1");
            self.min_duration_minutes = 1;
        }
        if self.max_duration_minutes < self.min_duration_minutes {
            warn!(
                min = self.min_duration_minutes,
                max = self.max_duration_minutes,
                "max_duration_minutes below minimum, raising"
            );
            self.max_duration_minutes = self.min_duration_minutes;
        }
        self.default_duration_minutes = self
            .default_duration_minutes
            .clamp(self.min_duration_minutes, self.max_duration_minutes);
        self
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Whether a session is still the class's current one.
///
/// ```text
///   Open ──(teacher regenerates)──→ Superseded
/// ```
///
/// Expiry is not a state: it is `now >= expires_at`, computed on demand.
/// A superseded session is treated as expired for marking, but stays in the
/// registry because attendance history refers to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Superseded { at_ms: u64, by: SessionId },
}

// ---------------------------------------------------------------------------
// SessionEntry
// ---------------------------------------------------------------------------

/// A session as the registry stores it.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub session: Session,
    pub state: SessionState,
    /// The teacher who generated it.
    pub created_by: UserId,
}

impl SessionEntry {
    /// `true` if a mark against this session must be refused at `now_ms`.
    pub fn is_closed_at(&self, now_ms: u64) -> bool {
        matches!(self.state, SessionState::Superseded { .. }) || self.session.is_expired_at(now_ms)
    }
}
