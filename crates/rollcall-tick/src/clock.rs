//! Wall clocks.
//!
//! Session expiry is an absolute timestamp (ms since the Unix epoch), so
//! the attendance screens need "what time is it now" rather than a
//! monotonic instant. [`Clock`] abstracts that so tests can drive time.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::Instant as TokioInstant;

/// Source of the current wall-clock time in milliseconds since the epoch.
pub trait Clock: Send + Sync + 'static {
    fn now_ms(&self) -> u64;
}

/// Clocks are shared between actors, so they travel as trait objects.
pub type SharedClock = Arc<dyn Clock>;

/// The operating system's wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// A wall clock derived from tokio's clock.
///
/// Anchored at an epoch timestamp when created, then advanced by tokio's
/// monotonic instant. Under `#[tokio::test(start_paused = true)]` it moves
/// exactly when `tokio::time::advance` (or auto-advance) moves, which keeps
/// countdown tests deterministic. In production it is immune to wall-clock
/// jumps for the lifetime of a screen.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    epoch_ms: u64,
    origin: TokioInstant,
}

impl TokioClock {
    /// Anchors at the system's current wall-clock time.
    pub fn new() -> Self {
        Self::starting_at(SystemClock.now_ms())
    }

    /// Anchors at an explicit epoch timestamp.
    pub fn starting_at(epoch_ms: u64) -> Self {
        Self {
            epoch_ms,
            origin: TokioInstant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> u64 {
        self.epoch_ms + self.origin.elapsed().as_millis() as u64
    }
}

/// A clock that only moves when told to. For synchronous tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(now_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
