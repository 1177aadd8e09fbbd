//! Timers and clocks for Rollcall's live screens.
//!
//! A screen runs several timers side by side, each in its own
//! [`TickScheduler`]:
//!
//! | timer       | period   | while                          |
//! |-------------|----------|--------------------------------|
//! | `poll`      | 5–30 s   | the presenter is mounted       |
//! | `countdown` | 1 s      | a session is active            |
//! | `sampling`  | ~900 ms  | the camera is scanning         |
//!
//! Timers that are switched off are [paused](TickScheduler::pause):
//! [`TickScheduler::wait_for_tick`] then pends forever, which lets it sit in
//! a `tokio::select!` arm without a guard.
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         biased;
//!         cmd = commands.recv() => { /* ... */ }
//!         _ = sampler.wait_for_tick() => {
//!             let decoded = codec.decode_frame(&lease.capture()?);
//!             sampler.record_tick_end();
//!         }
//!     }
//! }
//! ```
//!
//! A timer that falls behind (the loop was busy, or the process was
//! suspended) never bursts to catch up: the next deadline is always one
//! period after the tick that actually fired. Wall-clock time lives in
//! [`Clock`], not here.

mod clock;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock, TokioClock};

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::Instant as TokioInstant;
use tracing::{debug, trace, warn};

/// How a [`TickScheduler`] is set up.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Shows up as `timer = ...` in log lines.
    pub name: &'static str,
    /// `None` makes the scheduler idle: it never fires.
    pub period: Option<Duration>,
    /// The first deadline is pushed back by a random amount in
    /// `0..initial_jitter`.
    pub initial_jitter: Duration,
    /// First deadline is "now" instead of one period out.
    pub fire_immediately: bool,
    /// Work per tick above this fraction of the period logs a warning.
    pub budget_ratio: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            name: "tick",
            period: None,
            initial_jitter: Duration::ZERO,
            fire_immediately: false,
            budget_ratio: 0.8,
        }
    }
}

impl TickConfig {
    pub const MIN_PERIOD: Duration = Duration::from_millis(10);

    pub fn every(name: &'static str, period: Duration) -> Self {
        Self {
            name,
            period: Some(period),
            ..Self::default()
        }
    }

    /// Raises a tiny period to [`Self::MIN_PERIOD`] and keeps
    /// `budget_ratio` within `0.1..=1.0`.
    pub fn validated(mut self) -> Self {
        if let Some(period) = self.period.filter(|p| *p < Self::MIN_PERIOD) {
            warn!(
                timer = self.name,
                requested_ms = period.as_millis() as u64,
                "timer period too short, using minimum"
            );
            self.period = Some(Self::MIN_PERIOD);
        }
        self.budget_ratio = if self.budget_ratio.is_nan() {
            1.0
        } else {
            self.budget_ratio.clamp(0.1, 1.0)
        };
        self
    }
}

/// One fired tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// 1 for the first tick, counting up.
    pub seq: u64,
    /// How far past its deadline the tick was observed.
    pub late_by: Duration,
    /// Whole periods that went by without a tick.
    pub missed: u64,
}

/// Running counters for one scheduler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickStats {
    pub fired: u64,
    /// Ticks that found at least one whole period missed.
    pub stalls: u64,
    pub missed: u64,
    /// Work time reported through [`TickScheduler::record_tick_end`].
    pub last_work: Duration,
    pub slowest_work: Duration,
}

/// A single timer domain.
pub struct TickScheduler {
    config: TickConfig,
    deadline: Option<TokioInstant>,
    paused: bool,
    work_started: Option<Instant>,
    stats: TickStats,
}

impl TickScheduler {
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let deadline = config.period.map(|period| {
            let first = if config.fire_immediately {
                Duration::ZERO
            } else {
                period
            };
            TokioInstant::now() + first + jitter(config.initial_jitter)
        });
        debug!(
            timer = config.name,
            period_ms = config.period.map(|p| p.as_millis() as u64),
            "timer created"
        );
        Self {
            config,
            deadline,
            paused: false,
            work_started: None,
            stats: TickStats::default(),
        }
    }

    pub fn every(name: &'static str, period: Duration) -> Self {
        Self::new(TickConfig::every(name, period))
    }

    /// Resolves when the next tick is due. Pends forever while paused or
    /// idle.
    pub async fn wait_for_tick(&mut self) -> Tick {
        let (deadline, period) = match (self.deadline, self.config.period) {
            (Some(deadline), Some(period)) if !self.paused => (deadline, period),
            _ => return std::future::pending().await,
        };

        tokio::time::sleep_until(deadline).await;

        let now = TokioInstant::now();
        let late_by = now.saturating_duration_since(deadline);
        let missed = (late_by.as_nanos() / period.as_nanos()) as u64;
        self.deadline = Some(now + period);
        self.work_started = Some(Instant::now());

        self.stats.fired += 1;
        if missed > 0 {
            self.stats.stalls += 1;
            self.stats.missed += missed;
            debug!(timer = self.config.name, missed, "timer fell behind, not catching up");
        }
        trace!(timer = self.config.name, seq = self.stats.fired, "tick");

        Tick {
            seq: self.stats.fired,
            late_by,
            missed,
        }
    }

    /// Marks the end of the work started by the last tick. Warns when that
    /// work used more than `budget_ratio` of the period.
    pub fn record_tick_end(&mut self) {
        let Some(started) = self.work_started.take() else {
            return;
        };
        let work = started.elapsed();
        self.stats.last_work = work;
        self.stats.slowest_work = self.stats.slowest_work.max(work);

        if let Some(period) = self.config.period {
            let used = work.as_secs_f64() / period.as_secs_f64();
            if used >= self.config.budget_ratio {
                warn!(
                    timer = self.config.name,
                    work_ms = work.as_millis() as u64,
                    period_ms = period.as_millis() as u64,
                    "tick work is eating into the period"
                );
            }
        }
    }

    /// Stops firing until [`resume`](Self::resume).
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(timer = self.config.name, "timer paused");
        }
    }

    /// Restarts a paused timer. The next tick is one full period out.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.deadline = self.config.period.map(|p| TokioInstant::now() + p);
            debug!(timer = self.config.name, "timer resumed");
        }
    }

    /// Makes the next tick due now. Does not unpause.
    pub fn fire_now(&mut self) {
        if self.config.period.is_some() {
            self.deadline = Some(TokioInstant::now());
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_idle(&self) -> bool {
        self.config.period.is_none()
    }

    pub fn period(&self) -> Option<Duration> {
        self.config.period
    }

    pub fn name(&self) -> &'static str {
        self.config.name
    }

    pub fn stats(&self) -> &TickStats {
        &self.stats
    }
}

fn jitter(max: Duration) -> Duration {
    let max_us = max.as_micros() as u64;
    if max_us == 0 {
        return Duration::ZERO;
    }
    Duration::from_micros(rand::rng().random_range(0..max_us))
}
