//! Timing and failure-tolerance knobs for the live screens.

use std::time::Duration;

use tracing::warn;

/// Configuration shared by the presenter and the capture loop.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// How often the presenter asks the issuer for the active session.
    /// Clamped to [`Self::MIN_POLL_INTERVAL`]..=[`Self::MAX_POLL_INTERVAL`].
    pub poll_interval: Duration,

    /// Random delay (0..max) before the first scheduled poll after mount,
    /// so a room full of phones opened together does not poll in lockstep.
    /// The mount-time fetch itself is never delayed.
    pub poll_jitter: Duration,

    /// Countdown refresh period. Also bounds how late the local
    /// `Active → Expired` transition can be.
    pub countdown_interval: Duration,

    /// Consecutive poll failures tolerated before the last known view is
    /// dropped in favour of an error. Minimum 2: one blip never clears the
    /// screen.
    pub clear_after_failures: u32,

    /// Camera frame sampling period.
    pub sample_period: Duration,

    /// How long a poll or a mark may wait for the issuer before it counts
    /// as a failure. Clamped to
    /// [`Self::MIN_REQUEST_TIMEOUT`]..=[`Self::MAX_REQUEST_TIMEOUT`].
    pub request_timeout: Duration,

    /// Bounded command channel size for each actor.
    pub channel_size: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            poll_jitter: Duration::ZERO,
            countdown_interval: Duration::from_secs(1),
            clear_after_failures: 3,
            sample_period: Duration::from_millis(900),
            request_timeout: Duration::from_secs(10),
            channel_size: 32,
        }
    }
}

impl LiveConfig {
    pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);
    pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(30);
    pub const MIN_SAMPLE_PERIOD: Duration = Duration::from_millis(100);
    pub const MIN_COUNTDOWN_INTERVAL: Duration = Duration::from_millis(100);
    pub const MAX_COUNTDOWN_INTERVAL: Duration = Duration::from_secs(1);
    pub const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);
    pub const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    /// Clamp every field into its supported range, warning about each fix.
    pub fn validated(mut self) -> Self {
        let poll = self
            .poll_interval
            .clamp(Self::MIN_POLL_INTERVAL, Self::MAX_POLL_INTERVAL);
        if poll != self.poll_interval {
            warn!(
                requested_ms = self.poll_interval.as_millis() as u64,
                using_ms = poll.as_millis() as u64,
                "poll_interval out of range, clamping"
            );
            self.poll_interval = poll;
        }

        if self.poll_jitter > self.poll_interval {
            warn!("poll_jitter exceeds poll_interval, capping");
            self.poll_jitter = self.poll_interval;
        }

        let countdown = self
            .countdown_interval
            .clamp(Self::MIN_COUNTDOWN_INTERVAL, Self::MAX_COUNTDOWN_INTERVAL);
        if countdown != self.countdown_interval {
            warn!(
                requested_ms = self.countdown_interval.as_millis() as u64,
                using_ms = countdown.as_millis() as u64,
                "countdown_interval out of range, clamping"
            );
            self.countdown_interval = countdown;
        }

        if self.clear_after_failures < 2 {
            warn!(
                requested = self.clear_after_failures,
                "clear_after_failures below 2, raising"
            );
            self.clear_after_failures = 2;
        }

        if self.sample_period < Self::MIN_SAMPLE_PERIOD {
            warn!(
                requested_ms = self.sample_period.as_millis() as u64,
                "sample_period too short, raising to 100ms"
            );
            self.sample_period = Self::MIN_SAMPLE_PERIOD;
        }

        let timeout = self
            .request_timeout
            .clamp(Self::MIN_REQUEST_TIMEOUT, Self::MAX_REQUEST_TIMEOUT);
        if timeout != self.request_timeout {
            warn!(
                requested_ms = self.request_timeout.as_millis() as u64,
                using_ms = timeout.as_millis() as u64,
                "request_timeout out of range, clamping"
            );
            self.request_timeout = timeout;
        }

        if self.channel_size == 0 {
            warn!("channel_size is 0, raising to 1");
            self.channel_size = 1;
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_already_valid() {
        let config = LiveConfig::default().validated();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.countdown_interval, Duration::from_secs(1));
        assert_eq!(config.clear_after_failures, 3);
        assert_eq!(config.sample_period, Duration::from_millis(900));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_validated_clamps_request_timeout() {
        let zero = LiveConfig {
            request_timeout: Duration::ZERO,
            ..Default::default()
        }
        .validated();
        assert_eq!(zero.request_timeout, LiveConfig::MIN_REQUEST_TIMEOUT);

        let day = LiveConfig {
            request_timeout: Duration::from_secs(86_400),
            ..Default::default()
        }
        .validated();
        assert_eq!(day.request_timeout, LiveConfig::MAX_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_validated_clamps_poll_interval_both_ways() {
        let fast = LiveConfig {
            poll_interval: Duration::from_secs(1),
            ..Default::default()
        }
        .validated();
        assert_eq!(fast.poll_interval, Duration::from_secs(5));

        let slow = LiveConfig {
            poll_interval: Duration::from_secs(120),
            ..Default::default()
        }
        .validated();
        assert_eq!(slow.poll_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_validated_raises_failure_tolerance_and_sampling() {
        let config = LiveConfig {
            clear_after_failures: 1,
            sample_period: Duration::from_millis(5),
            channel_size: 0,
            ..Default::default()
        }
        .validated();
        assert_eq!(config.clear_after_failures, 2);
        assert_eq!(config.sample_period, Duration::from_millis(100));
        assert_eq!(config.channel_size, 1);
    }

    #[test]
    fn test_validated_caps_jitter_at_interval() {
        let config = LiveConfig {
            poll_jitter: Duration::from_secs(60),
            ..Default::default()
        }
        .validated();
        assert_eq!(config.poll_jitter, config.poll_interval);
    }
}
