//! Reconnect policy with capped exponential back-off.

use std::time::Duration;

/// Controls how long the channel waits before reopening a dropped
/// connection.  The delay doubles per consecutive failure, is capped at
/// `max_delay`, and has no jitter.  Retries never give up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectBackoff {
    /// Delay before the first reconnect attempt, and after any successful open.
    pub min_delay: Duration,
    /// Maximum delay between attempts (cap).
    pub max_delay: Duration,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl ReconnectBackoff {
    /// Delay that follows `current` after another failure.
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_delay)
    }
}

/// Per-channel retry bookkeeping: whether a retry timer is pending and how
/// long the next one waits.
#[derive(Debug, Clone)]
pub struct RetrySchedule {
    policy: ReconnectBackoff,
    current: Duration,
    scheduled: bool,
}

impl RetrySchedule {
    pub fn new(policy: ReconnectBackoff) -> Self {
        Self {
            current: policy.min_delay,
            policy,
            scheduled: false,
        }
    }

    /// A connection opened: the next failure starts from the minimum again.
    pub fn on_open(&mut self) {
        self.current = self.policy.min_delay;
    }

    /// A connection closed unexpectedly.
    ///
    /// Returns the delay to wait before reopening, or `None` when a retry
    /// is already pending.  The stored delay doubles only when a retry is
    /// actually scheduled.
    pub fn on_close(&mut self) -> Option<Duration> {
        if self.scheduled {
            return None;
        }
        self.scheduled = true;
        let delay = self.current;
        self.current = self.policy.next_delay(delay);
        Some(delay)
    }

    /// The pending retry timer fired.
    pub fn on_retry_fired(&mut self) {
        self.scheduled = false;
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    /// Delay the next scheduled retry will use.
    pub fn current_delay(&self) -> Duration {
        self.current
    }
}
