//! Reconnect backoff

use std::time::Duration;

/// Exponential reconnect delay schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(250),
            max: Duration::from_secs(8),
            multiplier: 2,
        }
    }
}

/// Running backoff state for one source
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    attempts: u32,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy, attempts: 0 }
    }

    /// Delay before the next attempt: `initial * multiplier^attempts`, capped at `max`
    pub fn next_delay(&mut self) -> Duration {
        let delay = self
            .policy
            .multiplier
            .max(1)
            .checked_pow(self.attempts)
            .and_then(|factor| self.policy.initial.checked_mul(factor))
            .map_or(self.policy.max, |delay| delay.min(self.policy.max));
        self.attempts = self.attempts.saturating_add(1);
        delay
    }

    /// Call after a successful read
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
