//! Reconnection backoff.
//!
//! Delay for attempt `n` (0-based) is `min(base * multiplier^n, max)`.
//! The attempt counter only moves forward until a connection opens,
//! at which point it is reset to zero.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base: Duration,
    pub multiplier: u32,
    pub max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(1_000),
            multiplier: 2,
            max: Duration::from_millis(30_000),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt`. Saturates instead of overflowing.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.multiplier)
            .checked_pow(attempt)
            .unwrap_or(u64::MAX);
        let base_ms = u64::try_from(self.base.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(factor)).min(self.max)
    }
}

/// Attempt counter paired with a policy.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: RetryPolicy,
    attempt: u32,
}

impl Backoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Delay for the current attempt; advances the counter.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.policy.delay_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
