//! Linear reconnect budget.
//!
//! The client retries a dropped connection a fixed number of times with a
//! fixed delay. The counter resets only when a connection actually opens.

use std::time::Duration;

use crate::config::ClientConfig;

/// Retry delay and attempt limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before each attempt.
    pub interval: Duration,
    /// Attempts allowed between successful opens.
    pub max_attempts: u32,
}

impl From<&ClientConfig> for ReconnectPolicy {
    fn from(config: &ClientConfig) -> Self {
        Self {
            interval: config.reconnect_interval,
            max_attempts: config.max_reconnect_attempts,
        }
    }
}

/// Attempt counter bounded by a [`ReconnectPolicy`].
#[derive(Debug, Clone)]
pub struct ReconnectBudget {
    policy: ReconnectPolicy,
    attempts: u32,
}

impl ReconnectBudget {
    /// Creates a fresh budget.
    #[must_use]
    pub const fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Takes one attempt from the budget.
    ///
    /// Returns the 1-based attempt number, or `None` once the budget is
    /// spent. A spent budget stays spent until [`reset`](Self::reset).
    pub fn try_consume(&mut self) -> Option<u32> {
        if self.attempts >= self.policy.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.attempts)
    }

    /// Restores the full budget.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Attempts consumed since the last reset.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay to wait before the next attempt.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.policy.interval
    }

    /// The policy this budget enforces.
    #[must_use]
    pub const fn policy(&self) -> ReconnectPolicy {
        self.policy
    }
}
