//! Retry policy for throttled CMS calls.
//!
//! The policy only decides; sleeping and re-sending belong to the caller.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP status the CMS answers with when its request budget is exhausted.
pub const TOO_MANY_REQUESTS: u16 = 429;

/// Bounded exponential backoff for throttling responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles on each further failure
    pub base_delay: Duration,
    /// Cap for computed delays. A server-provided retry-after is not capped.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Only throttling is transient; every other failure status is permanent.
    pub fn is_retryable(status: u16) -> bool {
        status == TOO_MANY_REQUESTS
    }

    /// Whether to try again after `attempt` (zero-based) failed with `status`.
    pub fn should_retry(&self, attempt: u32, status: u16) -> bool {
        Self::is_retryable(status) && attempt.saturating_add(1) < self.max_attempts
    }

    /// How long to wait after `attempt` (zero-based) failed.
    ///
    /// Uses `retry_after` when the server sent one, otherwise
    /// `base_delay * 2^attempt` capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(wait) = retry_after {
            return wait;
        }
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}
