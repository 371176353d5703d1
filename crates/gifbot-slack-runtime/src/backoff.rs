//! Retry timing for Web API calls and for Socket Mode reconnects.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Per-request retry policy for the Slack Web API: exponential backoff from
/// `base_delay_ms`, overridden by a server-provided `Retry-After`.
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms: base_delay_ms.max(1),
        }
    }

    pub fn allows_another_attempt(&self, attempt: usize) -> bool {
        attempt < self.max_attempts
    }

    /// Delay before retrying after the 1-based `attempt` failed.
    pub fn delay_for(&self, attempt: usize, retry_after_seconds: Option<u64>) -> Duration {
        if let Some(seconds) = retry_after_seconds {
            return Duration::from_secs(seconds);
        }
        let exponent = attempt.saturating_sub(1).min(6) as u32;
        Duration::from_millis(self.base_delay_ms.saturating_mul(2_u64.pow(exponent)))
    }

    pub fn is_retryable_status(status: u16) -> bool {
        status == 429 || (500..600).contains(&status)
    }

    pub fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
        error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
    }
}

pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Linear-then-capped reconnect delay: the n-th consecutive failure waits
/// `min(base + step * (n - 1), max)`.
pub struct ReconnectBackoff {
    pub base: Duration,
    pub step: Duration,
    pub max: Duration,
    /// Give up once this many consecutive failures happened; 0 retries forever.
    pub max_failures: usize,
}

impl ReconnectBackoff {
    pub fn delay_for(&self, failure_streak: usize) -> Duration {
        let extra_steps = failure_streak.saturating_sub(1).min(u32::MAX as usize) as u32;
        self.base
            .saturating_add(self.step.saturating_mul(extra_steps))
            .min(self.max)
    }

    pub fn is_exhausted(&self, failure_streak: usize) -> bool {
        self.max_failures > 0 && failure_streak >= self.max_failures
    }
}
