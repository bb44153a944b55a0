use std::time::Duration;

/// Bounded exponential backoff for completion calls.
///
/// `max_retries` counts attempts, not re-tries: with the default of 3 the
/// service is called at most three times, sleeping 1s and then 2s in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the failed attempt `attempt` (0-based):
    /// `base_delay * 2^attempt`, saturating instead of overflowing.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Whether another attempt is allowed after `attempt` (0-based) failed
    pub fn has_next(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_retries
    }
}
