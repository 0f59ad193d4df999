use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::domain::rate_limit::models::RateLimitDecision;

/// Bounds attempts per client key. Pure in-memory; never blocks on I/O.
pub trait RateLimiter: Send + Sync + 'static {
    fn allow_at(
        &self,
        client_key: &str,
        max_attempts: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> RateLimitDecision;

    fn allow(&self, client_key: &str, max_attempts: u32, window: Duration) -> RateLimitDecision {
        self.allow_at(client_key, max_attempts, window, Utc::now())
    }

    /// Forget counters whose window has closed. Returns how many were dropped.
    fn sweep(&self, now: DateTime<Utc>) -> usize;
}
