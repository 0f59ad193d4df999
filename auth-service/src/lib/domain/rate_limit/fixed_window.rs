//! Fixed-window attempt counting per client key.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::PoisonError;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::domain::rate_limit::models::RateLimitDecision;
use crate::domain::rate_limit::ports::RateLimiter;

/// Tracking data for a single client key.
#[derive(Debug, Clone)]
struct WindowCounter {
    count: u32,
    resets_at: DateTime<Utc>,
}

/// Thread-safe fixed-window rate limiter.
///
/// The first attempt opens a window ending `window` later; every attempt in
/// it counts, and once the count exceeds `max_attempts` the key is blocked
/// until the window ends. A single mutex guards the map.
///
/// At most `max_tracked_keys` keys are tracked. A new key arriving at the cap
/// first drops closed windows; if none closed, the tenth of open windows
/// nearest their reset is evicted, so full scans stay rare under a flood of
/// distinct keys.
pub struct FixedWindowRateLimiter {
    counters: Mutex<HashMap<String, WindowCounter>>,
    max_tracked_keys: usize,
}

impl FixedWindowRateLimiter {
    pub fn new() -> Self {
        Self::with_capacity(100_000)
    }

    /// Track at most `max_tracked_keys` keys.
    pub fn with_capacity(max_tracked_keys: usize) -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
            max_tracked_keys: max_tracked_keys.max(1),
        }
    }

    pub fn tracked_keys(&self) -> usize {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for FixedWindowRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter for FixedWindowRateLimiter {
    fn allow_at(
        &self,
        client_key: &str,
        max_attempts: u32,
        window: Duration,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);

        if counters.len() >= self.max_tracked_keys && !counters.contains_key(client_key) {
            make_room(&mut counters, self.max_tracked_keys, now);
        }

        let counter = counters
            .entry(client_key.to_string())
            .or_insert_with(|| WindowCounter {
                count: 0,
                resets_at: now + window,
            });

        if now >= counter.resets_at {
            counter.count = 0;
            counter.resets_at = now + window;
        }

        // Both outcomes take the same path up to here: one lookup, one increment.
        counter.count = counter.count.saturating_add(1);
        let remaining_window = counter.resets_at - now;
        let count = counter.count;
        drop(counters);

        if count > max_attempts {
            let millis = remaining_window.num_milliseconds().max(0);
            let retry_after_seconds = u64::try_from((millis + 999) / 1000).unwrap_or(1).max(1);

            tracing::warn!(
                client_key,
                attempts = count,
                retry_after_seconds,
                "Rate limit exceeded"
            );
            RateLimitDecision::Blocked {
                retry_after_seconds,
            }
        } else {
            RateLimitDecision::Allowed {
                remaining: max_attempts - count,
            }
        }
    }

    fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let before = counters.len();
        counters.retain(|_, counter| counter.resets_at > now);
        before - counters.len()
    }
}

/// Free at least one slot in a map holding `capacity` keys.
fn make_room(
    counters: &mut HashMap<String, WindowCounter>,
    capacity: usize,
    now: DateTime<Utc>,
) {
    counters.retain(|_, counter| counter.resets_at > now);
    if counters.len() < capacity {
        return;
    }

    let evict = (capacity / 10).max(1);
    let mut resets: Vec<DateTime<Utc>> = counters.values().map(|c| c.resets_at).collect();
    let (_, cutoff, _) = resets.select_nth_unstable(evict - 1);
    let cutoff = *cutoff;

    let before = counters.len();
    counters.retain(|_, counter| counter.resets_at > cutoff);
    tracing::warn!(
        evicted = before - counters.len(),
        capacity,
        "Rate limiter full, evicted open windows"
    );
}
