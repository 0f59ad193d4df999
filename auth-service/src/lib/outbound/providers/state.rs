use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

use uuid::Uuid;

/// Lifetime of a pending authorization.
const STATE_TTL: Duration = Duration::from_secs(600);

const MAX_PENDING: usize = 10_000;

struct PendingAuthorization {
    provider: String,
    created_at: Instant,
}

/// Pending OAuth `state` values between authorize redirect and callback.
///
/// Each value is single-use and bound to the provider it was issued for.
/// At most `max_pending` values are held; issuing past that drops expired
/// values, then the oldest tenth.
pub struct OAuthStateStore {
    pending: Mutex<HashMap<String, PendingAuthorization>>,
    ttl: Duration,
    max_pending: usize,
}

impl OAuthStateStore {
    pub fn new() -> Self {
        Self::with_limits(STATE_TTL, MAX_PENDING)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self::with_limits(ttl, MAX_PENDING)
    }

    pub fn with_limits(ttl: Duration, max_pending: usize) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            ttl,
            max_pending: max_pending.max(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create and remember a fresh unguessable state value for `provider`.
    pub fn issue(&self, provider: &str) -> String {
        let state = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if pending.len() >= self.max_pending {
            self.make_room(&mut pending);
        }

        pending.insert(
            state.clone(),
            PendingAuthorization {
                provider: provider.to_string(),
                created_at: Instant::now(),
            },
        );
        state
    }

    fn make_room(&self, pending: &mut HashMap<String, PendingAuthorization>) {
        pending.retain(|_, p| p.created_at.elapsed() <= self.ttl);
        if pending.len() < self.max_pending {
            return;
        }

        let evict = (self.max_pending / 10).max(1);
        let mut issued: Vec<Instant> = pending.values().map(|p| p.created_at).collect();
        let (_, cutoff, _) = issued.select_nth_unstable(evict - 1);
        let cutoff = *cutoff;
        pending.retain(|_, p| p.created_at > cutoff);

        tracing::warn!(
            max_pending = self.max_pending,
            "OAuth state store full, dropped oldest pending authorizations"
        );
    }

    /// Consume `state`. True only for a live value issued for `provider`.
    pub fn take(&self, state: &str, provider: &str) -> bool {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(state);

        pending.is_some_and(|p| p.provider == provider && p.created_at.elapsed() <= self.ttl)
    }

    /// Forget expired values. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let before = pending.len();
        pending.retain(|_, p| p.created_at.elapsed() <= self.ttl);
        before - pending.len()
    }
}

impl Default for OAuthStateStore {
    fn default() -> Self {
        Self::new()
    }
}
