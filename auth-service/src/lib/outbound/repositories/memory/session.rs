use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::domain::session::errors::SessionError;
use crate::domain::session::models::token_digest;
use crate::domain::session::models::NewSession;
use crate::domain::session::models::Session;
use crate::domain::session::models::SessionId;
use crate::domain::session::ports::SessionStore;
use crate::domain::user::models::UserId;

#[derive(Default)]
struct Sessions {
    records: HashMap<SessionId, Session>,
    /// Refresh token digest of every active record.
    by_digest: HashMap<String, SessionId>,
}

impl Sessions {
    fn deactivate(&mut self, id: &SessionId) -> bool {
        let Some(session) = self.records.get_mut(id) else {
            return false;
        };
        if !session.active {
            return false;
        }
        session.active = false;
        self.by_digest.remove(&session.refresh_token_digest);
        true
    }
}

/// Session store behind a single mutex.
///
/// Every mutation happens under the lock, which linearizes rotations of the
/// same session. Active records are indexed by refresh token digest.
pub struct InMemorySessionStore {
    sessions: Mutex<Sessions>,
    ttl: Duration,
    retention: Duration,
}

impl InMemorySessionStore {
    /// # Arguments
    /// * `ttl` - Lifetime of a new session
    /// * `retention` - How long inactive records are kept past their expiry
    pub fn new(ttl: Duration, retention: Duration) -> Self {
        Self {
            sessions: Mutex::new(Sessions::default()),
            ttl,
            retention,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, new_session: NewSession) -> Result<Session, SessionError> {
        let session = Session::start(new_session, self.ttl, Utc::now());
        let mut sessions = self.lock();

        sessions
            .by_digest
            .insert(session.refresh_token_digest.clone(), session.id);
        sessions.records.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<Session>, SessionError> {
        let digest = token_digest(refresh_token);
        let now = Utc::now();
        let sessions = self.lock();

        Ok(sessions
            .by_digest
            .get(&digest)
            .and_then(|id| sessions.records.get(id))
            .filter(|session| session.is_usable(now))
            .cloned())
    }

    async fn rotate(
        &self,
        id: &SessionId,
        current: &str,
        replacement: &str,
    ) -> Result<Session, SessionError> {
        let now = Utc::now();
        let mut sessions = self.lock();
        let Sessions {
            records,
            by_digest,
        } = &mut *sessions;

        let session = records
            .get_mut(id)
            .filter(|session| session.is_usable(now))
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        if !session.holds(current) {
            return Err(SessionError::Stale(id.to_string()));
        }

        by_digest.remove(&session.refresh_token_digest);
        session.refresh_token_digest = token_digest(replacement);
        session.last_used_at = now;
        by_digest.insert(session.refresh_token_digest.clone(), session.id);
        Ok(session.clone())
    }

    async fn invalidate(&self, id: &SessionId) -> Result<bool, SessionError> {
        Ok(self.lock().deactivate(id))
    }

    async fn invalidate_all_for_user(&self, user_id: &UserId) -> Result<u64, SessionError> {
        let mut sessions = self.lock();
        let owned: Vec<SessionId> = sessions
            .records
            .values()
            .filter(|session| session.user_id == *user_id && session.active)
            .map(|session| session.id)
            .collect();

        for id in &owned {
            sessions.deactivate(id);
        }
        Ok(owned.len() as u64)
    }

    async fn list_active_for_user(&self, user_id: &UserId) -> Result<Vec<Session>, SessionError> {
        let now = Utc::now();
        let sessions = self.lock();

        let mut active: Vec<Session> = sessions
            .records
            .values()
            .filter(|session| session.user_id == *user_id && session.is_usable(now))
            .cloned()
            .collect();
        active.sort_by_key(|session| session.created_at);
        Ok(active)
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, SessionError> {
        let mut sessions = self.lock();

        let expired: Vec<SessionId> = sessions
            .records
            .values()
            .filter(|session| session.active && session.is_expired(now))
            .map(|session| session.id)
            .collect();
        for id in &expired {
            sessions.deactivate(id);
        }

        let before = sessions.records.len();
        let retention = self.retention;
        sessions
            .records
            .retain(|_, session| session.active || session.expires_at + retention > now);

        Ok((expired.len() + before - sessions.records.len()) as u64)
    }
}
