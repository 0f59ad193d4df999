use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::session::errors::SessionError;
use crate::domain::session::models::NewSession;
use crate::domain::session::models::Session;
use crate::domain::session::models::SessionId;
use crate::domain::user::models::UserId;

/// Storage for per-device login sessions.
///
/// Refresh tokens are passed in clear and stored as digests by the
/// implementation. Mutations of one session must be serialized so that a
/// rotation can never be applied twice from the same starting token.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Start a new active session with the store's fixed lifetime.
    ///
    /// # Errors
    /// * `Database` - Storage operation failed
    async fn create(&self, new_session: NewSession) -> Result<Session, SessionError>;

    /// Find the active, unexpired session currently holding `refresh_token`.
    ///
    /// # Errors
    /// * `Database` - Storage operation failed
    async fn find_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<Session>, SessionError>;

    /// Swap the session's refresh token from `current` to `replacement`.
    ///
    /// Compare-and-swap: succeeds only while the session is active and still
    /// holds `current`. Afterwards `current` no longer resolves.
    ///
    /// # Errors
    /// * `NotFound` - Session does not exist or is inactive
    /// * `Stale` - Session no longer holds `current`
    /// * `Database` - Storage operation failed
    async fn rotate(
        &self,
        id: &SessionId,
        current: &str,
        replacement: &str,
    ) -> Result<Session, SessionError>;

    /// Mark one session inactive. Returns whether it was active before.
    ///
    /// # Errors
    /// * `Database` - Storage operation failed
    async fn invalidate(&self, id: &SessionId) -> Result<bool, SessionError>;

    /// Mark every session of a user inactive. Returns how many were active.
    ///
    /// # Errors
    /// * `Database` - Storage operation failed
    async fn invalidate_all_for_user(&self, user_id: &UserId) -> Result<u64, SessionError>;

    /// Active, unexpired sessions of a user, oldest first.
    ///
    /// # Errors
    /// * `Database` - Storage operation failed
    async fn list_active_for_user(&self, user_id: &UserId) -> Result<Vec<Session>, SessionError>;

    /// Deactivate sessions past expiry and drop inactive records older than
    /// the retention period. Returns the number of records affected.
    ///
    /// # Errors
    /// * `Database` - Storage operation failed
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, SessionError>;
}
