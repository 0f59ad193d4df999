use async_trait::async_trait;
use auth::Claims;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::models::AuthOutcome;
use crate::domain::auth::models::LoginCommand;
use crate::domain::auth::models::RefreshOutcome;
use crate::domain::auth::models::RegisterCommand;
use crate::domain::auth::models::SweepReport;
use crate::domain::identity::models::ProviderProfile;
use crate::domain::session::models::ClientContext;
use crate::domain::session::models::Session;
use crate::domain::session::models::SessionId;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;

/// Authentication and session lifecycle operations.
///
/// `unauthenticated -> (register | login | oauth_callback) -> authenticated
/// -> (refresh)* -> (logout | logout_all) -> unauthenticated`
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Create a local account and sign it in.
    ///
    /// # Errors
    /// * `DuplicateEmail` - An account with this email exists
    /// * `Unavailable` - Storage did not answer in time
    async fn register(
        &self,
        command: RegisterCommand,
        context: ClientContext,
    ) -> Result<AuthOutcome, AuthError>;

    /// Verify a password and open a new session.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email, inactive account, account
    ///   without password or wrong password, indistinguishably
    async fn login(
        &self,
        command: LoginCommand,
        context: ClientContext,
    ) -> Result<AuthOutcome, AuthError>;

    /// Trade a refresh token for a new pair. The presented token is spent.
    ///
    /// # Errors
    /// * `InvalidRefreshToken` - Token rejected or its owner is gone
    /// * `SessionNotFound` - No active session holds the token
    async fn refresh(
        &self,
        refresh_token: &str,
        context: ClientContext,
    ) -> Result<RefreshOutcome, AuthError>;

    /// Revoke the access token and end the session holding `refresh_token`
    /// when it belongs to the same user.
    async fn logout(&self, access_token: &str, refresh_token: Option<&str>)
        -> Result<(), AuthError>;

    /// End every session of a user. Returns how many were active.
    async fn logout_all(&self, user_id: &UserId) -> Result<u64, AuthError>;

    /// Validate an access token for a protected request.
    ///
    /// # Errors
    /// * `BlacklistedToken` - Token was revoked
    /// * `InvalidToken` - Token is malformed, expired, foreign or a refresh token
    async fn verify(&self, access_token: &str) -> Result<Claims, AuthError>;

    /// Sign in with a profile verified by an identity provider.
    ///
    /// # Errors
    /// * `MissingProviderEmail` - Profile has no email address
    /// * `InvalidCredentials` - Resolved account is inactive
    async fn oauth_callback(
        &self,
        profile: ProviderProfile,
        context: ClientContext,
    ) -> Result<AuthOutcome, AuthError>;

    async fn me(&self, user_id: &UserId) -> Result<User, AuthError>;

    /// Active sessions of a user, oldest first.
    async fn list_sessions(&self, user_id: &UserId) -> Result<Vec<Session>, AuthError>;

    /// End one of the user's own sessions.
    ///
    /// # Errors
    /// * `SessionNotFound` - No such active session for this user
    async fn revoke_session(&self, user_id: &UserId, session_id: &SessionId)
        -> Result<(), AuthError>;

    /// Revoke one access token until its expiry.
    async fn revoke_access_token(&self, access_token: &str) -> Result<(), AuthError>;

    /// Purge expired revocations and expire stale sessions.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<SweepReport, AuthError>;
}
