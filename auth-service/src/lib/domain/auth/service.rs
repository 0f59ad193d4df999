use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auth::AuthenticationError;
use auth::Authenticator;
use auth::Claims;
use auth::TokenPair;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::models::token_subject;
use crate::domain::auth::models::AuthOutcome;
use crate::domain::auth::models::LoginCommand;
use crate::domain::auth::models::RefreshOutcome;
use crate::domain::auth::models::RegisterCommand;
use crate::domain::auth::models::SweepReport;
use crate::domain::auth::ports::AuthServicePort;
use crate::domain::identity::models::ProviderProfile;
use crate::domain::identity::resolver::IdentityResolver;
use crate::domain::revocation::ports::RevocationStore;
use crate::domain::revocation::registry::RevocationRegistry;
use crate::domain::session::models::ClientContext;
use crate::domain::session::models::NewSession;
use crate::domain::session::models::Session;
use crate::domain::session::models::SessionId;
use crate::domain::session::ports::SessionStore;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserDirectory;

/// Tunables of the auth service that are not token lifetimes.
#[derive(Debug, Clone, Copy)]
pub struct AuthSettings {
    /// Oldest sessions beyond this many are ended when a new one starts.
    pub max_sessions_per_user: Option<usize>,
    /// Upper bound for every directory, session and revocation call.
    pub storage_timeout: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            max_sessions_per_user: None,
            storage_timeout: Duration::from_millis(3000),
        }
    }
}

/// Domain service implementation for authentication operations.
///
/// Concrete implementation of AuthServicePort with dependency injection.
pub struct AuthService<UD, SS, RS>
where
    UD: UserDirectory,
    SS: SessionStore,
    RS: RevocationStore,
{
    directory: Arc<UD>,
    sessions: Arc<SS>,
    revocations: RevocationRegistry<RS>,
    identities: IdentityResolver<UD>,
    authenticator: Arc<Authenticator>,
    settings: AuthSettings,
}

impl<UD, SS, RS> AuthService<UD, SS, RS>
where
    UD: UserDirectory,
    SS: SessionStore,
    RS: RevocationStore,
{
    /// Create a new auth service with injected dependencies.
    ///
    /// # Arguments
    /// * `directory` - User directory implementation
    /// * `sessions` - Session persistence implementation
    /// * `revocations` - Revoked access token storage
    /// * `authenticator` - Password verification and token issuance
    /// * `settings` - Session cap and storage timeout
    pub fn new(
        directory: Arc<UD>,
        sessions: Arc<SS>,
        revocations: Arc<RS>,
        authenticator: Arc<Authenticator>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            identities: IdentityResolver::new(Arc::clone(&directory)),
            revocations: RevocationRegistry::new(revocations, Arc::clone(&authenticator)),
            directory,
            sessions,
            authenticator,
            settings,
        }
    }

    /// Run one storage call under the configured timeout.
    async fn bounded<T, E, F>(&self, operation: &'static str, call: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<AuthError>,
    {
        match tokio::time::timeout(self.settings.storage_timeout, call).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => {
                tracing::error!(
                    operation,
                    timeout_ms = self.settings.storage_timeout.as_millis() as u64,
                    "Storage call timed out"
                );
                Err(AuthError::Unavailable(format!("{} timed out", operation)))
            }
        }
    }

    /// Store a session for the refresh half of `tokens`, then apply the cap.
    async fn open_session(
        &self,
        user: &User,
        tokens: &TokenPair,
        context: ClientContext,
    ) -> Result<Session, AuthError> {
        let new_session = NewSession {
            user_id: user.id,
            refresh_token: tokens.refresh.value.clone(),
            context,
        };
        let session = self
            .bounded("create_session", self.sessions.create(new_session))
            .await?;

        if let Some(cap) = self.settings.max_sessions_per_user {
            self.enforce_session_cap(&user.id, cap).await?;
        }

        Ok(session)
    }

    async fn enforce_session_cap(&self, user_id: &UserId, cap: usize) -> Result<(), AuthError> {
        let active = self
            .bounded("list_sessions", self.sessions.list_active_for_user(user_id))
            .await?;
        let excess = active.len().saturating_sub(cap);

        for session in active.iter().take(excess) {
            self.bounded("invalidate_session", self.sessions.invalidate(&session.id))
                .await?;
            tracing::info!(
                user_id = %user_id,
                session_id = %session.id,
                "Oldest session ended by per-user session cap"
            );
        }
        Ok(())
    }

    /// Stamp the login, failing if the account was deactivated since it was read.
    async fn record_login(&self, user: &User) -> Result<User, AuthError> {
        self.bounded(
            "record_login",
            self.directory.record_login(&user.id, Utc::now()),
        )
        .await?
        .ok_or_else(|| {
            tracing::warn!(user_id = %user.id, "Account deactivated during login");
            AuthError::InvalidCredentials
        })
    }

    fn reject_login(&self, password: &str, reason: &'static str) -> AuthError {
        tracing::warn!(reason, "Login failed");
        self.authenticator.reject_unknown_account(password);
        AuthError::InvalidCredentials
    }
}

#[async_trait]
impl<UD, SS, RS> AuthServicePort for AuthService<UD, SS, RS>
where
    UD: UserDirectory,
    SS: SessionStore,
    RS: RevocationStore,
{
    async fn register(
        &self,
        command: RegisterCommand,
        context: ClientContext,
    ) -> Result<AuthOutcome, AuthError> {
        if self
            .bounded("find_by_email", self.directory.find_by_email(&command.email))
            .await?
            .is_some()
        {
            tracing::info!("Registration rejected, email already registered");
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = self
            .authenticator
            .hash_password(command.password.expose())
            .map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e)))?;

        let user = User::local(command.email, command.name, password_hash, Utc::now());
        let user = self
            .bounded("create_user", self.directory.create(user))
            .await?;

        let tokens = self.authenticator.issue_pair(&token_subject(&user))?;
        let session = self.open_session(&user, &tokens, context).await?;

        tracing::info!(
            user_id = %user.id,
            session_id = %session.id,
            "User registered"
        );

        Ok(AuthOutcome {
            user,
            tokens,
            session,
        })
    }

    async fn login(
        &self,
        command: LoginCommand,
        context: ClientContext,
    ) -> Result<AuthOutcome, AuthError> {
        let Ok(email) = EmailAddress::new(command.email) else {
            return Err(self.reject_login(&command.password, "malformed email"));
        };

        let Some(user) = self
            .bounded("find_by_email", self.directory.find_by_email(&email))
            .await?
        else {
            return Err(self.reject_login(&command.password, "unknown account"));
        };

        if !user.active {
            return Err(self.reject_login(&command.password, "inactive account"));
        }

        let Some(stored_hash) = user.password_hash.as_deref() else {
            return Err(self.reject_login(&command.password, "account has no password"));
        };

        let tokens = self
            .authenticator
            .authenticate(&command.password, stored_hash, &token_subject(&user))
            .map_err(|e| match e {
                AuthenticationError::InvalidCredentials => {
                    tracing::warn!(user_id = %user.id, reason = "wrong password", "Login failed");
                    AuthError::InvalidCredentials
                }
                AuthenticationError::PasswordError(err) => {
                    tracing::error!(user_id = %user.id, error = %err, "Stored password hash unreadable");
                    AuthError::InvalidCredentials
                }
                AuthenticationError::TokenError(err) => AuthError::from(err),
            })?;

        let user = self.record_login(&user).await?;
        let session = self.open_session(&user, &tokens, context).await?;

        tracing::info!(
            user_id = %user.id,
            session_id = %session.id,
            "User logged in"
        );

        Ok(AuthOutcome {
            user,
            tokens,
            session,
        })
    }

    async fn refresh(
        &self,
        refresh_token: &str,
        context: ClientContext,
    ) -> Result<RefreshOutcome, AuthError> {
        let claims = self
            .authenticator
            .validate_refresh_token(refresh_token)
            .map_err(|e| {
                tracing::debug!(error = %e, "Refresh token rejected");
                AuthError::InvalidRefreshToken
            })?;

        let session = self
            .bounded(
                "find_session",
                self.sessions.find_by_refresh_token(refresh_token),
            )
            .await?
            .ok_or_else(|| {
                tracing::warn!(
                    user_id = %claims.sub,
                    client = context.ip_address.as_deref().unwrap_or("unknown"),
                    "Refresh token not held by any active session, possible replay"
                );
                AuthError::SessionNotFound
            })?;

        if session.user_id.to_string() != claims.sub {
            tracing::warn!(
                session_id = %session.id,
                "Refresh token subject does not own its session"
            );
            return Err(AuthError::InvalidRefreshToken);
        }

        let user = match self
            .bounded("find_by_id", self.directory.find_by_id(&session.user_id))
            .await?
        {
            Some(user) if user.active => user,
            _ => {
                self.bounded("invalidate_session", self.sessions.invalidate(&session.id))
                    .await?;
                tracing::warn!(
                    user_id = %session.user_id,
                    session_id = %session.id,
                    "Session owner missing or inactive, session ended"
                );
                return Err(AuthError::InvalidRefreshToken);
            }
        };

        let tokens = self.authenticator.issue_pair(&token_subject(&user))?;
        let session = self
            .bounded(
                "rotate_session",
                self.sessions
                    .rotate(&session.id, refresh_token, &tokens.refresh.value),
            )
            .await
            .inspect_err(|e| {
                if *e == AuthError::SessionNotFound {
                    tracing::warn!(
                        session_id = %session.id,
                        "Refresh token rotated concurrently, possible replay"
                    );
                }
            })?;

        tracing::debug!(
            user_id = %user.id,
            session_id = %session.id,
            "Session refreshed"
        );

        Ok(RefreshOutcome { tokens, session })
    }

    async fn logout(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), AuthError> {
        let claims = self.verify(access_token).await?;

        self.bounded("revoke_token", self.revocations.revoke(access_token))
            .await?;

        if let Some(refresh_token) = refresh_token {
            let session = self
                .bounded(
                    "find_session",
                    self.sessions.find_by_refresh_token(refresh_token),
                )
                .await?;

            match session {
                Some(session) if session.user_id.to_string() == claims.sub => {
                    self.bounded("invalidate_session", self.sessions.invalidate(&session.id))
                        .await?;
                    tracing::info!(
                        user_id = %claims.sub,
                        session_id = %session.id,
                        "Session ended by logout"
                    );
                }
                Some(session) => {
                    tracing::warn!(
                        user_id = %claims.sub,
                        session_id = %session.id,
                        "Logout presented a refresh token of another user"
                    );
                }
                None => {}
            }
        }

        tracing::info!(user_id = %claims.sub, "User logged out");
        Ok(())
    }

    async fn logout_all(&self, user_id: &UserId) -> Result<u64, AuthError> {
        let ended = self
            .bounded(
                "invalidate_sessions",
                self.sessions.invalidate_all_for_user(user_id),
            )
            .await?;

        tracing::info!(
            user_id = %user_id,
            sessions_revoked = ended,
            "All sessions ended"
        );
        Ok(ended)
    }

    async fn verify(&self, access_token: &str) -> Result<Claims, AuthError> {
        let claims = self
            .authenticator
            .validate_access_token(access_token)
            .map_err(|e| {
                tracing::debug!(error = %e, "Access token rejected");
                AuthError::InvalidToken
            })?;

        if self
            .bounded("check_revocation", self.revocations.is_revoked(access_token))
            .await?
        {
            tracing::warn!(user_id = %claims.sub, "Revoked access token presented");
            return Err(AuthError::BlacklistedToken);
        }

        Ok(claims)
    }

    async fn oauth_callback(
        &self,
        profile: ProviderProfile,
        context: ClientContext,
    ) -> Result<AuthOutcome, AuthError> {
        let user = self
            .bounded("resolve_identity", self.identities.resolve(&profile))
            .await?;

        if !user.active {
            tracing::warn!(
                user_id = %user.id,
                provider = %profile.provider,
                "Provider login for inactive account"
            );
            return Err(AuthError::InvalidCredentials);
        }

        let user = self.record_login(&user).await?;
        let tokens = self.authenticator.issue_pair(&token_subject(&user))?;
        let session = self.open_session(&user, &tokens, context).await?;

        tracing::info!(
            user_id = %user.id,
            session_id = %session.id,
            provider = %profile.provider,
            "User logged in through identity provider"
        );

        Ok(AuthOutcome {
            user,
            tokens,
            session,
        })
    }

    async fn me(&self, user_id: &UserId) -> Result<User, AuthError> {
        self.bounded("find_by_id", self.directory.find_by_id(user_id))
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    async fn list_sessions(&self, user_id: &UserId) -> Result<Vec<Session>, AuthError> {
        self.bounded("list_sessions", self.sessions.list_active_for_user(user_id))
            .await
    }

    async fn revoke_session(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
    ) -> Result<(), AuthError> {
        let owned = self
            .list_sessions(user_id)
            .await?
            .iter()
            .any(|session| session.id == *session_id);

        if !owned
            || !self
                .bounded("invalidate_session", self.sessions.invalidate(session_id))
                .await?
        {
            return Err(AuthError::SessionNotFound);
        }

        tracing::info!(
            user_id = %user_id,
            session_id = %session_id,
            "Session revoked by owner"
        );
        Ok(())
    }

    async fn revoke_access_token(&self, access_token: &str) -> Result<(), AuthError> {
        self.bounded("revoke_token", self.revocations.revoke(access_token))
            .await?;
        Ok(())
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<SweepReport, AuthError> {
        let revocations_purged = self
            .bounded("purge_revocations", self.revocations.sweep(now))
            .await?;
        let sessions_swept = self
            .bounded("sweep_sessions", self.sessions.sweep_expired(now))
            .await?;

        Ok(SweepReport {
            revocations_purged,
            sessions_swept,
        })
    }
}
