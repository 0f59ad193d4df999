use std::fmt;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use sha2::Digest;
use sha2::Sha256;
use uuid::Uuid;

use crate::domain::session::errors::SessionError;
use crate::domain::user::models::UserId;

/// Session unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, SessionError> {
        Uuid::parse_str(s)
            .map(SessionId)
            .map_err(|_| SessionError::NotFound(s.to_string()))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Advisory details about the device a request came from.
///
/// Recorded for display and audit only; never used for security decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientContext {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl ClientContext {
    const MAX_USER_AGENT: usize = 512;
    /// Width of the `ip_address` column.
    const MAX_IP_ADDRESS: usize = 64;

    pub fn new(user_agent: Option<String>, ip_address: Option<String>) -> Self {
        Self {
            user_agent: user_agent.map(|ua| ua.chars().take(Self::MAX_USER_AGENT).collect()),
            ip_address: ip_address.map(|ip| ip.chars().take(Self::MAX_IP_ADDRESS).collect()),
        }
    }
}

/// One login context for one device.
///
/// Only a digest of the current refresh token is kept; the token itself
/// is handed to the client and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub refresh_token_digest: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub active: bool,
}

impl Session {
    pub fn start(new: NewSession, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            user_id: new.user_id,
            refresh_token_digest: token_digest(&new.refresh_token),
            created_at: now,
            expires_at: now + ttl,
            last_used_at: now,
            user_agent: new.context.user_agent,
            ip_address: new.context.ip_address,
            active: true,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Active and not past its expiry.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.active && !self.is_expired(now)
    }

    pub fn holds(&self, refresh_token: &str) -> bool {
        self.refresh_token_digest == token_digest(refresh_token)
    }
}

/// Input for creating a session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: UserId,
    pub refresh_token: String,
    pub context: ClientContext,
}

/// SHA-256 hex digest used to store and look up opaque tokens.
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
