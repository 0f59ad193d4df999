use std::fmt;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Which half of a token pair a token belongs to.
///
/// Serialized into the `typ` claim so a refresh token can never be
/// presented where an access token is expected, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// Identity claims supplied by the caller when issuing a token.
///
/// Only non-sensitive identity data belongs here: never passwords,
/// secrets or provider access tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub id: String,
    pub email: String,
    pub role: String,
    pub provider: String,
}

impl TokenSubject {
    pub fn new(
        id: impl ToString,
        email: impl Into<String>,
        role: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            id: id.to_string(),
            email: email.into(),
            role: role.into(),
            provider: provider.into(),
        }
    }
}

/// Full claim set embedded in every signed token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (user identifier)
    pub sub: String,

    pub email: String,

    pub role: String,

    /// Authentication provider (`local` or a provider name)
    pub provider: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Unique token identifier
    pub jti: String,

    pub typ: TokenKind,
}

impl Claims {
    /// Build the claim set for `subject`, valid from `now` for `ttl`.
    pub fn for_subject(
        subject: &TokenSubject,
        kind: TokenKind,
        issuer: &str,
        audience: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let issued_at = now.timestamp();

        Self {
            sub: subject.id.clone(),
            email: subject.email.clone(),
            role: subject.role.clone(),
            provider: subject.provider.clone(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
            iat: issued_at,
            nbf: issued_at,
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
            typ: kind,
        }
    }

    /// Identity portion of the claims, as originally supplied to `issue`.
    pub fn subject(&self) -> TokenSubject {
        TokenSubject {
            id: self.sub.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
            provider: self.provider.clone(),
        }
    }

    /// A token is expired from the second its `exp` is reached.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        current_timestamp >= self.exp
    }

    /// Seconds until expiry, clamped at zero.
    pub fn remaining_seconds(&self, current_timestamp: i64) -> i64 {
        (self.exp - current_timestamp).max(0)
    }
}
