use thiserror::Error;

use crate::domain::identity::errors::IdentityError;
use crate::domain::revocation::errors::RevocationError;
use crate::domain::session::errors::SessionError;
use crate::domain::user::errors::DirectoryError;

/// Error for password policy violations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("Password too short: minimum {min} characters, got {actual}")]
    TooShort { min: usize, actual: usize },

    #[error("Password too long: maximum {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },
}

/// Top-level error for authentication and session operations.
///
/// Variants carrying a `String` hold details for the log; the HTTP layer
/// never forwards them to clients.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid access token")]
    InvalidToken,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Access token has been revoked")]
    BlacklistedToken,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Identity provider returned no usable email address")]
    MissingProviderEmail,

    #[error("Too many attempts, retry after {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    #[error("User not found")]
    UserNotFound,

    #[error("Dependency unavailable: {0}")]
    Unavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn validation(field: &'static str, message: impl ToString) -> Self {
        AuthError::Validation {
            field,
            message: message.to_string(),
        }
    }
}

impl From<DirectoryError> for AuthError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::EmailTaken(_) => AuthError::DuplicateEmail,
            DirectoryError::NotFound(_) => AuthError::UserNotFound,
            DirectoryError::Database(_) | DirectoryError::Timeout(_) => {
                AuthError::Unavailable(err.to_string())
            }
            DirectoryError::ProviderIdentityTaken { .. } | DirectoryError::InvalidRecord(_) => {
                AuthError::Internal(err.to_string())
            }
        }
    }
}

impl From<SessionError> for AuthError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) | SessionError::Stale(_) => AuthError::SessionNotFound,
            SessionError::Database(_) | SessionError::Timeout(_) => {
                AuthError::Unavailable(err.to_string())
            }
        }
    }
}

impl From<RevocationError> for AuthError {
    fn from(err: RevocationError) -> Self {
        AuthError::Unavailable(err.to_string())
    }
}

impl From<IdentityError> for AuthError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::MissingProviderEmail | IdentityError::InvalidProviderEmail(_) => {
                AuthError::MissingProviderEmail
            }
            IdentityError::UnknownProvider(provider) => {
                AuthError::validation("provider", format!("{} is not configured", provider))
            }
            IdentityError::MissingProviderId
            | IdentityError::Rejected(_)
            | IdentityError::InvalidState => AuthError::InvalidCredentials,
            IdentityError::ProviderUnavailable(_) => AuthError::Unavailable(err.to_string()),
            IdentityError::Directory(e) => AuthError::from(e),
        }
    }
}

impl From<auth::TokenError> for AuthError {
    fn from(err: auth::TokenError) -> Self {
        match err {
            auth::TokenError::WeakSecret { .. } => AuthError::Configuration(err.to_string()),
            _ => AuthError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lost_rotation_reads_as_missing_session() {
        assert_eq!(
            AuthError::from(SessionError::Stale("s-1".to_string())),
            AuthError::SessionNotFound
        );
    }

    #[test]
    fn test_storage_failures_are_unavailable_not_credential_errors() {
        assert!(matches!(
            AuthError::from(DirectoryError::Timeout("find_by_email")),
            AuthError::Unavailable(_)
        ));
        assert!(matches!(
            AuthError::from(SessionError::Database("connection reset".to_string())),
            AuthError::Unavailable(_)
        ));
    }

    #[test]
    fn test_email_conflict_is_duplicate_email() {
        assert_eq!(
            AuthError::from(DirectoryError::EmailTaken("ann@example.com".to_string())),
            AuthError::DuplicateEmail
        );
    }

    #[test]
    fn test_identity_errors_map_through() {
        assert_eq!(
            AuthError::from(IdentityError::InvalidState),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            AuthError::from(IdentityError::Directory(DirectoryError::EmailTaken(
                "ann@example.com".to_string()
            ))),
            AuthError::DuplicateEmail
        );
    }
}
