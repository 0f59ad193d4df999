use thiserror::Error;

/// Error for UserId parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserIdError {
    #[error("Invalid UUID format: {0}")]
    InvalidFormat(String),
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Error for DisplayName validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DisplayNameError {
    #[error("Name must not be empty")]
    Empty,

    #[error("Name too long: maximum {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },
}

/// Error for provider name validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderNameError {
    #[error("Provider name must be 1-32 lowercase alphanumeric characters, got {0:?}")]
    Invalid(String),

    #[error("Provider name {0:?} is reserved")]
    Reserved(String),
}

/// Error for role parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown role: {0}")]
pub struct RoleError(pub String);

/// Errors reported by a user directory backend.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    #[error("Email already registered: {0}")]
    EmailTaken(String),

    #[error("Identity {provider}:{provider_id} already linked to another user")]
    ProviderIdentityTaken {
        provider: String,
        provider_id: String,
    },

    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Stored user record is invalid: {0}")]
    InvalidRecord(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("User directory timed out during {0}")]
    Timeout(&'static str),
}
