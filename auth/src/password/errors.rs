use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    /// The stored value is not a PHC hash string. Never means a wrong password.
    #[error("Stored password hash is unreadable: {0}")]
    MalformedHash(String),
}
