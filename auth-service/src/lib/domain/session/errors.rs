use thiserror::Error;

/// Errors reported by a session store backend.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    /// The session exists but no longer holds the refresh token the caller
    /// presented: it was rotated by someone else first.
    #[error("Session {0} was already rotated")]
    Stale(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Session store timed out during {0}")]
    Timeout(&'static str),
}
