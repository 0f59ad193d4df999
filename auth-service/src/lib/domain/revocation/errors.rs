use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RevocationError {
    #[error("Revocation store error: {0}")]
    Store(String),
}
