use thiserror::Error;

use crate::domain::user::errors::DirectoryError;

#[derive(Debug, Clone, Error)]
pub enum IdentityError {
    #[error("Identity provider returned no email address")]
    MissingProviderEmail,

    #[error("Identity provider returned an invalid email address: {0}")]
    InvalidProviderEmail(String),

    #[error("Identity provider returned no account identifier")]
    MissingProviderId,

    #[error("Unknown identity provider: {0}")]
    UnknownProvider(String),

    #[error("Identity provider rejected the authorization: {0}")]
    Rejected(String),

    #[error("Identity provider unreachable: {0}")]
    ProviderUnavailable(String),

    #[error("OAuth state is unknown or expired")]
    InvalidState,

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
