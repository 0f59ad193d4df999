use std::fmt;

use auth::TokenPair;
use auth::TokenSubject;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::errors::PasswordPolicyError;
use crate::domain::session::models::Session;
use crate::domain::user::models::DisplayName;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::User;

/// Plaintext password that satisfies the registration policy.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    const MIN_LENGTH: usize = 8;
    const MAX_LENGTH: usize = 128;

    pub fn new(password: String) -> Result<Self, PasswordPolicyError> {
        let length = password.chars().count();

        if length < Self::MIN_LENGTH {
            return Err(PasswordPolicyError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            });
        }

        if length > Self::MAX_LENGTH {
            return Err(PasswordPolicyError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            });
        }

        Ok(Self(password))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Validated input for creating a local account.
#[derive(Debug, Clone)]
pub struct RegisterCommand {
    pub email: EmailAddress,
    pub password: Password,
    pub name: DisplayName,
}

impl RegisterCommand {
    /// Validate raw registration fields, reporting the first offending field.
    pub fn new(email: String, password: String, name: String) -> Result<Self, AuthError> {
        let email = EmailAddress::new(email).map_err(|e| AuthError::validation("email", e))?;
        let password = Password::new(password).map_err(|e| AuthError::validation("password", e))?;
        let name = DisplayName::new(name).map_err(|e| AuthError::validation("name", e))?;

        Ok(Self {
            email,
            password,
            name,
        })
    }
}

/// Credentials presented at login.
///
/// Deliberately unvalidated: a malformed email must fail exactly like an
/// unknown one.
#[derive(Clone)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

impl LoginCommand {
    pub fn new(email: String, password: String) -> Self {
        Self { email, password }
    }
}

impl fmt::Debug for LoginCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCommand")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Result of a successful register, login or provider callback.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub user: User,
    pub tokens: TokenPair,
    pub session: Session,
}

/// Result of a successful refresh token rotation.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub tokens: TokenPair,
    pub session: Session,
}

/// What one maintenance pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub revocations_purged: usize,
    pub sessions_swept: u64,
}

/// Claims embedded in every token issued for `user`.
pub fn token_subject(user: &User) -> TokenSubject {
    TokenSubject::new(
        user.id,
        user.email.as_str(),
        user.role.as_str(),
        user.provider.as_str(),
    )
}
