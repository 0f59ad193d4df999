use chrono::Duration;

use crate::jwt::Claims;
use crate::jwt::IssuedToken;
use crate::jwt::TokenCodec;
use crate::jwt::TokenError;
use crate::jwt::TokenKind;
use crate::jwt::TokenSubject;
use crate::password::PasswordError;
use crate::password::PasswordHasher;

/// Authentication coordinator combining password verification and token issuance.
///
/// Owns the lifetimes of both halves of a token pair: access tokens are short
/// (minutes), refresh tokens long (days).
pub struct Authenticator {
    password_hasher: PasswordHasher,
    codec: TokenCodec,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

/// Access and refresh token issued together.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Authentication operation errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),

    #[error("Token error: {0}")]
    TokenError(#[from] TokenError),
}

impl Authenticator {
    /// Create a new authenticator.
    ///
    /// # Arguments
    /// * `codec` - Token codec holding the signing secret
    /// * `access_ttl` - Access token lifetime
    /// * `refresh_ttl` - Refresh token lifetime
    pub fn new(codec: TokenCodec, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            password_hasher: PasswordHasher::new(),
            codec,
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Hash a password for storage.
    ///
    /// # Errors
    /// * `PasswordError` - Hashing operation failed
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    /// Burn the cost of a password check for an account that does not exist.
    pub fn reject_unknown_account(&self, password: &str) -> AuthenticationError {
        self.password_hasher.verify_decoy(password);
        AuthenticationError::InvalidCredentials
    }

    /// Verify credentials and issue a token pair.
    ///
    /// # Arguments
    /// * `password` - Plaintext password to verify
    /// * `stored_hash` - Stored password hash
    /// * `subject` - Identity claims to embed in both tokens
    ///
    /// # Errors
    /// * `InvalidCredentials` - Password does not match
    /// * `PasswordError` - Stored hash is unreadable
    /// * `TokenError` - Token generation failed
    pub fn authenticate(
        &self,
        password: &str,
        stored_hash: &str,
        subject: &TokenSubject,
    ) -> Result<TokenPair, AuthenticationError> {
        let is_valid = self.password_hasher.verify(password, stored_hash)?;

        if !is_valid {
            return Err(AuthenticationError::InvalidCredentials);
        }

        Ok(self.issue_pair(subject)?)
    }

    /// Issue a token pair without password verification.
    ///
    /// For refresh flows and provider logins, where the caller has already
    /// been authenticated by other means.
    ///
    /// # Errors
    /// * `TokenError` - Token generation failed
    pub fn issue_pair(&self, subject: &TokenSubject) -> Result<TokenPair, TokenError> {
        let access = self
            .codec
            .issue(subject, TokenKind::Access, self.access_ttl)?;
        let refresh = self
            .codec
            .issue(subject, TokenKind::Refresh, self.refresh_ttl)?;

        Ok(TokenPair {
            access,
            refresh,
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Validate an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.codec.verify(token, TokenKind::Access)
    }

    /// Validate a refresh token.
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.codec.verify(token, TokenKind::Refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> Authenticator {
        let codec = TokenCodec::new(b"test_secret_key_at_least_32_bytes!", "issuer", "audience")
            .expect("Failed to build codec");
        Authenticator::new(codec, Duration::minutes(15), Duration::days(7))
    }

    fn subject() -> TokenSubject {
        TokenSubject::new("user123", "ann@example.com", "user", "local")
    }

    #[test]
    fn test_authenticate_success() {
        let authenticator = authenticator();

        let password = "my_password";
        let hash = authenticator
            .hash_password(password)
            .expect("Failed to hash password");

        let pair = authenticator
            .authenticate(password, &hash, &subject())
            .expect("Authentication failed");

        assert_eq!(pair.expires_in, 15 * 60);
        let claims = authenticator
            .validate_access_token(&pair.access.value)
            .expect("Token validation failed");
        assert_eq!(claims.sub, "user123");
        assert!(authenticator
            .validate_refresh_token(&pair.refresh.value)
            .is_ok());
    }

    #[test]
    fn test_authenticate_invalid_password() {
        let authenticator = authenticator();

        let hash = authenticator
            .hash_password("my_password")
            .expect("Failed to hash password");

        let result = authenticator.authenticate("wrong_password", &hash, &subject());
        assert!(matches!(
            result,
            Err(AuthenticationError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_pair_halves_are_not_interchangeable() {
        let authenticator = authenticator();
        let pair = authenticator.issue_pair(&subject()).unwrap();

        assert!(authenticator
            .validate_access_token(&pair.refresh.value)
            .is_err());
        assert!(authenticator
            .validate_refresh_token(&pair.access.value)
            .is_err());
    }

    #[test]
    fn test_refresh_outlives_access() {
        let authenticator = authenticator();
        let pair = authenticator.issue_pair(&subject()).unwrap();

        assert!(pair.refresh.claims.exp > pair.access.claims.exp);
        assert_eq!(
            pair.refresh.claims.exp - pair.refresh.claims.iat,
            7 * 24 * 60 * 60
        );
    }

    #[test]
    fn test_reject_unknown_account() {
        let authenticator = authenticator();
        assert!(matches!(
            authenticator.reject_unknown_account("whatever"),
            AuthenticationError::InvalidCredentials
        ));
    }
}
