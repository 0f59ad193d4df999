//! Authentication utilities library
//!
//! Provides reusable authentication infrastructure:
//! - Password hashing (Argon2id)
//! - Signed access/refresh token issuance and verification
//! - Authentication coordination
//!
//! ## Token Codec
//! ```
//! use auth::{TokenCodec, TokenKind, TokenSubject};
//! use chrono::Duration;
//!
//! let codec = TokenCodec::new(b"secret_key_at_least_32_bytes_long!", "issuer", "audience").unwrap();
//! let subject = TokenSubject::new("user123", "ann@example.com", "user", "local");
//! let issued = codec.issue(&subject, TokenKind::Access, Duration::minutes(15)).unwrap();
//! let claims = codec.verify(&issued.value, TokenKind::Access).unwrap();
//! assert_eq!(claims.subject(), subject);
//! ```
//!
//! ## Complete Authentication Flow
//! ```
//! use auth::{Authenticator, TokenCodec, TokenSubject};
//! use chrono::Duration;
//!
//! let codec = TokenCodec::new(b"secret_key_at_least_32_bytes_long!", "issuer", "audience").unwrap();
//! let auth = Authenticator::new(codec, Duration::minutes(15), Duration::days(7));
//!
//! // Register: hash password
//! let hash = auth.hash_password("password123").unwrap();
//!
//! // Login: verify and issue a token pair
//! let subject = TokenSubject::new("user123", "ann@example.com", "user", "local");
//! let pair = auth.authenticate("password123", &hash, &subject).unwrap();
//!
//! let claims = auth.validate_access_token(&pair.access.value).unwrap();
//! assert_eq!(claims.sub, "user123");
//! ```

pub mod authenticator;
pub mod jwt;
pub mod password;

pub use authenticator::AuthenticationError;
pub use authenticator::Authenticator;
pub use authenticator::TokenPair;
pub use jwt::Claims;
pub use jwt::IssuedToken;
pub use jwt::TokenCodec;
pub use jwt::TokenError;
pub use jwt::TokenKind;
pub use jwt::TokenSubject;
pub use password::PasswordError;
pub use password::PasswordHasher;
