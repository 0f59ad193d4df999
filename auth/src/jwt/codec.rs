use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims::Claims;
use super::claims::TokenKind;
use super::claims::TokenSubject;
use super::errors::TokenError;

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub value: String,
    pub claims: Claims,
}

impl IssuedToken {
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.claims.exp, 0).unwrap_or_else(Utc::now)
    }
}

/// Signs and verifies compact `header.payload.signature` tokens.
///
/// Uses HS256 (HMAC with SHA-256). Issuer and audience are fixed per codec and
/// checked on every verification, so tokens minted by another service sharing
/// the secret are still rejected.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    issuer: String,
    audience: String,
    leeway_seconds: i64,
}

impl TokenCodec {
    /// Minimum secret length for HS256.
    pub const MIN_SECRET_LEN: usize = 32;

    /// Create a codec bound to an issuer and audience.
    ///
    /// # Arguments
    /// * `secret` - Signing secret, at least 32 bytes
    /// * `issuer` - Value written to and expected in `iss`
    /// * `audience` - Value written to and expected in `aud`
    ///
    /// # Errors
    /// * `WeakSecret` - Secret is shorter than 32 bytes
    ///
    /// # Security Notes
    /// Rotating the secret invalidates every outstanding token; callers
    /// then have to re-authenticate.
    pub fn new(
        secret: &[u8],
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Result<Self, TokenError> {
        if secret.len() < Self::MIN_SECRET_LEN {
            return Err(TokenError::WeakSecret {
                min: Self::MIN_SECRET_LEN,
                actual: secret.len(),
            });
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
            issuer: issuer.into(),
            audience: audience.into(),
            leeway_seconds: 0,
        })
    }

    /// Tolerate this much clock skew on the `nbf` check.
    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Sign a new token for `subject` that expires after `ttl`.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn issue(
        &self,
        subject: &TokenSubject,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject, kind, ttl, Utc::now())
    }

    pub fn issue_at(
        &self,
        subject: &TokenSubject,
        kind: TokenKind,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let claims = Claims::for_subject(subject, kind, &self.issuer, &self.audience, now, ttl);
        let header = Header::new(self.algorithm);

        let value = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| TokenError::EncodingFailed(e.to_string()))?;

        Ok(IssuedToken { value, claims })
    }

    /// Verify a token and return its claims.
    ///
    /// Malformed input is reported as an error, never a panic.
    ///
    /// # Errors
    /// * `Malformed` - Not a decodable token
    /// * `InvalidSignature` - Signature does not match the secret
    /// * `InvalidIssuer` / `InvalidAudience` - Issued for someone else
    /// * `Expired` - `exp` has been reached
    /// * `NotYetValid` - `nbf` lies beyond the allowed clock skew
    /// * `WrongKind` - Token is not of `expected` kind
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        self.verify_at(token, expected, Utc::now())
    }

    pub fn verify_at(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud", "sub"]);
        // Time claims are checked below against `now`, with `exp` inclusive.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(map_decode_error)?
            .claims;

        let timestamp = now.timestamp();
        if claims.is_expired(timestamp) {
            return Err(TokenError::Expired);
        }
        if claims.nbf > timestamp + self.leeway_seconds {
            return Err(TokenError::NotYetValid);
        }
        if claims.typ != expected {
            return Err(TokenError::WrongKind {
                expected,
                actual: claims.typ,
            });
        }

        Ok(claims)
    }

    /// Decode claims without checking signature, audience or expiry.
    ///
    /// # Security Warning
    /// Only for reading bookkeeping data such as `exp`. Never authorize
    /// anything based on the result.
    pub fn inspect(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.insecure_disable_signature_validation();
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(map_decode_error)
    }
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> TokenError {
    match e.kind() {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::InvalidIssuer => TokenError::InvalidIssuer,
        ErrorKind::InvalidAudience => TokenError::InvalidAudience,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::ImmatureSignature => TokenError::NotYetValid,
        ErrorKind::MissingRequiredClaim(claim) => TokenError::MissingClaim(claim.clone()),
        _ => TokenError::Malformed(e.to_string()),
    }
}
