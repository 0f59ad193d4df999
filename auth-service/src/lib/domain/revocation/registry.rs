use std::sync::Arc;

use auth::Authenticator;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::revocation::errors::RevocationError;
use crate::domain::revocation::ports::RevocationStore;
use crate::domain::session::models::token_digest;

/// Early invalidation of access tokens, e.g. on logout.
///
/// Entries live exactly as long as the token they reject would have; after
/// that the codec refuses the token on expiry grounds anyway.
pub struct RevocationRegistry<RS>
where
    RS: RevocationStore,
{
    store: Arc<RS>,
    authenticator: Arc<Authenticator>,
}

impl<RS> RevocationRegistry<RS>
where
    RS: RevocationStore,
{
    pub fn new(store: Arc<RS>, authenticator: Arc<Authenticator>) -> Self {
        Self {
            store,
            authenticator,
        }
    }

    /// Revoke `token` until its embedded expiry.
    ///
    /// A token whose claims cannot be read is kept for one access token
    /// lifetime, which outlasts any token this service could have issued.
    pub async fn revoke(&self, token: &str) -> Result<DateTime<Utc>, RevocationError> {
        self.revoke_at(token, Utc::now()).await
    }

    pub async fn revoke_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, RevocationError> {
        let expires_at = self
            .authenticator
            .codec()
            .inspect(token)
            .ok()
            .and_then(|claims| DateTime::from_timestamp(claims.exp, 0))
            .unwrap_or_else(|| now + self.authenticator.access_ttl());

        self.store.insert(token_digest(token), expires_at).await?;
        tracing::debug!(expires_at = %expires_at, "Access token revoked");

        Ok(expires_at)
    }

    pub async fn is_revoked(&self, token: &str) -> Result<bool, RevocationError> {
        self.is_revoked_at(token, Utc::now()).await
    }

    pub async fn is_revoked_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RevocationError> {
        self.store.contains(&token_digest(token), now).await
    }

    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, RevocationError> {
        self.store.purge_expired(now).await
    }
}

#[cfg(test)]
mod tests {
    use auth::TokenCodec;
    use auth::TokenKind;
    use auth::TokenSubject;
    use chrono::Duration;

    use super::*;
    use crate::outbound::repositories::memory::InMemoryRevocationStore;

    fn authenticator() -> Arc<Authenticator> {
        let codec = TokenCodec::new(b"test_secret_key_at_least_32_bytes!", "issuer", "audience")
            .expect("Failed to build codec");
        Arc::new(Authenticator::new(
            codec,
            Duration::minutes(15),
            Duration::days(7),
        ))
    }

    fn registry(authenticator: &Arc<Authenticator>) -> RevocationRegistry<InMemoryRevocationStore> {
        RevocationRegistry::new(
            Arc::new(InMemoryRevocationStore::new()),
            Arc::clone(authenticator),
        )
    }

    fn access_token(authenticator: &Authenticator) -> (String, DateTime<Utc>) {
        let subject = TokenSubject::new("user-1", "ann@example.com", "user", "local");
        let issued = authenticator
            .codec()
            .issue(&subject, TokenKind::Access, Duration::minutes(15))
            .unwrap();
        let expires_at = issued.expires_at();
        (issued.value, expires_at)
    }

    #[tokio::test]
    async fn test_revoked_until_sweep_past_expiry() {
        let authenticator = authenticator();
        let registry = registry(&authenticator);
        let (token, expires_at) = access_token(&authenticator);

        assert!(!registry.is_revoked(&token).await.unwrap());

        let recorded = registry.revoke(&token).await.unwrap();
        assert_eq!(recorded, expires_at);
        assert!(registry.is_revoked(&token).await.unwrap());

        // A sweep before expiry keeps the entry.
        assert_eq!(registry.sweep(Utc::now()).await.unwrap(), 0);
        assert!(registry.is_revoked(&token).await.unwrap());

        // Past expiry the entry goes, and the codec rejects the token itself.
        let later = expires_at + Duration::seconds(1);
        assert_eq!(registry.sweep(later).await.unwrap(), 1);
        assert!(!registry.is_revoked_at(&token, later).await.unwrap());
        assert!(authenticator
            .codec()
            .verify_at(&token, TokenKind::Access, later)
            .is_err());
    }

    #[tokio::test]
    async fn test_revoking_one_token_leaves_others_valid() {
        let authenticator = authenticator();
        let registry = registry(&authenticator);
        let (first, _) = access_token(&authenticator);
        let (second, _) = access_token(&authenticator);

        registry.revoke(&first).await.unwrap();

        assert!(registry.is_revoked(&first).await.unwrap());
        assert!(!registry.is_revoked(&second).await.unwrap());
    }

    #[tokio::test]
    async fn test_unreadable_token_kept_for_access_lifetime() {
        let authenticator = authenticator();
        let registry = registry(&authenticator);
        let now = Utc::now();

        let recorded = registry.revoke_at("garbage", now).await.unwrap();

        assert_eq!(recorded, now + Duration::minutes(15));
        assert!(registry.is_revoked_at("garbage", now).await.unwrap());
    }
}
