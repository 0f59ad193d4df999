use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::revocation::errors::RevocationError;

/// Set of revoked access token digests, each kept until its token expires.
///
/// Must be safe to call concurrently from request handlers and the sweeper.
#[async_trait]
pub trait RevocationStore: Send + Sync + 'static {
    /// Record a digest. Re-inserting keeps the later expiry.
    async fn insert(&self, digest: String, expires_at: DateTime<Utc>) -> Result<(), RevocationError>;

    /// Whether `digest` is recorded with an expiry later than `now`.
    async fn contains(&self, digest: &str, now: DateTime<Utc>) -> Result<bool, RevocationError>;

    /// Drop entries whose expiry has passed. Returns how many were dropped.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, RevocationError>;
}
