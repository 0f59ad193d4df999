use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::PoisonError;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::revocation::errors::RevocationError;
use crate::domain::revocation::ports::RevocationStore;

/// Revoked token digests mapped to the instant they may be forgotten.
#[derive(Default)]
pub struct InMemoryRevocationStore {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn insert(&self, digest: String, expires_at: DateTime<Utc>) -> Result<(), RevocationError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(digest).or_insert(expires_at);
        *entry = (*entry).max(expires_at);
        Ok(())
    }

    async fn contains(&self, digest: &str, now: DateTime<Utc>) -> Result<bool, RevocationError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(digest).is_some_and(|expires_at| *expires_at > now))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, RevocationError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[tokio::test]
    async fn test_reinsert_keeps_later_expiry() {
        let store = InMemoryRevocationStore::new();
        let now = Utc::now();

        store
            .insert("d".to_string(), now + Duration::minutes(10))
            .await
            .unwrap();
        store
            .insert("d".to_string(), now + Duration::minutes(1))
            .await
            .unwrap();

        assert!(store
            .contains("d", now + Duration::minutes(5))
            .await
            .unwrap());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_entries_no_longer_match() {
        let store = InMemoryRevocationStore::new();
        let now = Utc::now();
        store
            .insert("d".to_string(), now + Duration::seconds(1))
            .await
            .unwrap();

        let later = now + Duration::seconds(1);
        assert!(!store.contains("d", later).await.unwrap());
        assert_eq!(store.purge_expired(later).await.unwrap(), 1);
        assert!(store.is_empty());
    }
}
