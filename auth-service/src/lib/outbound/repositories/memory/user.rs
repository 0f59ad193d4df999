use std::collections::HashMap;
use std::sync::PoisonError;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::user::errors::DirectoryError;
use crate::domain::user::models::AuthProvider;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::ProfileRefresh;
use crate::domain::user::models::ProviderLink;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserDirectory;

/// User directory held in a map, enforcing the same uniqueness rules as the
/// database schema: one account per email and per provider identity.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `change` to one stored record under the write lock.
    fn modify<F>(&self, id: &UserId, change: F) -> Result<User, DirectoryError>
    where
        F: FnOnce(&mut User),
    {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        let user = users
            .get_mut(id)
            .ok_or_else(|| DirectoryError::NotFound(id.to_string()))?;
        change(user);
        Ok(user.clone())
    }
}

/// Reject `user` if another record already claims its email or provider identity.
fn check_unique(users: &HashMap<UserId, User>, user: &User) -> Result<(), DirectoryError> {
    for other in users.values().filter(|other| other.id != user.id) {
        if other.email == user.email {
            return Err(DirectoryError::EmailTaken(user.email.to_string()));
        }

        if let Some(provider_id) = &user.provider_id {
            if other.provider == user.provider && other.provider_id.as_ref() == Some(provider_id) {
                return Err(DirectoryError::ProviderIdentityTaken {
                    provider: user.provider.to_string(),
                    provider_id: provider_id.clone(),
                });
            }
        }
    }
    Ok(())
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, DirectoryError> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        Ok(users.values().find(|user| user.email == *email).cloned())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DirectoryError> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        Ok(users.get(id).cloned())
    }

    async fn find_by_provider(
        &self,
        provider: &AuthProvider,
        provider_id: &str,
    ) -> Result<Option<User>, DirectoryError> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        Ok(users
            .values()
            .find(|user| {
                user.provider == *provider && user.provider_id.as_deref() == Some(provider_id)
            })
            .cloned())
    }

    async fn create(&self, user: User) -> Result<User, DirectoryError> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        check_unique(&users, &user)?;
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn record_login(
        &self,
        id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, DirectoryError> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        Ok(users.get_mut(id).filter(|user| user.active).map(|user| {
            user.record_login(at);
            user.clone()
        }))
    }

    async fn link_provider(
        &self,
        id: &UserId,
        link: &ProviderLink,
        at: DateTime<Utc>,
    ) -> Result<User, DirectoryError> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        let taken = users.values().any(|other| {
            other.id != *id
                && other.provider == link.provider
                && other.provider_id.as_deref() == Some(link.provider_id.as_str())
        });
        if taken {
            return Err(DirectoryError::ProviderIdentityTaken {
                provider: link.provider.to_string(),
                provider_id: link.provider_id.clone(),
            });
        }

        let user = users
            .get_mut(id)
            .ok_or_else(|| DirectoryError::NotFound(id.to_string()))?;
        user.link_provider(link, at);
        Ok(user.clone())
    }

    async fn update_profile(
        &self,
        id: &UserId,
        refresh: &ProfileRefresh,
        at: DateTime<Utc>,
    ) -> Result<User, DirectoryError> {
        self.modify(id, |user| user.refresh_profile(refresh, at))
    }

    async fn set_active(
        &self,
        id: &UserId,
        active: bool,
        at: DateTime<Utc>,
    ) -> Result<User, DirectoryError> {
        self.modify(id, |user| {
            user.active = active;
            user.updated_at = at;
        })
    }
}
