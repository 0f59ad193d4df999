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

/// Durable storage for user accounts.
///
/// Implementations must enforce uniqueness of email and of the
/// (provider, provider id) pair, reporting violations as
/// `EmailTaken` / `ProviderIdentityTaken` instead of storing duplicates.
///
/// Changes to an existing account touch only the columns they own, so
/// concurrent writers never undo each other.
#[async_trait]
pub trait UserDirectory: Send + Sync + 'static {
    /// Retrieve user by (normalized) email address.
    ///
    /// # Errors
    /// * `Database` - Storage operation failed
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, DirectoryError>;

    /// Retrieve user by identifier.
    ///
    /// # Errors
    /// * `Database` - Storage operation failed
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DirectoryError>;

    /// Retrieve user linked to an identity provider account.
    ///
    /// # Errors
    /// * `Database` - Storage operation failed
    async fn find_by_provider(
        &self,
        provider: &AuthProvider,
        provider_id: &str,
    ) -> Result<Option<User>, DirectoryError>;

    /// Persist a new user.
    ///
    /// # Errors
    /// * `EmailTaken` - Email is already registered
    /// * `ProviderIdentityTaken` - Provider identity already linked
    /// * `Database` - Storage operation failed
    async fn create(&self, user: User) -> Result<User, DirectoryError>;

    /// Stamp a login on an account that is still active.
    ///
    /// Returns `None` when the account does not exist or was deactivated.
    ///
    /// # Errors
    /// * `Database` - Storage operation failed
    async fn record_login(
        &self,
        id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, DirectoryError>;

    /// Attach a provider identity to an existing account and mark its email verified.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `ProviderIdentityTaken` - Identity belongs to another account
    /// * `Database` - Storage operation failed
    async fn link_provider(
        &self,
        id: &UserId,
        link: &ProviderLink,
        at: DateTime<Utc>,
    ) -> Result<User, DirectoryError>;

    /// Overwrite name and avatar with values from the provider.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `Database` - Storage operation failed
    async fn update_profile(
        &self,
        id: &UserId,
        refresh: &ProfileRefresh,
        at: DateTime<Utc>,
    ) -> Result<User, DirectoryError>;

    /// Activate or deactivate an account.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `Database` - Storage operation failed
    async fn set_active(
        &self,
        id: &UserId,
        active: bool,
        at: DateTime<Utc>,
    ) -> Result<User, DirectoryError>;
}
