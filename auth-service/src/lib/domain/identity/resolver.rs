use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;

use crate::domain::identity::errors::IdentityError;
use crate::domain::identity::models::ProviderProfile;
use crate::domain::locks::KeyedLocks;
use crate::domain::user::errors::DirectoryError;
use crate::domain::user::models::DisplayName;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::ProfileRefresh;
use crate::domain::user::models::ProviderLink;
use crate::domain::user::models::User;
use crate::domain::user::ports::UserDirectory;

/// Reconciles identity provider logins with local accounts.
///
/// Resolution of one provider identity is serialized, so simultaneous
/// callbacks for a brand-new identity create a single user.
pub struct IdentityResolver<UD>
where
    UD: UserDirectory,
{
    directory: Arc<UD>,
    locks: KeyedLocks,
}

impl<UD> IdentityResolver<UD>
where
    UD: UserDirectory,
{
    pub fn new(directory: Arc<UD>) -> Self {
        Self {
            directory,
            locks: KeyedLocks::new(),
        }
    }

    /// Find or create the local user for a verified provider profile.
    ///
    /// 1. Known provider identity: refresh name and avatar.
    /// 2. Known email: link the provider identity to that account.
    /// 3. Otherwise: create a new, email-verified account.
    ///
    /// # Errors
    /// * `MissingProviderEmail` - Profile has no email address
    /// * `InvalidProviderEmail` - Profile email is not a valid address
    /// * `MissingProviderId` - Profile has no account identifier
    /// * `Directory` - User directory failure
    pub async fn resolve(&self, profile: &ProviderProfile) -> Result<User, IdentityError> {
        self.resolve_at(profile, Utc::now()).await
    }

    pub async fn resolve_at(
        &self,
        profile: &ProviderProfile,
        now: DateTime<Utc>,
    ) -> Result<User, IdentityError> {
        let email = profile
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or(IdentityError::MissingProviderEmail)?;
        let email = EmailAddress::new(email.to_string())
            .map_err(|e| IdentityError::InvalidProviderEmail(e.to_string()))?;

        if profile.provider_id.trim().is_empty() {
            return Err(IdentityError::MissingProviderId);
        }

        let _guard = self.locks.lock(&profile.identity_key()).await;

        match self.find_or_create(profile, &email, now).await {
            // Lost a race against another login or registration for the same
            // email; the winner's record is there now.
            Err(IdentityError::Directory(
                DirectoryError::EmailTaken(_) | DirectoryError::ProviderIdentityTaken { .. },
            )) => {
                tracing::debug!(
                    provider = %profile.provider,
                    "Identity resolution conflicted, retrying lookup"
                );
                self.find_or_create(profile, &email, now).await
            }
            result => result,
        }
    }

    async fn find_or_create(
        &self,
        profile: &ProviderProfile,
        email: &EmailAddress,
        now: DateTime<Utc>,
    ) -> Result<User, IdentityError> {
        if let Some(user) = self
            .directory
            .find_by_provider(&profile.provider, &profile.provider_id)
            .await?
        {
            return match profile_refresh(&user, profile) {
                Some(refresh) => Ok(self
                    .directory
                    .update_profile(&user.id, &refresh, now)
                    .await?),
                None => Ok(user),
            };
        }

        if let Some(user) = self.directory.find_by_email(email).await? {
            let link = ProviderLink {
                provider: profile.provider.clone(),
                provider_id: profile.provider_id.clone(),
                avatar_url: profile.avatar_url.clone(),
            };
            let user = self.directory.link_provider(&user.id, &link, now).await?;

            tracing::info!(
                user_id = %user.id,
                provider = %profile.provider,
                "Provider identity linked to existing account"
            );
            return Ok(user);
        }

        let name = DisplayName::or_from_email(profile.display_name.clone(), email);
        let user = User::from_provider(
            profile.provider.clone(),
            profile.provider_id.clone(),
            email.clone(),
            name,
            profile.avatar_url.clone(),
            now,
        );
        let user = self.directory.create(user).await?;

        tracing::info!(
            user_id = %user.id,
            provider = %profile.provider,
            "Account created from provider identity"
        );
        Ok(user)
    }
}

/// Name and avatar to store when the provider reports different ones.
fn profile_refresh(user: &User, profile: &ProviderProfile) -> Option<ProfileRefresh> {
    let name = profile
        .display_name
        .clone()
        .and_then(|n| DisplayName::new(n).ok())
        .filter(|name| *name != user.name);
    let avatar_url = profile
        .avatar_url
        .clone()
        .filter(|avatar| user.avatar_url.as_ref() != Some(avatar));

    if name.is_none() && avatar_url.is_none() {
        return None;
    }

    Some(ProfileRefresh {
        name: name.unwrap_or_else(|| user.name.clone()),
        avatar_url: avatar_url.or_else(|| user.avatar_url.clone()),
    })
}
