use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::user::errors::DisplayNameError;
use crate::domain::user::errors::EmailError;
use crate::domain::user::errors::ProviderNameError;
use crate::domain::user::errors::RoleError;
use crate::domain::user::errors::UserIdError;

/// User aggregate entity.
///
/// One record per email and at most one per (provider, provider id) pair.
/// Accounts are deactivated through `active` rather than deleted.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: EmailAddress,
    pub name: DisplayName,
    pub role: Role,
    pub provider: AuthProvider,
    pub provider_id: Option<String>,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    pub active: bool,
    /// Absent for accounts that only ever signed in through a provider.
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// New local account created by registration.
    pub fn local(
        email: EmailAddress,
        name: DisplayName,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UserId::new(),
            email,
            name,
            role: Role::User,
            provider: AuthProvider::local(),
            provider_id: None,
            avatar_url: None,
            email_verified: false,
            active: true,
            password_hash: Some(password_hash),
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    /// New account created by a first identity provider login.
    ///
    /// Providers are trusted to have verified email ownership.
    pub fn from_provider(
        provider: AuthProvider,
        provider_id: String,
        email: EmailAddress,
        name: DisplayName,
        avatar_url: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UserId::new(),
            email,
            name,
            role: Role::User,
            provider,
            provider_id: Some(provider_id),
            avatar_url,
            email_verified: true,
            active: true,
            password_hash: None,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    pub fn record_login(&mut self, now: DateTime<Utc>) {
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    /// Make `link` the account's provider identity and trust its email.
    ///
    /// An account carries one provider identity; linking a second provider
    /// replaces the first. An existing avatar is kept.
    pub fn link_provider(&mut self, link: &ProviderLink, now: DateTime<Utc>) {
        self.provider = link.provider.clone();
        self.provider_id = Some(link.provider_id.clone());
        self.email_verified = true;
        if self.avatar_url.is_none() {
            self.avatar_url = link.avatar_url.clone();
        }
        self.updated_at = now;
    }

    pub fn refresh_profile(&mut self, refresh: &ProfileRefresh, now: DateTime<Utc>) {
        self.name = refresh.name.clone();
        self.avatar_url = refresh.avatar_url.clone();
        self.updated_at = now;
    }
}

/// Provider identity attached to an existing account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderLink {
    pub provider: AuthProvider,
    pub provider_id: String,
    /// Used only when the account has no avatar yet.
    pub avatar_url: Option<String>,
}

/// Name and avatar copied from a provider profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRefresh {
    pub name: DisplayName,
    pub avatar_url: Option<String>,
}

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a user ID from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, UserIdError> {
        Uuid::parse_str(s)
            .map(UserId)
            .map_err(|e| UserIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Validated with an RFC 5322 parser and normalized to lowercase, so lookups
/// are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated email address.
    ///
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, EmailError> {
        let normalized = email.trim().to_lowercase();
        email_address::EmailAddress::from_str(&normalized)
            .map(|_| EmailAddress(normalized))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Display name value type, 1-100 characters after trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName(String);

impl DisplayName {
    const MAX_LENGTH: usize = 100;

    pub fn new(name: String) -> Result<Self, DisplayNameError> {
        let trimmed = name.trim();
        let length = trimmed.chars().count();

        if length == 0 {
            Err(DisplayNameError::Empty)
        } else if length > Self::MAX_LENGTH {
            Err(DisplayNameError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            })
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Name for a provider profile that may not carry one.
    ///
    /// Falls back to the local part of the email address.
    pub fn or_from_email(name: Option<String>, email: &EmailAddress) -> Self {
        name.and_then(|n| Self::new(n).ok()).unwrap_or_else(|| {
            let local_part = email.as_str().split('@').next().unwrap_or("user");
            let fallback: String = local_part.chars().take(Self::MAX_LENGTH).collect();
            Self(fallback)
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(RoleError(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an account authenticates: `local` or an identity provider name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthProvider(String);

impl AuthProvider {
    pub const LOCAL: &'static str = "local";
    const MAX_LENGTH: usize = 32;

    pub fn local() -> Self {
        Self(Self::LOCAL.to_string())
    }

    /// Parse an external identity provider name such as `google`.
    ///
    /// # Errors
    /// * `Invalid` - Empty, too long or not lowercase alphanumeric
    /// * `Reserved` - The name `local`
    pub fn external(name: &str) -> Result<Self, ProviderNameError> {
        let valid = !name.is_empty()
            && name.len() <= Self::MAX_LENGTH
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

        if !valid {
            return Err(ProviderNameError::Invalid(name.to_string()));
        }
        if name == Self::LOCAL {
            return Err(ProviderNameError::Reserved(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    /// Rebuild from storage, where `local` is legitimate.
    pub fn from_stored(name: &str) -> Result<Self, ProviderNameError> {
        if name == Self::LOCAL {
            Ok(Self::local())
        } else {
            Self::external(name)
        }
    }

    pub fn is_local(&self) -> bool {
        self.0 == Self::LOCAL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_normalized() {
        let email = EmailAddress::new("  Ann@Example.COM ".to_string()).unwrap();
        assert_eq!(email.as_str(), "ann@example.com");
    }

    #[test]
    fn test_email_rejects_garbage() {
        assert!(EmailAddress::new("not-an-email".to_string()).is_err());
        assert!(EmailAddress::new(String::new()).is_err());
    }

    #[test]
    fn test_display_name_bounds() {
        assert_eq!(DisplayName::new("   ".to_string()), Err(DisplayNameError::Empty));
        assert!(matches!(
            DisplayName::new("x".repeat(101)),
            Err(DisplayNameError::TooLong { max: 100, actual: 101 })
        ));
        assert_eq!(DisplayName::new(" Ann ".to_string()).unwrap().as_str(), "Ann");
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let email = EmailAddress::new("ann@example.com".to_string()).unwrap();
        assert_eq!(DisplayName::or_from_email(None, &email).as_str(), "ann");
        assert_eq!(
            DisplayName::or_from_email(Some("".to_string()), &email).as_str(),
            "ann"
        );
        assert_eq!(
            DisplayName::or_from_email(Some("Ann Lee".to_string()), &email).as_str(),
            "Ann Lee"
        );
    }

    #[test]
    fn test_provider_names() {
        assert!(AuthProvider::external("google").is_ok());
        assert!(AuthProvider::external("Google").is_err());
        assert_eq!(
            AuthProvider::external("local"),
            Err(ProviderNameError::Reserved("local".to_string()))
        );
        assert!(AuthProvider::from_stored("local").unwrap().is_local());
    }

    #[test]
    fn test_role_round_trips_through_str() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::User.as_str(), "user");
        assert!("root".parse::<Role>().is_err());
    }
}
