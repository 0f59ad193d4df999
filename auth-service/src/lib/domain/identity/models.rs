use crate::domain::user::models::AuthProvider;

/// Verified profile reported by an identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider: AuthProvider,
    pub provider_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProviderProfile {
    pub fn new(
        provider: AuthProvider,
        provider_id: impl Into<String>,
        email: Option<String>,
        display_name: Option<String>,
        avatar_url: Option<String>,
    ) -> Self {
        Self {
            provider,
            provider_id: provider_id.into(),
            email,
            display_name,
            avatar_url,
        }
    }

    /// Serialization key for concurrent resolution of this identity.
    pub fn identity_key(&self) -> String {
        format!("{}:{}", self.provider, self.provider_id)
    }
}
