use async_trait::async_trait;

use crate::domain::identity::errors::IdentityError;
use crate::domain::identity::models::ProviderProfile;

/// Handshake with external identity providers.
#[async_trait]
pub trait ProviderGateway: Send + Sync + 'static {
    /// Where to send the browser to start a login with `provider`.
    ///
    /// # Errors
    /// * `UnknownProvider` - Provider is not configured
    fn authorize_url(&self, provider: &str, state: &str) -> Result<String, IdentityError>;

    /// Trade an authorization code for the verified profile it grants.
    ///
    /// # Errors
    /// * `UnknownProvider` - Provider is not configured
    /// * `Rejected` - Provider refused the code
    /// * `ProviderUnavailable` - Provider could not be reached
    /// * `MissingProviderId` - Profile carries no account identifier
    async fn exchange(&self, provider: &str, code: &str) -> Result<ProviderProfile, IdentityError>;
}
