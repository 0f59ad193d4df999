pub mod oauth;
pub mod state;

pub use oauth::OAuthProviderGateway;
pub use state::OAuthStateStore;
