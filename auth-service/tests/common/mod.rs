use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use auth::Authenticator;
use auth::TokenCodec;
use auth_service::domain::auth::service::AuthService;
use auth_service::domain::auth::service::AuthSettings;
use auth_service::domain::identity::errors::IdentityError;
use auth_service::domain::identity::models::ProviderProfile;
use auth_service::domain::identity::ports::ProviderGateway;
use auth_service::domain::rate_limit::fixed_window::FixedWindowRateLimiter;
use auth_service::domain::rate_limit::models::RateLimitPolicy;
use auth_service::domain::user::models::AuthProvider;
use auth_service::inbound::http::cookies::CookieSettings;
use auth_service::inbound::http::router::create_router;
use auth_service::inbound::http::router::AppState;
use auth_service::outbound::providers::OAuthStateStore;
use auth_service::outbound::repositories::InMemoryRevocationStore;
use auth_service::outbound::repositories::InMemorySessionStore;
use auth_service::outbound::repositories::InMemoryUserDirectory;
use serde_json::json;
use serde_json::Value;

const TEST_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";

/// Identity provider stand-in: each authorization code maps to a profile.
pub struct FakeProviderGateway {
    profiles: HashMap<String, ProviderProfile>,
}

impl FakeProviderGateway {
    fn new() -> Self {
        let google = AuthProvider::external("google").expect("valid provider name");
        let profiles = HashMap::from([
            (
                "code-ann".to_string(),
                ProviderProfile::new(
                    google.clone(),
                    "g-ann",
                    Some("ann@example.com".to_string()),
                    Some("Ann From Google".to_string()),
                    Some("https://img.example.com/ann.png".to_string()),
                ),
            ),
            (
                "code-no-email".to_string(),
                ProviderProfile::new(google, "g-anon", None, None, None),
            ),
        ]);

        Self { profiles }
    }
}

#[async_trait]
impl ProviderGateway for FakeProviderGateway {
    fn authorize_url(&self, provider: &str, state: &str) -> Result<String, IdentityError> {
        if provider != "google" {
            return Err(IdentityError::UnknownProvider(provider.to_string()));
        }
        Ok(format!(
            "https://accounts.example.com/authorize?client_id=test&state={}",
            state
        ))
    }

    async fn exchange(&self, provider: &str, code: &str) -> Result<ProviderProfile, IdentityError> {
        if provider != "google" {
            return Err(IdentityError::UnknownProvider(provider.to_string()));
        }
        self.profiles
            .get(code)
            .cloned()
            .ok_or_else(|| IdentityError::Rejected("invalid_grant".to_string()))
    }
}

/// Test application that spawns a real server on in-memory adapters
pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub users: Arc<InMemoryUserDirectory>,
    pub sessions: Arc<InMemorySessionStore>,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let codec = TokenCodec::new(TEST_SECRET, "auth-service", "auth-clients")
            .expect("Failed to create token codec");
        let authenticator = Arc::new(Authenticator::new(
            codec,
            chrono::Duration::minutes(15),
            chrono::Duration::days(7),
        ));

        let users = Arc::new(InMemoryUserDirectory::new());
        let sessions = Arc::new(InMemorySessionStore::new(
            chrono::Duration::days(7),
            chrono::Duration::days(30),
        ));
        let auth_service = Arc::new(AuthService::new(
            Arc::clone(&users),
            Arc::clone(&sessions),
            Arc::new(InMemoryRevocationStore::new()),
            authenticator,
            AuthSettings::default(),
        ));

        let state = AppState {
            auth_service,
            rate_limiter: Arc::new(FixedWindowRateLimiter::new()),
            rate_limit: RateLimitPolicy::default(),
            gateway: Arc::new(FakeProviderGateway::new()),
            oauth_states: Arc::new(OAuthStateStore::new()),
            // Plain http: secure cookies would never be sent back.
            cookies: CookieSettings { secure: false },
        };
        let router = create_router(state);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Server error");
        });

        Self {
            address,
            api_client: reqwest::Client::builder()
                .cookie_store(true)
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .expect("Failed to create reqwest client"),
            users,
            sessions,
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Helper to make POST request with Bearer token
    pub fn post_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.post(path).bearer_auth(token)
    }

    /// Helper to make DELETE request with Bearer token
    pub fn delete_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.api_client
            .delete(format!("{}{}", self.address, path))
            .bearer_auth(token)
    }

    /// Register an account and return the response `data`.
    pub async fn register(&self, email: &str, password: &str, name: &str) -> Value {
        let response = self
            .post("/api/auth/register")
            .json(&json!({ "email": email, "password": password, "name": name }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        let body: Value = response.json().await.expect("Failed to parse response");
        body["data"].clone()
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/api/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }
}
