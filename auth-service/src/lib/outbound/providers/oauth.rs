use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::config::OAuthProviderConfig;
use crate::domain::identity::errors::IdentityError;
use crate::domain::identity::models::ProviderProfile;
use crate::domain::identity::ports::ProviderGateway;
use crate::domain::user::models::AuthProvider;

/// Authorization-code flow against configured OAuth 2.0 providers.
pub struct OAuthProviderGateway {
    client: reqwest::Client,
    providers: HashMap<String, OAuthProviderConfig>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl OAuthProviderGateway {
    pub fn new(
        providers: HashMap<String, OAuthProviderConfig>,
        timeout: Duration,
    ) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityError::ProviderUnavailable(e.to_string()))?;

        Ok(Self { client, providers })
    }

    fn provider(&self, name: &str) -> Result<&OAuthProviderConfig, IdentityError> {
        self.providers
            .get(name)
            .ok_or_else(|| IdentityError::UnknownProvider(name.to_string()))
    }

    async fn fetch_access_token(
        &self,
        name: &str,
        config: &OAuthProviderConfig,
        code: &str,
    ) -> Result<String, IdentityError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
        ];

        let response = self
            .client
            .post(&config.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| IdentityError::ProviderUnavailable(format!("{}: {}", name, e)))?;

        check_status(name, "token exchange", response.status())?;

        response
            .json::<TokenResponse>()
            .await
            .map(|token| token.access_token)
            .map_err(|e| IdentityError::Rejected(format!("{} token response: {}", name, e)))
    }

    async fn fetch_userinfo(
        &self,
        name: &str,
        config: &OAuthProviderConfig,
        access_token: &str,
    ) -> Result<Value, IdentityError> {
        let response = self
            .client
            .get(&config.userinfo_url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| IdentityError::ProviderUnavailable(format!("{}: {}", name, e)))?;

        check_status(name, "userinfo", response.status())?;

        response
            .json::<Value>()
            .await
            .map_err(|e| IdentityError::Rejected(format!("{} userinfo response: {}", name, e)))
    }
}

fn check_status(name: &str, step: &str, status: StatusCode) -> Result<(), IdentityError> {
    if status.is_success() {
        Ok(())
    } else if status.is_server_error() {
        Err(IdentityError::ProviderUnavailable(format!(
            "{} {} returned {}",
            name, step, status
        )))
    } else {
        Err(IdentityError::Rejected(format!(
            "{} {} returned {}",
            name, step, status
        )))
    }
}

/// Read one userinfo member as text. Numeric ids are stringified.
fn text_field(userinfo: &Value, field: &str) -> Option<String> {
    match userinfo.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Map a userinfo document to a profile using the provider's field names.
fn profile_from_userinfo(
    provider: AuthProvider,
    config: &OAuthProviderConfig,
    userinfo: &Value,
) -> Result<ProviderProfile, IdentityError> {
    let provider_id =
        text_field(userinfo, &config.id_field).ok_or(IdentityError::MissingProviderId)?;

    Ok(ProviderProfile::new(
        provider,
        provider_id,
        text_field(userinfo, &config.email_field),
        text_field(userinfo, &config.name_field),
        text_field(userinfo, &config.avatar_field),
    ))
}

#[async_trait]
impl ProviderGateway for OAuthProviderGateway {
    fn authorize_url(&self, provider: &str, state: &str) -> Result<String, IdentityError> {
        let config = self.provider(provider)?;

        let mut url = Url::parse(&config.authorize_url)
            .map_err(|e| IdentityError::ProviderUnavailable(format!("{}: {}", provider, e)))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &config.client_id)
            .append_pair("redirect_uri", &config.redirect_uri)
            .append_pair("scope", &config.scopes.join(" "))
            .append_pair("state", state);

        Ok(url.into())
    }

    async fn exchange(&self, provider: &str, code: &str) -> Result<ProviderProfile, IdentityError> {
        let config = self.provider(provider)?;
        let name = AuthProvider::external(provider)
            .map_err(|_| IdentityError::UnknownProvider(provider.to_string()))?;

        let access_token = self.fetch_access_token(provider, config, code).await?;
        let userinfo = self.fetch_userinfo(provider, config, &access_token).await?;

        tracing::debug!(provider, "Provider profile fetched");
        profile_from_userinfo(name, config, &userinfo)
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::Form;
    use axum::http::HeaderMap;
    use axum::routing::get;
    use axum::routing::post;
    use axum::Json;
    use axum::Router;
    use serde_json::json;

    use super::*;

    fn provider_config(base: &str) -> OAuthProviderConfig {
        OAuthProviderConfig {
            client_id: "client-1".to_string(),
            client_secret: "shh".to_string(),
            authorize_url: format!("{}/authorize", base),
            token_url: format!("{}/token", base),
            userinfo_url: format!("{}/userinfo", base),
            redirect_uri: "https://app.example.com/callback".to_string(),
            scopes: vec!["openid".to_string(), "email".to_string()],
            id_field: "id".to_string(),
            email_field: "email".to_string(),
            name_field: "login".to_string(),
            avatar_field: "avatar_url".to_string(),
        }
    }

    fn gateway(base: &str) -> OAuthProviderGateway {
        let providers = HashMap::from([("github".to_string(), provider_config(base))]);
        OAuthProviderGateway::new(providers, Duration::from_secs(5)).unwrap()
    }

    /// Minimal provider: accepts code `good`, serves a numeric-id profile.
    async fn spawn_provider() -> String {
        async fn token(Form(form): Form<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
            if form.get("code").map(String::as_str) == Some("good")
                && form.get("grant_type").map(String::as_str) == Some("authorization_code")
            {
                (StatusCode::OK, Json(json!({ "access_token": "at-1" })))
            } else {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid_grant" })))
            }
        }

        async fn userinfo(headers: HeaderMap) -> (StatusCode, Json<Value>) {
            let authorized = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                == Some("Bearer at-1");
            if authorized {
                (
                    StatusCode::OK,
                    Json(json!({
                        "id": 4242,
                        "email": "ann@example.com",
                        "login": "ann",
                        "avatar_url": "https://img.example.com/ann.png"
                    })),
                )
            } else {
                (StatusCode::UNAUTHORIZED, Json(json!({})))
            }
        }

        let app = Router::new()
            .route("/token", post(token))
            .route("/userinfo", get(userinfo));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        address
    }

    #[test]
    fn test_authorize_url_carries_state_and_client() {
        let gateway = gateway("https://provider.example.com");

        let url = gateway.authorize_url("github", "st-1").unwrap();
        let parsed = Url::parse(&url).unwrap();
        let query: HashMap<_, _> = parsed.query_pairs().into_owned().collect();

        assert_eq!(parsed.path(), "/authorize");
        assert_eq!(query["state"], "st-1");
        assert_eq!(query["client_id"], "client-1");
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["scope"], "openid email");
    }

    #[test]
    fn test_unknown_provider() {
        let gateway = gateway("https://provider.example.com");

        assert!(matches!(
            gateway.authorize_url("myspace", "st-1"),
            Err(IdentityError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_profile_requires_id() {
        let config = provider_config("https://provider.example.com");
        let provider = AuthProvider::external("github").unwrap();

        let result = profile_from_userinfo(provider, &config, &json!({ "email": "a@b.c" }));

        assert!(matches!(result, Err(IdentityError::MissingProviderId)));
    }

    #[tokio::test]
    async fn test_exchange_maps_profile_fields() {
        let base = spawn_provider().await;
        let gateway = gateway(&base);

        let profile = gateway.exchange("github", "good").await.unwrap();

        assert_eq!(profile.provider.as_str(), "github");
        assert_eq!(profile.provider_id, "4242");
        assert_eq!(profile.email.as_deref(), Some("ann@example.com"));
        assert_eq!(profile.display_name.as_deref(), Some("ann"));
        assert_eq!(
            profile.avatar_url.as_deref(),
            Some("https://img.example.com/ann.png")
        );
    }

    #[tokio::test]
    async fn test_exchange_with_bad_code_is_rejected() {
        let base = spawn_provider().await;
        let gateway = gateway(&base);

        let result = gateway.exchange("github", "bad").await;

        assert!(matches!(result, Err(IdentityError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_unavailable() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let result = gateway(&base).exchange("github", "good").await;

        assert!(matches!(result, Err(IdentityError::ProviderUnavailable(_))));
    }
}
