use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::header;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::enforce_rate_limit;
use super::register::signed_in;
use super::ApiError;
use super::ApiSuccess;
use super::AuthResponseData;
use crate::domain::auth::errors::AuthError;
use crate::domain::identity::errors::IdentityError;
use crate::domain::rate_limit::models::RateLimitScope;
use crate::inbound::http::client::ClientInfo;
use crate::inbound::http::cookies;
use crate::inbound::http::router::AppState;

/// Start the authorization-code flow: 302 to the provider with a fresh state,
/// which is also set as a cookie binding the flow to this browser.
pub async fn authorize(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    client: ClientInfo,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    enforce_rate_limit(&state, RateLimitScope::OAuthAuthorize, &client)?;

    let pending = state.oauth_states.issue(&provider);

    let location = match state.gateway.authorize_url(&provider, &pending) {
        Ok(location) => location,
        Err(e) => {
            state.oauth_states.take(&pending, &provider);
            return Err(AuthError::from(e).into());
        }
    };

    let max_age = i64::try_from(state.oauth_states.ttl().as_secs()).unwrap_or(i64::MAX);
    let jar = cookies::with_oauth_state(jar, pending, max_age, state.cookies);

    tracing::debug!(provider = %provider, "Redirecting to identity provider");
    Ok((StatusCode::FOUND, jar, [(header::LOCATION, location)]).into_response())
}

pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    client: ClientInfo,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, ApiSuccess<AuthResponseData>), ApiError> {
    enforce_rate_limit(&state, RateLimitScope::OAuth, &client)?;

    let bound = cookies::read(&jar, cookies::OAUTH_STATE_COOKIE);
    let state_matches = match (params.state.as_deref(), bound.as_deref()) {
        (Some(pending), Some(bound)) if pending == bound => {
            state.oauth_states.take(pending, &provider)
        }
        _ => false,
    };
    if !state_matches {
        tracing::warn!(
            provider = %provider,
            client = client.ip.as_deref().unwrap_or("unknown"),
            has_state_cookie = bound.is_some(),
            "OAuth callback state rejected"
        );
        return Err(AuthError::from(IdentityError::InvalidState).into());
    }
    let jar = cookies::without_oauth_state(jar);

    if let Some(error) = params.error {
        tracing::info!(provider = %provider, error = %error, "Provider denied authorization");
        return Err(AuthError::from(IdentityError::Rejected(error)).into());
    }

    let code = params
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AuthError::from(IdentityError::Rejected("missing code".to_string())))?;

    let profile = state
        .gateway
        .exchange(&provider, &code)
        .await
        .map_err(|e| {
            tracing::warn!(provider = %provider, error = %e, "Provider code exchange failed");
            AuthError::from(e)
        })?;

    let outcome = state
        .auth_service
        .oauth_callback(profile, client.context())
        .await?;

    Ok(signed_in(jar, &state, StatusCode::OK, &outcome))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}
