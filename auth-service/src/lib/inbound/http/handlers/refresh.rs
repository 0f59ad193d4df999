use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::enforce_rate_limit;
use super::ApiError;
use super::ApiSuccess;
use super::TokenData;
use crate::domain::auth::errors::AuthError;
use crate::domain::rate_limit::models::RateLimitScope;
use crate::inbound::http::client::ClientInfo;
use crate::inbound::http::cookies;
use crate::inbound::http::cookies::REFRESH_TOKEN_COOKIE;
use crate::inbound::http::router::AppState;

/// Rotate the presented refresh token. The body wins over the cookie.
pub async fn refresh(
    State(state): State<AppState>,
    client: ClientInfo,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<(CookieJar, ApiSuccess<TokenData>), ApiError> {
    enforce_rate_limit(&state, RateLimitScope::Refresh, &client)?;

    let presented = body
        .and_then(|Json(body)| body.refresh_token)
        .filter(|token| !token.is_empty())
        .or_else(|| cookies::read(&jar, REFRESH_TOKEN_COOKIE))
        .ok_or(AuthError::InvalidRefreshToken)?;

    let outcome = state
        .auth_service
        .refresh(&presented, client.context())
        .await?;

    let jar = cookies::with_tokens(jar, &outcome.tokens, state.cookies);
    Ok((
        jar,
        ApiSuccess::new(StatusCode::OK, (&outcome.tokens).into()),
    ))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RefreshRequest {
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
}
