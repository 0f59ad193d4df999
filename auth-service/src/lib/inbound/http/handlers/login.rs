use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::enforce_account_rate_limit;
use super::enforce_rate_limit;
use super::register::signed_in;
use super::ApiError;
use super::ApiSuccess;
use super::AuthResponseData;
use crate::domain::auth::models::LoginCommand;
use crate::domain::rate_limit::models::RateLimitScope;
use crate::inbound::http::client::ClientInfo;
use crate::inbound::http::router::AppState;

pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, ApiSuccess<AuthResponseData>), ApiError> {
    enforce_rate_limit(&state, RateLimitScope::Login, &client)?;
    enforce_account_rate_limit(&state, &body.email)?;

    let outcome = state
        .auth_service
        .login(LoginCommand::new(body.email, body.password), client.context())
        .await?;

    Ok(signed_in(jar, &state, StatusCode::OK, &outcome))
}

/// Credentials are passed through unvalidated so malformed input fails like a
/// wrong password.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}
