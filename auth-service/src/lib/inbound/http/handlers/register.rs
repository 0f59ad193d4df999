use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::enforce_rate_limit;
use super::ApiError;
use super::ApiSuccess;
use super::AuthResponseData;
use crate::domain::auth::errors::AuthError;
use crate::domain::auth::models::AuthOutcome;
use crate::domain::auth::models::RegisterCommand;
use crate::domain::rate_limit::models::RateLimitScope;
use crate::inbound::http::client::ClientInfo;
use crate::inbound::http::cookies;
use crate::inbound::http::router::AppState;

pub async fn register(
    State(state): State<AppState>,
    client: ClientInfo,
    jar: CookieJar,
    Json(body): Json<RegisterRequest>,
) -> Result<(CookieJar, ApiSuccess<AuthResponseData>), ApiError> {
    enforce_rate_limit(&state, RateLimitScope::Register, &client)?;

    let outcome = state
        .auth_service
        .register(body.try_into_command()?, client.context())
        .await?;

    Ok(signed_in(jar, &state, StatusCode::CREATED, &outcome))
}

/// Set the token cookies and build the shared sign-in response.
pub(super) fn signed_in(
    jar: CookieJar,
    state: &AppState,
    status: StatusCode,
    outcome: &AuthOutcome,
) -> (CookieJar, ApiSuccess<AuthResponseData>) {
    let jar = cookies::with_tokens(jar, &outcome.tokens, state.cookies);
    let data = AuthResponseData {
        user: (&outcome.user).into(),
        tokens: (&outcome.tokens).into(),
    };
    (jar, ApiSuccess::new(status, data))
}

/// HTTP request body for registering a local account (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterRequest {
    email: String,
    password: String,
    name: String,
}

impl RegisterRequest {
    fn try_into_command(self) -> Result<RegisterCommand, AuthError> {
        RegisterCommand::new(self.email, self.password, self.name)
    }
}
