use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use super::refresh::RefreshRequest;
use super::ApiError;
use super::ApiSuccess;
use super::MessageData;
use crate::inbound::http::cookies;
use crate::inbound::http::cookies::REFRESH_TOKEN_COOKIE;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

/// End the current session: revoke the bearer and drop the refresh session.
pub async fn logout(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> Result<(CookieJar, ApiSuccess<MessageData>), ApiError> {
    let refresh_token = body
        .and_then(|Json(body)| body.refresh_token)
        .filter(|token| !token.is_empty())
        .or_else(|| cookies::read(&jar, REFRESH_TOKEN_COOKIE));

    state
        .auth_service
        .logout(&caller.token, refresh_token.as_deref())
        .await?;

    Ok((
        cookies::cleared(jar),
        ApiSuccess::new(StatusCode::OK, MessageData::new("Logged out")),
    ))
}

pub async fn logout_all(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiSuccess<LogoutAllResponseData>), ApiError> {
    let sessions_revoked = state.auth_service.logout_all(&caller.user_id).await?;
    state
        .auth_service
        .revoke_access_token(&caller.token)
        .await?;

    Ok((
        cookies::cleared(jar),
        ApiSuccess::new(
            StatusCode::OK,
            LogoutAllResponseData {
                message: "Logged out of all sessions".to_string(),
                sessions_revoked,
            },
        ),
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogoutAllResponseData {
    pub message: String,
    pub sessions_revoked: u64,
}
