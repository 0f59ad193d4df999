use auth::Claims;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;

use crate::domain::auth::errors::AuthError;
use crate::domain::user::models::UserId;
use crate::inbound::http::cookies;
use crate::inbound::http::cookies::ACCESS_TOKEN_COOKIE;
use crate::inbound::http::handlers::ApiError;
use crate::inbound::http::router::AppState;

/// Verified caller, stored in request extensions by [`authenticate`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub claims: Claims,
    /// The access token the request was authenticated with.
    pub token: String,
}

/// Verify the access token and attach the caller to the request.
///
/// The `Authorization: Bearer` header takes precedence over the
/// `access_token` cookie.
pub async fn authenticate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = bearer_token(req.headers())
        .or_else(|| cookies::read(&jar, ACCESS_TOKEN_COOKIE))
        .ok_or_else(|| ApiError::Unauthorized.into_response())?;

    let claims = state.auth_service.verify(&token).await.map_err(|e| {
        tracing::debug!(error = %e, "Access token rejected");
        ApiError::from(e).into_response()
    })?;

    let user_id = UserId::from_string(&claims.sub).map_err(|e| {
        tracing::error!(error = %e, "Token subject is not a user id");
        ApiError::from(AuthError::InvalidToken).into_response()
    })?;

    req.extensions_mut().insert(AuthenticatedUser {
        user_id,
        claims,
        token,
    });

    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
