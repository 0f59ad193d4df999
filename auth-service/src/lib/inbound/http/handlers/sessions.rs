use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::auth::errors::AuthError;
use crate::domain::session::models::Session;
use crate::domain::session::models::SessionId;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<ApiSuccess<Vec<SessionData>>, ApiError> {
    let sessions = state.auth_service.list_sessions(&caller.user_id).await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        sessions.iter().map(SessionData::from).collect(),
    ))
}

pub async fn revoke_session(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    // A malformed id cannot name one of the caller's sessions.
    let session_id = SessionId::from_string(&session_id)
        .map_err(|_| ApiError::NotFound(AuthError::SessionNotFound.to_string()))?;

    match state
        .auth_service
        .revoke_session(&caller.user_id, &session_id)
        .await
    {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(AuthError::SessionNotFound) => {
            Err(ApiError::NotFound(AuthError::SessionNotFound.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Device view of a session. The token digest is never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionData {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl From<&Session> for SessionData {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.to_string(),
            created_at: session.created_at,
            last_used_at: session.last_used_at,
            expires_at: session.expires_at,
            user_agent: session.user_agent.clone(),
            ip_address: session.ip_address.clone(),
        }
    }
}
