use auth::TokenPair;
use axum::http::header;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::domain::auth::errors::AuthError;
use crate::domain::rate_limit::models::RateLimitDecision;
use crate::domain::rate_limit::models::RateLimitScope;
use crate::domain::user::models::User;
use crate::inbound::http::client::ClientInfo;
use crate::inbound::http::router::AppState;

pub mod health;
pub mod login;
pub mod logout;
pub mod me;
pub mod oauth;
pub mod refresh;
pub mod register;
pub mod sessions;

const AUTHENTICATION_FAILED: &str = "Authentication failed";

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

/// Caller-facing failures. Messages never carry internal details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError,
    ServiceUnavailable,
    BadRequest(String),
    Unauthorized,
    NotFound(String),
    Conflict(String),
    TooManyRequests { retry_after_seconds: u64 },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
            ApiError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, AUTHENTICATION_FAILED.to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::TooManyRequests {
                retry_after_seconds,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                format!(
                    "Too many attempts, retry after {} seconds",
                    retry_after_seconds
                ),
            ),
        };

        let mut response =
            (status, Json(ApiResponseBody::new_error(status, message))).into_response();

        if let ApiError::TooManyRequests {
            retry_after_seconds,
        } = self
        {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_seconds));
        }
        response
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation { .. } => ApiError::BadRequest(err.to_string()),
            AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::InvalidRefreshToken
            | AuthError::SessionNotFound
            | AuthError::BlacklistedToken => ApiError::Unauthorized,
            AuthError::DuplicateEmail | AuthError::MissingProviderEmail => {
                ApiError::Conflict(err.to_string())
            }
            AuthError::RateLimitExceeded {
                retry_after_seconds,
            } => ApiError::TooManyRequests {
                retry_after_seconds,
            },
            AuthError::UserNotFound => ApiError::NotFound(err.to_string()),
            AuthError::Unavailable(detail) => {
                tracing::error!(error = %detail, "Dependency unavailable");
                ApiError::ServiceUnavailable
            }
            AuthError::Configuration(detail) | AuthError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                ApiError::InternalServerError
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data,
        }
    }
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, message: String) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData { message },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageData {
    pub message: String,
}

impl MessageData {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserData {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub provider: String,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&User> for UserData {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.as_str().to_string(),
            name: user.name.as_str().to_string(),
            role: user.role.as_str().to_string(),
            provider: user.provider.as_str().to_string(),
            avatar_url: user.avatar_url.clone(),
            email_verified: user.email_verified,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenData {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: &'static str,
}

impl From<&TokenPair> for TokenData {
    fn from(tokens: &TokenPair) -> Self {
        Self {
            access_token: tokens.access.value.clone(),
            refresh_token: tokens.refresh.value.clone(),
            expires_in: tokens.expires_in,
            token_type: "Bearer",
        }
    }
}

/// Response of every endpoint that signs a user in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthResponseData {
    pub user: UserData,
    #[serde(flatten)]
    pub tokens: TokenData,
}

/// Count this request against the client's budget for `scope`.
pub fn enforce_rate_limit(
    state: &AppState,
    scope: RateLimitScope,
    client: &ClientInfo,
) -> Result<(), ApiError> {
    spend(state, &client.rate_limit_key(scope)).map_err(|err| {
        tracing::warn!(
            scope = scope.as_str(),
            client = client.ip.as_deref().unwrap_or("unknown"),
            "Client blocked by rate limit"
        );
        err
    })
}

/// Count a login attempt against the targeted account, whatever address it
/// claims to come from.
pub fn enforce_account_rate_limit(state: &AppState, email: &str) -> Result<(), ApiError> {
    let scope = RateLimitScope::LoginAccount;
    let account = email.trim().to_lowercase();

    spend(state, &scope.key_for(Some(&account))).map_err(|err| {
        tracing::warn!(scope = scope.as_str(), "Account blocked by rate limit");
        err
    })
}

fn spend(state: &AppState, key: &str) -> Result<(), ApiError> {
    let policy = state.rate_limit;

    match state
        .rate_limiter
        .allow(key, policy.max_attempts, policy.window)
    {
        RateLimitDecision::Allowed { .. } => Ok(()),
        RateLimitDecision::Blocked {
            retry_after_seconds,
        } => Err(AuthError::RateLimitExceeded {
            retry_after_seconds,
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_failures_share_one_response() {
        let failures = [
            AuthError::InvalidCredentials,
            AuthError::InvalidToken,
            AuthError::InvalidRefreshToken,
            AuthError::SessionNotFound,
            AuthError::BlacklistedToken,
        ];

        for failure in failures {
            assert_eq!(ApiError::from(failure), ApiError::Unauthorized);
        }
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        assert_eq!(
            ApiError::from(AuthError::Unavailable("pool exhausted at 10.0.0.5".to_string())),
            ApiError::ServiceUnavailable
        );
        assert_eq!(
            ApiError::from(AuthError::Internal("argon2 params".to_string())),
            ApiError::InternalServerError
        );
    }

    #[test]
    fn test_rate_limit_response_has_retry_after() {
        let response = ApiError::TooManyRequests {
            retry_after_seconds: 42,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[test]
    fn test_validation_names_the_field() {
        let err = ApiError::from(AuthError::validation("password", "too short"));

        assert_eq!(
            err,
            ApiError::BadRequest("Invalid password: too short".to_string())
        );
    }
}
