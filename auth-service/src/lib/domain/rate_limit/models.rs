use chrono::Duration;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Blocked { retry_after_seconds: u64 },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

/// Attempt budget for one endpoint scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_attempts: u32,
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window: Duration::minutes(15),
        }
    }
}

/// Endpoints limited independently of one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitScope {
    Login,
    /// Login attempts against one account, from any address.
    LoginAccount,
    Register,
    Refresh,
    OAuthAuthorize,
    OAuth,
}

impl RateLimitScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitScope::Login => "login",
            RateLimitScope::LoginAccount => "login-account",
            RateLimitScope::Register => "register",
            RateLimitScope::Refresh => "refresh",
            RateLimitScope::OAuthAuthorize => "oauth-authorize",
            RateLimitScope::OAuth => "oauth",
        }
    }

    /// Counter key for `client` in this scope. A missing client identifier
    /// shares the `unknown` bucket instead of bypassing the limit.
    pub fn key_for(&self, client: Option<&str>) -> String {
        let client = client
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("unknown");
        format!("{}:{}", self.as_str(), client)
    }
}
