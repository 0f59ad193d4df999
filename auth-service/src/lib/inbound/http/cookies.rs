use auth::TokenPair;
use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::cookie::CookieJar;
use axum_extra::extract::cookie::SameSite;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// Refresh tokens are only ever sent back to the auth endpoints.
const REFRESH_TOKEN_PATH: &str = "/api/auth";
const OAUTH_STATE_PATH: &str = "/api/auth/oauth";

#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self { secure: true }
    }
}

fn http_only_cookie(
    name: &'static str,
    value: String,
    path: &'static str,
    max_age_seconds: i64,
    same_site: SameSite,
    settings: CookieSettings,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(settings.secure)
        .same_site(same_site)
        .path(path)
        .max_age(time::Duration::seconds(max_age_seconds.max(0)))
        .build()
}

fn token_cookie(
    name: &'static str,
    value: String,
    path: &'static str,
    max_age_seconds: i64,
    settings: CookieSettings,
) -> Cookie<'static> {
    http_only_cookie(name, value, path, max_age_seconds, SameSite::Strict, settings)
}

/// Set both halves of `tokens` as HTTP-only cookies.
pub fn with_tokens(jar: CookieJar, tokens: &TokenPair, settings: CookieSettings) -> CookieJar {
    let refresh_lifetime = tokens.refresh.claims.exp - tokens.refresh.claims.iat;

    jar.add(token_cookie(
        ACCESS_TOKEN_COOKIE,
        tokens.access.value.clone(),
        "/",
        tokens.expires_in,
        settings,
    ))
    .add(token_cookie(
        REFRESH_TOKEN_COOKIE,
        tokens.refresh.value.clone(),
        REFRESH_TOKEN_PATH,
        refresh_lifetime,
        settings,
    ))
}

/// Expire both token cookies.
pub fn cleared(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_TOKEN_COOKIE).path(REFRESH_TOKEN_PATH))
}

pub fn read(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Bind a pending OAuth `state` to this browser.
///
/// `Lax` so the cookie survives the top-level redirect back from the provider.
pub fn with_oauth_state(
    jar: CookieJar,
    state: String,
    max_age_seconds: i64,
    settings: CookieSettings,
) -> CookieJar {
    jar.add(http_only_cookie(
        OAUTH_STATE_COOKIE,
        state,
        OAUTH_STATE_PATH,
        max_age_seconds,
        SameSite::Lax,
        settings,
    ))
}

pub fn without_oauth_state(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(OAUTH_STATE_COOKIE).path(OAUTH_STATE_PATH))
}
