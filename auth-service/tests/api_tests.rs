mod common;

use common::TestApp;
use reqwest::header;
use reqwest::StatusCode;
use serde_json::json;
use serde_json::Value;

const PASSWORD: &str = "correct horse battery";

async fn data(response: reqwest::Response) -> Value {
    let body: Value = response.json().await.expect("Failed to parse response");
    body["data"].clone()
}

fn text(value: &Value) -> String {
    value.as_str().expect("expected a string").to_string()
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::spawn().await;

    let response = app.get("/health").send().await.expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(data(response).await["status"], "ok");
}

#[tokio::test]
async fn test_register_returns_user_and_tokens() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/api/auth/register")
        .json(&json!({ "email": "ann@example.com", "password": PASSWORD, "name": "Ann" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::CREATED);
    let cookies: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(cookies
        .iter()
        .any(|c| c.starts_with("access_token=") && c.contains("HttpOnly")));
    assert!(cookies
        .iter()
        .any(|c| c.starts_with("refresh_token=") && c.contains("SameSite=Strict")));

    let body = data(response).await;
    assert_eq!(body["user"]["email"], "ann@example.com");
    assert_eq!(body["user"]["name"], "Ann");
    assert_eq!(body["user"]["role"], "user");
    assert_eq!(body["user"]["provider"], "local");
    assert!(body["user"].get("password_hash").is_none());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 900);
    assert_ne!(body["access_token"], body["refresh_token"]);
}

#[tokio::test]
async fn test_register_rejects_invalid_fields() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/api/auth/register")
        .json(&json!({ "email": "ann@example.com", "password": "short", "name": "Ann" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let message = text(&data(response).await["message"]);
    assert!(message.contains("password"));
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let app = TestApp::spawn().await;
    app.register("ann@example.com", PASSWORD, "Ann").await;

    let response = app
        .post("/api/auth/register")
        .json(&json!({ "email": "ann@example.com", "password": PASSWORD, "name": "Other Ann" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(app.users.len(), 1);
}

#[tokio::test]
async fn test_register_then_login_opens_distinct_sessions() {
    let app = TestApp::spawn().await;
    let registered = app.register("ann@example.com", PASSWORD, "Ann").await;

    let response = app.login("ann@example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
    let logged_in = data(response).await;

    assert_eq!(logged_in["user"]["id"], registered["user"]["id"]);
    assert!(logged_in["user"]["last_login_at"].is_string());
    assert_ne!(logged_in["refresh_token"], registered["refresh_token"]);

    let access = text(&logged_in["access_token"]);
    let response = app
        .get_authenticated("/api/auth/sessions", &access)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);

    let sessions = data(response).await;
    let sessions = sessions.as_array().expect("expected a session list");
    assert_eq!(sessions.len(), 2);
    assert_ne!(sessions[0]["id"], sessions[1]["id"]);
    assert!(sessions[0].get("refresh_token_digest").is_none());
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::spawn().await;
    app.register("ann@example.com", PASSWORD, "Ann").await;

    let wrong_password = app.login("ann@example.com", "not the password").await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    let wrong_password = data(wrong_password).await;

    let unknown_user = app.login("nobody@example.com", PASSWORD).await;
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    let unknown_user = data(unknown_user).await;

    assert_eq!(wrong_password, unknown_user);
    assert_eq!(wrong_password["message"], "Authentication failed");
}

#[tokio::test]
async fn test_sixth_failed_login_is_rate_limited() {
    let app = TestApp::spawn().await;
    app.register("ann@example.com", PASSWORD, "Ann").await;

    for _ in 0..5 {
        let response = app.login("ann@example.com", "not the password").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let blocked = app.login("ann@example.com", PASSWORD).await;
    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = blocked.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 900);
    assert!(text(&data(blocked).await["message"]).contains(&retry_after.to_string()));

    // Another client address has its own budget for other accounts.
    app.register("bob@example.com", PASSWORD, "Bob").await;
    let response = app
        .post("/api/auth/login")
        .header("x-forwarded-for", "203.0.113.50")
        .json(&json!({ "email": "bob@example.com", "password": PASSWORD }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rotating_forwarded_for_keeps_account_budget() {
    let app = TestApp::spawn().await;
    app.register("ann@example.com", PASSWORD, "Ann").await;

    let mut statuses = Vec::new();
    for i in 1..=20 {
        let response = app
            .post("/api/auth/login")
            .header("x-forwarded-for", format!("198.51.100.{}", i))
            .json(&json!({ "email": " ANN@example.com", "password": "not the password" }))
            .send()
            .await
            .expect("Failed to execute request");
        statuses.push(response.status());
    }

    assert!(statuses[..5]
        .iter()
        .all(|status| *status == StatusCode::UNAUTHORIZED));
    assert!(statuses[5..]
        .iter()
        .all(|status| *status == StatusCode::TOO_MANY_REQUESTS));

    let response = app
        .post("/api/auth/login")
        .header("x-forwarded-for", "198.51.100.200")
        .json(&json!({ "email": "ann@example.com", "password": PASSWORD }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_oversized_forwarded_for_is_not_stored() {
    let app = TestApp::spawn().await;
    app.register("ann@example.com", PASSWORD, "Ann").await;

    let response = app
        .post("/api/auth/login")
        .header("x-forwarded-for", "1".repeat(65))
        .json(&json!({ "email": "ann@example.com", "password": PASSWORD }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
    let access = text(&data(response).await["access_token"]);

    let response = app
        .get_authenticated("/api/auth/sessions", &access)
        .send()
        .await
        .expect("Failed to execute request");
    let sessions = data(response).await;
    let sessions = sessions.as_array().expect("expected a session list");
    assert!(sessions
        .iter()
        .all(|session| session["ip_address"] == "127.0.0.1"));
}

#[tokio::test]
async fn test_refresh_rotates_and_replay_is_rejected() {
    let app = TestApp::spawn().await;
    let registered = app.register("ann@example.com", PASSWORD, "Ann").await;
    let original = text(&registered["refresh_token"]);

    let response = app
        .post("/api/auth/refresh")
        .json(&json!({ "refresh_token": original }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = data(response).await;
    assert_ne!(text(&rotated["refresh_token"]), original);
    assert!(rotated.get("user").is_none());

    let replay = app
        .post("/api/auth/refresh")
        .json(&json!({ "refreshToken": original }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .post("/api/auth/refresh")
        .json(&json!({ "refresh_token": text(&rotated["refresh_token"]) }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_from_cookie() {
    let app = TestApp::spawn().await;
    app.register("ann@example.com", PASSWORD, "Ann").await;

    let response = app
        .post("/api/auth/refresh")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(data(response).await["access_token"].is_string());
}

#[tokio::test]
async fn test_me_requires_a_valid_token() {
    let app = TestApp::spawn().await;
    let registered = app.register("ann@example.com", PASSWORD, "Ann").await;

    let response = app
        .get_authenticated("/api/auth/me", &text(&registered["access_token"]))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(data(response).await["user"]["email"], "ann@example.com");

    // The refresh token is not an access token.
    let response = app
        .get_authenticated("/api/auth/me", &text(&registered["refresh_token"]))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .get_authenticated("/api/auth/me", "garbage")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_access_and_refresh() {
    let app = TestApp::spawn().await;
    let registered = app.register("ann@example.com", PASSWORD, "Ann").await;
    let access = text(&registered["access_token"]);
    let refresh = text(&registered["refresh_token"]);

    let response = app
        .post_authenticated("/api/auth/logout", &access)
        .json(&json!({ "refresh_token": refresh }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(data(response).await["message"].is_string());

    let response = app
        .get_authenticated("/api/auth/me", &access)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .post("/api/auth/refresh")
        .json(&json!({ "refresh_token": refresh }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_token_is_unauthorized() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/api/auth/logout")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_all_ends_every_session() {
    let app = TestApp::spawn().await;
    let registered = app.register("ann@example.com", PASSWORD, "Ann").await;
    let second = data(app.login("ann@example.com", PASSWORD).await).await;
    let access = text(&second["access_token"]);

    let response = app
        .post_authenticated("/api/auth/logout-all", &access)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(data(response).await["sessions_revoked"], 2);

    for refresh in [&registered["refresh_token"], &second["refresh_token"]] {
        let response = app
            .post("/api/auth/refresh")
            .json(&json!({ "refresh_token": text(refresh) }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // The bearer used for the call is revoked too.
    let response = app
        .get_authenticated("/api/auth/me", &access)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_revoke_own_session_only() {
    let app = TestApp::spawn().await;
    let ann = app.register("ann@example.com", PASSWORD, "Ann").await;
    let bob = app.register("bob@example.com", PASSWORD, "Bob").await;

    let sessions = data(
        app.get_authenticated("/api/auth/sessions", &text(&ann["access_token"]))
            .send()
            .await
            .expect("Failed to execute request"),
    )
    .await;
    let ann_session = text(&sessions[0]["id"]);

    let response = app
        .delete_authenticated(
            &format!("/api/auth/sessions/{}", ann_session),
            &text(&bob["access_token"]),
        )
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .delete_authenticated(
            &format!("/api/auth/sessions/{}", ann_session),
            &text(&ann["access_token"]),
        )
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .post("/api/auth/refresh")
        .json(&json!({ "refresh_token": text(&ann["refresh_token"]) }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

async fn authorize_state(app: &TestApp, provider: &str) -> String {
    let response = app
        .get(&format!("/api/auth/oauth/{}/authorize", provider))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::FOUND);

    let location = response.headers()[header::LOCATION].to_str().unwrap();
    let location = url::Url::parse(location).expect("Location is a URL");
    location
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .expect("state parameter")
}

#[tokio::test]
async fn test_oauth_links_existing_local_account() {
    let app = TestApp::spawn().await;
    let local = app.register("ann@example.com", PASSWORD, "Ann").await;

    let state = authorize_state(&app, "google").await;
    let response = app
        .get(&format!(
            "/api/auth/oauth/google/callback?code=code-ann&state={}",
            state
        ))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let linked = data(response).await;
    assert_eq!(linked["user"]["id"], local["user"]["id"]);
    assert_eq!(linked["user"]["provider"], "google");
    assert_eq!(linked["user"]["email_verified"], true);
    assert_eq!(app.users.len(), 1);

    // The local password keeps working after linking.
    let response = app.login("ann@example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_oauth_state_is_single_use() {
    let app = TestApp::spawn().await;
    let state = authorize_state(&app, "google").await;
    let callback = format!("/api/auth/oauth/google/callback?code=code-ann&state={}", state);

    let first = app.get(&callback).send().await.expect("Failed to execute request");
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.get(&callback).send().await.expect("Failed to execute request");
    assert_eq!(second.status(), StatusCode::UNAUTHORIZED);

    let forged = app
        .get("/api/auth/oauth/google/callback?code=code-ann&state=forged")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_oauth_state_is_bound_to_the_browser() {
    let app = TestApp::spawn().await;

    let response = app
        .get("/api/auth/oauth/google/authorize")
        .send()
        .await
        .expect("Failed to execute request");
    let state_cookie = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("oauth_state="))
        .expect("state cookie")
        .to_string();
    assert!(state_cookie.contains("HttpOnly"));
    assert!(state_cookie.contains("SameSite=Lax"));
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    let state = url::Url::parse(location)
        .expect("Location is a URL")
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .expect("state parameter");
    let callback = format!(
        "{}/api/auth/oauth/google/callback?code=code-ann&state={}",
        app.address, state
    );

    // A victim lured to the attacker's callback URL has no matching cookie.
    let victim = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create reqwest client");
    let response = victim
        .get(&callback)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.users.is_empty());

    // The browser that started the flow completes it, and the cookie is cleared.
    let response = app
        .api_client
        .get(&callback)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with("oauth_state=") && value.contains("Max-Age=0")));
}

#[tokio::test]
async fn test_oauth_without_email_is_a_conflict() {
    let app = TestApp::spawn().await;
    let state = authorize_state(&app, "google").await;

    let response = app
        .get(&format!(
            "/api/auth/oauth/google/callback?code=code-no-email&state={}",
            state
        ))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(app.users.is_empty());
}

#[tokio::test]
async fn test_oauth_unknown_provider() {
    let app = TestApp::spawn().await;

    let response = app
        .get("/api/auth/oauth/myspace/authorize")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
