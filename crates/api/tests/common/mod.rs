#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use chrono::{TimeZone, Utc};
use hippo_core::clock::{Clock, ManualClock};
use hippo_db::models::user::{CreateUser, User};
use hippo_db::repositories::UserRepo;
use hippo_events::{AuditDispatcher, LogAuditNotifier};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use hippo_api::auth::{
    Argon2Hasher, AuthConfig, CredentialAuthority, PasswordHasher, PgSessionStore,
};
use hippo_api::config::{AppEnv, AuditConfig, ServerConfig};
use hippo_api::router::build_app_router;
use hippo_api::state::AppState;

pub const TEST_PASSWORD: &str = "test_password_123!";

/// Build a test `ServerConfig` with safe defaults.
///
/// Access tokens live 15 minutes and refresh sessions one hour.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        env: AppEnv::Local,
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        handler_timeout: Duration::from_secs(5),
        shutdown_timeout: Duration::from_secs(1),
        database_url: String::new(),
        db_max_connections: 5,
        auth: AuthConfig::new(
            "integration-test-secret",
            chrono::Duration::minutes(15),
            chrono::Duration::hours(1),
        ),
        audit: AuditConfig {
            url: None,
            timeout: Duration::from_secs(1),
            max_in_flight: 16,
        },
        session_sweep_interval: Duration::from_secs(3600),
    }
}

/// A clock pinned to a fixed instant. Advance it to age tokens and sessions.
pub fn test_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Utc::now()))
}

/// A clock pinned to a known calendar instant, for tests that compare times.
pub fn fixed_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ))
}

/// Application state over `pool`, reading time from `clock`.
pub fn build_test_state(pool: PgPool, clock: Arc<dyn Clock>) -> AppState {
    let config = test_config();
    let authority = CredentialAuthority::new(
        Arc::new(PgSessionStore::new(pool.clone())),
        clock,
        config.auth.clone(),
    );
    let audit = AuditDispatcher::new(
        Arc::new(LogAuditNotifier),
        config.audit.max_in_flight,
        config.audit.timeout,
    );

    AppState {
        pool,
        config: Arc::new(config),
        authority: Arc::new(authority),
        hasher: Arc::new(Argon2Hasher),
        audit: Arc::new(audit),
    }
}

/// Build the full application router, exactly as `main.rs` does.
pub fn app_from_state(state: AppState) -> Router {
    let config = Arc::clone(&state.config);
    build_app_router(state, &config).expect("test config is valid")
}

/// Full router over `pool` with the real clock.
pub fn build_test_app(pool: PgPool) -> Router {
    app_from_state(build_test_state(pool, test_clock()))
}

/// Insert a user with [`TEST_PASSWORD`].
pub async fn create_user(pool: &PgPool, name: &str) -> User {
    let password_hash = Argon2Hasher.hash(TEST_PASSWORD).unwrap();
    UserRepo::create(
        pool,
        &CreateUser {
            name: name.to_string(),
            email: format!("{name}@test.com"),
            password_hash,
        },
    )
    .await
    .expect("user creation should succeed")
    .expect("email should be unused")
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, empty_request(Method::GET, uri, None)).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, empty_request(Method::GET, uri, Some(token))).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, empty_request(Method::DELETE, uri, Some(token))).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, json_request(Method::POST, uri, None, body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, json_request(Method::POST, uri, Some(token), body)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, json_request(Method::PUT, uri, Some(token), body)).await
}

/// POST `/auth/refresh` presenting `refresh_token` as a cookie.
pub async fn refresh_with_cookie(app: Router, refresh_token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/refresh")
        .header(header::COOKIE, format!("refresh-token={refresh_token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Extract the refresh token from a `Set-Cookie: refresh-token=...` header.
pub fn refresh_cookie(response: &Response<Body>) -> String {
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("response should set the refresh cookie")
        .to_str()
        .unwrap();
    cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("refresh-token="))
        .expect("cookie should be refresh-token")
        .to_string()
}

/// Sign in through the API and return `(access_token, refresh_token)`.
pub async fn sign_in(app: Router, email: &str) -> (String, String) {
    let response = post_json(
        app,
        "/auth/sign-in",
        serde_json::json!({ "email": email, "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let refresh = refresh_cookie(&response);
    let json = body_json(response).await;
    (json["access_token"].as_str().unwrap().to_string(), refresh)
}
