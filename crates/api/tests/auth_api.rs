//! HTTP-level integration tests for sign-up, sign-in and refresh-token rotation.

mod common;

use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::StatusCode;
use common::{body_json, create_user, post_json, refresh_cookie, refresh_with_cookie, sign_in};
use hippo_db::models::user::CreateUser;
use hippo_db::repositories::UserRepo;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Sign-up
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn sign_up_returns_201_with_location(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(
        app,
        "/auth/sign-up",
        serde_json::json!({ "name": "Ada", "email": "ada@test.com", "password": "hunter22" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response.headers()[LOCATION].to_str().unwrap().to_string();
    let json = body_json(response).await;
    let id = json["data"]["id"].as_i64().unwrap();
    assert_eq!(location, format!("/auth/users/{id}"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sign_up_with_taken_email_is_409(pool: PgPool) {
    create_user(&pool, "taken").await;
    let app = common::build_test_app(pool);

    let response = post_json(
        app,
        "/auth/sign-up",
        serde_json::json!({ "name": "Other", "email": "taken@test.com", "password": "hunter22" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sign_up_validates_fields(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(
        app,
        "/auth/sign-up",
        serde_json::json!({ "name": "A", "email": "nope", "password": "123" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("name:"));
    assert!(message.contains("email:"));
    assert!(message.contains("password:"));
}

// ---------------------------------------------------------------------------
// Sign-in
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn sign_in_sets_refresh_cookie(pool: PgPool) {
    create_user(&pool, "signin").await;
    let app = common::build_test_app(pool);

    let response = post_json(
        app,
        "/auth/sign-in",
        serde_json::json!({ "email": "signin@test.com", "password": common::TEST_PASSWORD }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("refresh-token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Secure"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Path=/"));
    assert_eq!(refresh_cookie(&response).len(), 64);

    let json = body_json(response).await;
    assert!(json["access_token"].is_string());
    assert_eq!(json["token_type"], "Bearer");
    assert_eq!(json["expires_in"], 15 * 60);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn wrong_password_and_unknown_email_look_the_same(pool: PgPool) {
    create_user(&pool, "victim").await;
    let app = common::build_test_app(pool);

    let wrong_password = post_json(
        app.clone(),
        "/auth/sign-in",
        serde_json::json!({ "email": "victim@test.com", "password": "not-it" }),
    )
    .await;
    let unknown_email = post_json(
        app,
        "/auth/sign-in",
        serde_json::json!({ "email": "ghost@test.com", "password": "not-it" }),
    )
    .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(wrong_password).await, body_json(unknown_email).await);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn corrupt_stored_hash_is_a_sanitized_500(pool: PgPool) {
    UserRepo::create(
        &pool,
        &CreateUser {
            name: "corrupt".into(),
            email: "corrupt@test.com".into(),
            password_hash: "not-a-phc-string".into(),
        },
    )
    .await
    .unwrap()
    .unwrap();
    let app = common::build_test_app(pool);

    let response = post_json(
        app,
        "/auth/sign-in",
        serde_json::json!({ "email": "corrupt@test.com", "password": "whatever" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn refresh_rotates_and_rejects_replay(pool: PgPool) {
    create_user(&pool, "rotator").await;
    let app = common::build_test_app(pool);
    let (_, first_refresh) = sign_in(app.clone(), "rotator@test.com").await;

    let rotated = refresh_with_cookie(app.clone(), &first_refresh).await;
    assert_eq!(rotated.status(), StatusCode::OK);
    let second_refresh = refresh_cookie(&rotated);
    assert_ne!(second_refresh, first_refresh);
    assert!(body_json(rotated).await["access_token"].is_string());

    let replay = refresh_with_cookie(app.clone(), &first_refresh).await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(replay).await["code"], "INVALID_REFRESH_TOKEN");

    // The new token still works.
    let again = refresh_with_cookie(app, &second_refresh).await;
    assert_eq!(again.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn refresh_accepts_json_body(pool: PgPool) {
    create_user(&pool, "jsonbody").await;
    let app = common::build_test_app(pool);
    let (_, refresh) = sign_in(app.clone(), "jsonbody@test.com").await;

    let response = post_json(
        app,
        "/auth/refresh",
        serde_json::json!({ "refresh_token": refresh }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn refresh_without_token_is_400(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(app, "/auth/refresh", serde_json::json!({})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn expired_refresh_session_is_rejected_then_gone(pool: PgPool) {
    create_user(&pool, "sleeper").await;
    let clock = common::test_clock();
    let app = common::app_from_state(common::build_test_state(pool, clock.clone()));
    let (_, refresh) = sign_in(app.clone(), "sleeper@test.com").await;

    // Sessions live one hour in the test config.
    clock.advance(chrono::Duration::hours(2));

    let expired = refresh_with_cookie(app.clone(), &refresh).await;
    assert_eq!(expired.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(expired).await;
    assert_eq!(json["code"], "REFRESH_TOKEN_EXPIRED");
    assert_eq!(json["error"], "Refresh token has expired. Please sign in again.");

    let replay = refresh_with_cookie(app, &refresh).await;
    assert_eq!(body_json(replay).await["code"], "INVALID_REFRESH_TOKEN");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_refresh_has_one_winner(pool: PgPool) {
    create_user(&pool, "racer").await;
    let app = common::build_test_app(pool);
    let (_, refresh) = sign_in(app.clone(), "racer@test.com").await;

    let (a, b) = futures::join!(
        refresh_with_cookie(app.clone(), &refresh),
        refresh_with_cookie(app, &refresh),
    );

    let mut statuses = [a.status(), b.status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::UNAUTHORIZED]);
}
