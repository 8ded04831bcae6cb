//! HTTP-level integration tests for the `/api/v1/medicines` resource.

mod common;

use axum::http::header::LOCATION;
use axum::http::StatusCode;
use common::{
    body_json, create_user, delete_auth, get, get_auth, post_json_auth, put_json_auth,
};
use sqlx::PgPool;

/// Create a user and return a valid access token for them.
async fn token_for(app: axum::Router, pool: &PgPool, name: &str) -> String {
    create_user(pool, name).await;
    common::sign_in(app, &format!("{name}@test.com")).await.0
}

fn aspirin() -> serde_json::Value {
    serde_json::json!({
        "global_id": "0363-0160",
        "name": "Aspirin",
        "dosage": "325mg",
        "form": "tablet",
        "active_ingredient": "acetylsalicylic acid",
        "pharma_company": "Acme Pharma"
    })
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_token_is_401(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = get(app, "/api/v1/medicines").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn garbage_token_is_invalid_token(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = get_auth(app, "/api/v1/medicines", "not-a-jwt").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "INVALID_TOKEN");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn access_token_expires(pool: PgPool) {
    let clock = common::test_clock();
    let app = common::app_from_state(common::build_test_state(pool.clone(), clock.clone()));
    let token = token_for(app.clone(), &pool, "expiring").await;

    assert_eq!(
        get_auth(app.clone(), "/api/v1/medicines", &token).await.status(),
        StatusCode::OK
    );

    clock.advance(chrono::Duration::minutes(16));
    let response = get_auth(app, "/api/v1/medicines", &token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "INVALID_TOKEN");
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_then_get(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = token_for(app.clone(), &pool, "creator").await;

    let created = post_json_auth(app.clone(), "/api/v1/medicines", &token, aspirin()).await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let location = created.headers()[LOCATION].to_str().unwrap().to_string();
    let json = body_json(created).await;
    let id = json["data"]["id"].as_i64().unwrap();
    assert_eq!(location, format!("/api/v1/medicines/{id}"));

    let fetched = get_auth(app, &location, &token).await;
    assert_eq!(fetched.status(), StatusCode::OK);
    let json = body_json(fetched).await;
    assert_eq!(json["data"]["name"], "Aspirin");
    assert_eq!(json["data"]["global_id"], "0363-0160");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_requires_a_name(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = token_for(app.clone(), &pool, "nameless").await;

    let response = post_json_auth(
        app,
        "/api/v1/medicines",
        &token,
        serde_json::json!({ "name": "  " }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_returns_all_in_id_order(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = token_for(app.clone(), &pool, "lister").await;

    for name in ["Aspirin", "Ibuprofen"] {
        let response = post_json_auth(
            app.clone(),
            "/api/v1/medicines",
            &token,
            serde_json::json!({ "name": name }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = get_auth(app, "/api/v1/medicines", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let names: Vec<_> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Aspirin", "Ibuprofen"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn partial_update_keeps_other_fields(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = token_for(app.clone(), &pool, "updater").await;
    let created = body_json(post_json_auth(app.clone(), "/api/v1/medicines", &token, aspirin()).await).await;
    let id = created["data"]["id"].as_i64().unwrap();

    let response = put_json_auth(
        app,
        &format!("/api/v1/medicines/{id}"),
        &token,
        serde_json::json!({ "dosage": "81mg" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["dosage"], "81mg");
    assert_eq!(json["data"]["name"], "Aspirin");
    assert_eq!(json["data"]["form"], "tablet");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn empty_update_is_a_no_op(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = token_for(app.clone(), &pool, "noop").await;
    let created = body_json(post_json_auth(app.clone(), "/api/v1/medicines", &token, aspirin()).await).await;
    let id = created["data"]["id"].as_i64().unwrap();

    let response = put_json_auth(
        app,
        &format!("/api/v1/medicines/{id}"),
        &token,
        serde_json::json!({}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"], created["data"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_then_get_is_404(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = token_for(app.clone(), &pool, "deleter").await;
    let created = body_json(post_json_auth(app.clone(), "/api/v1/medicines", &token, aspirin()).await).await;
    let uri = format!("/api/v1/medicines/{}", created["data"]["id"]);

    let deleted = delete_auth(app.clone(), &uri, &token).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let again = delete_auth(app.clone(), &uri, &token).await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);

    let fetched = get_auth(app, &uri, &token).await;
    assert_eq!(fetched.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(fetched).await["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_medicine_update_is_404(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = token_for(app.clone(), &pool, "ghostwriter").await;

    let response = put_json_auth(
        app,
        "/api/v1/medicines/999999",
        &token,
        serde_json::json!({ "name": "Nothing" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn non_positive_id_is_400(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = token_for(app.clone(), &pool, "zero").await;

    let response = get_auth(app, "/api/v1/medicines/0", &token).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}
