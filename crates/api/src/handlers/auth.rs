//! Handlers for the `/auth` resource (sign-up, sign-in, refresh).
//!
//! Sign-in and refresh return the access token in the body and set the
//! refresh token as an `HttpOnly` cookie.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use hippo_core::error::CoreError;
use hippo_core::types::DbId;
use hippo_core::validation::validate_input;
use hippo_db::models::user::CreateUser;
use hippo_db::repositories::UserRepo;
use hippo_events::{AuditAction, AuditEntity, AuditEntry};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::CredentialPair;
use crate::error::{AppError, AppResult};
use crate::middleware::timeout::RequestDeadline;
use crate::response::DataResponse;
use crate::state::AppState;

/// Name of the cookie carrying the refresh token.
pub const REFRESH_COOKIE: &str = "refresh-token";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/sign-up`.
#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(length(min = 2, message = "must be at least 2 characters"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: String,
}

/// Request body for `POST /auth/sign-in`.
#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    pub password: String,
}

/// Optional body for `POST /auth/refresh` when no cookie is sent.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub id: DbId,
}

/// Successful sign-in / refresh body.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /auth/sign-up
///
/// Register a user. Returns 201 with the new id and a `Location` header.
pub async fn sign_up(
    State(state): State<AppState>,
    Json(input): Json<SignUpRequest>,
) -> AppResult<impl IntoResponse> {
    validate_input(&input)?;

    let password_hash = hash_on_blocking_pool(&state, input.password).await?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            name: input.name,
            email: input.email,
            password_hash,
        },
    )
    .await?
    .ok_or_else(|| CoreError::Conflict("A user with this email already exists".into()))?;

    tracing::info!(user_id = user.id, "User registered");
    state
        .audit
        .dispatch(AuditEntry::new(AuditEntity::User, AuditAction::Register, user.id));

    Ok((
        StatusCode::CREATED,
        [(LOCATION, format!("/auth/users/{}", user.id))],
        Json(DataResponse {
            data: SignUpResponse { id: user.id },
        }),
    ))
}

/// POST /auth/sign-in
///
/// Authenticate with email + password. Unknown email and wrong password are
/// indistinguishable to the caller.
pub async fn sign_in(
    State(state): State<AppState>,
    deadline: RequestDeadline,
    Json(input): Json<SignInRequest>,
) -> AppResult<Response> {
    validate_input(&input)?;

    let invalid = || AppError::Core(CoreError::Unauthorized("Invalid credentials".into()));

    let user = UserRepo::find_by_email(&state.pool, &input.email)
        .await?
        .ok_or_else(invalid)?;

    let hasher = Arc::clone(&state.hasher);
    let stored_hash = user.password_hash.clone();
    let password_valid =
        tokio::task::spawn_blocking(move || hasher.verify(&input.password, &stored_hash))
            .await
            .map_err(|e| CoreError::Internal(format!("Password task failed: {e}")))?
            .map_err(|e| CoreError::Internal(format!("Password verification error: {e}")))?;

    if !password_valid {
        tracing::info!(user_id = user.id, "Rejected sign-in with wrong password");
        return Err(invalid());
    }

    if deadline.is_cancelled() {
        tracing::debug!(user_id = user.id, "Sign-in abandoned before issuing credentials");
        return Ok(StatusCode::SERVICE_UNAVAILABLE.into_response());
    }

    let pair = state.authority.issue_pair(user.id).await?;

    state
        .audit
        .dispatch(AuditEntry::new(AuditEntity::User, AuditAction::Login, user.id));

    Ok(token_response(&state, &pair))
}

/// POST /auth/refresh
///
/// Exchange a refresh token (cookie, or JSON `refresh_token`) for a new pair.
/// The presented token is spent whether or not the exchange succeeds.
pub async fn refresh(
    State(state): State<AppState>,
    deadline: RequestDeadline,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let token = match refresh_cookie(&headers) {
        Some(token) => token,
        None => {
            serde_json::from_slice::<RefreshRequest>(&body)
                .map_err(|_| AppError::BadRequest("Missing refresh token".into()))?
                .refresh_token
        }
    };

    // Leave the token unspent if the client is already gone.
    if deadline.is_cancelled() {
        tracing::debug!("Refresh abandoned before rotation");
        return Ok(StatusCode::SERVICE_UNAVAILABLE.into_response());
    }

    let pair = state.authority.rotate(&token).await?;

    Ok(token_response(&state, &pair))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn hash_on_blocking_pool(state: &AppState, password: String) -> AppResult<String> {
    let hasher = Arc::clone(&state.hasher);
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| CoreError::Internal(format!("Password task failed: {e}")))?
        .map_err(|e| CoreError::Internal(format!("Password hashing error: {e}")).into())
}

/// Build the 200 response: access token in the body, refresh token in a cookie.
fn token_response(state: &AppState, pair: &CredentialPair) -> Response {
    let mut response = Json(TokenResponse {
        access_token: pair.access_token.clone(),
        token_type: "Bearer",
        expires_in: pair.expires_in,
    })
    .into_response();

    let max_age = (pair.refresh_expires_at - state.authority.clock().now())
        .num_seconds()
        .max(0);
    let cookie = format!(
        "{REFRESH_COOKIE}={}; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age={max_age}",
        pair.refresh_token
    );
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().insert(SET_COOKIE, value);
        }
        Err(e) => {
            tracing::error!(error = %e, "Refresh cookie is not a valid header value");
            return AppError::InternalError("Failed to set refresh cookie".into()).into_response();
        }
    }
    response
}

/// Read the refresh token from the `Cookie` header(s).
fn refresh_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == REFRESH_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; refresh-token=abc123; x=1"));
        assert_eq!(refresh_cookie(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn refresh_cookie_checks_every_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(COOKIE, HeaderValue::from_static("refresh-token=zzz"));
        assert_eq!(refresh_cookie(&headers).as_deref(), Some("zzz"));
    }

    #[test]
    fn empty_or_absent_refresh_cookie_is_none() {
        let mut headers = HeaderMap::new();
        assert_eq!(refresh_cookie(&headers), None);

        headers.insert(COOKIE, HeaderValue::from_static("refresh-token="));
        assert_eq!(refresh_cookie(&headers), None);
    }
}
