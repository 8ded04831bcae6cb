//! Handlers for the `/medicines` resource.
//!
//! Every handler requires an authenticated user and records an audit entry on
//! success.

use axum::extract::{Path, State};
use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use hippo_core::error::CoreError;
use hippo_core::types::DbId;
use hippo_db::models::medicine::{CreateMedicine, Medicine, UpdateMedicine};
use hippo_db::repositories::MedicineRepo;
use hippo_events::{AuditAction, AuditEntity, AuditEntry};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

fn audit(state: &AppState, action: AuditAction, id: DbId) {
    state
        .audit
        .dispatch(AuditEntry::new(AuditEntity::Medicine, action, id));
}

fn ensure_positive(id: DbId) -> AppResult<()> {
    if id <= 0 {
        return Err(AppError::BadRequest(format!(
            "Medicine id must be positive, got {id}"
        )));
    }
    Ok(())
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Medicine",
        id,
    })
}

/// POST /api/v1/medicines
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateMedicine>,
) -> AppResult<impl IntoResponse> {
    if input.name.trim().is_empty() {
        return Err(CoreError::Validation("name: must not be empty".into()).into());
    }

    let medicine = MedicineRepo::create(&state.pool, &input).await?;

    tracing::info!(
        medicine_id = medicine.id,
        user_id = user.user_id,
        "Medicine created"
    );
    audit(&state, AuditAction::Create, medicine.id);

    Ok((
        StatusCode::CREATED,
        [(LOCATION, format!("/api/v1/medicines/{}", medicine.id))],
        Json(DataResponse { data: medicine }),
    ))
}

/// GET /api/v1/medicines
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Medicine>>>> {
    let medicines = MedicineRepo::list(&state.pool).await?;
    audit(&state, AuditAction::Get, 0);
    Ok(Json(DataResponse { data: medicines }))
}

/// GET /api/v1/medicines/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Medicine>>> {
    ensure_positive(id)?;

    let medicine = MedicineRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    audit(&state, AuditAction::Get, id);
    Ok(Json(DataResponse { data: medicine }))
}

/// PUT /api/v1/medicines/{id}
///
/// Only the provided fields change. An empty body returns the row untouched.
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateMedicine>,
) -> AppResult<Json<DataResponse<Medicine>>> {
    ensure_positive(id)?;

    if input.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(CoreError::Validation("name: must not be empty".into()).into());
    }

    let medicine = if input.is_empty() {
        MedicineRepo::find_by_id(&state.pool, id).await?
    } else {
        MedicineRepo::update(&state.pool, id, &input).await?
    }
    .ok_or_else(|| not_found(id))?;

    tracing::info!(medicine_id = id, user_id = user.user_id, "Medicine updated");
    audit(&state, AuditAction::Update, id);

    Ok(Json(DataResponse { data: medicine }))
}

/// DELETE /api/v1/medicines/{id}
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    ensure_positive(id)?;

    if !MedicineRepo::delete(&state.pool, id).await? {
        return Err(not_found(id));
    }

    tracing::info!(medicine_id = id, user_id = user.user_id, "Medicine deleted");
    audit(&state, AuditAction::Delete, id);

    Ok(StatusCode::NO_CONTENT)
}
