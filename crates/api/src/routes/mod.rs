pub mod auth;
pub mod health;
pub mod medicine;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /medicines                                       list, create
/// /medicines/{id}                                  get, update, delete
/// ```
///
/// `/auth` and `/health` are mounted at the root by the app router.
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/medicines", medicine::router())
}
