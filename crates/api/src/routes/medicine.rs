//! Route definitions for the `/medicines` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::medicine;
use crate::state::AppState;

/// Routes mounted at `/medicines`.
///
/// ```text
/// GET    /       -> list
/// POST   /       -> create
/// GET    /{id}   -> get_by_id
/// PUT    /{id}   -> update
/// DELETE /{id}   -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(medicine::list).post(medicine::create))
        .route(
            "/{id}",
            get(medicine::get_by_id)
                .put(medicine::update)
                .delete(medicine::delete),
        )
}
