use std::sync::Arc;

use hippo_events::AuditDispatcher;

use crate::auth::{CredentialAuthority, PasswordHasher};
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: everything is behind an `Arc` or is a pool handle.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: hippo_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Issues, verifies and rotates credentials.
    pub authority: Arc<CredentialAuthority>,
    pub hasher: Arc<dyn PasswordHasher>,
    /// Fire-and-forget audit delivery.
    pub audit: Arc<AuditDispatcher>,
}
