//! Refresh session model and DTOs.

use hippo_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A refresh session row from the `refresh_sessions` table.
///
/// Only the SHA-256 digest of the refresh token is stored.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RefreshSession {
    pub id: DbId,
    pub user_id: DbId,
    pub token_hash: String,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

impl RefreshSession {
    /// Whether the session had lapsed at `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at < now
    }
}

/// DTO for creating a new refresh session.
#[derive(Debug, Clone)]
pub struct CreateRefreshSession {
    pub user_id: DbId,
    pub token_hash: String,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}
