//! Repository for the `refresh_sessions` table.

use hippo_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::session::{CreateRefreshSession, RefreshSession};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, token_hash, expires_at, created_at";

/// Provides storage operations for refresh sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new session, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateRefreshSession,
    ) -> Result<RefreshSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO refresh_sessions (user_id, token_hash, expires_at, created_at)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RefreshSession>(&query)
            .bind(input.user_id)
            .bind(&input.token_hash)
            .bind(input.expires_at)
            .bind(input.created_at)
            .fetch_one(pool)
            .await
    }

    /// Delete the session matching `token_hash` and return it.
    ///
    /// Lookup and deletion are one statement. Concurrent callers presenting the
    /// same hash serialize on the row lock; the loser re-evaluates the predicate
    /// against the deleted row and gets `None`.
    ///
    /// Expired rows are returned too; the caller decides what expiry means.
    pub async fn consume_by_token_hash(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<RefreshSession>, sqlx::Error> {
        let query = format!(
            "DELETE FROM refresh_sessions
             WHERE token_hash = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RefreshSession>(&query)
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    /// Delete every session that expired before `cutoff`. Returns the count.
    pub async fn delete_expired(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE expires_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
