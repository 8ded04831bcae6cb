//! Storage of refresh sessions behind the [`SessionStore`] seam.
//!
//! The contract every implementation must keep: `consume_by_token` looks up
//! and deletes in one atomic step, so two concurrent callers presenting the
//! same token never both receive the session.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use hippo_core::types::{DbId, Timestamp};
use hippo_db::models::session::{CreateRefreshSession, RefreshSession};
use hippo_db::repositories::SessionRepo;
use hippo_db::DbPool;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No session matches the presented token (never issued or already consumed).
    #[error("refresh session not found")]
    NotFound,

    #[error("session store failure: {0}")]
    Persistence(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Persistence(err.to_string())
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, session: CreateRefreshSession) -> Result<RefreshSession, StoreError>;

    /// Remove and return the session whose token hashes to `token_hash`.
    /// Expired sessions are returned (and removed) like any other.
    async fn consume_by_token(&self, token_hash: &str) -> Result<RefreshSession, StoreError>;

    /// Delete every session that expired before `now`. Returns the count.
    async fn purge_expired(&self, now: Timestamp) -> Result<u64, StoreError>;
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

pub struct PgSessionStore {
    pool: DbPool,
}

impl PgSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn save(&self, session: CreateRefreshSession) -> Result<RefreshSession, StoreError> {
        Ok(SessionRepo::create(&self.pool, &session).await?)
    }

    async fn consume_by_token(&self, token_hash: &str) -> Result<RefreshSession, StoreError> {
        SessionRepo::consume_by_token_hash(&self.pool, token_hash)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<u64, StoreError> {
        Ok(SessionRepo::delete_expired(&self.pool, now).await?)
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Mutex-guarded map keyed by token hash. Same contract as [`PgSessionStore`].
///
/// Backs the credential unit tests, which run without a database.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    last_id: DbId,
    by_hash: HashMap<String, RefreshSession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unconsumed, unpurged) sessions.
    pub fn len(&self) -> usize {
        self.lock().by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, session: CreateRefreshSession) -> Result<RefreshSession, StoreError> {
        let mut inner = self.lock();
        if inner.by_hash.contains_key(&session.token_hash) {
            return Err(StoreError::Persistence(
                "duplicate refresh token hash".into(),
            ));
        }

        inner.last_id += 1;
        let row = RefreshSession {
            id: inner.last_id,
            user_id: session.user_id,
            token_hash: session.token_hash,
            expires_at: session.expires_at,
            created_at: session.created_at,
        };
        inner.by_hash.insert(row.token_hash.clone(), row.clone());
        Ok(row)
    }

    async fn consume_by_token(&self, token_hash: &str) -> Result<RefreshSession, StoreError> {
        self.lock()
            .by_hash
            .remove(token_hash)
            .ok_or(StoreError::NotFound)
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        let before = inner.by_hash.len();
        inner.by_hash.retain(|_, s| !s.is_expired_at(now));
        Ok((before - inner.by_hash.len()) as u64)
    }
}
