//! Audit entry types and the notifier seam.

use async_trait::async_trait;
use hippo_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};

/// Kind of entity an audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntity {
    User,
    Medicine,
}

impl AuditEntity {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditEntity::User => "user",
            AuditEntity::Medicine => "medicine",
        }
    }
}

/// What was done to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Register,
    Login,
    Create,
    Get,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Register => "register",
            AuditAction::Login => "login",
            AuditAction::Create => "create",
            AuditAction::Get => "get",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
        }
    }
}

/// A single security-relevant event.
///
/// `entity_id` is `0` for collection-level actions (e.g. listing medicines).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entity: AuditEntity,
    pub action: AuditAction,
    pub entity_id: DbId,
    pub timestamp: Timestamp,
}

impl AuditEntry {
    pub fn new(entity: AuditEntity, action: AuditAction, entity_id: DbId) -> Self {
        Self {
            entity,
            action,
            entity_id,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Error type for audit delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The collector returned a non-2xx status code.
    #[error("Audit collector returned HTTP {0}")]
    HttpStatus(u16),

    /// Any other delivery failure.
    #[error("Audit delivery failed: {0}")]
    Delivery(String),
}

/// Delivers audit entries to wherever they are recorded.
#[async_trait]
pub trait AuditNotifier: Send + Sync {
    async fn notify(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}
