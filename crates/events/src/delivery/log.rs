//! Log-only delivery, used when no audit collector is configured.

use async_trait::async_trait;

use crate::audit::{AuditEntry, AuditError, AuditNotifier};

/// Writes each entry to the `audit` tracing target and always succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAuditNotifier;

#[async_trait]
impl AuditNotifier for LogAuditNotifier {
    async fn notify(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        tracing::info!(
            target: "audit",
            entity = entry.entity.as_str(),
            action = entry.action.as_str(),
            entity_id = entry.entity_id,
            timestamp = %entry.timestamp,
            "Audit event"
        );
        Ok(())
    }
}
