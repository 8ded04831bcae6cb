//! Bounded fire-and-forget audit dispatch.
//!
//! Every [`AuditDispatcher::dispatch`] call returns immediately. Delivery runs
//! on a detached task tracked by a [`TaskTracker`]; at most `max_in_flight`
//! deliveries run at once and entries arriving beyond that are dropped with a
//! warning. Delivery failures are logged and otherwise ignored.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

use crate::audit::{AuditEntry, AuditNotifier};

pub struct AuditDispatcher {
    notifier: Arc<dyn AuditNotifier>,
    permits: Arc<Semaphore>,
    timeout: Duration,
    tracker: TaskTracker,
}

impl AuditDispatcher {
    pub fn new(notifier: Arc<dyn AuditNotifier>, max_in_flight: usize, timeout: Duration) -> Self {
        Self {
            notifier,
            permits: Arc::new(Semaphore::new(max_in_flight)),
            timeout,
            tracker: TaskTracker::new(),
        }
    }

    /// Queue `entry` for delivery without waiting for it.
    ///
    /// Returns `false` when the entry was dropped because the dispatcher is
    /// saturated or shutting down.
    pub fn dispatch(&self, entry: AuditEntry) -> bool {
        if self.tracker.is_closed() {
            tracing::warn!(
                entity = entry.entity.as_str(),
                action = entry.action.as_str(),
                "Audit dispatcher closed, dropping entry"
            );
            return false;
        }

        let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() else {
            tracing::warn!(
                entity = entry.entity.as_str(),
                action = entry.action.as_str(),
                entity_id = entry.entity_id,
                "Audit dispatcher saturated, dropping entry"
            );
            return false;
        };

        let notifier = Arc::clone(&self.notifier);
        let timeout = self.timeout;

        self.tracker.spawn(async move {
            let _permit = permit;
            match tokio::time::timeout(timeout, notifier.notify(&entry)).await {
                Ok(Ok(())) => {
                    tracing::debug!(
                        entity = entry.entity.as_str(),
                        action = entry.action.as_str(),
                        entity_id = entry.entity_id,
                        "Audit entry delivered"
                    );
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        error = %e,
                        entity = entry.entity.as_str(),
                        action = entry.action.as_str(),
                        entity_id = entry.entity_id,
                        "Audit log failed"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        timeout_ms = timeout.as_millis() as u64,
                        entity = entry.entity.as_str(),
                        action = entry.action.as_str(),
                        entity_id = entry.entity_id,
                        "Audit log timed out"
                    );
                }
            }
        });

        true
    }

    /// Number of deliveries currently running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stop accepting entries and wait up to `grace` for running deliveries.
    pub async fn shutdown(&self, grace: Duration) {
        self.tracker.close();
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
            tracing::warn!(
                remaining = self.tracker.len(),
                "Audit deliveries still running after shutdown grace period"
            );
        }
    }
}
