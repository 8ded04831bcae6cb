//! Periodic removal of expired refresh sessions.
//!
//! Expired sessions can never be rotated, but a client that simply stops
//! refreshing leaves its last session behind. This loop deletes them.

use std::sync::Arc;
use std::time::Duration;

use hippo_core::clock::Clock;
use tokio_util::sync::CancellationToken;

use crate::auth::SessionStore;

/// Run the sweep loop until `cancel` is triggered.
///
/// The first sweep runs immediately.
pub async fn run(
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    every: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = every.as_secs(), "Session sweep started");

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session sweep stopping");
                break;
            }
            _ = interval.tick() => {
                match store.purge_expired(clock.now()).await {
                    Ok(0) => tracing::debug!("Session sweep: nothing to purge"),
                    Ok(deleted) => tracing::info!(deleted, "Session sweep: purged expired sessions"),
                    Err(e) => tracing::error!(error = %e, "Session sweep failed"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use hippo_core::clock::ManualClock;
    use hippo_db::models::session::CreateRefreshSession;

    use super::*;
    use crate::auth::MemorySessionStore;

    #[tokio::test]
    async fn sweeps_expired_sessions_and_stops_on_cancel() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let store = Arc::new(MemorySessionStore::new());
        for (hash, offset) in [("gone", -2), ("also-gone", -1), ("kept", 1)] {
            store
                .save(CreateRefreshSession {
                    user_id: 1,
                    token_hash: hash.into(),
                    expires_at: now + chrono::Duration::hours(offset),
                    created_at: now,
                })
                .await
                .unwrap();
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(
            store.clone(),
            Arc::new(ManualClock::new(now)),
            Duration::from_secs(3600),
            cancel.clone(),
        ));

        tokio::time::timeout(Duration::from_secs(1), async {
            while store.len() != 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("first sweep should run immediately");

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweep should stop after cancel")
            .unwrap();
        assert!(store.consume_by_token("kept").await.is_ok());
    }
}
