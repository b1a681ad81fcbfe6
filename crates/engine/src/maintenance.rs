//! Background maintenance
//!
//! Sweeps expired request ids out of the idempotency ledger on a fixed
//! interval. Expired ids are already treated as unseen by lookups; the sweep
//! only bounds memory.

use std::sync::Arc;
use std::time::Duration;

use eventsync_core::Timestamp;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::engine::MutationEngine;

/// Start the periodic ledger sweep on the current tokio runtime
///
/// The task runs until the returned handle is aborted or the runtime shuts
/// down.
pub fn spawn_maintenance(engine: Arc<MutationEngine>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = engine.purge_expired(Timestamp::now());
            if purged > 0 {
                info!(target: "eventsync::engine", purged, remaining = engine.ledger().len(), "Purged expired request ids");
            } else {
                debug!(target: "eventsync::engine", "Ledger sweep found nothing to purge");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::StaticDirectory;
    use crate::hub::HubConfig;
    use eventsync_concurrency::LedgerConfig;
    use eventsync_core::{Limits, ProjectId, RequestId, UserId};
    use eventsync_storage::ShardedVersionStore;

    #[tokio::test]
    async fn test_sweep_purges_expired_request_ids() {
        let directory = StaticDirectory::from_entries(
            vec![("t".to_string(), UserId::new("alice"))],
            vec![(ProjectId::new(1), vec![UserId::new("alice")])],
        );
        let engine = Arc::new(MutationEngine::new(
            Arc::new(ShardedVersionStore::new()),
            Arc::new(directory),
            LedgerConfig {
                retention: Duration::ZERO,
                pending_wait: Duration::from_millis(100),
            },
            HubConfig::default(),
            Limits::default(),
        ));
        engine
            .create_event(
                ProjectId::new(1),
                "standup",
                "2024-01-10",
                Some(RequestId::new()),
                &UserId::new("alice"),
            )
            .await
            .unwrap();
        assert_eq!(engine.ledger().len(), 1);

        let handle = spawn_maintenance(Arc::clone(&engine), Duration::from_millis(10));
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while !engine.ledger().is_empty() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        handle.abort();

        assert!(engine.ledger().is_empty());
        assert_eq!(engine.store().len(), 1);
    }
}
