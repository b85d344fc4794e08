//! Simulated resource activity.

use std::sync::Arc;
use std::time::Duration;

use livesub_core::{BroadcasterHandle, MemoryResourceStore};

/// Periodically bump every resource and wake the broadcaster.
///
/// Runs until the task is aborted.
pub async fn simulate_updates(
    store: Arc<MemoryResourceStore>,
    broadcast: Arc<BroadcasterHandle>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let updated = store.touch_all();
        if updated > 0 {
            tracing::debug!(updated, "simulated resource updates");
            broadcast.trigger();
        }
    }
}
