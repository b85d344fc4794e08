//! Notification broadcaster.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::snapshot::VersionSnapshot;
use super::stats::BroadcastStats;
use crate::config::BroadcasterConfig;
use crate::error::Error;
use crate::registry::SharedRegistry;
use crate::resource::SharedResourceStore;
use crate::session::ResourceUpdated;

/// Outcome of a single broadcast cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Resources listed by the store.
    pub resources_scanned: usize,
    /// Resources whose version moved since the previous cycle.
    pub resources_changed: usize,
    /// Notifications accepted by a session sink.
    pub notifications_delivered: usize,
    /// Notifications a session sink rejected.
    pub delivery_failures: usize,
    /// Changed resources the store could no longer read.
    pub resources_missing: usize,
}

/// Scans the resource store and notifies subscribers of changed resources.
///
/// Delivery is best-effort per subscriber: one failing session never stops
/// delivery to the others. The registry lock is only taken to copy the
/// subscriber list.
pub struct NotificationBroadcaster {
    registry: SharedRegistry,
    store: SharedResourceStore,
    config: BroadcasterConfig,
    /// Held for a whole cycle so concurrent scans never double-notify.
    snapshot: Mutex<VersionSnapshot>,
    stats: BroadcastStats,
}

impl NotificationBroadcaster {
    pub fn new(
        registry: SharedRegistry,
        store: SharedResourceStore,
        config: BroadcasterConfig,
    ) -> Self {
        Self {
            registry,
            store,
            config,
            snapshot: Mutex::new(VersionSnapshot::new()),
            stats: BroadcastStats::new(),
        }
    }

    /// Run one broadcast cycle.
    pub fn scan_once(&self) -> CycleReport {
        let mut snapshot = self.snapshot.lock();

        let listing = self.store.list();
        let changed = snapshot.advance(&listing);

        let mut report = CycleReport {
            resources_scanned: listing.len(),
            resources_changed: changed.len(),
            ..CycleReport::default()
        };

        for resource in changed {
            let contents = match self.store.get(&resource.id) {
                Ok(contents) => contents,
                Err(e) => {
                    warn!(uri = %resource.id, error = %e, "skipping changed resource");
                    snapshot.forget(&resource.id);
                    report.resources_missing += 1;
                    continue;
                }
            };
            snapshot.record(&contents.uri, contents.version);

            let subscribers = self.registry.subscribers_of(resource.id.as_str());
            if subscribers.is_empty() {
                continue;
            }

            let notification = ResourceUpdated::new(contents.uri, contents.version);
            for session in subscribers {
                match session.notify(&notification) {
                    Ok(()) => report.notifications_delivered += 1,
                    Err(reason) => {
                        let error = Error::DeliveryFailed {
                            session: session.id().clone(),
                            reason,
                        };
                        warn!(uri = %notification.uri, error = %error, "notification not delivered");
                        report.delivery_failures += 1;
                    }
                }
            }

            debug!(
                uri = %notification.uri,
                version = notification.version,
                "resource update broadcast"
            );
        }

        drop(snapshot);
        self.stats.record(&report);
        report
    }

    /// Spawn the periodic broadcast loop on the current tokio runtime.
    ///
    /// The loop scans every `interval` and whenever [`BroadcasterHandle::trigger`]
    /// is called, until the handle is stopped or dropped.
    pub fn start(self: &Arc<Self>) -> BroadcasterHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let trigger = Arc::new(Notify::new());

        let broadcaster = Arc::clone(self);
        let wake = Arc::clone(&trigger);
        let interval = self.config.interval;

        let task = tokio::spawn(async move {
            info!(interval_ms = interval.as_millis() as u64, "notification broadcaster started");

            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                    _ = ticker.tick() => {}
                    _ = wake.notified() => {}
                }

                let report = broadcaster.scan_once();
                if report.resources_changed > 0 {
                    debug!(
                        scanned = report.resources_scanned,
                        changed = report.resources_changed,
                        delivered = report.notifications_delivered,
                        failed = report.delivery_failures,
                        "broadcast cycle complete"
                    );
                }
            }

            let stats = broadcaster.stats.snapshot();
            info!(
                cycles = stats.cycles,
                delivered = stats.notifications_delivered,
                failed = stats.delivery_failures,
                "notification broadcaster stopped"
            );
        });

        BroadcasterHandle {
            shutdown: shutdown_tx,
            trigger,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn stats(&self) -> &BroadcastStats {
        &self.stats
    }

    pub fn config(&self) -> &BroadcasterConfig {
        &self.config
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }
}

/// Control handle for a running broadcast loop.
///
/// Dropping the handle also ends the loop.
pub struct BroadcasterHandle {
    shutdown: watch::Sender<bool>,
    trigger: Arc<Notify>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl BroadcasterHandle {
    /// Request a scan without waiting for the next tick.
    ///
    /// Triggers issued while a scan is pending are coalesced.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Stop the loop and wait for it to exit.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "broadcaster task ended abnormally");
            }
        }
    }

    /// Whether the loop is still running.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}
