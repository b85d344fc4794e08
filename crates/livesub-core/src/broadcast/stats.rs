//! Broadcaster counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use super::broadcaster::CycleReport;

/// Running totals across broadcast cycles.
#[derive(Debug)]
pub struct BroadcastStats {
    cycles: AtomicU64,
    resources_changed: AtomicU64,
    notifications_delivered: AtomicU64,
    delivery_failures: AtomicU64,
    resources_missing: AtomicU64,
    started_at: Instant,
}

/// Point-in-time copy of [`BroadcastStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BroadcastStatsSnapshot {
    pub cycles: u64,
    pub resources_changed: u64,
    pub notifications_delivered: u64,
    pub delivery_failures: u64,
    pub resources_missing: u64,
    pub uptime_secs: u64,
}

impl BroadcastStats {
    pub fn new() -> Self {
        Self {
            cycles: AtomicU64::new(0),
            resources_changed: AtomicU64::new(0),
            notifications_delivered: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            resources_missing: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Fold a finished cycle into the totals.
    pub(crate) fn record(&self, report: &CycleReport) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.resources_changed
            .fetch_add(report.resources_changed as u64, Ordering::Relaxed);
        self.notifications_delivered
            .fetch_add(report.notifications_delivered as u64, Ordering::Relaxed);
        self.delivery_failures
            .fetch_add(report.delivery_failures as u64, Ordering::Relaxed);
        self.resources_missing
            .fetch_add(report.resources_missing as u64, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn snapshot(&self) -> BroadcastStatsSnapshot {
        BroadcastStatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            resources_changed: self.resources_changed.load(Ordering::Relaxed),
            notifications_delivered: self.notifications_delivered.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            resources_missing: self.resources_missing.load(Ordering::Relaxed),
            uptime_secs: self.uptime().as_secs(),
        }
    }
}

impl Default for BroadcastStats {
    fn default() -> Self {
        Self::new()
    }
}
