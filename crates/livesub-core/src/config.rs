//! Broadcaster configuration.

use std::time::Duration;

/// Default interval between broadcast cycles in seconds.
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 5;

/// Shortest interval accepted for the periodic scan.
pub const MIN_SCAN_INTERVAL: Duration = Duration::from_millis(1);

/// Notification broadcaster configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcasterConfig {
    /// Time between periodic scans.
    pub interval: Duration,
}

impl BroadcasterConfig {
    /// Create a configuration with the default interval.
    pub fn new() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_SCAN_INTERVAL_SECS),
        }
    }

    /// Set the scan interval. Clamped to [`MIN_SCAN_INTERVAL`].
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_SCAN_INTERVAL);
        self
    }
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self::new()
    }
}
