//! Background change notification broadcasting.
//!
//! The broadcaster compares the store's resource versions against the last
//! versions it saw and notifies every subscriber of each changed resource.

mod broadcaster;
mod snapshot;
mod stats;

pub use broadcaster::{BroadcasterHandle, CycleReport, NotificationBroadcaster};
pub use snapshot::VersionSnapshot;
pub use stats::{BroadcastStats, BroadcastStatsSnapshot};
