//! livesub core - session-scoped resource subscriptions.
//!
//! This crate provides the subscription registry, the background
//! notification broadcaster and the session lifecycle hook that clears a
//! session's subscriptions when it ends.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod resource;
pub mod session;

pub use broadcast::{
    BroadcastStats, BroadcastStatsSnapshot, BroadcasterHandle, CycleReport,
    NotificationBroadcaster, VersionSnapshot,
};
pub use config::{BroadcasterConfig, DEFAULT_SCAN_INTERVAL_SECS};
pub use error::{DeliveryError, Error, Result};
pub use lifecycle::{SessionGuard, SessionLifecycle};
pub use registry::{SharedRegistry, SubscriptionRegistry};
pub use resource::{
    MemoryResourceStore, ResourceContents, ResourceId, ResourceStore, ResourceVersion,
    SharedResourceStore,
};
pub use session::{
    ChannelSink, NotificationSink, ResourceUpdated, Session, SessionHandle, SessionId,
    SessionState, RESOURCE_UPDATED_METHOD,
};
