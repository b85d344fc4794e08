use std::sync::Arc;

use livesub_core::{
    BroadcasterHandle, MemoryResourceStore, NotificationBroadcaster, SessionLifecycle,
    SharedRegistry, SubscriptionRegistry,
};

use crate::config::ServerConfig;

/// Application state shared across all routes and sessions
#[derive(Clone)]
pub struct AppState {
    pub registry: SharedRegistry,
    pub store: Arc<MemoryResourceStore>,
    pub lifecycle: Arc<SessionLifecycle>,
    pub broadcaster: Arc<NotificationBroadcaster>,
    pub broadcast: Arc<BroadcasterHandle>,
    pub config: ServerConfig,
}

impl AppState {
    /// Build the core components and start broadcasting.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: ServerConfig) -> Self {
        let registry: SharedRegistry = Arc::new(SubscriptionRegistry::new());
        let store = Arc::new(MemoryResourceStore::with_prefix(config.uri_prefix.clone()));
        let lifecycle = Arc::new(SessionLifecycle::new(registry.clone()));
        let broadcaster = Arc::new(NotificationBroadcaster::new(
            registry.clone(),
            store.clone(),
            config.broadcaster(),
        ));
        let broadcast = Arc::new(broadcaster.start());

        Self {
            registry,
            store,
            lifecycle,
            broadcaster,
            broadcast,
            config,
        }
    }

    /// Stop background broadcasting.
    pub async fn shutdown(&self) {
        self.broadcast.stop().await;
    }
}
