//! Sessions and their notification sinks.
//!
//! A [`Session`] is owned by the hosting transport. The subscription registry
//! only keeps weak references to it, so a session's lifetime is never
//! extended by its subscriptions.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::DeliveryError;
use crate::resource::ResourceId;

/// JSON-RPC method name of a resource update notification.
pub const RESOURCE_UPDATED_METHOD: &str = "notifications/resources/updated";

/// Unique identifier of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a session identifier from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Subscription state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Subscribe and unsubscribe are permitted.
    Active = 0,
    /// Teardown has begun; new subscribe/unsubscribe calls are rejected.
    Ending = 1,
    /// All subscriptions have been removed. Terminal.
    Cleared = 2,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::Active,
            1 => SessionState::Ending,
            _ => SessionState::Cleared,
        }
    }
}

/// Notification that a subscribed resource changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceUpdated {
    pub uri: ResourceId,
    pub version: u64,
}

impl ResourceUpdated {
    pub fn new(uri: ResourceId, version: u64) -> Self {
        Self { uri, version }
    }

    /// The notification method name.
    pub fn method(&self) -> &'static str {
        RESOURCE_UPDATED_METHOD
    }
}

/// Transport-side capability to push a notification to one session.
///
/// `send` must not block; retrying is the transport's concern.
pub trait NotificationSink: Send + Sync {
    fn send(&self, notification: &ResourceUpdated) -> Result<(), DeliveryError>;
}

/// Sink that forwards notifications into a bounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<ResourceUpdated>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<ResourceUpdated>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiving end of its channel.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<ResourceUpdated>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(tx), rx)
    }
}

impl NotificationSink for ChannelSink {
    fn send(&self, notification: &ResourceUpdated) -> Result<(), DeliveryError> {
        self.tx.try_send(notification.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Disconnected,
        })
    }
}

/// A connected client session.
pub struct Session {
    id: SessionId,
    state: AtomicU8,
    sink: Box<dyn NotificationSink>,
    created_at: Instant,
    notifications_sent: AtomicU64,
}

/// Shared session handle held by the transport.
pub type SessionHandle = Arc<Session>;

impl Session {
    /// Create a session with a generated id.
    pub fn new(sink: impl NotificationSink + 'static) -> SessionHandle {
        Self::with_id(SessionId::generate(), sink)
    }

    /// Create a session with an explicit id.
    pub fn with_id(id: SessionId, sink: impl NotificationSink + 'static) -> SessionHandle {
        Arc::new(Self {
            id,
            state: AtomicU8::new(SessionState::Active as u8),
            sink: Box::new(sink),
            created_at: Instant::now(),
            notifications_sent: AtomicU64::new(0),
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// Move from `Active` to `Ending`. Returns false if teardown had already begun.
    pub(crate) fn begin_ending(&self) -> bool {
        self.state
            .compare_exchange(
                SessionState::Active as u8,
                SessionState::Ending as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    pub(crate) fn mark_cleared(&self) {
        self.state
            .store(SessionState::Cleared as u8, Ordering::SeqCst);
    }

    /// Push a notification through the session's sink.
    pub fn notify(&self, notification: &ResourceUpdated) -> Result<(), DeliveryError> {
        self.sink.send(notification)?;
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of notifications successfully handed to the sink.
    pub fn notifications_sent(&self) -> u64 {
        self.notifications_sent.load(Ordering::Relaxed)
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Session {}

impl std::hash::Hash for Session {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_transitions() {
        let (sink, _rx) = ChannelSink::channel(1);
        let session = Session::new(sink);

        assert_eq!(session.state(), SessionState::Active);
        assert!(session.begin_ending());
        assert_eq!(session.state(), SessionState::Ending);
        assert!(!session.begin_ending());

        session.mark_cleared();
        assert_eq!(session.state(), SessionState::Cleared);
        assert!(!session.begin_ending());
    }

    #[test]
    fn test_channel_sink_full_and_closed() {
        let (sink, rx) = ChannelSink::channel(1);
        let session = Session::with_id(SessionId::new("s1"), sink);
        let note = ResourceUpdated::new("test://resource/1".into(), 2);

        assert!(session.notify(&note).is_ok());
        assert_eq!(session.notify(&note), Err(DeliveryError::Full));
        assert_eq!(session.notifications_sent(), 1);

        drop(rx);
        assert_eq!(session.notify(&note), Err(DeliveryError::Disconnected));
    }

    #[test]
    fn test_session_equality_by_id() {
        let (a, _rx_a) = ChannelSink::channel(1);
        let (b, _rx_b) = ChannelSink::channel(1);
        let s1 = Session::with_id(SessionId::new("same"), a);
        let s2 = Session::with_id(SessionId::new("same"), b);
        assert_eq!(*s1, *s2);
    }

    #[test]
    fn test_notification_serialization() {
        let note = ResourceUpdated::new("test://resource/3".into(), 4);
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["uri"], "test://resource/3");
        assert_eq!(json["version"], 4);
        assert_eq!(note.method(), "notifications/resources/updated");
    }
}
