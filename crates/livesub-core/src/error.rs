//! Core error types.

use thiserror::Error;

use crate::resource::ResourceId;
use crate::session::SessionId;

/// Errors surfaced by the subscription core.
#[derive(Debug, Error)]
pub enum Error {
    /// Subscribe/unsubscribe attempted after the session started ending.
    #[error("session {0} is closed")]
    SessionClosed(SessionId),

    /// The resource store does not recognize the resource.
    #[error("resource not found: {0}")]
    ResourceNotFound(ResourceId),

    /// A notification could not be handed to a session's transport.
    #[error("delivery to session {session} failed: {reason}")]
    DeliveryFailed {
        /// Session the notification was addressed to.
        session: SessionId,
        /// Why the transport rejected it.
        reason: DeliveryError,
    },
}

/// Why a notification sink refused a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The outbound buffer is full.
    #[error("outbound buffer full")]
    Full,

    /// The receiving side has gone away.
    #[error("receiver disconnected")]
    Disconnected,
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
