//! Session lifecycle hook.
//!
//! The hosting transport reports session start and end. Ending a session
//! clears all of its subscriptions; [`SessionGuard`] ties that to scope exit
//! so it also happens when the session loop errors, panics or is cancelled.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashSet;

use crate::registry::SharedRegistry;
use crate::session::{Session, SessionHandle, SessionId};

/// Receives session start/end events from the transport.
pub struct SessionLifecycle {
    registry: SharedRegistry,
    /// Sessions started and not yet ended.
    started: DashSet<SessionId>,
}

impl SessionLifecycle {
    pub fn new(registry: SharedRegistry) -> Self {
        Self {
            registry,
            started: DashSet::new(),
        }
    }

    /// A session began. Only tracked for reporting.
    pub fn on_session_start(&self, session: &Session) {
        if self.started.insert(session.id().clone()) {
            tracing::info!(session = %session.id(), "session started");
        }
    }

    /// A session ended. Drops all of its subscriptions.
    ///
    /// Safe to call more than once, and after the session's subscriptions
    /// were already cleared through the registry.
    pub fn on_session_end(&self, session: &Session) {
        let was_started = self.started.remove(session.id()).is_some();
        let removed = if session.begin_ending() {
            self.registry.clear_session(session)
        } else {
            0
        };

        if !was_started && removed == 0 {
            return;
        }

        tracing::info!(
            session = %session.id(),
            subscriptions_removed = removed,
            notifications_sent = session.notifications_sent(),
            age_secs = session.age().as_secs(),
            "session ended"
        );
    }

    /// Start tracking `session` and return a guard that ends it on drop.
    pub fn begin(self: &Arc<Self>, session: SessionHandle) -> SessionGuard {
        self.on_session_start(&session);
        SessionGuard {
            lifecycle: Arc::clone(self),
            session,
        }
    }

    /// Drive a session's run loop; the session is ended however `run_loop` exits.
    pub async fn run<F>(self: &Arc<Self>, session: SessionHandle, run_loop: F) -> F::Output
    where
        F: Future,
    {
        let _guard = self.begin(session);
        run_loop.await
    }

    /// Number of sessions started and not yet ended.
    pub fn active_sessions(&self) -> usize {
        self.started.len()
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }
}

/// Ends its session when dropped.
#[must_use = "dropping the guard ends the session immediately"]
pub struct SessionGuard {
    lifecycle: Arc<SessionLifecycle>,
    session: SessionHandle,
}

impl SessionGuard {
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.lifecycle.on_session_end(&self.session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::registry::SubscriptionRegistry;
    use crate::resource::ResourceId;
    use crate::session::{ChannelSink, SessionId, SessionState};

    fn setup() -> (Arc<SessionLifecycle>, SessionHandle) {
        let registry = Arc::new(SubscriptionRegistry::new());
        let lifecycle = Arc::new(SessionLifecycle::new(registry));
        let (sink, _rx) = ChannelSink::channel(4);
        (lifecycle, Session::with_id(SessionId::new("s1"), sink))
    }

    #[test]
    fn test_guard_clears_on_drop() {
        let (lifecycle, session) = setup();
        let registry = lifecycle.registry().clone();

        {
            let guard = lifecycle.begin(session.clone());
            registry
                .subscribe(&ResourceId::from("test://resource/1"), guard.session())
                .unwrap();
            assert_eq!(lifecycle.active_sessions(), 1);
        }

        assert_eq!(session.state(), SessionState::Cleared);
        assert_eq!(registry.subscription_count(), 0);
        assert_eq!(lifecycle.active_sessions(), 0);
    }

    #[test]
    fn test_end_is_idempotent() {
        let (lifecycle, session) = setup();
        lifecycle.on_session_start(&session);

        lifecycle.on_session_end(&session);
        lifecycle.on_session_end(&session);

        assert_eq!(lifecycle.active_sessions(), 0);
        assert_eq!(session.state(), SessionState::Cleared);
    }

    #[test]
    fn test_end_after_registry_clear() {
        let (lifecycle, session) = setup();
        let registry = lifecycle.registry().clone();
        lifecycle.on_session_start(&session);
        registry
            .subscribe(&ResourceId::from("test://resource/1"), &session)
            .unwrap();

        assert_eq!(registry.clear_session(&session), 1);
        lifecycle.on_session_end(&session);

        assert_eq!(lifecycle.active_sessions(), 0);
        assert_eq!(session.state(), SessionState::Cleared);
    }

    #[test]
    fn test_repeated_start_counted_once() {
        let (lifecycle, session) = setup();
        lifecycle.on_session_start(&session);
        lifecycle.on_session_start(&session);
        assert_eq!(lifecycle.active_sessions(), 1);

        lifecycle.on_session_end(&session);
        assert_eq!(lifecycle.active_sessions(), 0);
    }

    #[test]
    fn test_subscribe_after_end_rejected() {
        let (lifecycle, session) = setup();
        let registry = lifecycle.registry().clone();
        let r1 = ResourceId::from("test://resource/1");

        drop(lifecycle.begin(session.clone()));

        let err = registry.subscribe(&r1, &session).unwrap_err();
        assert!(matches!(err, Error::SessionClosed(_)));
        assert_eq!(registry.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_run_clears_on_error() {
        let (lifecycle, session) = setup();
        let registry = lifecycle.registry().clone();

        let result: Result<(), &str> = lifecycle
            .run(session.clone(), async {
                registry
                    .subscribe(&ResourceId::from("test://resource/1"), &session)
                    .unwrap();
                Err("connection reset")
            })
            .await;

        assert!(result.is_err());
        assert_eq!(registry.subscription_count(), 0);
        assert_eq!(session.state(), SessionState::Cleared);
    }

    #[tokio::test]
    async fn test_run_clears_on_cancellation() {
        let (lifecycle, session) = setup();
        let registry = lifecycle.registry().clone();
        registry
            .subscribe(&ResourceId::from("test://resource/1"), &session)
            .unwrap();

        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let task = {
            let lifecycle = lifecycle.clone();
            let session = session.clone();
            tokio::spawn(async move {
                lifecycle
                    .run(session, async move {
                        let _ = started_tx.send(());
                        std::future::pending::<()>().await
                    })
                    .await
            })
        };
        started_rx.await.unwrap();

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert_eq!(registry.subscription_count(), 0);
        assert_eq!(session.state(), SessionState::Cleared);
    }

    #[tokio::test]
    async fn test_run_clears_on_panic() {
        let (lifecycle, session) = setup();
        let registry = lifecycle.registry().clone();
        registry
            .subscribe(&ResourceId::from("test://resource/1"), &session)
            .unwrap();

        let task = {
            let lifecycle = lifecycle.clone();
            let session = session.clone();
            tokio::spawn(async move {
                lifecycle
                    .run(session, async { panic!("session loop failed") })
                    .await
            })
        };

        assert!(task.await.unwrap_err().is_panic());
        assert_eq!(registry.subscription_count(), 0);
    }
}
