//! Subscription registry.
//!
//! A bidirectional index between resources and the sessions subscribed to
//! them. Both directions live behind one mutex so every operation observes
//! them in agreement, and clearing a session costs O(its subscriptions).

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::resource::ResourceId;
use crate::session::{Session, SessionHandle, SessionId};

#[derive(Default)]
struct Indices {
    /// Subscribers per resource. Weak: the transport owns sessions.
    by_resource: HashMap<ResourceId, HashMap<SessionId, Weak<Session>>>,
    /// Subscribed resources per session.
    by_session: HashMap<SessionId, HashSet<ResourceId>>,
}

impl Indices {
    fn remove_pair(&mut self, resource: &ResourceId, session: &SessionId) -> bool {
        let mut removed = false;

        if let Some(subscribers) = self.by_resource.get_mut(resource) {
            removed = subscribers.remove(session).is_some();
            if subscribers.is_empty() {
                self.by_resource.remove(resource);
            }
        }

        if let Some(resources) = self.by_session.get_mut(session) {
            removed |= resources.remove(resource);
            if resources.is_empty() {
                self.by_session.remove(session);
            }
        }

        removed
    }
}

/// Process-wide registry of resource subscriptions.
///
/// Construct one per process and share it through an `Arc`.
#[derive(Default)]
pub struct SubscriptionRegistry {
    indices: Mutex<Indices>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `session` to `resource`.
    ///
    /// Subscribing twice is a no-op. Returns whether a new subscription was
    /// recorded, or [`Error::SessionClosed`] once the session has begun ending.
    pub fn subscribe(&self, resource: &ResourceId, session: &SessionHandle) -> Result<bool> {
        let added = {
            let mut indices = self.indices.lock();
            // Checked under the lock: teardown flips the state before taking it.
            if !session.is_active() {
                return Err(Error::SessionClosed(session.id().clone()));
            }

            indices
                .by_resource
                .entry(resource.clone())
                .or_default()
                .insert(session.id().clone(), Arc::downgrade(session));
            indices
                .by_session
                .entry(session.id().clone())
                .or_default()
                .insert(resource.clone())
        };

        if added {
            tracing::debug!(uri = %resource, session = %session.id(), "subscription added");
        }
        Ok(added)
    }

    /// Remove the subscription of `session` to `resource`.
    ///
    /// Removing an absent subscription is a no-op. Returns whether anything
    /// was removed.
    pub fn unsubscribe(&self, resource: &ResourceId, session: &SessionHandle) -> Result<bool> {
        let removed = {
            let mut indices = self.indices.lock();
            if !session.is_active() {
                return Err(Error::SessionClosed(session.id().clone()));
            }
            indices.remove_pair(resource, session.id())
        };

        if removed {
            tracing::debug!(uri = %resource, session = %session.id(), "subscription removed");
        }
        Ok(removed)
    }

    /// Snapshot of the live sessions subscribed to `resource`.
    ///
    /// The returned handles can be used without holding any registry lock.
    pub fn subscribers_of(&self, resource: &str) -> Vec<SessionHandle> {
        let indices = self.indices.lock();
        indices
            .by_resource
            .get(resource)
            .map(|subscribers| subscribers.values().filter_map(Weak::upgrade).collect())
            .unwrap_or_default()
    }

    /// Remove every subscription held by `session` and mark it cleared.
    ///
    /// Any subscribe/unsubscribe that has not yet entered the registry fails
    /// with [`Error::SessionClosed`] from here on. Calling this again is harmless.
    /// Returns the number of subscriptions removed.
    pub fn clear_session(&self, session: &Session) -> usize {
        session.begin_ending();
        let removed = self.clear_session_id(session.id());
        session.mark_cleared();

        tracing::debug!(session = %session.id(), removed, "session subscriptions cleared");
        removed
    }

    /// Remove every subscription recorded under `session_id`.
    pub fn clear_session_id(&self, session_id: &SessionId) -> usize {
        let mut indices = self.indices.lock();
        let Some(resources) = indices.by_session.remove(session_id) else {
            return 0;
        };

        for resource in &resources {
            if let Some(subscribers) = indices.by_resource.get_mut(resource) {
                subscribers.remove(session_id);
                if subscribers.is_empty() {
                    indices.by_resource.remove(resource);
                }
            }
        }

        resources.len()
    }

    /// Resources `session_id` is currently subscribed to, sorted.
    pub fn resources_of(&self, session_id: &SessionId) -> Vec<ResourceId> {
        let indices = self.indices.lock();
        let mut resources: Vec<ResourceId> = indices
            .by_session
            .get(session_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        resources.sort();
        resources
    }

    /// Whether `session_id` is subscribed to `resource`.
    pub fn is_subscribed(&self, resource: &str, session_id: &SessionId) -> bool {
        let indices = self.indices.lock();
        indices
            .by_resource
            .get(resource)
            .is_some_and(|subscribers| subscribers.contains_key(session_id))
    }

    /// Total number of (resource, session) subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.indices.lock().by_session.values().map(HashSet::len).sum()
    }

    /// Number of sessions holding at least one subscription.
    pub fn session_count(&self) -> usize {
        self.indices.lock().by_session.len()
    }

    /// Number of resources with at least one subscriber.
    pub fn resource_count(&self) -> usize {
        self.indices.lock().by_resource.len()
    }

    /// Drop every subscription. Intended for test isolation.
    pub fn clear_all(&self) {
        let mut indices = self.indices.lock();
        indices.by_resource.clear();
        indices.by_session.clear();
    }

    /// Check that both indices describe the same set of subscriptions and
    /// that no empty sets are left behind.
    pub fn is_consistent(&self) -> bool {
        let indices = self.indices.lock();

        let forward_ok = indices.by_resource.iter().all(|(resource, subscribers)| {
            !subscribers.is_empty()
                && subscribers.keys().all(|session| {
                    indices
                        .by_session
                        .get(session)
                        .is_some_and(|resources| resources.contains(resource))
                })
        });

        let backward_ok = indices.by_session.iter().all(|(session, resources)| {
            !resources.is_empty()
                && resources.iter().all(|resource| {
                    indices
                        .by_resource
                        .get(resource)
                        .is_some_and(|subscribers| subscribers.contains_key(session))
                })
        });

        forward_ok && backward_ok
    }
}

/// Shared registry handle.
pub type SharedRegistry = Arc<SubscriptionRegistry>;
