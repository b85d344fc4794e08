//! Concurrent access to the subscription registry.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use livesub_core::{
    BroadcasterConfig, ChannelSink, Error, MemoryResourceStore, NotificationBroadcaster,
    ResourceId, Session, SessionHandle, SessionId, SubscriptionRegistry,
};
use rand::Rng;

fn session(id: String) -> SessionHandle {
    let (sink, _rx) = ChannelSink::channel(16);
    Session::with_id(SessionId::new(id), sink)
}

#[test]
fn test_interleaved_ops_on_one_pair_stay_consistent() {
    let registry = Arc::new(SubscriptionRegistry::new());
    let s1 = session("s1".to_string());
    let r1 = ResourceId::from("r1");
    let barrier = Arc::new(Barrier::new(8));

    thread::scope(|scope| {
        for _ in 0..8 {
            let registry = &registry;
            let s1 = &s1;
            let r1 = &r1;
            let barrier = barrier.clone();
            scope.spawn(move || {
                let mut rng = rand::thread_rng();
                barrier.wait();
                for _ in 0..2_000 {
                    if rng.gen_bool(0.5) {
                        registry.subscribe(r1, s1).unwrap();
                    } else {
                        registry.unsubscribe(r1, s1).unwrap();
                    }
                }
            });
        }
    });

    assert!(registry.is_consistent());
    assert!(registry.subscription_count() <= 1);
    assert_eq!(
        registry.is_subscribed("r1", s1.id()),
        registry.resources_of(s1.id()) == vec![r1]
    );
}

#[test]
fn test_per_session_state_matches_sequential_history() {
    const THREADS: usize = 8;
    const RESOURCES: usize = 16;
    const OPS: usize = 5_000;

    let registry = Arc::new(SubscriptionRegistry::new());
    let resources: Vec<ResourceId> = (0..RESOURCES)
        .map(|i| ResourceId::from(format!("test://resource/{i}")))
        .collect();

    let expected: Vec<(SessionHandle, HashSet<ResourceId>)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let registry = &registry;
                let resources = &resources;
                scope.spawn(move || {
                    let session = session(format!("s{t}"));
                    let mut rng = rand::thread_rng();
                    let mut mine = HashSet::new();
                    for _ in 0..OPS {
                        let resource = &resources[rng.gen_range(0..RESOURCES)];
                        if rng.gen_bool(0.6) {
                            registry.subscribe(resource, &session).unwrap();
                            mine.insert(resource.clone());
                        } else {
                            registry.unsubscribe(resource, &session).unwrap();
                            mine.remove(resource);
                        }
                    }
                    (session, mine)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(registry.is_consistent());

    let mut total = 0;
    for (session, mine) in &expected {
        let actual: HashSet<ResourceId> = registry.resources_of(session.id()).into_iter().collect();
        assert_eq!(&actual, mine, "session {}", session.id());
        total += mine.len();

        for resource in &resources {
            let listed = registry
                .subscribers_of(resource.as_str())
                .iter()
                .any(|s| s.id() == session.id());
            assert_eq!(listed, mine.contains(resource));
        }
    }
    assert_eq!(registry.subscription_count(), total);
}

#[test]
fn test_subscribe_racing_session_end() {
    let registry = Arc::new(SubscriptionRegistry::new());
    let resources: Vec<ResourceId> = (0..32).map(|i| ResourceId::from(format!("r{i}"))).collect();

    for round in 0..50 {
        let s = session(format!("s{round}"));
        let ended = AtomicBool::new(false);
        let rejected_after_end = AtomicUsize::new(0);
        let barrier = Barrier::new(5);

        thread::scope(|scope| {
            for worker in 0..4 {
                let registry = &registry;
                let s = &s;
                let resources = &resources;
                let ended = &ended;
                let rejected_after_end = &rejected_after_end;
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    for i in 0..resources.len() {
                        let resource = &resources[(i + worker * 7) % resources.len()];
                        let already_ended = ended.load(Ordering::SeqCst);
                        match registry.subscribe(resource, s) {
                            Ok(_) => assert!(!already_ended, "subscribe succeeded after end"),
                            Err(Error::SessionClosed(_)) => {
                                if already_ended {
                                    rejected_after_end.fetch_add(1, Ordering::Relaxed);
                                }
                            }
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                    }
                });
            }

            let registry = &registry;
            let s = &s;
            let ended = &ended;
            let barrier = &barrier;
            scope.spawn(move || {
                barrier.wait();
                registry.clear_session(s);
                ended.store(true, Ordering::SeqCst);
            });
        });

        assert!(registry.resources_of(s.id()).is_empty());
        assert!(registry.is_consistent());
    }

    assert_eq!(registry.subscription_count(), 0);
}

#[test]
fn test_scans_during_churn_keep_registry_consistent() {
    let registry = Arc::new(SubscriptionRegistry::new());
    let store = Arc::new(MemoryResourceStore::new());
    let resources: Vec<ResourceId> = (0..8)
        .map(|i| ResourceId::from(format!("test://resource/{i}")))
        .collect();
    for resource in &resources {
        store.create(resource).unwrap();
    }
    let broadcaster = NotificationBroadcaster::new(
        registry.clone(),
        store.clone(),
        BroadcasterConfig::default(),
    );
    let stop = AtomicBool::new(false);

    thread::scope(|scope| {
        scope.spawn(|| {
            while !stop.load(Ordering::SeqCst) {
                store.touch_all();
                broadcaster.scan_once();
            }
        });

        let workers: Vec<_> = (0..4)
            .map(|t| {
                let registry = &registry;
                let resources = &resources;
                scope.spawn(move || {
                    let mut rng = rand::thread_rng();
                    for round in 0..200 {
                        let s = session(format!("w{t}-{round}"));
                        for _ in 0..4 {
                            let resource = &resources[rng.gen_range(0..resources.len())];
                            registry.subscribe(resource, &s).unwrap();
                        }
                        registry.clear_session(&s);
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        stop.store(true, Ordering::SeqCst);
    });

    assert!(registry.is_consistent());
    assert_eq!(registry.subscription_count(), 0);
    assert!(broadcaster.stats().snapshot().cycles > 0);
}
