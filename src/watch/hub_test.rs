//! Unit tests for the watch hub.
//!
//! Covers prefix filtering, registration fencing (no replay), per-watcher
//! ordering, RAII cleanup, and the disconnect-on-overflow policy.

use super::*;
use tokio::time::{timeout, Duration};

fn put_event(key: &str, value: &str, revision: u64) -> WatchEvent {
    WatchEvent {
        key: key.to_string(),
        value: Some(value.to_string()),
        revision,
    }
}

fn delete_event(key: &str, revision: u64) -> WatchEvent {
    WatchEvent {
        key: key.to_string(),
        value: None,
        revision,
    }
}

async fn recv_event(handle: &mut WatcherHandle) -> WatchEvent {
    timeout(
        Duration::from_secs(1),
        handle.receiver_mut().unwrap().recv(),
    )
    .await
    .expect("timed out waiting for event")
    .expect("watcher channel closed")
}

fn started_hub(config: WatchConfig) -> WatchHub {
    let hub = WatchHub::new(config);
    hub.start();
    hub
}

#[tokio::test]
async fn test_register_and_receive() {
    let hub = started_hub(WatchConfig::default());
    let mut handle = hub.register(String::new(), 0);

    hub.publish(put_event("x", "1", 1));

    let event = recv_event(&mut handle).await;
    assert_eq!(event.key, "x");
    assert_eq!(event.value.as_deref(), Some("1"));
}

#[tokio::test]
async fn test_delete_event_has_no_value() {
    let hub = started_hub(WatchConfig::default());
    let mut handle = hub.register(String::new(), 0);

    hub.publish(delete_event("x", 1));

    let event = recv_event(&mut handle).await;
    assert_eq!(event.key, "x");
    assert_eq!(event.value, None);
}

#[tokio::test]
async fn test_prefix_filtering() {
    let hub = started_hub(WatchConfig::default());
    let mut handle = hub.register("a".to_string(), 0);

    hub.publish(put_event("ab", "1", 1));
    hub.publish(put_event("b", "2", 2));
    hub.publish(delete_event("abc", 3));

    // "ab" and "abc" match the "a" prefix; "b" must never show up.
    let first = recv_event(&mut handle).await;
    assert_eq!(first.key, "ab");
    let second = recv_event(&mut handle).await;
    assert_eq!(second.key, "abc");
    assert_eq!(second.value, None);
}

#[tokio::test]
async fn test_empty_prefix_matches_everything() {
    let hub = started_hub(WatchConfig::default());
    let mut handle = hub.register(String::new(), 0);

    hub.publish(put_event("alpha", "1", 1));
    hub.publish(put_event("beta", "2", 2));

    assert_eq!(recv_event(&mut handle).await.key, "alpha");
    assert_eq!(recv_event(&mut handle).await.key, "beta");
}

#[tokio::test]
async fn test_no_replay_of_events_before_registration() {
    let hub = started_hub(WatchConfig::default());

    // Watcher registers at revision 5: events 1..=5 are history.
    let mut handle = hub.register(String::new(), 5);

    hub.publish(put_event("old", "stale", 5));
    hub.publish(put_event("new", "fresh", 6));

    let event = recv_event(&mut handle).await;
    assert_eq!(event.key, "new");
}

#[tokio::test]
async fn test_two_watchers_see_disjoint_matching_subsets() {
    let hub = started_hub(WatchConfig::default());
    let mut users = hub.register("user/".to_string(), 0);
    let mut orders = hub.register("order/".to_string(), 0);

    hub.publish(put_event("user/1", "alice", 1));
    hub.publish(put_event("order/9", "pending", 2));
    hub.publish(put_event("user/2", "bob", 3));

    assert_eq!(recv_event(&mut users).await.key, "user/1");
    assert_eq!(recv_event(&mut users).await.key, "user/2");
    assert_eq!(recv_event(&mut orders).await.key, "order/9");
}

#[tokio::test]
async fn test_events_arrive_in_publish_order() {
    let hub = started_hub(WatchConfig::default());
    let mut handle = hub.register(String::new(), 0);

    for i in 1..=20u64 {
        hub.publish(put_event("k", &i.to_string(), i));
    }

    for i in 1..=20u64 {
        let event = recv_event(&mut handle).await;
        assert_eq!(event.revision, i);
        assert_eq!(event.value.as_deref(), Some(i.to_string().as_str()));
    }
}

#[tokio::test]
async fn test_handle_drop_unregisters() {
    let hub = started_hub(WatchConfig::default());

    let handle = hub.register(String::new(), 0);
    let id = handle.id();
    assert_eq!(hub.watcher_count(), 1);

    drop(handle);

    assert_eq!(hub.watcher_count(), 0);
    assert!(!hub.is_registered(id));
}

#[tokio::test]
async fn test_guard_drop_unregisters_after_receiver_moved() {
    let hub = started_hub(WatchConfig::default());

    let handle = hub.register("p".to_string(), 0);
    let (id, prefix, receiver, guard) = handle.into_receiver();
    assert_eq!(prefix, "p");
    assert!(hub.is_registered(id));

    drop(receiver);
    // Receiver gone but guard alive: entry stays until the guard drops
    // (the dispatcher would prune it lazily on the next matching event).
    assert!(hub.is_registered(id));

    drop(guard);
    assert!(!hub.is_registered(id));
}

#[tokio::test]
async fn test_slow_watcher_is_disconnected() {
    let hub = started_hub(WatchConfig {
        event_queue_size: 0,
        watcher_buffer_size: 2,
    });

    let mut handle = hub.register(String::new(), 0);
    let id = handle.id();

    // Nothing drains the receiver, so the third event overflows the
    // buffer and the watcher is dropped from the registry.
    for i in 1..=3u64 {
        hub.publish(put_event("k", "v", i));
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while hub.is_registered(id) {
        assert!(
            tokio::time::Instant::now() < deadline,
            "watcher was not disconnected"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Buffered events are still delivered, then the channel closes.
    assert_eq!(recv_event(&mut handle).await.revision, 1);
    assert_eq!(recv_event(&mut handle).await.revision, 2);
    let closed = timeout(
        Duration::from_secs(1),
        handle.receiver_mut().unwrap().recv(),
    )
    .await
    .expect("timed out waiting for channel close");
    assert!(closed.is_none());
}

#[tokio::test]
async fn test_unregistered_watcher_does_not_stall_publish() {
    let hub = started_hub(WatchConfig::default());

    let handle = hub.register(String::new(), 0);
    drop(handle);

    // Publishing after the watcher is gone must neither block nor panic.
    for i in 1..=100u64 {
        hub.publish(put_event("k", "v", i));
    }
    assert_eq!(hub.watcher_count(), 0);
}

#[tokio::test]
async fn test_start_is_idempotent() {
    let hub = WatchHub::new(WatchConfig::default());
    hub.start();
    hub.start();

    let mut handle = hub.register(String::new(), 0);
    hub.publish(put_event("x", "1", 1));
    assert_eq!(recv_event(&mut handle).await.key, "x");

    hub.stop();
    hub.stop();
}

#[tokio::test]
async fn test_concurrent_register_unregister_during_fanout() {
    let hub = std::sync::Arc::new(started_hub(WatchConfig::default()));

    let publisher = {
        let hub = std::sync::Arc::clone(&hub);
        std::thread::spawn(move || {
            for i in 1..=500u64 {
                hub.publish(put_event("k", "v", i));
            }
        })
    };

    let churner = {
        let hub = std::sync::Arc::clone(&hub);
        std::thread::spawn(move || {
            for _ in 0..100 {
                let handle = hub.register(String::new(), 0);
                drop(handle);
            }
        })
    };

    publisher.join().unwrap();
    churner.join().unwrap();
    assert_eq!(hub.watcher_count(), 0);
}
