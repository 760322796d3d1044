//! End-to-end tests of watch subscriptions through a real gRPC server and
//! client over loopback.

mod common;

use common::spawn_server;
use minikv::proto::kvs::Entry;
use tokio::time::{timeout, Duration};
use tonic::Streaming;

async fn next_event(stream: &mut Streaming<Entry>) -> Entry {
    timeout(Duration::from_secs(5), stream.message())
        .await
        .expect("timed out waiting for watch event")
        .expect("watch stream errored")
        .expect("watch stream ended unexpectedly")
}

#[tokio::test]
async fn test_watch_all_sees_put_then_delete() {
    let server = spawn_server().await;
    let mut writer = server.client().await;
    let mut watcher = server.client().await;

    let mut stream = watcher.watch("").await.unwrap();

    writer.put("x", "1").await.unwrap();
    let event = next_event(&mut stream).await;
    assert_eq!(event.key, "x");
    assert_eq!(event.value.as_deref(), Some("1"));

    writer.delete("x").await.unwrap();
    let event = next_event(&mut stream).await;
    assert_eq!(event.key, "x");
    assert_eq!(event.value, None);
}

#[tokio::test]
async fn test_watch_prefix_filters_events() {
    let server = spawn_server().await;
    let mut writer = server.client().await;
    let mut watcher = server.client().await;

    let mut stream = watcher.watch("a").await.unwrap();

    writer.put("ab", "1").await.unwrap();
    writer.put("b", "2").await.unwrap();
    writer.delete("abc").await.unwrap();

    // The "b" mutation must never surface on this stream.
    let event = next_event(&mut stream).await;
    assert_eq!(event.key, "ab");
    let event = next_event(&mut stream).await;
    assert_eq!(event.key, "abc");
    assert_eq!(event.value, None);
}

#[tokio::test]
async fn test_two_watchers_receive_disjoint_subsets_in_order() {
    let server = spawn_server().await;
    let mut writer = server.client().await;
    let mut user_watcher = server.client().await;
    let mut order_watcher = server.client().await;

    let mut users = user_watcher.watch("user/").await.unwrap();
    let mut orders = order_watcher.watch("order/").await.unwrap();

    writer.put("user/1", "alice").await.unwrap();
    writer.put("order/9", "pending").await.unwrap();
    writer.put("user/2", "bob").await.unwrap();
    writer.delete("order/9").await.unwrap();

    assert_eq!(next_event(&mut users).await.key, "user/1");
    assert_eq!(next_event(&mut users).await.key, "user/2");

    let first = next_event(&mut orders).await;
    assert_eq!(first.key, "order/9");
    assert_eq!(first.value.as_deref(), Some("pending"));
    let second = next_event(&mut orders).await;
    assert_eq!(second.key, "order/9");
    assert_eq!(second.value, None);
}

#[tokio::test]
async fn test_watch_does_not_replay_history() {
    let server = spawn_server().await;
    let mut writer = server.client().await;
    let mut watcher = server.client().await;

    writer.put("before", "1").await.unwrap();

    let mut stream = watcher.watch("").await.unwrap();
    writer.put("after", "2").await.unwrap();

    let event = next_event(&mut stream).await;
    assert_eq!(event.key, "after");
}

#[tokio::test]
async fn test_watch_events_arrive_in_commit_order() {
    let server = spawn_server().await;
    let mut writer = server.client().await;
    let mut watcher = server.client().await;

    let mut stream = watcher.watch("seq/").await.unwrap();

    for i in 0..20 {
        writer.put(format!("seq/{i:02}"), i.to_string()).await.unwrap();
    }

    for i in 0..20 {
        let event = next_event(&mut stream).await;
        assert_eq!(event.key, format!("seq/{i:02}"));
        assert_eq!(event.value.as_deref(), Some(i.to_string().as_str()));
    }
}

#[tokio::test]
async fn test_cancelled_watch_does_not_affect_writers() {
    let server = spawn_server().await;
    let mut writer = server.client().await;
    let mut watcher = server.client().await;

    let stream = watcher.watch("").await.unwrap();
    drop(stream);

    // Writers keep going; nothing blocks on the dead subscription.
    for i in 0..50 {
        writer.put(format!("k{i}"), "v").await.unwrap();
    }
    assert_eq!(writer.range("").await.unwrap().len(), 50);
}
