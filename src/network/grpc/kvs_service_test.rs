use std::sync::Arc;

use tokio::time::{timeout, Duration};
use tokio_stream::StreamExt;
use tonic::{Code, Request};

use crate::proto::kvs::kvs_server::Kvs;
use crate::proto::kvs::{DeleteRequest, GetRequest, PutRequest, RangeRequest, WatchRequest};
use crate::store::KvStore;
use crate::watch::{WatchConfig, WatchHub};

use super::kvs_service::KvsService;

fn setup_service() -> (KvsService, Arc<KvStore>, Arc<WatchHub>) {
    let hub = Arc::new(WatchHub::new(WatchConfig::default()));
    hub.start();
    let store = Arc::new(KvStore::new(hub.clone()));
    let service = KvsService::new(store.clone(), 16);
    (service, store, hub)
}

fn get_request(key: &str) -> Request<GetRequest> {
    Request::new(GetRequest {
        key: key.to_string(),
    })
}

#[tokio::test]
async fn test_get_missing_key_is_not_found() {
    let (service, _store, _hub) = setup_service();

    let err = service.get(get_request("nope")).await.unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
    assert!(err.message().contains("nope"));
}

#[tokio::test]
async fn test_put_then_get() {
    let (service, _store, _hub) = setup_service();

    service
        .put(Request::new(PutRequest {
            key: "key".into(),
            value: "value".into(),
        }))
        .await
        .unwrap();

    let response = service.get(get_request("key")).await.unwrap();
    assert_eq!(response.into_inner().value, "value");
}

#[tokio::test]
async fn test_delete_succeeds_even_when_absent() {
    let (service, store, _hub) = setup_service();

    service
        .delete(Request::new(DeleteRequest {
            key: "ghost".into(),
        }))
        .await
        .unwrap();

    // The commit is still observable through the revision counter.
    assert_eq!(store.revision(), 1);
}

#[tokio::test]
async fn test_range_streams_sorted_snapshot() {
    let (service, store, _hub) = setup_service();

    store.put("b".into(), "2".into());
    store.put("a".into(), "1".into());
    store.put("c".into(), "3".into());

    let response = service
        .range(Request::new(RangeRequest {
            start_key: String::new(),
        }))
        .await
        .unwrap();

    let mut stream = response.into_inner();
    let mut keys = Vec::new();
    while let Some(entry) = stream.next().await {
        let entry = entry.unwrap();
        assert!(entry.value.is_some());
        keys.push(entry.key);
    }
    assert_eq!(keys, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_range_respects_start_key() {
    let (service, store, _hub) = setup_service();

    for key in ["apple", "banana", "cherry"] {
        store.put(key.into(), "v".into());
    }

    let mut stream = service
        .range(Request::new(RangeRequest {
            start_key: "banana".into(),
        }))
        .await
        .unwrap()
        .into_inner();

    let mut keys = Vec::new();
    while let Some(entry) = stream.next().await {
        keys.push(entry.unwrap().key);
    }
    assert_eq!(keys, vec!["banana", "cherry"]);
}

#[tokio::test]
async fn test_range_on_empty_store_is_empty_stream() {
    let (service, _store, _hub) = setup_service();

    let mut stream = service
        .range(Request::new(RangeRequest {
            start_key: String::new(),
        }))
        .await
        .unwrap()
        .into_inner();

    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_watch_receives_put_and_delete() {
    let (service, store, _hub) = setup_service();

    let mut stream = service
        .watch(Request::new(WatchRequest {
            prefix: String::new(),
        }))
        .await
        .unwrap()
        .into_inner();

    store.put("x".into(), "1".into());
    let entry = timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("timed out")
        .expect("stream ended")
        .unwrap();
    assert_eq!(entry.key, "x");
    assert_eq!(entry.value.as_deref(), Some("1"));

    store.delete("x");
    let entry = timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("timed out")
        .expect("stream ended")
        .unwrap();
    assert_eq!(entry.key, "x");
    assert_eq!(entry.value, None);
}

#[tokio::test]
async fn test_watch_prefix_filters_stream() {
    let (service, store, _hub) = setup_service();

    let mut stream = service
        .watch(Request::new(WatchRequest {
            prefix: "a".into(),
        }))
        .await
        .unwrap()
        .into_inner();

    store.put("ab".into(), "1".into());
    store.put("b".into(), "2".into());
    store.delete("abc");

    let entry = timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("timed out")
        .expect("stream ended")
        .unwrap();
    assert_eq!(entry.key, "ab");

    // Next matching event is the delete; put("b", ...) never appears.
    let entry = timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("timed out")
        .expect("stream ended")
        .unwrap();
    assert_eq!(entry.key, "abc");
    assert_eq!(entry.value, None);
}

#[tokio::test]
async fn test_watch_sees_no_history() {
    let (service, store, _hub) = setup_service();

    store.put("before".into(), "1".into());

    let mut stream = service
        .watch(Request::new(WatchRequest {
            prefix: String::new(),
        }))
        .await
        .unwrap()
        .into_inner();

    store.put("after".into(), "2".into());

    let entry = timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("timed out")
        .expect("stream ended")
        .unwrap();
    assert_eq!(entry.key, "after");
}

#[tokio::test]
async fn test_dropping_watch_stream_unregisters_watcher() {
    let (service, store, hub) = setup_service();

    let stream = service
        .watch(Request::new(WatchRequest {
            prefix: String::new(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(hub.watcher_count(), 1);

    drop(stream);

    // The relay notices the closed response channel and drops its guard.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while hub.watcher_count() != 0 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "watcher was not unregistered after client went away"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Subsequent writes must not block or error on the stale conduit.
    store.put("k".into(), "v".into());
    assert_eq!(store.get("k"), Some("v".to_string()));
}
