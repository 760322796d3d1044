use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::watch::{WatchEvent, WatchHub, WatcherHandle};

/// Contents guarded by the store lock.
///
/// `revision` counts committed mutations (including deletes of absent
/// keys). It is only ever advanced while the write lock is held, which
/// makes revision order identical to commit order.
#[derive(Debug, Default)]
struct StoreInner {
    entries: BTreeMap<String, String>,
    revision: u64,
}

/// Thread-safe in-memory key/value store with ordered range scans.
///
/// Multiple readers proceed concurrently; writers serialize. All state is
/// volatile and lives for the process lifetime. An absent key is distinct
/// from a key holding an empty string.
#[derive(Debug)]
pub struct KvStore {
    inner: RwLock<StoreInner>,
    hub: Arc<WatchHub>,
}

impl KvStore {
    /// Create an empty store wired to the given watch hub.
    pub fn new(hub: Arc<WatchHub>) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            hub,
        }
    }

    /// Look up a single key. Pure read under the shared lock.
    pub fn get(&self, key: &str) -> Option<String> {
        let inner = self.inner.read();
        inner.entries.get(key).cloned()
    }

    /// Insert or overwrite a key. Always succeeds.
    ///
    /// The put event is enqueued to the hub while the write lock is still
    /// held; the enqueue itself never blocks, so writer latency stays
    /// decoupled from subscriber consumption.
    pub fn put(&self, key: String, value: String) {
        let mut inner = self.inner.write();
        inner.entries.insert(key.clone(), value.clone());
        inner.revision += 1;
        self.hub.publish(WatchEvent {
            key,
            value: Some(value),
            revision: inner.revision,
        });
    }

    /// Remove a key if present. Returns whether it existed.
    ///
    /// A delete of an absent key is a no-op on the map but still commits a
    /// revision and notifies watchers, keeping deletion unconditionally
    /// observable, in parity with put.
    pub fn delete(&self, key: &str) -> bool {
        let mut inner = self.inner.write();
        let existed = inner.entries.remove(key).is_some();
        inner.revision += 1;
        self.hub.publish(WatchEvent {
            key: key.to_string(),
            value: None,
            revision: inner.revision,
        });
        existed
    }

    /// Snapshot of all entries with key >= `start_key`, ascending.
    ///
    /// The shared lock is held across the whole enumeration, so the result
    /// is a consistent point-in-time snapshot: no concurrent mutation can
    /// appear or disappear mid-scan.
    pub fn range(&self, start_key: &str) -> Vec<(String, String)> {
        let inner = self.inner.read();
        inner
            .entries
            .range::<str, _>((Bound::Included(start_key), Bound::Unbounded))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Register a watcher for keys matching `prefix` (empty matches all).
    ///
    /// Registration happens under the shared lock, which excludes writers:
    /// every mutation that commits after this returns is observed by the
    /// new watcher, and nothing that committed strictly before is ever
    /// replayed, even though fan-out itself is asynchronous.
    pub fn subscribe(&self, prefix: impl Into<String>) -> WatcherHandle {
        let prefix = prefix.into();
        let inner = self.inner.read();
        let handle = self.hub.register(prefix.clone(), inner.revision);
        debug!(
            watcher_id = handle.id(),
            prefix = %prefix,
            revision = inner.revision,
            "watcher subscribed"
        );
        handle
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Revision of the latest committed mutation.
    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }
}
