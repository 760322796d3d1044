use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::config::WatchConfig;

/// One committed mutation, as seen by watchers.
///
/// `value` is `None` for deletes. `revision` is the store's commit counter
/// for this mutation; the dispatcher uses it to fence off events that
/// committed before a watcher registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub key: String,
    pub value: Option<String>,
    pub revision: u64,
}

/// Metadata required to unregister a watcher when its owner goes away.
#[derive(Debug)]
struct WatcherCleanup {
    id: u64,
    prefix: String,
    hub: Arc<WatchHubInner>,
}

/// Handle for a registered watcher.
///
/// Dropping the handle unregisters the watcher. Use [`into_receiver`] to
/// move the event receiver into a stream while keeping cleanup alive via
/// the returned guard.
///
/// [`into_receiver`]: WatcherHandle::into_receiver
#[derive(Debug)]
pub struct WatcherHandle {
    /// Cleanup state (None once moved to a guard via into_receiver)
    cleanup: Option<WatcherCleanup>,
    /// Channel receiver for watch events (Option to allow moving out)
    receiver: Option<mpsc::Receiver<WatchEvent>>,
}

impl WatcherHandle {
    /// Unique identifier for this watcher.
    pub fn id(&self) -> u64 {
        self.cleanup.as_ref().expect("cleanup state moved").id
    }

    /// The prefix filter this watcher registered with.
    pub fn prefix(&self) -> &str {
        &self.cleanup.as_ref().expect("cleanup state moved").prefix
    }

    /// Consume the handle and return the event receiver.
    ///
    /// Cleanup responsibility transfers to the returned guard, which
    /// unregisters the watcher when dropped.
    ///
    /// # Panics
    ///
    /// Panics if the receiver or cleanup state has already been taken.
    pub fn into_receiver(
        mut self,
    ) -> (u64, String, mpsc::Receiver<WatchEvent>, WatcherHandleGuard) {
        let cleanup = self.cleanup.take().expect("cleanup already taken");
        let receiver = self.receiver.take().expect("receiver already taken");

        let id = cleanup.id;
        let prefix = cleanup.prefix.clone();

        let guard = WatcherHandleGuard { cleanup };

        (id, prefix, receiver, guard)
    }

    /// Mutable access to the receiver, unless it was moved out.
    pub fn receiver_mut(&mut self) -> Option<&mut mpsc::Receiver<WatchEvent>> {
        self.receiver.as_mut()
    }
}

/// Guard that unregisters the watcher when dropped.
///
/// Returned by [`WatcherHandle::into_receiver`] so cleanup survives the
/// receiver being moved into a stream.
#[derive(Debug)]
pub struct WatcherHandleGuard {
    cleanup: WatcherCleanup,
}

impl Drop for WatcherHandleGuard {
    fn drop(&mut self) {
        unregister_watcher(&self.cleanup);
        trace!(
            watcher_id = self.cleanup.id,
            prefix = %self.cleanup.prefix,
            "watcher unregistered via guard"
        );
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            unregister_watcher(&cleanup);
            trace!(
                watcher_id = cleanup.id,
                prefix = %cleanup.prefix,
                "watcher unregistered"
            );
        }
    }
}

fn unregister_watcher(cleanup: &WatcherCleanup) {
    cleanup.hub.watchers.remove(&cleanup.id);
}

/// Internal watcher state kept in the registry.
#[derive(Debug)]
struct WatcherState {
    /// Prefix filter; empty matches every key
    prefix: String,
    /// Store revision at registration time; events at or below it are
    /// never delivered (no replay)
    registered_revision: u64,
    /// Bounded channel toward the watcher's delivery task
    sender: mpsc::Sender<WatchEvent>,
}

/// Internal state of the watch hub.
#[derive(Debug)]
struct WatchHubInner {
    /// Active watchers keyed by id
    watchers: DashMap<u64, WatcherState>,

    /// Next watcher id (monotonically increasing)
    next_id: AtomicU64,

    /// Dispatcher thread handle (None when not running)
    thread_handle: Mutex<Option<JoinHandle<()>>>,

    /// Shutdown signal sender (None when not running)
    shutdown_tx: Mutex<Option<Sender<()>>>,

    /// Configuration
    config: WatchConfig,
}

/// Subscriber registry plus change-event fan-out.
///
/// Writers call [`publish`] (non-blocking) with events stamped in commit
/// order; a dedicated dispatcher thread distributes each event to every
/// registered watcher whose prefix matches and whose registration predates
/// the event.
///
/// # Thread safety
///
/// All methods can be called concurrently from any thread. Registration
/// and unregistration are safe against an in-flight fan-out: a watcher
/// removed mid-dispatch is skipped, never faulted on.
///
/// [`publish`]: WatchHub::publish
#[derive(Debug)]
pub struct WatchHub {
    /// Shared inner state
    inner: Arc<WatchHubInner>,

    /// Sender side of the global event queue
    event_tx: Sender<WatchEvent>,

    /// Receiver side of the global event queue, consumed by the
    /// dispatcher. Wrapped in Arc so the hub itself stays cheap to share.
    event_rx: Arc<Receiver<WatchEvent>>,
}

impl WatchHub {
    /// Create a hub with the given configuration. Call [`start`] before
    /// publishing.
    ///
    /// [`start`]: WatchHub::start
    pub fn new(config: WatchConfig) -> Self {
        let (event_tx, event_rx) = if config.event_queue_size > 0 {
            bounded(config.event_queue_size)
        } else {
            unbounded()
        };

        let inner = Arc::new(WatchHubInner {
            watchers: DashMap::new(),
            next_id: AtomicU64::new(1),
            thread_handle: Mutex::new(None),
            shutdown_tx: Mutex::new(None),
            config,
        });

        Self {
            inner,
            event_tx,
            event_rx: Arc::new(event_rx),
        }
    }

    /// Start the background dispatcher thread.
    ///
    /// Idempotent; calling `start` while a dispatcher is already running is
    /// a no-op.
    pub fn start(&self) {
        let mut handle_guard = self.inner.thread_handle.lock().unwrap();

        // Already running
        if handle_guard.is_some() {
            return;
        }

        let (shutdown_tx, shutdown_rx) = bounded(1);
        let inner = self.inner.clone();
        let receiver = Arc::clone(&self.event_rx);

        let handle = std::thread::spawn(move || {
            debug!("watch dispatcher thread started");

            loop {
                crossbeam_channel::select! {
                    recv(receiver) -> result => {
                        match result {
                            Ok(event) => {
                                Self::dispatch_event(&inner, event);
                            }
                            Err(_) => {
                                warn!("watch event channel closed unexpectedly");
                                break;
                            }
                        }
                    }
                    recv(shutdown_rx) -> _ => {
                        debug!("watch dispatcher received shutdown signal");
                        break;
                    }
                }
            }

            debug!("watch dispatcher thread stopped");
        });

        *handle_guard = Some(handle);
        *self.inner.shutdown_tx.lock().unwrap() = Some(shutdown_tx);
    }

    /// Stop the dispatcher thread and wait for it to exit.
    ///
    /// Idempotent; a no-op when no dispatcher is running.
    pub fn stop(&self) {
        if let Some(tx) = self.inner.shutdown_tx.lock().unwrap().take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.inner.thread_handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }

    /// Register a new watcher.
    ///
    /// `registered_revision` must be read while writers are excluded (the
    /// store does this under its lock); the dispatcher will only deliver
    /// events with a strictly greater revision to this watcher.
    pub fn register(&self, prefix: String, registered_revision: u64) -> WatcherHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.inner.config.watcher_buffer_size);

        self.inner.watchers.insert(
            id,
            WatcherState {
                prefix: prefix.clone(),
                registered_revision,
                sender,
            },
        );

        trace!(
            watcher_id = id,
            prefix = %prefix,
            registered_revision,
            "watcher registered"
        );

        WatcherHandle {
            cleanup: Some(WatcherCleanup {
                id,
                prefix,
                hub: self.inner.clone(),
            }),
            receiver: Some(receiver),
        }
    }

    /// Enqueue a committed mutation for fan-out.
    ///
    /// Called from the write path, so it must never block. Events are
    /// dropped (with a warning) only when the global queue is full, which
    /// means the dispatcher itself is stalled.
    pub fn publish(&self, event: WatchEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(
                    key = %event.key,
                    revision = event.revision,
                    "watch event queue full, dropping event"
                );
            }
            Err(TrySendError::Disconnected(_)) => {
                // Hub is shutting down; nothing left to notify.
            }
        }
    }

    /// Distribute one event to every matching watcher.
    ///
    /// Runs on the dispatcher thread. Watchers whose channel is full are
    /// disconnected rather than skipped: a silently gapped stream would
    /// break the in-order, no-loss contract for events that do arrive.
    fn dispatch_event(inner: &Arc<WatchHubInner>, event: WatchEvent) {
        inner.watchers.retain(|id, watcher| {
            if event.revision <= watcher.registered_revision {
                return true;
            }
            if !event.key.starts_with(watcher.prefix.as_str()) {
                return true;
            }

            match watcher.sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        watcher_id = *id,
                        prefix = %watcher.prefix,
                        "watcher backlog full, disconnecting slow watcher"
                    );
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    trace!(watcher_id = *id, "watcher gone, pruning registry entry");
                    false
                }
            }
        });
    }

    /// Number of currently registered watchers.
    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.len()
    }

    /// Whether a watcher id is still registered. Primarily for tests.
    pub fn is_registered(&self, id: u64) -> bool {
        self.inner.watchers.contains_key(&id)
    }
}

impl Drop for WatchHub {
    fn drop(&mut self) {
        self.stop();
    }
}
