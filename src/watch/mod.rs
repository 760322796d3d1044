//! Watch mechanism for streaming key-change notifications.
//!
//! Clients subscribe with a key prefix (empty prefix = everything) and
//! receive every put/delete that commits after their registration, in
//! commit order, with no replay of earlier history. The design keeps the
//! write path non-blocking no matter how many subscribers exist or how
//! slowly they consume:
//!
//! ```text
//! put()/delete() ──publish, try_send──▶ global event queue (crossbeam, bounded)
//!                                            │
//!                                            ▼
//!                                   dispatcher thread
//!                                            │ prefix + revision filter
//!                                            ▼
//!                              per-watcher channels (tokio mpsc, bounded)
//!                                            │
//!                                            ▼
//!                                  gRPC watch streams
//! ```
//!
//! Overflow policy: a watcher whose private channel is full is
//! disconnected (its stream ends) instead of being allowed to stall the
//! writer or to observe a gapped, reordered history. The global queue drops
//! events only when it is itself full, which indicates a stalled
//! dispatcher, and logs a warning.
//!
//! Watchers are removed via RAII: dropping a [`WatcherHandle`] (or its
//! [`WatcherHandleGuard`]) unregisters it, so a watcher removed mid-fan-out
//! is simply skipped.

mod hub;

#[cfg(test)]
mod hub_test;

pub use hub::{WatchEvent, WatchHub, WatcherHandle, WatcherHandleGuard};

// Re-export the config knob next to the mechanism it tunes.
pub use crate::config::WatchConfig;
