//! Change-notification fan-out configuration.

use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Tuning knobs for the watch hub.
///
/// The global event queue decouples writers from the dispatcher; the
/// per-watcher buffer decouples the dispatcher from each subscriber's
/// delivery speed. A watcher that falls more than `watcher_buffer_size`
/// events behind is disconnected rather than allowed to stall anything.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct WatchConfig {
    /// Capacity of the global event queue fed by writers. 0 means
    /// unbounded.
    pub event_queue_size: usize,

    /// Capacity of each watcher's private delivery channel.
    pub watcher_buffer_size: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            event_queue_size: 1024,
            watcher_buffer_size: 64,
        }
    }
}

impl WatchConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.watcher_buffer_size == 0 {
            return Err(crate::Error::Fatal(
                "watch.watcher_buffer_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
