//! Relay between a registered watcher and its gRPC stream.
//!
//! One handler per watch call. It forwards hub events to the response
//! channel until either side goes away: a failed send means the client
//! disconnected or cancelled; a closed event channel means the hub
//! disconnected the watcher (slow consumer) or is shutting down. Both are
//! normal terminations.

use tokio::sync::mpsc;
use tonic::Status;
use tracing::{info, trace};

use crate::proto::kvs::Entry;
use crate::watch::WatchEvent;

pub struct WatchStreamHandler {
    watcher_id: u64,
    prefix: String,
    event_receiver: mpsc::Receiver<WatchEvent>,
}

impl WatchStreamHandler {
    pub fn new(
        watcher_id: u64,
        prefix: String,
        event_receiver: mpsc::Receiver<WatchEvent>,
    ) -> Self {
        Self {
            watcher_id,
            prefix,
            event_receiver,
        }
    }

    pub fn id(&self) -> u64 {
        self.watcher_id
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Forward events until the client disconnects or the watcher closes.
    ///
    /// The caller owns the registration guard; this method only drives the
    /// relay loop, so it can be tested without a hub or a socket.
    pub async fn run(
        mut self,
        response_sender: mpsc::Sender<std::result::Result<Entry, Status>>,
    ) {
        let watcher_id = self.watcher_id;

        loop {
            tokio::select! {
                maybe_event = self.event_receiver.recv() => {
                    let Some(event) = maybe_event else {
                        // Hub side closed (slow-watcher disconnect or shutdown).
                        info!(watcher_id, "watch stream ended");
                        return;
                    };

                    trace!(
                        watcher_id,
                        key = %event.key,
                        revision = event.revision,
                        "relaying watch event"
                    );

                    let entry = Self::entry_from_event(event);
                    if response_sender.send(Ok(entry)).await.is_err() {
                        // Client disconnected or cancelled; normal exit.
                        info!(watcher_id, "watch stream client disconnected");
                        return;
                    }
                }
                // Waking on closure keeps unregistration prompt even when
                // no events are flowing.
                _ = response_sender.closed() => {
                    info!(watcher_id, "watch stream client disconnected");
                    return;
                }
            }
        }
    }

    fn entry_from_event(event: WatchEvent) -> Entry {
        Entry {
            key: event.key,
            value: event.value,
        }
    }
}
