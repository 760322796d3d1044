//! gRPC service façade over the store.
//!
//! Unary get/put/delete map one request to one response. Range and watch
//! are server-streaming: each call gets a private relay channel serviced by
//! its own task, so a stalled or disconnected client only ever affects its
//! own call. Client disconnection and cancellation are normal exits that
//! still run cleanup (watch unregistration happens via guard drop).

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::{debug, info};

use crate::proto::kvs::kvs_server::Kvs;
use crate::proto::kvs::{
    DeleteRequest, DeleteResponse, Entry, GetRequest, GetResponse, PutRequest, PutResponse,
    RangeRequest, WatchRequest,
};
use crate::store::KvStore;

use super::watch_stream::WatchStreamHandler;

/// The single entry point used by the transport. Stateless per call; all
/// shared state lives in the store (and, through it, the watch hub).
#[derive(Debug)]
pub struct KvsService {
    store: Arc<KvStore>,
    /// Capacity of per-call relay channels for range and watch streams.
    stream_buffer: usize,
}

impl KvsService {
    pub fn new(store: Arc<KvStore>, stream_buffer: usize) -> Self {
        Self {
            store,
            stream_buffer,
        }
    }
}

#[tonic::async_trait]
impl Kvs for KvsService {
    async fn get(
        &self,
        request: Request<GetRequest>,
    ) -> std::result::Result<Response<GetResponse>, Status> {
        let GetRequest { key } = request.into_inner();

        match self.store.get(&key) {
            Some(value) => Ok(Response::new(GetResponse { value })),
            None => Err(Status::not_found(format!("key not found: {key}"))),
        }
    }

    async fn put(
        &self,
        request: Request<PutRequest>,
    ) -> std::result::Result<Response<PutResponse>, Status> {
        let PutRequest { key, value } = request.into_inner();

        debug!(key = %key, "put");
        self.store.put(key, value);
        Ok(Response::new(PutResponse {}))
    }

    async fn delete(
        &self,
        request: Request<DeleteRequest>,
    ) -> std::result::Result<Response<DeleteResponse>, Status> {
        let DeleteRequest { key } = request.into_inner();

        let existed = self.store.delete(&key);
        debug!(key = %key, existed, "delete");
        Ok(Response::new(DeleteResponse {}))
    }

    type RangeStream = ReceiverStream<std::result::Result<Entry, Status>>;

    async fn range(
        &self,
        request: Request<RangeRequest>,
    ) -> std::result::Result<Response<Self::RangeStream>, Status> {
        let RangeRequest { start_key } = request.into_inner();

        // The snapshot is fully captured under the read lock before the
        // first entry is sent; the stream itself is lazy toward the client.
        let snapshot = self.store.range(&start_key);
        debug!(start_key = %start_key, entries = snapshot.len(), "range scan");

        let (tx, rx) = mpsc::channel(self.stream_buffer);
        tokio::spawn(async move {
            for (key, value) in snapshot {
                let entry = Entry {
                    key,
                    value: Some(value),
                };
                if tx.send(Ok(entry)).await.is_err() {
                    debug!("range stream client disconnected");
                    return;
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    type WatchStream = ReceiverStream<std::result::Result<Entry, Status>>;

    async fn watch(
        &self,
        request: Request<WatchRequest>,
    ) -> std::result::Result<Response<Self::WatchStream>, Status> {
        let WatchRequest { prefix } = request.into_inner();

        let handle = self.store.subscribe(prefix);
        let (watcher_id, prefix, event_receiver, guard) = handle.into_receiver();

        info!(watcher_id, prefix = %prefix, "watch stream opened");

        let (tx, rx) = mpsc::channel(self.stream_buffer);
        let handler = WatchStreamHandler::new(watcher_id, prefix, event_receiver);

        tokio::spawn(async move {
            // Keep the watcher registered for exactly as long as the relay
            // runs; every exit path drops the guard and unregisters.
            let _guard = guard;
            handler.run(tx).await;
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
