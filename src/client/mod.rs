//! Async client library for the key/value service.
//!
//! [`KvClient`] wraps the generated gRPC client with a typed API:
//! `Option` for lookups, plain tuples for range snapshots, and a raw entry
//! stream for watch. All methods take `&mut self`; clone the client for
//! concurrent use (the underlying channel is cheap to clone and
//! multiplexes).

mod client_config;
mod error;
mod kv_client;


pub use client_config::ClientConfig;
pub use error::ClientApiError;
pub use kv_client::KvClient;
