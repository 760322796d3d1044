//! Protocol Buffer definitions and generated code for the key/value RPC
//! service.
//!
//! This module contains auto-generated Rust types from the Protobuf
//! definitions in `proto/kvs.proto`, created with [`tonic-build`]. The
//! generated sources are committed under `src/generated/` so that building
//! the crate does not require `protoc`.

pub mod kvs {
    include!("../generated/minikv.v1.rs");
}
