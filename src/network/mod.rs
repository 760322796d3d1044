//! Transport-facing layer: the gRPC service façade and stream handlers.

pub mod grpc;

pub use grpc::*;
