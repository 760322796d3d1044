mod kvs_service;
mod watch_stream;

#[cfg(test)]
mod kvs_service_test;

pub use kvs_service::KvsService;
pub use watch_stream::WatchStreamHandler;
