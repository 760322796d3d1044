//! In-memory key/value state.
//!
//! One [`KvStore`] owns the whole mapping behind a single reader/writer
//! lock. Reads (get, range) share the lock; mutations (put, delete) take it
//! exclusively, stamp a revision and hand the resulting change event to the
//! watch hub before the lock is released, so that hub queue order always
//! matches commit order.

mod engine;


pub use engine::KvStore;
