//! [`RecordStore`](stockwise_analytics::RecordStore) implementations.
//!
//! - [`InMemoryRecordStore`]: tests, demos and local runs.
//! - [`PostgresRecordStore`]: the persistent store, over a `sqlx` pool.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryRecordStore;
pub use postgres::PostgresRecordStore;
