//! Infrastructure layer: record store adapters and database configuration.

pub mod config;
pub mod record_store;


pub use config::{ConfigError, DatabaseConfig};
pub use record_store::{InMemoryRecordStore, PostgresRecordStore};
