//! Durable offline storage.
//!
//! Holds two partitions:
//! - the pending queue of mutations that could not reach the backend
//! - the response cache of the last successful read per `METHOD:path`

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{CachedResponse, OfflineStore, PendingRequest};
