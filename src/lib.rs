//! Offline-first request layer for the fitness tracking API.
//!
//! - [`store`] keeps the pending-write queue and the read cache in SQLite
//! - [`network`] tracks connectivity and talks HTTP to the backend
//! - [`dispatch`] routes every call to the network, the cache or the queue
//! - [`drain`] replays the queue when the connection comes back

pub mod config;
pub mod dispatch;
pub mod drain;
pub mod error;
pub mod logging;
pub mod network;
pub mod request;
pub mod store;

pub use dispatch::{DispatchOutcome, OfflineDispatcher, OfflinePaths, OptimisticResult};
pub use drain::{DrainReport, QueueDrainer, ReplayFailure};
pub use error::{Error, Result};
pub use network::{HttpTransport, NetworkError, NetworkStatus, Subscription, Transport};
pub use request::{ApiRequest, Method};
pub use store::{CachedResponse, OfflineStore, PendingRequest, SqliteStore};
