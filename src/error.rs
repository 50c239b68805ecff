//! Error types shared by the store, dispatcher and drainer.

use thiserror::Error;

use crate::network::NetworkError;
use crate::request::Method;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
  /// The durable store could not be opened or a storage operation failed.
  #[error("Offline storage unavailable: {reason}")]
  StorageUnavailable { reason: String },

  #[error("Failed to (de)serialize stored value: {0}")]
  Serialization(#[from] serde_json::Error),

  /// A read fell back to the cache and nothing was there.
  #[error("Data not available offline: no cached response for '{key}'")]
  NoCachedData { key: String },

  #[error("{method} {path} is not available while offline")]
  OfflineUnsupported { method: Method, path: String },

  #[error(transparent)]
  Network(#[from] NetworkError),

  #[error("Invalid request: {0}")]
  InvalidRequest(String),
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self {
    Self::unavailable(e)
  }
}

impl Error {
  pub(crate) fn unavailable(reason: impl std::fmt::Display) -> Self {
    Self::StorageUnavailable {
      reason: reason.to_string(),
    }
  }
}
