//! Records kept by the offline store and the storage trait itself.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::request::{ApiRequest, Method};

/// A queued mutation awaiting replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRequest {
  /// Auto-assigned, never reused within a store
  pub id: i64,
  pub path: String,
  pub method: Method,
  pub body: Option<Value>,
  /// Milliseconds since the Unix epoch
  pub created_at: i64,
}

impl PendingRequest {
  /// Stable token identifying this entry across replays.
  ///
  /// Derived only from fields that never change after enqueue, so every
  /// replay attempt of the same entry carries the same key.
  pub fn idempotency_key(&self) -> String {
    let input = format!(
      "{}:{}:{}:{}",
      self.id, self.created_at, self.method, self.path
    );
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
  }

  /// Build the network call that replays this entry.
  pub fn to_request(&self) -> ApiRequest {
    ApiRequest::new(self.method, self.path.clone(), self.body.clone())
      .with_idempotency_key(self.idempotency_key())
  }
}

/// Last-known-good payload for a cacheable read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
  pub key: String,
  pub payload: Value,
  /// When the payload was last written (milliseconds since the Unix epoch)
  pub cached_at: i64,
}

/// Durable storage for the pending queue and the response cache.
pub trait OfflineStore: Send + Sync {
  /// Append a mutation to the queue.
  fn enqueue(&self, path: &str, method: Method, body: Option<&Value>) -> Result<PendingRequest>;

  /// Upsert the cached payload for `key`.
  fn put_cache(&self, key: &str, payload: &Value) -> Result<()>;

  /// Cached payload for `key`, if any.
  fn get_cache(&self, key: &str) -> Result<Option<CachedResponse>>;

  /// All queued mutations, oldest first.
  fn list_pending(&self) -> Result<Vec<PendingRequest>>;

  /// Remove one queued mutation. Missing ids are ignored.
  fn remove_pending(&self, id: i64) -> Result<()>;

  /// Drop every cached response. The queue is untouched.
  fn clear_cache(&self) -> Result<()>;

  fn pending_count(&self) -> Result<usize>;
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn pending(id: i64) -> PendingRequest {
    PendingRequest {
      id,
      path: "/api/workouts".to_string(),
      method: Method::Post,
      body: Some(json!({"name": "Leg Day"})),
      created_at: 1_700_000_000_000,
    }
  }

  #[test]
  fn test_idempotency_key_is_stable() {
    let entry = pending(1);
    assert_eq!(entry.idempotency_key(), entry.clone().idempotency_key());
    assert_eq!(entry.idempotency_key().len(), 64);
  }

  #[test]
  fn test_idempotency_key_differs_per_entry() {
    assert_ne!(pending(1).idempotency_key(), pending(2).idempotency_key());
  }

  #[test]
  fn test_to_request_carries_key_and_body() {
    let entry = pending(7);
    let request = entry.to_request();
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.path, "/api/workouts");
    assert_eq!(request.body, entry.body);
    assert_eq!(request.idempotency_key, Some(entry.idempotency_key()));
  }
}
