//! Synthetic results handed back for writes that were queued instead of sent.

use serde_json::{json, Map, Value};

use crate::request::Method;
use crate::store::PendingRequest;

/// Success stand-in for a write that has not reached the server yet.
#[derive(Debug, Clone, PartialEq)]
pub enum OptimisticResult {
  /// POST: the submitted body under a temporary id.
  Created { temp_id: String, body: Option<Value> },
  /// PUT/PATCH: the submitted body under the id taken from the path.
  Updated { id: Option<u64>, body: Option<Value> },
  /// DELETE
  Deleted,
}

impl OptimisticResult {
  /// Shape the result for a freshly queued entry. `None` for reads.
  pub fn for_pending(entry: &PendingRequest) -> Option<Self> {
    match entry.method {
      Method::Post => Some(Self::Created {
        temp_id: format!("temp_{}", entry.created_at),
        body: entry.body.clone(),
      }),
      Method::Put | Method::Patch => Some(Self::Updated {
        id: resource_id(&entry.path),
        body: entry.body.clone(),
      }),
      Method::Delete => Some(Self::Deleted),
      Method::Get => None,
    }
  }

  /// JSON as seen by callers that expect the server's response shape.
  pub fn to_json(&self) -> Value {
    match self {
      Self::Created { temp_id, body } => {
        let mut fields = echo(body.as_ref());
        fields.insert("id".into(), Value::String(temp_id.clone()));
        fields.insert("_offlineCreated".into(), Value::Bool(true));
        fields.insert("_pendingSync".into(), Value::Bool(true));
        Value::Object(fields)
      }
      Self::Updated { id, body } => {
        let mut fields = echo(body.as_ref());
        if let Some(id) = id {
          fields.insert("id".into(), json!(id));
        }
        fields.insert("_offlineUpdated".into(), Value::Bool(true));
        fields.insert("_pendingSync".into(), Value::Bool(true));
        Value::Object(fields)
      }
      Self::Deleted => json!({
        "success": true,
        "_offlineDeleted": true,
        "_pendingSync": true,
      }),
    }
  }
}

/// Object bodies are copied field by field; anything else lands under `data`.
fn echo(body: Option<&Value>) -> Map<String, Value> {
  match body {
    Some(Value::Object(map)) => map.clone(),
    Some(other) => {
      let mut map = Map::new();
      map.insert("data".into(), other.clone());
      map
    }
    None => Map::new(),
  }
}

/// First path segment made only of decimal digits.
pub fn resource_id(path: &str) -> Option<u64> {
  let path = path.split('?').next().unwrap_or(path);
  path
    .split('/')
    .find(|segment| !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()))
    .and_then(|segment| segment.parse().ok())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(method: Method, path: &str, body: Option<Value>) -> PendingRequest {
    PendingRequest {
      id: 1,
      path: path.to_string(),
      method,
      body,
      created_at: 1_714_000_000_000,
    }
  }

  #[test]
  fn test_created_shape() {
    let result =
      OptimisticResult::for_pending(&entry(Method::Post, "/api/workouts", Some(json!({"name": "Leg Day"}))))
        .unwrap();

    assert_eq!(
      result.to_json(),
      json!({
        "name": "Leg Day",
        "id": "temp_1714000000000",
        "_offlineCreated": true,
        "_pendingSync": true,
      })
    );
  }

  #[test]
  fn test_created_id_overrides_body_id() {
    let result =
      OptimisticResult::for_pending(&entry(Method::Post, "/api/meals", Some(json!({"id": 5}))))
        .unwrap();
    assert_eq!(result.to_json()["id"], json!("temp_1714000000000"));
  }

  #[test]
  fn test_updated_shape_for_put_and_patch() {
    for method in [Method::Put, Method::Patch] {
      let result = OptimisticResult::for_pending(&entry(
        method,
        "/api/weight-logs/42",
        Some(json!({"weight": 81.5})),
      ))
      .unwrap();

      assert_eq!(
        result,
        OptimisticResult::Updated {
          id: Some(42),
          body: Some(json!({"weight": 81.5})),
        }
      );
      assert_eq!(
        result.to_json(),
        json!({
          "weight": 81.5,
          "id": 42,
          "_offlineUpdated": true,
          "_pendingSync": true,
        })
      );
    }
  }

  #[test]
  fn test_deleted_shape() {
    let result =
      OptimisticResult::for_pending(&entry(Method::Delete, "/api/weight-logs/42", None)).unwrap();
    assert_eq!(
      result.to_json(),
      json!({"success": true, "_offlineDeleted": true, "_pendingSync": true})
    );
  }

  #[test]
  fn test_non_object_body_is_wrapped() {
    let result =
      OptimisticResult::for_pending(&entry(Method::Post, "/api/plans", Some(json!([1, 2])))).unwrap();
    assert_eq!(result.to_json()["data"], json!([1, 2]));
  }

  #[test]
  fn test_reads_have_no_optimistic_result() {
    assert!(OptimisticResult::for_pending(&entry(Method::Get, "/api/meals", None)).is_none());
  }

  #[test]
  fn test_resource_id() {
    assert_eq!(resource_id("/api/workouts/17/sets/3"), Some(17));
    assert_eq!(resource_id("/api/plans/abc12/days/4"), Some(4));
    assert_eq!(resource_id("/api/meals?page=2"), None);
    assert_eq!(resource_id("/api/meals"), None);
  }

  #[test]
  fn test_resource_id_overflow_does_not_skip_to_later_segment() {
    assert_eq!(resource_id("/api/workouts/18446744073709551616/sets/3"), None);
  }
}
