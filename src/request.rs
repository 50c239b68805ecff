//! Request primitives shared by the dispatcher, store and transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// HTTP-like method of an API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
  Get,
  Post,
  Put,
  Patch,
  Delete,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Patch => "PATCH",
      Method::Delete => "DELETE",
    }
  }

  /// Everything except GET mutates server state and may be queued.
  pub fn is_write(&self) -> bool {
    !matches!(self, Method::Get)
  }
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Method {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_uppercase().as_str() {
      "GET" => Ok(Method::Get),
      "POST" => Ok(Method::Post),
      "PUT" => Ok(Method::Put),
      "PATCH" => Ok(Method::Patch),
      "DELETE" => Ok(Method::Delete),
      other => Err(Error::InvalidRequest(format!("unknown method '{}'", other))),
    }
  }
}

impl From<Method> for reqwest::Method {
  fn from(method: Method) -> Self {
    match method {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Put => reqwest::Method::PUT,
      Method::Patch => reqwest::Method::PATCH,
      Method::Delete => reqwest::Method::DELETE,
    }
  }
}

/// Cache slot for a read: `METHOD:path`.
pub fn cache_key(method: Method, path: &str) -> String {
  format!("{}:{}", method, path)
}

/// A single call headed for the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method: Method,
  pub path: String,
  pub body: Option<Value>,
  /// Set on replays so the backend can drop duplicates
  pub idempotency_key: Option<String>,
}

impl ApiRequest {
  pub fn new(method: Method, path: impl Into<String>, body: Option<Value>) -> Self {
    Self {
      method,
      path: path.into(),
      body,
      idempotency_key: None,
    }
  }

  pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
    self.idempotency_key = Some(key.into());
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_method_case_insensitive() {
    assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
    assert_eq!(" Delete ".parse::<Method>().unwrap(), Method::Delete);
    assert!("TRACE".parse::<Method>().is_err());
  }

  #[test]
  fn test_only_get_is_a_read() {
    assert!(!Method::Get.is_write());
    for method in [Method::Post, Method::Put, Method::Patch, Method::Delete] {
      assert!(method.is_write());
    }
  }

  #[test]
  fn test_cache_key_format() {
    assert_eq!(cache_key(Method::Get, "/api/meals"), "GET:/api/meals");
  }

  #[test]
  fn test_method_serializes_uppercase() {
    let json = serde_json::to_string(&Method::Patch).unwrap();
    assert_eq!(json, "\"PATCH\"");
  }
}
