//! The seam between offline handling and real HTTP traffic.

use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::request::ApiRequest;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
  #[error("Could not connect to {url}: {message}")]
  Connect { url: String, message: String },

  #[error("Request to {url} timed out")]
  Timeout { url: String },

  #[error("Server responded with {status}: {body}")]
  Status { status: u16, body: String },

  #[error("Failed to decode response body: {0}")]
  Decode(String),

  #[error("Invalid URL '{0}'")]
  InvalidUrl(String),

  #[error("Request failed: {0}")]
  Other(String),
}

/// Something that can deliver an [`ApiRequest`] to the backend.
pub trait Transport: Send + Sync {
  /// Perform the call and return the decoded JSON response
  /// (`Value::Null` for an empty body).
  fn send<'a>(&'a self, request: &'a ApiRequest) -> BoxFuture<'a, Result<Value, NetworkError>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
  fn send<'a>(&'a self, request: &'a ApiRequest) -> BoxFuture<'a, Result<Value, NetworkError>> {
    (**self).send(request)
  }
}
