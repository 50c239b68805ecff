//! Offline-aware request dispatcher.
//!
//! Every read and write goes through [`OfflineDispatcher::request`], which
//! decides between the network, the response cache and the pending queue:
//! - reads on offline-enabled paths are cached on success and served from
//!   the cache when offline or when the network call fails
//! - writes on offline-enabled paths are queued when offline or when the
//!   network call fails, and answered with an [`OptimisticResult`]
//! - everything else goes straight to the network, and is refused offline

mod optimistic;
mod paths;

pub use optimistic::{resource_id, OptimisticResult};
pub use paths::{OfflinePaths, DEFAULT_OFFLINE_PATHS};

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::network::{NetworkStatus, Transport};
use crate::request::{cache_key, ApiRequest, Method};
use crate::store::{CachedResponse, OfflineStore};

/// Where a dispatched result came from.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
  /// The server's response, unmodified
  Network(Value),
  /// Last-known-good payload for the read
  Cached(CachedResponse),
  /// The write was queued; this stands in for the server's response
  Optimistic(OptimisticResult),
}

impl DispatchOutcome {
  pub fn into_json(self) -> Value {
    match self {
      Self::Network(value) => value,
      Self::Cached(cached) => cached.payload,
      Self::Optimistic(result) => result.to_json(),
    }
  }

  /// True when the caller is looking at something the server has not confirmed.
  pub fn is_pending_sync(&self) -> bool {
    matches!(self, Self::Optimistic(_))
  }
}

/// Single chokepoint for calls to the fitness API.
pub struct OfflineDispatcher<S: OfflineStore, T: Transport> {
  store: Arc<S>,
  transport: Arc<T>,
  status: Arc<NetworkStatus>,
  paths: Arc<OfflinePaths>,
}

impl<S: OfflineStore, T: Transport> OfflineDispatcher<S, T> {
  pub fn new(
    store: Arc<S>,
    transport: Arc<T>,
    status: Arc<NetworkStatus>,
    paths: OfflinePaths,
  ) -> Self {
    Self {
      store,
      transport,
      status,
      paths: Arc::new(paths),
    }
  }

  pub fn store(&self) -> &Arc<S> {
    &self.store
  }

  pub fn status(&self) -> &Arc<NetworkStatus> {
    &self.status
  }

  /// Dispatch one call.
  ///
  /// Store failures always propagate. Network failures propagate only for
  /// paths outside the offline allowlist.
  pub async fn request(
    &self,
    method: Method,
    path: &str,
    body: Option<Value>,
  ) -> Result<DispatchOutcome> {
    let request = ApiRequest::new(method, path, body);

    if !self.paths.is_enabled(path) {
      if !self.status.is_online() {
        return Err(Error::OfflineUnsupported {
          method,
          path: path.to_string(),
        });
      }
      let value = self.transport.send(&request).await?;
      return Ok(DispatchOutcome::Network(value));
    }

    if method.is_write() {
      self.write(request).await
    } else {
      self.read(request).await
    }
  }

  async fn read(&self, request: ApiRequest) -> Result<DispatchOutcome> {
    let key = cache_key(request.method, &request.path);

    if self.status.is_online() {
      match self.transport.send(&request).await {
        Ok(value) => {
          self.store.put_cache(&key, &value)?;
          return Ok(DispatchOutcome::Network(value));
        }
        Err(e) => {
          warn!(path = %request.path, "read failed, falling back to cache: {}", e);
        }
      }
    }

    match self.store.get_cache(&key)? {
      Some(cached) => {
        debug!(%key, "serving cached response");
        Ok(DispatchOutcome::Cached(cached))
      }
      None => Err(Error::NoCachedData { key }),
    }
  }

  async fn write(&self, request: ApiRequest) -> Result<DispatchOutcome> {
    if self.status.is_online() {
      match self.transport.send(&request).await {
        Ok(value) => return Ok(DispatchOutcome::Network(value)),
        Err(e) => {
          warn!(
            method = %request.method,
            path = %request.path,
            "write failed, queueing for later sync: {}",
            e
          );
        }
      }
    }

    let entry = self
      .store
      .enqueue(&request.path, request.method, request.body.as_ref())?;

    let result = OptimisticResult::for_pending(&entry).ok_or_else(|| {
      Error::InvalidRequest(format!("{} has no optimistic result", entry.method))
    })?;

    Ok(DispatchOutcome::Optimistic(result))
  }

  pub async fn get(&self, path: &str) -> Result<Value> {
    Ok(self.request(Method::Get, path, None).await?.into_json())
  }

  pub async fn post(&self, path: &str, body: Value) -> Result<Value> {
    Ok(self.request(Method::Post, path, Some(body)).await?.into_json())
  }

  pub async fn put(&self, path: &str, body: Value) -> Result<Value> {
    Ok(self.request(Method::Put, path, Some(body)).await?.into_json())
  }

  pub async fn patch(&self, path: &str, body: Value) -> Result<Value> {
    Ok(self.request(Method::Patch, path, Some(body)).await?.into_json())
  }

  pub async fn delete(&self, path: &str) -> Result<Value> {
    Ok(self.request(Method::Delete, path, None).await?.into_json())
  }
}

impl<S: OfflineStore, T: Transport> Clone for OfflineDispatcher<S, T> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      transport: Arc::clone(&self.transport),
      status: Arc::clone(&self.status),
      paths: Arc::clone(&self.paths),
    }
  }
}
