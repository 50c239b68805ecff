//! Replays queued mutations once connectivity returns.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::network::{NetworkError, NetworkStatus, Transport};
use crate::request::Method;
use crate::store::OfflineStore;

/// A queued entry whose replay failed. It stays queued for the next pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayFailure {
  pub id: i64,
  pub method: Method,
  pub path: String,
  #[serde(serialize_with = "serialize_display")]
  pub error: NetworkError,
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DrainReport {
  /// The pass did not run because the network was reported offline
  pub skipped: bool,
  pub attempted: usize,
  /// Ids removed from the queue, in replay order
  pub replayed: Vec<i64>,
  pub failed: Vec<ReplayFailure>,
}

impl DrainReport {
  fn skipped() -> Self {
    Self {
      skipped: true,
      ..Self::default()
    }
  }

  pub fn is_clean(&self) -> bool {
    !self.skipped && self.failed.is_empty()
  }
}

fn serialize_display<S: serde::Serializer>(
  error: &NetworkError,
  serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
  serializer.collect_str(error)
}

/// Replays the pending queue against the backend.
pub struct QueueDrainer<S: OfflineStore, T: Transport> {
  store: Arc<S>,
  transport: Arc<T>,
  status: Arc<NetworkStatus>,
  /// Held for the duration of a pass so two passes never overlap
  pass: Arc<Mutex<()>>,
}

impl<S: OfflineStore, T: Transport> QueueDrainer<S, T> {
  pub fn new(store: Arc<S>, transport: Arc<T>, status: Arc<NetworkStatus>) -> Self {
    Self {
      store,
      transport,
      status,
      pass: Arc::new(Mutex::new(())),
    }
  }

  /// Run one drain pass.
  ///
  /// Entries are replayed one at a time, oldest first. A successful replay
  /// removes the entry; a failed one is left in place and the pass moves on.
  /// Store failures abort the pass.
  pub async fn drain(&self) -> Result<DrainReport> {
    let _pass = self.pass.lock().await;

    if !self.status.is_online() {
      info!("sync: offline, skipping drain pass");
      return Ok(DrainReport::skipped());
    }

    let pending = self.store.list_pending()?;
    if pending.is_empty() {
      debug!("sync: queue empty");
      return Ok(DrainReport::default());
    }

    info!("sync: replaying {} queued requests", pending.len());
    let mut report = DrainReport::default();

    for entry in pending {
      report.attempted += 1;

      match self.transport.send(&entry.to_request()).await {
        Ok(_) => {
          self.store.remove_pending(entry.id)?;
          debug!(id = entry.id, method = %entry.method, path = %entry.path, "replayed");
          report.replayed.push(entry.id);
        }
        Err(e) => {
          warn!(
            id = entry.id,
            method = %entry.method,
            path = %entry.path,
            "replay failed, keeping entry queued: {}",
            e
          );
          report.failed.push(ReplayFailure {
            id: entry.id,
            method: entry.method,
            path: entry.path,
            error: e,
          });
        }
      }
    }

    info!(
      "sync: {} replayed, {} still pending",
      report.replayed.len(),
      report.failed.len()
    );
    Ok(report)
  }
}

impl<S, T> QueueDrainer<S, T>
where
  S: OfflineStore + 'static,
  T: Transport + 'static,
{
  /// Drain in the background on every transition to online.
  ///
  /// Also runs one pass immediately if the network is already up. The task
  /// lives until the returned handle is aborted.
  pub fn spawn_on_reconnect(self) -> JoinHandle<()> {
    let mut rx = self.status.watch();

    tokio::spawn(async move {
      let online = *rx.borrow_and_update();
      if online {
        self.drain_logged().await;
      }

      while rx.changed().await.is_ok() {
        let online = *rx.borrow_and_update();
        if online {
          self.drain_logged().await;
        }
      }
    })
  }

  async fn drain_logged(&self) {
    if let Err(e) = self.drain().await {
      error!("sync: drain pass aborted: {}", e);
    }
  }
}

impl<S: OfflineStore, T: Transport> Clone for QueueDrainer<S, T> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      transport: Arc::clone(&self.transport),
      status: Arc::clone(&self.status),
      pass: Arc::clone(&self.pass),
    }
  }
}
