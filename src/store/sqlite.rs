//! SQLite implementation of the offline store.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::schema::SCHEMA;
use super::traits::{CachedResponse, OfflineStore, PendingRequest};
use crate::error::{Error, Result};
use crate::request::Method;

/// Offline store backed by a single long-lived SQLite connection.
///
/// All calls serialize on the connection mutex, so a read followed by a
/// write inside one method cannot interleave with another caller.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open or create the store at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent).map_err(|e| {
          Error::unavailable(format!(
            "failed to create directory {}: {}",
            parent.display(),
            e
          ))
        })?;
      }
    }

    let conn = Connection::open(path)
      .map_err(|e| Error::unavailable(format!("failed to open {}: {}", path.display(), e)))?;

    Self::from_connection(conn)
  }

  /// Open the store at the platform data directory.
  pub fn open_default() -> Result<Self> {
    Self::open(&Self::default_path()?)
  }

  /// Store that lives only as long as the value. Used by tests.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory().map_err(Error::unavailable)?;
    Self::from_connection(conn)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| Error::unavailable("could not determine data directory"))?;

    Ok(data_dir.join("fitsync").join("offline.db"))
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(SCHEMA)
      .map_err(|e| Error::unavailable(format!("failed to run migrations: {}", e)))?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| Error::unavailable(format!("lock poisoned: {}", e)))
  }
}

impl OfflineStore for SqliteStore {
  fn enqueue(&self, path: &str, method: Method, body: Option<&Value>) -> Result<PendingRequest> {
    if !method.is_write() {
      return Err(Error::InvalidRequest(format!(
        "{} requests are never queued",
        method
      )));
    }

    let body_text = body.map(serde_json::to_string).transpose()?;
    let created_at = Utc::now().timestamp_millis();

    let conn = self.conn()?;
    conn.execute(
      "INSERT INTO pending_requests (path, method, body, created_at) VALUES (?, ?, ?, ?)",
      params![path, method.as_str(), body_text, created_at],
    )?;
    let id = conn.last_insert_rowid();

    debug!(id, %method, path, "queued request");

    Ok(PendingRequest {
      id,
      path: path.to_string(),
      method,
      body: body.cloned(),
      created_at,
    })
  }

  fn put_cache(&self, key: &str, payload: &Value) -> Result<()> {
    let data = serde_json::to_string(payload)?;
    let cached_at = Utc::now().timestamp_millis();

    self.conn()?.execute(
      "INSERT OR REPLACE INTO cached_responses (cache_key, payload, cached_at) VALUES (?, ?, ?)",
      params![key, data, cached_at],
    )?;

    Ok(())
  }

  fn get_cache(&self, key: &str) -> Result<Option<CachedResponse>> {
    let conn = self.conn()?;

    let row: Option<(String, i64)> = conn
      .query_row(
        "SELECT payload, cached_at FROM cached_responses WHERE cache_key = ?",
        params![key],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()?;

    match row {
      Some((data, cached_at)) => Ok(Some(CachedResponse {
        key: key.to_string(),
        payload: serde_json::from_str(&data)?,
        cached_at,
      })),
      None => Ok(None),
    }
  }

  fn list_pending(&self) -> Result<Vec<PendingRequest>> {
    let conn = self.conn()?;

    let mut stmt = conn.prepare(
      "SELECT id, path, method, body, created_at FROM pending_requests ORDER BY id ASC",
    )?;

    let rows = stmt
      .query_map([], |row| {
        Ok((
          row.get::<_, i64>(0)?,
          row.get::<_, String>(1)?,
          row.get::<_, String>(2)?,
          row.get::<_, Option<String>>(3)?,
          row.get::<_, i64>(4)?,
        ))
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;

    rows
      .into_iter()
      .map(|(id, path, method, body, created_at)| -> Result<PendingRequest> {
        Ok(PendingRequest {
          id,
          path,
          method: method.parse()?,
          body: body.as_deref().map(serde_json::from_str).transpose()?,
          created_at,
        })
      })
      .collect()
  }

  fn remove_pending(&self, id: i64) -> Result<()> {
    self
      .conn()?
      .execute("DELETE FROM pending_requests WHERE id = ?", params![id])?;
    Ok(())
  }

  fn clear_cache(&self) -> Result<()> {
    self.conn()?.execute("DELETE FROM cached_responses", [])?;
    Ok(())
  }

  fn pending_count(&self) -> Result<usize> {
    let conn = self.conn()?;
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM pending_requests", [], |row| row.get(0))?;
    Ok(count as usize)
  }
}
