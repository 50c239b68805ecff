use clap::{Parser, Subcommand};
use color_eyre::{eyre::WrapErr, Result};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use fitsync::config::Config;
use fitsync::{
  logging, HttpTransport, Method, NetworkStatus, OfflineDispatcher, OfflineStore, QueueDrainer,
  SqliteStore,
};

#[derive(Parser, Debug)]
#[command(name = "fitsync")]
#[command(about = "Offline-first client for the fitness tracking API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/fitsync/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Offline database file, overrides storage.path
  #[arg(long)]
  database: Option<PathBuf>,

  /// Start in offline mode without probing the backend
  #[arg(long)]
  offline: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Send a request through the offline-aware dispatcher
  Request {
    /// GET, POST, PUT, PATCH or DELETE
    method: String,
    /// Resource path, e.g. /api/workouts
    path: String,
    /// JSON request body
    #[arg(short, long)]
    body: Option<String>,
  },
  /// List queued requests waiting for sync
  Pending,
  /// Replay queued requests now
  Sync,
  /// Remove all cached responses
  ClearCache,
  /// Show connectivity and queue size
  Status,
}

impl Command {
  fn needs_network(&self) -> bool {
    matches!(
      self,
      Command::Request { .. } | Command::Sync | Command::Status
    )
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.logging)?;

  let store = match args.database.as_ref().or(config.storage.path.as_ref()) {
    Some(path) => SqliteStore::open(path)?,
    None => SqliteStore::open_default()?,
  };
  let store = Arc::new(store);

  let transport = Arc::new(HttpTransport::new(
    &config.api.base_url,
    config.api.timeout(),
    Config::api_token().as_deref(),
  )?);

  let online = !args.offline && args.command.needs_network() && transport.check_reachable().await;
  info!(online, base_url = %config.api.base_url, "starting");
  let status = NetworkStatus::new(online);

  match args.command {
    Command::Request { method, path, body } => {
      let method: Method = method.parse()?;
      let body: Option<Value> = body
        .map(|b| serde_json::from_str(&b))
        .transpose()
        .wrap_err("--body is not valid JSON")?;

      let dispatcher = OfflineDispatcher::new(
        Arc::clone(&store),
        Arc::clone(&transport),
        Arc::clone(&status),
        config.offline_paths(),
      );

      let outcome = dispatcher.request(method, &path, body).await?;
      if outcome.is_pending_sync() {
        info!("request queued, it will be sent on the next sync");
      }
      print_json(&outcome.into_json())?;
    }
    Command::Pending => {
      print_json(&serde_json::to_value(store.list_pending()?)?)?;
    }
    Command::Sync => {
      let drainer = QueueDrainer::new(Arc::clone(&store), transport, status);
      let report = drainer.drain().await?;
      print_json(&serde_json::to_value(&report)?)?;
    }
    Command::ClearCache => {
      store.clear_cache()?;
      println!("Cache cleared");
    }
    Command::Status => {
      let snapshot = status.snapshot();
      print_json(&json!({
        "online": snapshot.is_online,
        "was_offline": snapshot.was_offline,
        "last_online_time": snapshot.last_online_time,
        "pending": store.pending_count()?,
      }))?;
    }
  }

  Ok(())
}

fn print_json(value: &Value) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
