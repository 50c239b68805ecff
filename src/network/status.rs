//! Connectivity state shared by the dispatcher and the drainer.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::watch;
use tracing::{debug, info};

type Listener = Arc<dyn Fn(bool) + Send + Sync>;

struct Inner {
  is_online: bool,
  was_offline: bool,
  last_online_time: Option<DateTime<Utc>>,
  listeners: Vec<(u64, Listener)>,
  next_listener_id: u64,
}

/// Point-in-time copy of the connectivity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
  pub is_online: bool,
  /// Latched once the first offline -> online transition is seen
  pub was_offline: bool,
  pub last_online_time: Option<DateTime<Utc>>,
}

/// Single source of truth for online/offline state.
///
/// Owned by the composition root and shared through an `Arc`. Transitions
/// are pushed in with [`NetworkStatus::set_online`]; nothing here polls.
pub struct NetworkStatus {
  inner: Mutex<Inner>,
  tx: watch::Sender<bool>,
}

impl NetworkStatus {
  /// Create the monitor from the platform's current connectivity signal.
  pub fn new(initially_online: bool) -> Arc<Self> {
    let (tx, _rx) = watch::channel(initially_online);
    Arc::new(Self {
      inner: Mutex::new(Inner {
        is_online: initially_online,
        was_offline: false,
        last_online_time: initially_online.then(Utc::now),
        listeners: Vec::new(),
        next_listener_id: 0,
      }),
      tx,
    })
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    // Listeners never run under the lock, so a poisoned guard still holds consistent state
    self.inner.lock().unwrap_or_else(|e| e.into_inner())
  }

  pub fn is_online(&self) -> bool {
    self.lock().is_online
  }

  pub fn was_offline(&self) -> bool {
    self.lock().was_offline
  }

  pub fn last_online_time(&self) -> Option<DateTime<Utc>> {
    self.lock().last_online_time
  }

  pub fn snapshot(&self) -> StatusSnapshot {
    let inner = self.lock();
    StatusSnapshot {
      is_online: inner.is_online,
      was_offline: inner.was_offline,
      last_online_time: inner.last_online_time,
    }
  }

  /// Apply a connectivity event.
  ///
  /// Repeating the current state is ignored. A real transition updates the
  /// state, then calls every subscriber in subscription order.
  pub fn set_online(&self, online: bool) {
    let listeners: Vec<Listener> = {
      let mut inner = self.lock();
      if inner.is_online == online {
        debug!(online, "connectivity unchanged");
        return;
      }

      inner.is_online = online;
      if online {
        inner.was_offline = true;
        inner.last_online_time = Some(Utc::now());
      }

      inner
        .listeners
        .iter()
        .map(|(_, listener)| Arc::clone(listener))
        .collect()
    };

    if online {
      info!("network: back online");
    } else {
      info!("network: connection lost, switching to offline mode");
    }

    self.tx.send_replace(online);
    for listener in listeners {
      listener(online);
    }
  }

  /// Register a callback for every transition.
  ///
  /// The callback stays registered until the returned [`Subscription`] is
  /// dropped or explicitly unsubscribed.
  #[must_use = "dropping the subscription removes the listener"]
  pub fn subscribe<F>(self: &Arc<Self>, listener: F) -> Subscription
  where
    F: Fn(bool) + Send + Sync + 'static,
  {
    let mut inner = self.lock();
    let id = inner.next_listener_id;
    inner.next_listener_id += 1;
    inner.listeners.push((id, Arc::new(listener)));

    Subscription {
      status: Arc::downgrade(self),
      id,
    }
  }

  /// Receiver that observes the latest connectivity value.
  pub fn watch(&self) -> watch::Receiver<bool> {
    self.tx.subscribe()
  }

  pub fn listener_count(&self) -> usize {
    self.lock().listeners.len()
  }

  fn remove_listener(&self, id: u64) {
    self.lock().listeners.retain(|(listener_id, _)| *listener_id != id);
  }
}

/// Disposer returned by [`NetworkStatus::subscribe`].
pub struct Subscription {
  status: Weak<NetworkStatus>,
  id: u64,
}

impl Subscription {
  pub fn unsubscribe(self) {
    // Drop does the work
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if let Some(status) = self.status.upgrade() {
      status.remove_listener(self.id);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Mutex;

  fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&'static str) -> Listener) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let log_clone = Arc::clone(&log);
    let make = move |name: &'static str| -> Listener {
      let log = Arc::clone(&log_clone);
      Arc::new(move |online: bool| log.lock().unwrap().push(format!("{}:{}", name, online)))
    };
    (log, make)
  }

  #[test]
  fn test_initial_state() {
    let online = NetworkStatus::new(true);
    assert!(online.is_online());
    assert!(!online.was_offline());
    assert!(online.last_online_time().is_some());

    let offline = NetworkStatus::new(false);
    assert!(!offline.is_online());
    assert!(offline.last_online_time().is_none());
  }

  #[test]
  fn test_listeners_called_in_subscription_order() {
    let status = NetworkStatus::new(true);
    let (log, make) = recorder();
    let first = make("first");
    let second = make("second");
    let _a = status.subscribe(move |online| first(online));
    let _b = status.subscribe(move |online| second(online));

    status.set_online(false);
    status.set_online(true);

    assert_eq!(
      *log.lock().unwrap(),
      vec!["first:false", "second:false", "first:true", "second:true"]
    );
  }

  #[test]
  fn test_was_offline_latches() {
    let status = NetworkStatus::new(false);
    status.set_online(true);
    assert!(status.was_offline());

    status.set_online(false);
    assert!(status.was_offline());
    assert!(!status.is_online());
  }

  #[test]
  fn test_going_offline_keeps_last_online_time() {
    let status = NetworkStatus::new(true);
    let before = status.last_online_time();
    status.set_online(false);
    assert_eq!(status.last_online_time(), before);
  }

  #[test]
  fn test_repeated_state_is_ignored() {
    let status = NetworkStatus::new(true);
    let (log, make) = recorder();
    let listener = make("l");
    let _sub = status.subscribe(move |online| listener(online));

    status.set_online(true);

    assert!(log.lock().unwrap().is_empty());
    assert!(!status.was_offline());
  }

  #[test]
  fn test_dropping_subscription_unsubscribes() {
    let status = NetworkStatus::new(true);
    let (log, make) = recorder();
    let listener = make("l");
    let sub = status.subscribe(move |online| listener(online));
    assert_eq!(status.listener_count(), 1);

    sub.unsubscribe();
    assert_eq!(status.listener_count(), 0);

    status.set_online(false);
    assert!(log.lock().unwrap().is_empty());
  }

  #[test]
  fn test_listener_can_read_status() {
    let status = NetworkStatus::new(false);
    let seen = Arc::new(Mutex::new(None));
    let seen_clone = Arc::clone(&seen);
    let weak = Arc::downgrade(&status);
    let _sub = status.subscribe(move |_| {
      if let Some(status) = weak.upgrade() {
        *seen_clone.lock().unwrap() = Some(status.is_online());
      }
    });

    status.set_online(true);
    assert_eq!(*seen.lock().unwrap(), Some(true));
  }

  #[tokio::test]
  async fn test_watch_sees_transitions() {
    let status = NetworkStatus::new(false);
    let mut rx = status.watch();
    assert!(!*rx.borrow());

    status.set_online(true);
    rx.changed().await.unwrap();
    assert!(*rx.borrow_and_update());
  }
}
