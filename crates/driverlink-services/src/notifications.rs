//! Ride notification intake and dedup store.
//!
//! The store is an ordered queue keyed on `ride_id`: first arrival wins,
//! later duplicates are dropped without merging. Entries stay until the UI
//! removes them; there is no expiry.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::watch;

use driverlink_core::{RideEvent, RideNotification};

/// Turn a raw `notify` event into a notification. Extraction failures are
/// logged and yield `None`.
pub fn ingest(event: &RideEvent) -> Option<RideNotification> {
    match RideNotification::from_event(event, now_millis()) {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::warn!(
                error = %e,
                ride_id = event.ride_id.as_deref().unwrap_or(""),
                "dropping ride notification"
            );
            None
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Insertion-ordered notification queue. Clones share the same queue;
/// every mutation wakes [`NotificationStore::subscribe`] receivers.
#[derive(Clone)]
pub struct NotificationStore {
    inner: Arc<watch::Sender<Vec<RideNotification>>>,
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self { inner: Arc::new(tx) }
    }

    /// Append unless `ride_id` is already queued. Returns whether it was added.
    pub fn add(&self, notification: RideNotification) -> bool {
        let ride_id = notification.ride_id.clone();
        let added = self.inner.send_if_modified(|list| {
            if list.iter().any(|n| n.ride_id == notification.ride_id) {
                false
            } else {
                list.push(notification);
                true
            }
        });
        if added {
            tracing::info!(ride_id, "ride notification queued");
        } else {
            tracing::debug!(ride_id, "duplicate ride notification dropped");
        }
        added
    }

    /// Remove one notification. Returns whether it was present.
    pub fn remove(&self, ride_id: &str) -> bool {
        self.inner.send_if_modified(|list| {
            let before = list.len();
            list.retain(|n| n.ride_id != ride_id);
            list.len() != before
        })
    }

    /// Remove everything. Returns how many entries were dropped.
    pub fn clear(&self) -> usize {
        let mut cleared = 0;
        self.inner.send_if_modified(|list| {
            cleared = list.len();
            list.clear();
            cleared > 0
        });
        cleared
    }

    pub fn list(&self) -> Vec<RideNotification> {
        self.inner.borrow().clone()
    }

    pub fn get(&self, ride_id: &str) -> Option<RideNotification> {
        self.inner
            .borrow()
            .iter()
            .find(|n| n.ride_id == ride_id)
            .cloned()
    }

    pub fn contains(&self, ride_id: &str) -> bool {
        self.inner.borrow().iter().any(|n| n.ride_id == ride_id)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    /// Receiver that observes every change to the queue.
    pub fn subscribe(&self) -> watch::Receiver<Vec<RideNotification>> {
        self.inner.subscribe()
    }
}
