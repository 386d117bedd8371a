//! Notification center: the ordered sink of user-facing notifications
//!
//! The poll pipeline is the only producer; list views and the three
//! explicit actions (mark-read, delete, clear) are the only other
//! mutations. Order is insertion order, newest last, and is never
//! reshuffled by unrelated updates. Badge consumers subscribe to the
//! unread count through a watch channel instead of polling the list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// A single user-facing notification record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    /// Generated, time-based id
    pub id: String,
    /// Human-readable message
    pub message: String,
    /// Whether the user has marked this notification as read
    pub read: bool,
    /// When the notification was created
    pub created_at: DateTime<Utc>,
}

/// Ordered collection of notifications with O(1) count queries
#[derive(Debug)]
pub struct NotificationCenter {
    notifications: Vec<Notification>,
    unread: usize,
    next_seq: u64,
    badge_tx: watch::Sender<usize>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCenter {
    /// Create an empty notification center
    pub fn new() -> Self {
        let (badge_tx, _) = watch::channel(0);
        Self {
            notifications: Vec::new(),
            unread: 0,
            next_seq: 0,
            badge_tx,
        }
    }

    /// Append an unread notification and return its generated id
    pub fn add(&mut self, message: impl Into<String>) -> String {
        let seq = self.next_seq;
        self.next_seq += 1;
        let created_at = Utc::now();
        let id = format!("{}-{}", created_at.timestamp_millis(), seq);

        self.notifications.push(Notification {
            id: id.clone(),
            message: message.into(),
            read: false,
            created_at,
        });
        self.unread += 1;
        self.publish_badge();
        id
    }

    /// Mark a notification as read; unknown ids are a no-op
    pub fn mark_read(&mut self, id: &str) {
        if let Some(notification) = self
            .notifications
            .iter_mut()
            .find(|n| n.id == id && !n.read)
        {
            notification.read = true;
            self.unread -= 1;
            self.publish_badge();
        }
    }

    /// Delete a notification by id; unknown ids are a no-op
    pub fn delete(&mut self, id: &str) {
        if let Some(index) = self.notifications.iter().position(|n| n.id == id) {
            let removed = self.notifications.remove(index);
            if !removed.read {
                self.unread -= 1;
            }
            self.publish_badge();
        }
    }

    /// Remove all notifications
    pub fn clear(&mut self) {
        self.notifications.clear();
        self.unread = 0;
        self.publish_badge();
    }

    /// All notifications in insertion order, newest last
    pub fn list(&self) -> &[Notification] {
        &self.notifications
    }

    /// Total number of notifications
    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    /// Whether the center holds no notifications
    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    /// Number of unread notifications
    pub fn unread_count(&self) -> usize {
        self.unread
    }

    /// Subscribe to unread-count changes for badge rendering
    pub fn subscribe_badge(&self) -> watch::Receiver<usize> {
        self.badge_tx.subscribe()
    }

    fn publish_badge(&self) {
        // send_replace never fails, even with no subscribers
        self.badge_tx.send_replace(self.unread);
    }
}
