//! Shared application state for health data
//!
//! The store owns the latest snapshot and the poll status, and hands them
//! to consumers through watch channels rather than letting components
//! reach into a free-standing global. The poll loop is the only producer
//! of snapshot replacements; consumers may locally edit outbreak records
//! (the dashboard-style CRUD), but those edits never feed back into
//! polling and are overwritten by the next successful poll.

use crate::snapshot::{DiseaseOutbreak, HealthSnapshot, OutbreakStatus};
use chrono::{DateTime, Utc};
use tokio::sync::watch;

/// Outcome of the most recent poll cycle
///
/// Fetch failures surface here exactly once per failing cycle (the toast
/// analogue); they are never persisted and never deduplicated.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    /// No poll cycle has completed yet
    Idle,
    /// Last cycle stored a fresh snapshot
    Healthy { at: DateTime<Utc> },
    /// Last cycle failed to fetch or validate a snapshot
    Failed { at: DateTime<Utc>, message: String },
}

/// Shared holder of the latest snapshot and poll status
#[derive(Debug)]
pub struct HealthStore {
    snapshot_tx: watch::Sender<Option<HealthSnapshot>>,
    status_tx: watch::Sender<PollStatus>,
}

impl Default for HealthStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthStore {
    /// Create an empty store
    pub fn new() -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        let (status_tx, _) = watch::channel(PollStatus::Idle);
        Self {
            snapshot_tx,
            status_tx,
        }
    }

    /// Replace the stored snapshot wholesale and mark the poll healthy
    pub fn set_snapshot(&self, snapshot: HealthSnapshot) {
        self.snapshot_tx.send_replace(Some(snapshot));
        self.status_tx.send_replace(PollStatus::Healthy { at: Utc::now() });
    }

    /// Record a failed poll cycle without touching the stored snapshot
    pub fn set_poll_error(&self, message: impl Into<String>) {
        self.status_tx.send_replace(PollStatus::Failed {
            at: Utc::now(),
            message: message.into(),
        });
    }

    /// Clone of the latest snapshot, if any poll has succeeded yet
    pub fn latest(&self) -> Option<HealthSnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    /// Current poll status
    pub fn status(&self) -> PollStatus {
        self.status_tx.borrow().clone()
    }

    /// Subscribe to snapshot replacements
    pub fn subscribe(&self) -> watch::Receiver<Option<HealthSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Subscribe to poll status changes
    pub fn subscribe_status(&self) -> watch::Receiver<PollStatus> {
        self.status_tx.subscribe()
    }

    /// Number of currently active outbreaks, for the badge counter
    pub fn active_outbreak_count(&self) -> usize {
        self.snapshot_tx
            .borrow()
            .as_ref()
            .map(|snapshot| {
                snapshot
                    .disease_outbreaks
                    .iter()
                    .filter(|o| o.status == OutbreakStatus::Active)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Locally append an outbreak record; a no-op before the first snapshot
    pub fn add_outbreak(&self, outbreak: DiseaseOutbreak) {
        self.snapshot_tx.send_modify(|current| {
            if let Some(snapshot) = current {
                snapshot.disease_outbreaks.push(outbreak);
            }
        });
    }

    /// Locally update an outbreak by id via the given edit
    pub fn update_outbreak<F>(&self, id: &str, edit: F)
    where
        F: FnOnce(&mut DiseaseOutbreak),
    {
        self.snapshot_tx.send_modify(|current| {
            if let Some(snapshot) = current {
                if let Some(outbreak) = snapshot
                    .disease_outbreaks
                    .iter_mut()
                    .find(|o| o.id == id)
                {
                    edit(outbreak);
                }
            }
        });
    }

    /// Locally delete an outbreak by id; unknown ids are a no-op
    pub fn delete_outbreak(&self, id: &str) {
        self.snapshot_tx.send_modify(|current| {
            if let Some(snapshot) = current {
                snapshot.disease_outbreaks.retain(|o| o.id != id);
            }
        });
    }
}
