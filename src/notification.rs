//! Failure Notifications
//!
//! Per-card failures are isolated from the response status, so they need a
//! separate place to surface. The card engine reports every failed card to a
//! [`FailureSink`]; [`TracingSink`] logs them and [`NotificationLog`] also
//! keeps a bounded history, most recent first.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use uuid::Uuid;

/// One card that failed to resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardFailure {
    pub request_id: Uuid,
    pub resource: String,
    pub card: String,
    pub index: usize,
    pub message: String,
}

pub trait FailureSink: Send + Sync {
    fn card_failed(&self, failure: &CardFailure);
}

/// Logs failures through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl FailureSink for TracingSink {
    fn card_failed(&self, failure: &CardFailure) {
        tracing::error!(
            request_id = %failure.request_id,
            resource = %failure.resource,
            card = %failure.card,
            index = failure.index,
            "card resolution failed: {}",
            failure.message
        );
    }
}

/// A recorded failure
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub resource: String,
    pub card: String,
    pub index: usize,
    pub message: String,
}

impl Notification {
    pub fn new(failure: &CardFailure) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            resource: failure.resource.clone(),
            card: failure.card.clone(),
            index: failure.index,
            message: failure.message.clone(),
        }
    }
}

/// Bounded failure history
pub struct NotificationLog {
    notifications: Mutex<VecDeque<Notification>>,
    /// Maximum notifications to keep in history
    max_history: usize,
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::new(50)
    }
}

impl NotificationLog {
    pub fn new(max_history: usize) -> Self {
        Self {
            notifications: Mutex::new(VecDeque::new()),
            max_history: max_history.max(1),
        }
    }

    /// Snapshot, most recent first
    pub fn recent(&self) -> Vec<Notification> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Notification>> {
        // history stays usable even if a writer panicked
        self.notifications
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FailureSink for NotificationLog {
    fn card_failed(&self, failure: &CardFailure) {
        TracingSink.card_failed(failure);

        let mut notifications = self.lock();
        notifications.push_front(Notification::new(failure));
        notifications.truncate(self.max_history);
    }
}
