//! Outbound notification hook. Delivery itself belongs to an external collaborator.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::access::ActorId;

/// Notification payload handed to the delivery collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub template: String,
    pub recipient: ActorId,
    pub details: BTreeMap<String, String>,
}

impl Notification {
    pub fn new(template: &str, recipient: ActorId) -> Self {
        Self {
            template: template.to_string(),
            recipient,
            details: BTreeMap::new(),
        }
    }

    pub fn detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError>;
}

/// Publish after a committed write. A delivery failure never undoes the write, so it is
/// logged and swallowed.
pub(crate) fn dispatch<N: NotificationPublisher + ?Sized>(publisher: &N, notification: Notification) {
    let template = notification.template.clone();
    let recipient = notification.recipient.clone();
    if let Err(err) = publisher.publish(notification) {
        warn!(%template, %recipient, error = %err, "notification dispatch failed");
    }
}

/// Publisher that only records notifications in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationPublisher for LogNotifier {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            template = %notification.template,
            recipient = %notification.recipient,
            details = ?notification.details,
            "notification queued"
        );
        Ok(())
    }
}

/// Publisher that keeps every notification in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryNotifier {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifier {
    pub fn events(&self) -> Vec<Notification> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl NotificationPublisher for MemoryNotifier {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .map_err(|_| NotificationError::Transport("notifier mutex poisoned".to_string()))?
            .push(notification);
        Ok(())
    }
}
