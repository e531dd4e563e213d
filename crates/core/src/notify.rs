//! Status and count notifications emitted by the queue.

use serde::Serialize;

use crate::queue::QueueStatus;

/// A change the queue broadcasts to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueueNotification {
    ItemQueued { count: usize },
    ItemProcessed { count: usize },
    StatusChanged { status: QueueStatus },
}

/// Receiver of queue notifications. Called on producer and worker threads.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: &QueueNotification);
}

/// Forwards notifications to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notification: &QueueNotification) {
        match notification {
            QueueNotification::ItemQueued { count } => {
                tracing::debug!(count, "Index queue item queued");
            }
            QueueNotification::ItemProcessed { count } => {
                tracing::debug!(count, "Index queue items processed");
            }
            QueueNotification::StatusChanged { status } => {
                tracing::debug!(%status, "Index queue status changed");
            }
        }
    }
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _notification: &QueueNotification) {}
}
