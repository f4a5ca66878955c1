//! Notification collaborator seam.
//!
//! The orchestrator hands every compiled solution to a [`Notifier`] exactly
//! once per run. Delivery and channel fan-out belong to the notifier; the
//! pipeline only records whether the handoff succeeded.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

use crate::domain::{CompiledSolution, NotificationPriority};

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification queue is full")]
    QueueFull,

    #[error("notification queue is closed")]
    QueueClosed,

    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        solution: &CompiledSolution,
        priority: NotificationPriority,
    ) -> Result<(), NotifyError>;
}

/// Writes the solution to the log and reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        solution: &CompiledSolution,
        priority: NotificationPriority,
    ) -> Result<(), NotifyError> {
        info!(
            event = "notification.dispatched",
            disruption_id = %solution.disruption_id,
            priority = %priority,
            summary = %solution.action_summary,
            groups = solution.affected_user_groups.len(),
        );
        Ok(())
    }
}

/// A solution waiting in a [`QueueNotifier`] channel.
#[derive(Debug, Clone)]
pub struct QueuedNotification {
    pub solution: CompiledSolution,
    pub priority: NotificationPriority,
}

/// Hands solutions to a bounded channel without waiting for a consumer.
///
/// A full or closed channel is reported as a failure rather than awaited.
#[derive(Debug, Clone)]
pub struct QueueNotifier {
    tx: mpsc::Sender<QueuedNotification>,
}

impl QueueNotifier {
    /// Notifier plus the receiving end a delivery worker drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<QueuedNotification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Notifier for QueueNotifier {
    async fn notify(
        &self,
        solution: &CompiledSolution,
        priority: NotificationPriority,
    ) -> Result<(), NotifyError> {
        self.tx
            .try_send(QueuedNotification {
                solution: solution.clone(),
                priority,
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => NotifyError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => NotifyError::QueueClosed,
            })
    }
}
