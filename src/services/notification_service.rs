use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::models::notification::{Notification, NotificationKind};
use crate::models::user::{Actor, User};
use crate::repositories::notification_repository::NotificationRepository;

/// Notification service errors
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// A committed change to a budget entry
#[derive(Debug, Clone)]
pub struct EntryEvent {
    pub kind: NotificationKind,
    pub entry_id: Uuid,
    pub expense: String,
    pub owner_id: Uuid,
    pub actor: Actor,
}

impl EntryEvent {
    /// Who is told about this event.
    ///
    /// The owner always is. An admin deleting an entry is told as well, even
    /// when the admin owns the entry.
    pub fn recipients(&self) -> Vec<Uuid> {
        let mut recipients = vec![self.owner_id];
        if self.kind == NotificationKind::Deleted && self.actor.is_admin() {
            recipients.push(self.actor.user_id);
        }
        recipients
    }
}

/// Consumer of post-commit mutation events
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Record the notifications an entry change produces
    async fn entry_changed(&self, event: EntryEvent)
    -> Result<Vec<Notification>, NotificationError>;

    /// Record that an admin deleted a user account
    async fn user_deleted(
        &self,
        admin_id: Uuid,
        user: &User,
    ) -> Result<Notification, NotificationError>;
}

/// Trait defining the caller-facing notification operations
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Unseen notifications for a user, newest first
    async fn list_unseen(&self, user_id: Uuid) -> Result<Vec<Notification>, NotificationError>;

    /// Mark all of a user's notifications as seen and return how many changed
    async fn mark_all_seen(&self, user_id: Uuid) -> Result<u64, NotificationError>;
}

/// Implementation of NotificationSink and NotificationService
pub struct NotificationServiceImpl {
    notification_repository: Arc<dyn NotificationRepository>,
}

impl NotificationServiceImpl {
    pub fn new(notification_repository: Arc<dyn NotificationRepository>) -> Self {
        Self {
            notification_repository,
        }
    }

    async fn append(&self, notification: Notification) -> Result<Notification, NotificationError> {
        self.notification_repository
            .create(notification)
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))
    }
}

#[async_trait]
impl NotificationSink for NotificationServiceImpl {
    async fn entry_changed(
        &self,
        event: EntryEvent,
    ) -> Result<Vec<Notification>, NotificationError> {
        let mut created = Vec::new();
        for recipient in event.recipients() {
            let notification =
                Notification::new(event.kind, Some(event.entry_id), &event.expense, recipient);
            created.push(self.append(notification).await?);
        }

        debug!(
            entry_id = %event.entry_id,
            kind = ?event.kind,
            count = created.len(),
            "notifications appended"
        );
        Ok(created)
    }

    async fn user_deleted(
        &self,
        admin_id: Uuid,
        user: &User,
    ) -> Result<Notification, NotificationError> {
        let message = format!("User {} deleted", user.full_name());
        self.append(Notification::new(
            NotificationKind::Deleted,
            None,
            message,
            admin_id,
        ))
        .await
    }
}

#[async_trait]
impl NotificationService for NotificationServiceImpl {
    async fn list_unseen(&self, user_id: Uuid) -> Result<Vec<Notification>, NotificationError> {
        self.notification_repository
            .find_unseen_by_user(user_id)
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))
    }

    async fn mark_all_seen(&self, user_id: Uuid) -> Result<u64, NotificationError> {
        self.notification_repository
            .mark_all_seen(user_id)
            .await
            .map_err(|e| NotificationError::DatabaseError(e.to_string()))
    }
}
