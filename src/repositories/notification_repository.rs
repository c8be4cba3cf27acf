use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::notification::Notification;
use crate::repositories::RepositoryError;

/// Trait defining notification repository operations
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Append a notification
    async fn create(&self, notification: Notification) -> Result<Notification, RepositoryError>;

    /// Unseen notifications for a user, newest first
    async fn find_unseen_by_user(&self, user_id: Uuid)
    -> Result<Vec<Notification>, RepositoryError>;

    /// Mark every unseen notification of a user as seen, returning how many changed
    async fn mark_all_seen(&self, user_id: Uuid) -> Result<u64, RepositoryError>;
}

/// PostgreSQL implementation of NotificationRepository
pub struct PostgresNotificationRepository {
    pool: PgPool,
}

impl PostgresNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    async fn create(&self, notification: Notification) -> Result<Notification, RepositoryError> {
        let created = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (id, kind, expense_id, message, user_id, seen, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, kind, expense_id, message, user_id, seen, created_at
            "#,
        )
        .bind(notification.id)
        .bind(notification.kind)
        .bind(notification.expense_id)
        .bind(&notification.message)
        .bind(notification.user_id)
        .bind(notification.seen)
        .bind(notification.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn find_unseen_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, kind, expense_id, message, user_id, seen, created_at
            FROM notifications
            WHERE user_id = $1 AND seen = FALSE
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    async fn mark_all_seen(&self, user_id: Uuid) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE notifications SET seen = TRUE WHERE user_id = $1 AND seen = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
