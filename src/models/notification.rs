use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

/// What happened to the entry a notification refers to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Added,
    Updated,
    Deleted,
}

/// User-visible record of a change, markable as seen
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Entry the event was about; kept even after the entry is deleted
    pub expense_id: Option<Uuid>,
    pub message: String,
    pub user_id: Uuid,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        expense_id: Option<Uuid>,
        message: impl Into<String>,
        user_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            expense_id,
            message: message.into(),
            user_id,
            seen: false,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarkSeenResponse {
    pub message: String,
    pub updated: u64,
}
