use axum::{
    extract::{Extension, State},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::handlers::error::{internal_error, ErrorResponse};
use crate::middleware::auth_middleware::AuthenticatedUser;
use crate::models::notification::{MarkSeenResponse, Notification};
use crate::services::notification_service::{NotificationError, NotificationService};

impl IntoResponse for NotificationError {
    fn into_response(self) -> Response {
        match self {
            NotificationError::DatabaseError(ref msg) => internal_error(msg),
        }
    }
}

/// Handler for listing the caller's unseen notifications, newest first
#[utoipa::path(
    get,
    path = "/api/notifications",
    responses(
        (status = 200, description = "Unseen notifications", body = Vec<Notification>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "notifications"
)]
pub async fn list_notifications_handler(
    State(notification_service): State<Arc<dyn NotificationService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<Notification>>, Response> {
    match notification_service.list_unseen(auth_user.user_id).await {
        Ok(notifications) => Ok(Json(notifications)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for marking every notification of the caller as seen
#[utoipa::path(
    put,
    path = "/api/notifications/all/seen",
    responses(
        (status = 200, description = "Notifications marked as seen", body = MarkSeenResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "notifications"
)]
pub async fn mark_all_seen_handler(
    State(notification_service): State<Arc<dyn NotificationService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<MarkSeenResponse>, Response> {
    let updated = notification_service
        .mark_all_seen(auth_user.user_id)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(Json(MarkSeenResponse {
        message: "All notifications marked as seen".to_string(),
        updated,
    }))
}
