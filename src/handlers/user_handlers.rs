use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::error::{internal_error, validation_error, ErrorResponse};
use crate::middleware::auth_middleware::AuthenticatedUser;
use crate::models::user::{AdminUpdateUserRequest, UpdateProfileRequest, User};
use crate::services::user_service::{UserError, UserService};

/// Convert UserError to HTTP response
impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        match self {
            UserError::UserNotFound => ErrorResponse::new("user_not_found", "User not found")
                .into_response_with(StatusCode::NOT_FOUND),
            UserError::CannotDeleteSelf => ErrorResponse::new(
                "cannot_delete_self",
                "Admins cannot delete their own account",
            )
            .into_response_with(StatusCode::BAD_REQUEST),
            UserError::InvalidConfiguration(ref msg) | UserError::DatabaseError(ref msg) => {
                internal_error(msg)
            }
        }
    }
}

/// Handler for reading the caller's profile
#[utoipa::path(
    get,
    path = "/api/user/profile",
    responses(
        (status = 200, description = "Caller's profile", body = User),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "users"
)]
pub async fn get_profile_handler(
    State(user_service): State<Arc<dyn UserService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Json<User>, Response> {
    match user_service.get_profile(auth_user.user_id).await {
        Ok(user) => Ok(Json(user)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for updating the caller's profile
///
/// A new budget limit recomputes the caller's stored percentages.
#[utoipa::path(
    put,
    path = "/api/user/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = User),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "users"
)]
pub async fn update_profile_handler(
    State(user_service): State<Arc<dyn UserService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<User>, Response> {
    if let Err(errors) = request.validate() {
        return Err(validation_error(&errors));
    }

    match user_service
        .update_profile(auth_user.user_id, request)
        .await
    {
        Ok(user) => Ok(Json(user)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for listing every user (admin only)
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users", body = Vec<User>),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "users"
)]
pub async fn list_users_handler(
    State(user_service): State<Arc<dyn UserService>>,
) -> Result<Json<Vec<User>>, Response> {
    match user_service.list_users().await {
        Ok(users) => Ok(Json(users)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for editing a user (admin only)
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = AdminUpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "users"
)]
pub async fn update_user_handler(
    State(user_service): State<Arc<dyn UserService>>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<AdminUpdateUserRequest>,
) -> Result<Json<User>, Response> {
    if let Err(errors) = request.validate() {
        return Err(validation_error(&errors));
    }

    match user_service.update_user(user_id, request).await {
        Ok(user) => Ok(Json(user)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for deleting a user and their entries (admin only)
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Admin tried to delete their own account", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "users"
)]
pub async fn delete_user_handler(
    State(user_service): State<Arc<dyn UserService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, Response> {
    match user_service.delete_user(auth_user.actor(), user_id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(e.into_response()),
    }
}
