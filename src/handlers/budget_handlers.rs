use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::error::{internal_error, validation_error, ErrorResponse};
use crate::middleware::auth_middleware::AuthenticatedUser;
use crate::models::analysis::{AnalysisQuery, AnalysisWindow, BudgetAnalysis};
use crate::models::budget::{
    BudgetEntry, BudgetQuery, CreateBudgetEntryRequest, UpdateBudgetEntryRequest,
};
use crate::services::analysis_service::{AnalysisError, AnalysisService};
use crate::services::budget_service::{BudgetError, BudgetService};

/// Convert BudgetError to HTTP response
impl IntoResponse for BudgetError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            BudgetError::InvalidAmount => (
                StatusCode::BAD_REQUEST,
                "invalid_amount",
                "Price must be between 0.01 and 999999999999.99",
            ),
            BudgetError::InvalidExpense => (
                StatusCode::BAD_REQUEST,
                "invalid_expense",
                "Expense description must not be blank",
            ),
            BudgetError::EntryNotFound => (
                StatusCode::NOT_FOUND,
                "entry_not_found",
                "Budget entry not found",
            ),
            BudgetError::UserNotFound => (
                StatusCode::NOT_FOUND,
                "user_not_found",
                "User not found",
            ),
            BudgetError::InvalidConfiguration(ref msg) | BudgetError::DatabaseError(ref msg) => {
                return internal_error(msg);
            }
        };

        ErrorResponse::new(error_type, message).into_response_with(status)
    }
}

/// Convert AnalysisError to HTTP response
impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        match self {
            AnalysisError::UserNotFound => ErrorResponse::new("user_not_found", "User not found")
                .into_response_with(StatusCode::NOT_FOUND),
            AnalysisError::DatabaseError(ref msg) => internal_error(msg),
        }
    }
}

/// Handler for recording an expense
///
/// Creates an entry for the authenticated user and recomputes their running percentages.
#[utoipa::path(
    post,
    path = "/api/budget",
    request_body = CreateBudgetEntryRequest,
    responses(
        (status = 201, description = "Budget entry successfully created", body = BudgetEntry),
        (status = 400, description = "Validation error (price out of range, blank expense)", body = ErrorResponse),
        (status = 401, description = "Missing token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "budget"
)]
pub async fn add_entry_handler(
    State(budget_service): State<Arc<dyn BudgetService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateBudgetEntryRequest>,
) -> Result<(StatusCode, Json<BudgetEntry>), Response> {
    if let Err(errors) = request.validate() {
        return Err(validation_error(&errors));
    }

    match budget_service.add_entry(auth_user.user_id, request).await {
        Ok(entry) => Ok((StatusCode::CREATED, Json(entry))),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for listing budget entries
///
/// Admins see every entry, other users their own. Newest first.
#[utoipa::path(
    get,
    path = "/api/budget",
    params(BudgetQuery),
    responses(
        (status = 200, description = "List of budget entries", body = Vec<BudgetEntry>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "budget"
)]
pub async fn list_entries_handler(
    State(budget_service): State<Arc<dyn BudgetService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Query(query): Query<BudgetQuery>,
) -> Result<Json<Vec<BudgetEntry>>, Response> {
    match budget_service
        .list_entries(auth_user.actor(), query.date)
        .await
    {
        Ok(entries) => Ok(Json(entries)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for updating a budget entry
#[utoipa::path(
    put,
    path = "/api/budget/{id}",
    params(
        ("id" = Uuid, Path, description = "Budget entry ID")
    ),
    request_body = UpdateBudgetEntryRequest,
    responses(
        (status = 200, description = "Budget entry successfully updated", body = BudgetEntry),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Entry not found or not owned by caller", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "budget"
)]
pub async fn update_entry_handler(
    State(budget_service): State<Arc<dyn BudgetService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(entry_id): Path<Uuid>,
    Json(request): Json<UpdateBudgetEntryRequest>,
) -> Result<Json<BudgetEntry>, Response> {
    if let Err(errors) = request.validate() {
        return Err(validation_error(&errors));
    }
    if request.is_empty() {
        return Err(ErrorResponse::new("validation_error", "No fields to update")
            .into_response_with(StatusCode::BAD_REQUEST));
    }

    match budget_service
        .update_entry(auth_user.actor(), entry_id, request)
        .await
    {
        Ok(entry) => Ok(Json(entry)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for deleting a budget entry
#[utoipa::path(
    delete,
    path = "/api/budget/{id}",
    params(
        ("id" = Uuid, Path, description = "Budget entry ID")
    ),
    responses(
        (status = 204, description = "Budget entry successfully deleted"),
        (status = 404, description = "Entry not found or not owned by caller", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "budget"
)]
pub async fn delete_entry_handler(
    State(budget_service): State<Arc<dyn BudgetService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Path(entry_id): Path<Uuid>,
) -> Result<StatusCode, Response> {
    match budget_service
        .delete_entry(auth_user.actor(), entry_id)
        .await
    {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for the spend-vs-limit chart
///
/// Sums the caller's spending per day over the requested window.
#[utoipa::path(
    get,
    path = "/api/budget/analysis",
    params(AnalysisQuery),
    responses(
        (status = 200, description = "Daily totals inside the window", body = BudgetAnalysis),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "budget"
)]
pub async fn analysis_handler(
    State(analysis_service): State<Arc<dyn AnalysisService>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<BudgetAnalysis>, Response> {
    let window = AnalysisWindow::from_filter(query.filter.as_deref());
    let today = Utc::now().date_naive();

    analysis_service
        .summarize(auth_user.user_id, window, today)
        .await
        .map(|summary| Json(summary.into()))
        .map_err(IntoResponse::into_response)
}
