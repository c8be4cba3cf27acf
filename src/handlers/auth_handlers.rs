use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::error::{internal_error, validation_error, ErrorResponse};
use crate::middleware::auth_middleware::AuthenticatedUser;
use crate::models::auth::{LoginRequest, LoginResponse, SignupResponse};
use crate::models::user::{Role, SignupRequest};
use crate::services::auth_service::{AuthError, AuthService};

/// Identity echoed back by `GET /api/protected`
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProtectedResponse {
    pub user_id: Uuid,
    pub role: Role,
    pub message: String,
}

/// Convert AuthError to HTTP response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            AuthError::DuplicateEmail => (
                StatusCode::CONFLICT,
                "duplicate_email",
                "Email already exists",
            ),
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                "Invalid email or password",
            ),
            AuthError::InvalidToken => (
                StatusCode::FORBIDDEN,
                "invalid_token",
                "Invalid authentication token",
            ),
            AuthError::TokenExpired => (
                StatusCode::FORBIDDEN,
                "token_expired",
                "Authentication token has expired",
            ),
            AuthError::DatabaseError(ref msg) => return internal_error(msg),
        };

        ErrorResponse::new(error_type, message).into_response_with(status)
    }
}

/// Handler for user signup
///
/// Creates a new account and signs it in.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User successfully registered", body = SignupResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 409, description = "Email already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn signup_handler(
    State(auth_service): State<Arc<dyn AuthService>>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), Response> {
    // Validate request body
    if let Err(errors) = request.validate() {
        return Err(validation_error(&errors));
    }

    match auth_service.register(request).await {
        Ok(response) => Ok((StatusCode::CREATED, Json(response))),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for user login
///
/// Authenticates a user and returns a JWT token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(auth_service): State<Arc<dyn AuthService>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, Response> {
    match auth_service.login(request).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => Err(e.into_response()),
    }
}

/// Echo the identity carried by the caller's token
#[utoipa::path(
    get,
    path = "/api/protected",
    responses(
        (status = 200, description = "Token accepted", body = ProtectedResponse),
        (status = 401, description = "Missing token", body = ErrorResponse),
        (status = 403, description = "Invalid or expired token", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "auth"
)]
pub async fn protected_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Json<ProtectedResponse> {
    Json(ProtectedResponse {
        user_id: auth_user.user_id,
        role: auth_user.role,
        message: "Access granted".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::InMemoryStore;
    use crate::services::auth_service::AuthServiceImpl;
    use rust_decimal::Decimal;

    fn auth_service() -> Arc<dyn AuthService> {
        Arc::new(AuthServiceImpl::new(
            Arc::new(InMemoryStore::new()),
            "test_secret".to_string(),
        ))
    }

    fn signup_request(email: &str) -> SignupRequest {
        SignupRequest {
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
            budget_limit: Decimal::from(50_000),
        }
    }

    fn login_request(password: &str) -> LoginRequest {
        LoginRequest {
            email: "test@example.com".to_string(),
            password: password.to_string(),
            remember_me: None,
        }
    }

    #[tokio::test]
    async fn test_signup_handler_success() {
        let result = signup_handler(
            State(auth_service()),
            Json(signup_request("test@example.com")),
        )
        .await;

        let (status, Json(response)) = result.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(response.user.email, "test@example.com");
        assert!(!response.token.is_empty());
    }

    #[tokio::test]
    async fn test_signup_handler_validation_error() {
        let mut request = signup_request("invalid-email");
        request.budget_limit = Decimal::ZERO;

        let result = signup_handler(State(auth_service()), Json(request)).await;

        let response = result.unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_signup_handler_duplicate_email() {
        let auth_service = auth_service();

        // First registration should succeed
        signup_handler(
            State(auth_service.clone()),
            Json(signup_request("test@example.com")),
        )
        .await
        .unwrap();

        // Second registration with same email should fail
        let result = signup_handler(
            State(auth_service),
            Json(signup_request("test@example.com")),
        )
        .await;
        assert_eq!(result.unwrap_err().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_login_handler_success() {
        let auth_service = auth_service();
        signup_handler(
            State(auth_service.clone()),
            Json(signup_request("test@example.com")),
        )
        .await
        .unwrap();

        let Json(response) = login_handler(State(auth_service), Json(login_request("password123")))
            .await
            .unwrap();

        assert!(!response.token.is_empty());
        assert_eq!(response.role, Role::User);
    }

    #[tokio::test]
    async fn test_login_handler_invalid_credentials() {
        let auth_service = auth_service();
        signup_handler(
            State(auth_service.clone()),
            Json(signup_request("test@example.com")),
        )
        .await
        .unwrap();

        // Try to login with wrong password
        let result = login_handler(State(auth_service), Json(login_request("wrongpassword"))).await;
        assert_eq!(result.unwrap_err().status(), StatusCode::UNAUTHORIZED);
    }
}
