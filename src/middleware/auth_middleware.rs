use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::models::user::{Actor, Role};
use crate::services::auth_service::{AuthError as TokenError, AuthService};
use crate::services::user_service::{UserError, UserService};

/// Extension type storing the authenticated identity of a request
#[derive(Clone, Copy, Debug)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

/// Auth middleware that validates JWT tokens and adds the caller to request extensions
pub async fn auth_middleware(
    State(auth_service): State<Arc<dyn AuthService>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    // Extract Authorization header
    let auth_header = headers
        .get("Authorization")
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidTokenFormat)?;

    // Parse Bearer token
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidTokenFormat)?;

    let actor = auth_service.validate_token(token).await.map_err(|e| {
        debug!(error = %e, "rejected bearer token");
        match e {
            TokenError::TokenExpired => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        }
    })?;

    request.extensions_mut().insert(AuthenticatedUser {
        user_id: actor.user_id,
        role: actor.role,
    });

    Ok(next.run(request).await)
}

/// Rejects callers whose stored account is not an admin. Runs after `auth_middleware`.
///
/// The role in the token is only a hint: a demoted or deleted admin loses
/// access immediately rather than when the token expires.
pub async fn require_admin(
    State(user_service): State<Arc<dyn UserService>>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let caller = request
        .extensions()
        .get::<AuthenticatedUser>()
        .copied()
        .ok_or_else(|| AuthError::Forbidden.into_response())?;

    match user_service.get_profile(caller.user_id).await {
        Ok(user) if user.role.is_admin() => Ok(next.run(request).await),
        Ok(_) | Err(UserError::UserNotFound) => {
            debug!(user_id = %caller.user_id, claimed = caller.role.as_str(), "admin access denied");
            Err(AuthError::Forbidden.into_response())
        }
        Err(e) => Err(e.into_response()),
    }
}

/// Auth middleware errors
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidTokenFormat,
    InvalidToken,
    TokenExpired,
    Forbidden,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AuthError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Missing authorization token",
            ),
            AuthError::InvalidTokenFormat => (
                StatusCode::FORBIDDEN,
                "forbidden",
                "Invalid authorization header format. Expected: Bearer <token>",
            ),
            AuthError::InvalidToken => (
                StatusCode::FORBIDDEN,
                "forbidden",
                "Invalid or malformed token",
            ),
            AuthError::TokenExpired => (StatusCode::FORBIDDEN, "forbidden", "Token has expired"),
            AuthError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", "Admin access required"),
        };

        let body = Json(json!({
            "error": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}
