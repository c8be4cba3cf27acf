use async_trait::async_trait;
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::models::auth::{AuthToken, Claims, LoginRequest, LoginResponse, SignupResponse};
use crate::models::user::{Actor, Role, SignupRequest, User};
use crate::repositories::RepositoryError;
use crate::repositories::user_repository::{NewUser, UserRepository};

/// Lifetime of a regular session token
const SESSION_HOURS: i64 = 24;
/// Lifetime of a "remember me" token
const REMEMBER_ME_DAYS: i64 = 7;

/// Authentication service errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Trait defining authentication service operations
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new user and sign them in
    async fn register(&self, request: SignupRequest) -> Result<SignupResponse, AuthError>;

    /// Authenticate user and return JWT token
    async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AuthError>;

    /// Validate JWT token and return the identity it carries
    async fn validate_token(&self, token: &str) -> Result<Actor, AuthError>;
}

/// Implementation of AuthService
pub struct AuthServiceImpl {
    user_repository: Arc<dyn UserRepository>,
    jwt_secret: String,
    admin_email: Option<String>,
}

impl AuthServiceImpl {
    pub fn new(user_repository: Arc<dyn UserRepository>, jwt_secret: String) -> Self {
        Self {
            user_repository,
            jwt_secret,
            admin_email: None,
        }
    }

    /// Accounts registered with this email are created as admins
    pub fn with_admin_email(mut self, admin_email: Option<String>) -> Self {
        self.admin_email = admin_email;
        self
    }

    /// Hash a password using bcrypt
    fn hash_password(password: &str) -> Result<String, AuthError> {
        hash(password, DEFAULT_COST)
            .map_err(|e| AuthError::DatabaseError(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against a hash
    fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
        verify(password, hash)
            .map_err(|e| AuthError::DatabaseError(format!("Password verification failed: {}", e)))
    }

    /// Generate a JWT token for a user
    fn generate_jwt(&self, user: &User, lifetime: Duration) -> Result<AuthToken, AuthError> {
        let expiration = Utc::now() + lifetime;

        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role.as_str().to_string(),
            exp: expiration.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::DatabaseError(format!("Token generation failed: {}", e)))?;

        Ok(AuthToken {
            token,
            expires_at: expiration,
        })
    }

    /// Decode and validate a JWT token
    fn decode_jwt(&self, token: &str) -> Result<Actor, AuthError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;

        let user_id =
            Uuid::parse_str(&token_data.claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let role = Role::from_claim(&token_data.claims.role).ok_or(AuthError::InvalidToken)?;

        Ok(Actor::new(user_id, role))
    }
}

#[async_trait]
impl AuthService for AuthServiceImpl {
    async fn register(&self, request: SignupRequest) -> Result<SignupResponse, AuthError> {
        // Hash the password
        let password_hash = Self::hash_password(&request.password)?;

        let role = match &self.admin_email {
            Some(admin_email) if admin_email.eq_ignore_ascii_case(&request.email) => Role::Admin,
            _ => Role::User,
        };

        let user = self
            .user_repository
            .create(NewUser {
                first_name: request.first_name,
                last_name: request.last_name,
                email: request.email,
                password_hash,
                role,
                budget_limit: Some(request.budget_limit),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::ConstraintViolation(_) => AuthError::DuplicateEmail,
                RepositoryError::DatabaseError(msg) => AuthError::DatabaseError(msg),
                RepositoryError::NotFound => {
                    AuthError::DatabaseError("Unexpected error".to_string())
                }
            })?;

        info!(user_id = %user.id, role = user.role.as_str(), "user registered");

        let token = self.generate_jwt(&user, Duration::hours(SESSION_HOURS))?;
        Ok(SignupResponse {
            token: token.token,
            user,
        })
    }

    async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AuthError> {
        // Find user by email
        let user = self
            .user_repository
            .find_by_email(&request.email)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        // Verify password
        let is_valid = Self::verify_password(&request.password, &user.password_hash)?;
        if !is_valid {
            return Err(AuthError::InvalidCredentials);
        }

        let lifetime = if request.remember_me.unwrap_or(false) {
            Duration::days(REMEMBER_ME_DAYS)
        } else {
            Duration::hours(SESSION_HOURS)
        };

        let token = self.generate_jwt(&user, lifetime)?;
        Ok(LoginResponse {
            token: token.token,
            role: user.role,
            expires_at: token.expires_at,
        })
    }

    async fn validate_token(&self, token: &str) -> Result<Actor, AuthError> {
        self.decode_jwt(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::InMemoryStore;
    use rust_decimal::Decimal;

    fn signup(email: &str) -> SignupRequest {
        SignupRequest {
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
            budget_limit: Decimal::from(50_000),
        }
    }

    fn login(email: &str, password: &str, remember_me: bool) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            remember_me: Some(remember_me),
        }
    }

    fn service(secret: &str) -> AuthServiceImpl {
        AuthServiceImpl::new(Arc::new(InMemoryStore::new()), secret.to_string())
    }

    #[tokio::test]
    async fn test_register_success() {
        let service = service("test_secret");

        let response = service.register(signup("test@example.com")).await.unwrap();

        assert_eq!(response.user.first_name, "Test");
        assert_eq!(response.user.email, "test@example.com");
        assert_eq!(response.user.role, Role::User);
        assert_eq!(response.user.budget_limit, Some(Decimal::from(50_000)));
        assert!(!response.token.is_empty());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let service = service("test_secret");

        // First registration should succeed
        service.register(signup("test@example.com")).await.unwrap();

        // Second registration with same email should fail
        let result = service.register(signup("test@example.com")).await;
        assert!(matches!(result, Err(AuthError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn test_register_bootstrap_admin() {
        let service =
            service("test_secret").with_admin_email(Some("Admin@Example.com".to_string()));

        let admin = service.register(signup("admin@example.com")).await.unwrap();
        let user = service.register(signup("user@example.com")).await.unwrap();

        assert_eq!(admin.user.role, Role::Admin);
        assert_eq!(user.user.role, Role::User);
    }

    #[tokio::test]
    async fn test_login_returns_role_and_valid_token() {
        let service = service("test_secret");
        let registered = service.register(signup("test@example.com")).await.unwrap();

        let response = service
            .login(login("test@example.com", "password123", false))
            .await
            .unwrap();
        assert_eq!(response.role, Role::User);

        let actor = service.validate_token(&response.token).await.unwrap();
        assert_eq!(actor.user_id, registered.user.id);
        assert_eq!(actor.role, Role::User);
    }

    #[tokio::test]
    async fn test_login_invalid_credentials() {
        let service = service("test_secret");
        service.register(signup("test@example.com")).await.unwrap();

        // Try to login with wrong password
        let result = service
            .login(login("test@example.com", "wrongpassword", false))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));

        let result = service
            .login(login("nobody@example.com", "password123", false))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_token_expiration_depends_on_remember_me() {
        let service = service("test_secret");
        service.register(signup("test@example.com")).await.unwrap();

        let short = service
            .login(login("test@example.com", "password123", false))
            .await
            .unwrap();
        let long = service
            .login(login("test@example.com", "password123", true))
            .await
            .unwrap();

        let now = Utc::now();
        let short_diff = (short.expires_at - (now + Duration::hours(24)))
            .num_seconds()
            .abs();
        let long_diff = (long.expires_at - (now + Duration::days(7)))
            .num_seconds()
            .abs();
        assert!(short_diff < 60, "diff: {} seconds", short_diff);
        assert!(long_diff < 60, "diff: {} seconds", long_diff);
    }

    #[tokio::test]
    async fn test_token_with_different_secrets_are_invalid() {
        let repo = Arc::new(InMemoryStore::new());
        let service1 = AuthServiceImpl::new(repo.clone(), "secret1".to_string());
        let service2 = AuthServiceImpl::new(repo.clone(), "secret2".to_string());

        let registered = service1.register(signup("test@example.com")).await.unwrap();

        let result = service2.validate_token(&registered.token).await;
        assert!(
            matches!(result, Err(AuthError::InvalidToken)),
            "Token signed with different secret should be invalid"
        );
    }

    #[tokio::test]
    async fn test_expired_token_is_reported_as_expired() {
        let service = service("test_secret");
        let registered = service.register(signup("test@example.com")).await.unwrap();

        // Past the default 60 second leeway
        let expired = service
            .generate_jwt(&registered.user, Duration::minutes(-5))
            .unwrap();

        let result = service.validate_token(&expired.token).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn test_malformed_token_is_rejected() {
        let service = service("test_secret");

        // Test various malformed tokens
        let malformed_tokens = vec![
            "not.a.token",
            "invalid",
            "",
            "header.payload", // Missing signature
            "a.b.c.d",        // Too many parts
        ];

        for token in malformed_tokens {
            let result = service.validate_token(token).await;
            assert!(
                matches!(result, Err(AuthError::InvalidToken)),
                "Malformed token '{}' should be rejected",
                token
            );
        }
    }
}
