//! Service wiring, router and OpenAPI document.

use axum::{
    Router,
    extract::FromRef,
    middleware,
    routing::{get, post, put},
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::auth_handlers::{
    ProtectedResponse, login_handler, protected_handler, signup_handler,
};
use crate::handlers::budget_handlers::{
    add_entry_handler, analysis_handler, delete_entry_handler, list_entries_handler,
    update_entry_handler,
};
use crate::handlers::error::ErrorResponse;
use crate::handlers::notification_handlers::{list_notifications_handler, mark_all_seen_handler};
use crate::handlers::user_handlers::{
    delete_user_handler, get_profile_handler, list_users_handler, update_profile_handler,
    update_user_handler,
};
use crate::middleware::auth_middleware::{auth_middleware, require_admin};
use crate::models::{
    AdminUpdateUserRequest, BudgetAnalysis, BudgetEntry, CreateBudgetEntryRequest, LoginRequest,
    LoginResponse, MarkSeenResponse, Notification, NotificationKind, Role, SignupRequest,
    SignupResponse, UpdateBudgetEntryRequest, UpdateProfileRequest, User,
};
use crate::repositories::budget_repository::{BudgetRepository, PostgresBudgetRepository};
use crate::repositories::memory::InMemoryStore;
use crate::repositories::notification_repository::{
    NotificationRepository, PostgresNotificationRepository,
};
use crate::repositories::user_repository::{PostgresUserRepository, UserRepository};
use crate::services::analysis_service::{AnalysisService, AnalysisServiceImpl};
use crate::services::auth_service::{AuthService, AuthServiceImpl};
use crate::services::budget_service::{BudgetService, BudgetServiceImpl};
use crate::services::notification_service::{NotificationService, NotificationServiceImpl};
use crate::services::recalculator::{Recalculator, UserLocks};
use crate::services::user_service::{UserService, UserServiceImpl};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::auth_handlers::signup_handler,
        crate::handlers::auth_handlers::login_handler,
        crate::handlers::auth_handlers::protected_handler,
        crate::handlers::budget_handlers::add_entry_handler,
        crate::handlers::budget_handlers::list_entries_handler,
        crate::handlers::budget_handlers::update_entry_handler,
        crate::handlers::budget_handlers::delete_entry_handler,
        crate::handlers::budget_handlers::analysis_handler,
        crate::handlers::notification_handlers::list_notifications_handler,
        crate::handlers::notification_handlers::mark_all_seen_handler,
        crate::handlers::user_handlers::get_profile_handler,
        crate::handlers::user_handlers::update_profile_handler,
        crate::handlers::user_handlers::list_users_handler,
        crate::handlers::user_handlers::update_user_handler,
        crate::handlers::user_handlers::delete_user_handler,
    ),
    components(
        schemas(
            User, Role, SignupRequest, SignupResponse, LoginRequest, LoginResponse,
            ProtectedResponse, BudgetEntry, CreateBudgetEntryRequest, UpdateBudgetEntryRequest,
            BudgetAnalysis, Notification, NotificationKind, MarkSeenResponse,
            UpdateProfileRequest, AdminUpdateUserRequest, ErrorResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication endpoints"),
        (name = "budget", description = "Budget entries and analysis"),
        (name = "notifications", description = "Entry change notifications"),
        (name = "users", description = "Profile and user administration")
    ),
    info(
        title = "Budget Tracker API",
        version = "0.1.0",
        description = "REST API for tracking personal spending against a budget limit",
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Storage backends the services are built on
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub budget: Arc<dyn BudgetRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            budget: Arc::new(PostgresBudgetRepository::new(pool.clone())),
            notifications: Arc::new(PostgresNotificationRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            users: store.clone(),
            budget: store.clone(),
            notifications: store,
        }
    }
}

/// Shared handler state; each handler extracts the one service it uses
#[derive(Clone, FromRef)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthService>,
    pub budget_service: Arc<dyn BudgetService>,
    pub notification_service: Arc<dyn NotificationService>,
    pub analysis_service: Arc<dyn AnalysisService>,
    pub user_service: Arc<dyn UserService>,
}

impl AppState {
    pub fn new(repositories: Repositories, jwt_secret: String, admin_email: Option<String>) -> Self {
        let Repositories {
            users,
            budget,
            notifications,
        } = repositories;

        let recalculator = Arc::new(Recalculator::new(
            users.clone(),
            budget.clone(),
            Arc::new(UserLocks::new()),
        ));
        let notification_service = Arc::new(NotificationServiceImpl::new(notifications));

        Self {
            auth_service: Arc::new(
                AuthServiceImpl::new(users.clone(), jwt_secret).with_admin_email(admin_email),
            ),
            budget_service: Arc::new(BudgetServiceImpl::new(
                budget.clone(),
                users.clone(),
                recalculator.clone(),
                notification_service.clone(),
            )),
            analysis_service: Arc::new(AnalysisServiceImpl::new(budget, users.clone())),
            user_service: Arc::new(UserServiceImpl::new(
                users,
                recalculator,
                notification_service.clone(),
            )),
            notification_service,
        }
    }
}

/// Build the full application router
pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/api/users", get(list_users_handler))
        .route(
            "/api/users/{id}",
            put(update_user_handler).delete(delete_user_handler),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let protected_routes = Router::new()
        .route("/api/protected", get(protected_handler))
        .route(
            "/api/budget",
            post(add_entry_handler).get(list_entries_handler),
        )
        .route("/api/budget/analysis", get(analysis_handler))
        .route(
            "/api/budget/{id}",
            put(update_entry_handler).delete(delete_entry_handler),
        )
        .route("/api/notifications", get(list_notifications_handler))
        .route("/api/notifications/all/seen", put(mark_all_seen_handler))
        .route(
            "/api/user/profile",
            get(get_profile_handler).put(update_profile_handler),
        )
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .route("/api/auth/signup", post(signup_handler))
        .route("/api/auth/login", post(login_handler))
        .merge(protected_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
