use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::models::user::{Actor, AdminUpdateUserRequest, UpdateProfileRequest, User};
use crate::repositories::RepositoryError;
use crate::repositories::user_repository::UserRepository;
use crate::services::notification_service::{NotificationError, NotificationSink};
use crate::services::recalculator::{RecalcError, Recalculator};

/// User management errors
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("User not found")]
    UserNotFound,

    #[error("Admins cannot delete their own account")]
    CannotDeleteSelf,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<RepositoryError> for UserError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound => UserError::UserNotFound,
            RepositoryError::DatabaseError(msg) => UserError::DatabaseError(msg),
            RepositoryError::ConstraintViolation(msg) => UserError::DatabaseError(msg),
        }
    }
}

impl From<RecalcError> for UserError {
    fn from(error: RecalcError) -> Self {
        match error {
            RecalcError::UserNotFound => UserError::UserNotFound,
            RecalcError::InvalidConfiguration(msg) => UserError::InvalidConfiguration(msg),
            RecalcError::DatabaseError(msg) => UserError::DatabaseError(msg),
        }
    }
}

impl From<NotificationError> for UserError {
    fn from(error: NotificationError) -> Self {
        match error {
            NotificationError::DatabaseError(msg) => UserError::DatabaseError(msg),
        }
    }
}

/// Trait defining profile and account management operations
#[async_trait]
pub trait UserService: Send + Sync {
    async fn get_profile(&self, user_id: Uuid) -> Result<User, UserError>;

    /// Update the caller's own profile; a new budget limit recomputes their entries
    async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<User, UserError>;

    async fn list_users(&self) -> Result<Vec<User>, UserError>;

    async fn update_user(
        &self,
        user_id: Uuid,
        request: AdminUpdateUserRequest,
    ) -> Result<User, UserError>;

    /// Delete another account and its entries, telling the acting admin
    async fn delete_user(&self, admin: Actor, user_id: Uuid) -> Result<(), UserError>;
}

pub struct UserServiceImpl {
    user_repository: Arc<dyn UserRepository>,
    recalculator: Arc<Recalculator>,
    notification_sink: Arc<dyn NotificationSink>,
}

impl UserServiceImpl {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        recalculator: Arc<Recalculator>,
        notification_sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            user_repository,
            recalculator,
            notification_sink,
        }
    }

    async fn find(&self, user_id: Uuid) -> Result<User, UserError> {
        self.user_repository
            .find_by_id(user_id)
            .await?
            .ok_or(UserError::UserNotFound)
    }
}

#[async_trait]
impl UserService for UserServiceImpl {
    async fn get_profile(&self, user_id: Uuid) -> Result<User, UserError> {
        self.find(user_id).await
    }

    #[tracing::instrument(skip(self, request))]
    async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<User, UserError> {
        // Entry totals must not be recomputed against a limit that is mid-change
        let _guard = self.recalculator.locks().acquire(user_id).await;

        let existing = self.find(user_id).await?;
        let limit_changed = request
            .budget_limit
            .is_some_and(|limit| existing.budget_limit != Some(limit));

        let user = User {
            first_name: request
                .first_name
                .map(|n| n.trim().to_string())
                .unwrap_or(existing.first_name),
            last_name: request
                .last_name
                .map(|n| n.trim().to_string())
                .unwrap_or(existing.last_name),
            budget_limit: request.budget_limit.or(existing.budget_limit),
            ..existing
        };
        let saved = self.user_repository.update(user).await?;

        if limit_changed {
            let changed = self.recalculator.recompute_locked(user_id).await?;
            info!(%user_id, changed, "budget limit changed");
        }

        Ok(saved)
    }

    async fn list_users(&self) -> Result<Vec<User>, UserError> {
        Ok(self.user_repository.find_all().await?)
    }

    #[tracing::instrument(skip(self, request))]
    async fn update_user(
        &self,
        user_id: Uuid,
        request: AdminUpdateUserRequest,
    ) -> Result<User, UserError> {
        let existing = self.find(user_id).await?;

        let user = User {
            first_name: request
                .first_name
                .map(|n| n.trim().to_string())
                .unwrap_or(existing.first_name),
            last_name: request
                .last_name
                .map(|n| n.trim().to_string())
                .unwrap_or(existing.last_name),
            role: request.role.unwrap_or(existing.role),
            ..existing
        };

        let saved = self.user_repository.update(user).await?;
        info!(%user_id, role = saved.role.as_str(), "user updated by admin");
        Ok(saved)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_user(&self, admin: Actor, user_id: Uuid) -> Result<(), UserError> {
        // The notification below is addressed to the admin's own row
        if admin.user_id == user_id {
            return Err(UserError::CannotDeleteSelf);
        }

        let guard = self.recalculator.locks().acquire(user_id).await;

        let user = self.find(user_id).await?;
        self.user_repository.delete(user_id).await?;
        self.notification_sink
            .user_deleted(admin.user_id, &user)
            .await?;

        drop(guard);
        self.recalculator.locks().forget(user_id);

        info!(%user_id, admin_id = %admin.user_id, "user deleted");
        Ok(())
    }
}
