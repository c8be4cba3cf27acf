use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{error, info};
use uuid::Uuid;

use crate::models::budget::{BudgetEntry, CreateBudgetEntryRequest, UpdateBudgetEntryRequest};
use crate::models::notification::NotificationKind;
use crate::models::user::Actor;
use crate::repositories::RepositoryError;
use crate::repositories::budget_repository::{BudgetRepository, EntryFilters};
use crate::repositories::user_repository::UserRepository;
use crate::services::notification_service::{EntryEvent, NotificationError, NotificationSink};
use crate::services::recalculator::{
    RecalcError, Recalculator, entry_percentage, round2, usable_limit,
};
use crate::validation::MAX_PRICE;

/// Budget service errors
#[derive(Debug, thiserror::Error)]
pub enum BudgetError {
    #[error("Invalid amount: price must be between 0.01 and 999999999999.99")]
    InvalidAmount,

    #[error("Expense description must not be blank")]
    InvalidExpense,

    #[error("Budget entry not found")]
    EntryNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<RepositoryError> for BudgetError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound => BudgetError::EntryNotFound,
            RepositoryError::DatabaseError(msg) => BudgetError::DatabaseError(msg),
            RepositoryError::ConstraintViolation(msg) => BudgetError::DatabaseError(msg),
        }
    }
}

impl From<RecalcError> for BudgetError {
    fn from(error: RecalcError) -> Self {
        match error {
            RecalcError::UserNotFound => BudgetError::UserNotFound,
            RecalcError::InvalidConfiguration(msg) => BudgetError::InvalidConfiguration(msg),
            RecalcError::DatabaseError(msg) => BudgetError::DatabaseError(msg),
        }
    }
}

impl From<NotificationError> for BudgetError {
    fn from(error: NotificationError) -> Self {
        match error {
            NotificationError::DatabaseError(msg) => BudgetError::DatabaseError(msg),
        }
    }
}

/// Positive once rounded to cents, and small enough to store
fn is_valid_price(price: Decimal) -> bool {
    round2(price) > Decimal::ZERO && price <= MAX_PRICE
}

/// Trait defining budget entry operations
#[async_trait]
pub trait BudgetService: Send + Sync {
    /// Record a new expense for `user_id`
    async fn add_entry(
        &self,
        user_id: Uuid,
        request: CreateBudgetEntryRequest,
    ) -> Result<BudgetEntry, BudgetError>;

    /// Entries visible to the actor: all of them for admins, own ones otherwise
    async fn list_entries(
        &self,
        actor: Actor,
        date: Option<NaiveDate>,
    ) -> Result<Vec<BudgetEntry>, BudgetError>;

    /// Patch an entry the actor may see
    async fn update_entry(
        &self,
        actor: Actor,
        entry_id: Uuid,
        request: UpdateBudgetEntryRequest,
    ) -> Result<BudgetEntry, BudgetError>;

    /// Delete an entry the actor may see
    async fn delete_entry(&self, actor: Actor, entry_id: Uuid) -> Result<(), BudgetError>;
}

/// Implementation of BudgetService
///
/// Every mutation holds the entry owner's lock from the first read of the
/// owner's entries until the owner's percentages are recomputed. An admin
/// update or delete then releases that lock and recomputes every user, one
/// lock at a time; that walk is O(users × entries).
pub struct BudgetServiceImpl {
    budget_repository: Arc<dyn BudgetRepository>,
    user_repository: Arc<dyn UserRepository>,
    recalculator: Arc<Recalculator>,
    notification_sink: Arc<dyn NotificationSink>,
}

impl BudgetServiceImpl {
    pub fn new(
        budget_repository: Arc<dyn BudgetRepository>,
        user_repository: Arc<dyn UserRepository>,
        recalculator: Arc<Recalculator>,
        notification_sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            budget_repository,
            user_repository,
            recalculator,
            notification_sink,
        }
    }

    /// Load an entry, hiding entries a non-admin does not own
    async fn find_visible(&self, actor: Actor, entry_id: Uuid) -> Result<BudgetEntry, BudgetError> {
        let entry = self
            .budget_repository
            .find_by_id(entry_id)
            .await?
            .ok_or(BudgetError::EntryNotFound)?;

        if !actor.is_admin() && entry.user_id != actor.user_id {
            return Err(BudgetError::EntryNotFound);
        }
        Ok(entry)
    }

    /// Recompute after an update or delete. The owner is recomputed under
    /// `guard`; for admins the guard is released before walking every user.
    async fn recompute_after_change(
        &self,
        actor: Actor,
        owner_id: Uuid,
        guard: OwnedMutexGuard<()>,
    ) -> Result<(), BudgetError> {
        self.recalculator.recompute_locked(owner_id).await?;
        drop(guard);

        if actor.is_admin() {
            self.recalculator.recompute_all().await?;
        }
        Ok(())
    }

    async fn emit(&self, event: EntryEvent) -> Result<(), BudgetError> {
        let entry_id = event.entry_id;
        self.notification_sink
            .entry_changed(event)
            .await
            .map_err(|e| {
                error!(%entry_id, error = %e, "failed to record notification after entry write");
                BudgetError::from(e)
            })?;
        Ok(())
    }

    async fn reload(&self, entry_id: Uuid) -> Result<BudgetEntry, BudgetError> {
        self.budget_repository
            .find_by_id(entry_id)
            .await?
            .ok_or(BudgetError::EntryNotFound)
    }
}

#[async_trait]
impl BudgetService for BudgetServiceImpl {
    #[tracing::instrument(skip(self, request))]
    async fn add_entry(
        &self,
        user_id: Uuid,
        request: CreateBudgetEntryRequest,
    ) -> Result<BudgetEntry, BudgetError> {
        if !is_valid_price(request.price) {
            return Err(BudgetError::InvalidAmount);
        }
        if request.expense.trim().is_empty() {
            return Err(BudgetError::InvalidExpense);
        }

        let _guard = self.recalculator.locks().acquire(user_id).await;

        let user = self
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or(BudgetError::UserNotFound)?;
        let limit = usable_limit(&user)?;

        let price = round2(request.price);
        let existing = self.budget_repository.find_by_user_ordered(user_id).await?;
        let prior = existing
            .last()
            .map(|e| e.total_expenditure)
            .unwrap_or(Decimal::ZERO);

        let now = Utc::now();
        let entry = BudgetEntry {
            id: Uuid::new_v4(),
            user_id,
            date: request.date,
            expense: request.expense.trim().to_string(),
            price,
            total_expenditure: round2(prior + entry_percentage(price, limit)?),
            created_at: now,
            updated_at: now,
        };

        let created = self.budget_repository.create(entry).await?;

        self.emit(EntryEvent {
            kind: NotificationKind::Added,
            entry_id: created.id,
            expense: created.expense.clone(),
            owner_id: user_id,
            actor: Actor::new(user_id, user.role),
        })
        .await?;

        // The provisional value assumes the new entry is last; an entry dated
        // earlier than existing ones shifts every later total.
        self.recalculator.recompute_locked(user_id).await?;

        info!(entry_id = %created.id, %user_id, "budget entry added");
        self.reload(created.id).await
    }

    async fn list_entries(
        &self,
        actor: Actor,
        date: Option<NaiveDate>,
    ) -> Result<Vec<BudgetEntry>, BudgetError> {
        let filters = EntryFilters {
            user_id: (!actor.is_admin()).then_some(actor.user_id),
            date,
        };

        Ok(self.budget_repository.find_all(filters).await?)
    }

    #[tracing::instrument(skip(self, request))]
    async fn update_entry(
        &self,
        actor: Actor,
        entry_id: Uuid,
        request: UpdateBudgetEntryRequest,
    ) -> Result<BudgetEntry, BudgetError> {
        // Validate fields before anything is written
        if request.price.is_some_and(|price| !is_valid_price(price)) {
            return Err(BudgetError::InvalidAmount);
        }
        if let Some(expense) = &request.expense {
            if expense.trim().is_empty() {
                return Err(BudgetError::InvalidExpense);
            }
        }

        let owner_id = self.find_visible(actor, entry_id).await?.user_id;
        let guard = self.recalculator.locks().acquire(owner_id).await;

        // Re-read under the lock; the entry may have changed or gone meanwhile
        let existing = self.find_visible(actor, entry_id).await?;

        let updated = BudgetEntry {
            expense: request
                .expense
                .map(|e| e.trim().to_string())
                .unwrap_or(existing.expense),
            price: request.price.map(round2).unwrap_or(existing.price),
            date: request.date.unwrap_or(existing.date),
            updated_at: Utc::now(),
            ..existing
        };

        let saved = self.budget_repository.update(updated).await?;

        self.emit(EntryEvent {
            kind: NotificationKind::Updated,
            entry_id: saved.id,
            expense: saved.expense.clone(),
            owner_id,
            actor,
        })
        .await?;

        self.recompute_after_change(actor, owner_id, guard).await?;

        info!(%entry_id, %owner_id, actor_id = %actor.user_id, "budget entry updated");
        self.reload(entry_id).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_entry(&self, actor: Actor, entry_id: Uuid) -> Result<(), BudgetError> {
        let owner_id = self.find_visible(actor, entry_id).await?.user_id;
        let guard = self.recalculator.locks().acquire(owner_id).await;

        let existing = self.find_visible(actor, entry_id).await?;
        self.budget_repository.delete(entry_id).await?;

        self.emit(EntryEvent {
            kind: NotificationKind::Deleted,
            entry_id,
            expense: existing.expense,
            owner_id,
            actor,
        })
        .await?;

        self.recompute_after_change(actor, owner_id, guard).await?;

        info!(%entry_id, %owner_id, actor_id = %actor.user_id, "budget entry deleted");
        Ok(())
    }
}
