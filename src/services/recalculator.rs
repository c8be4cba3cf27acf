//! Cumulative expenditure percentages.
//!
//! Every entry stores the share of its owner's budget limit consumed by that
//! entry and all entries before it. "Before" is the recomputation order:
//! ascending date, then creation time, then id. Each entry's share and each
//! running total are rounded half-up to two decimal places as they are
//! produced, so a full recompute and an incremental one agree exactly.

use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::user::User;
use crate::repositories::RepositoryError;
use crate::repositories::budget_repository::BudgetRepository;
use crate::repositories::user_repository::UserRepository;

/// Recalculation errors
#[derive(Debug, thiserror::Error)]
pub enum RecalcError {
    #[error("User not found")]
    UserNotFound,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<RepositoryError> for RecalcError {
    fn from(error: RepositoryError) -> Self {
        RecalcError::DatabaseError(error.to_string())
    }
}

/// Round half-up to two decimal places
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn out_of_range(price: Decimal, limit: Decimal) -> RecalcError {
    RecalcError::InvalidConfiguration(format!(
        "price {} against limit {} is out of range",
        price, limit
    ))
}

/// Share of `limit` taken by `price`, in percent, rounded to two places
pub fn entry_percentage(price: Decimal, limit: Decimal) -> Result<Decimal, RecalcError> {
    price
        .checked_div(limit)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(round2)
        .ok_or_else(|| out_of_range(price, limit))
}

/// Running totals of the per-entry percentages, one per price, in input order
pub fn cumulative_percentages<I>(limit: Decimal, prices: I) -> Result<Vec<Decimal>, RecalcError>
where
    I: IntoIterator<Item = Decimal>,
{
    let mut running = Decimal::ZERO;
    prices
        .into_iter()
        .map(|price| {
            let share = entry_percentage(price, limit)?;
            running = round2(
                running
                    .checked_add(share)
                    .ok_or_else(|| out_of_range(price, limit))?,
            );
            Ok(running)
        })
        .collect()
}

/// The user's budget limit, if it can be divided by
pub fn usable_limit(user: &User) -> Result<Decimal, RecalcError> {
    match user.budget_limit {
        Some(limit) if limit > Decimal::ZERO => Ok(limit),
        Some(limit) => Err(RecalcError::InvalidConfiguration(format!(
            "budget limit of user {} is {}",
            user.id, limit
        ))),
        None => Err(RecalcError::InvalidConfiguration(format!(
            "user {} has no budget limit",
            user.id
        ))),
    }
}

/// One async mutex per user, created on first use.
///
/// Holding a user's guard serializes every read-modify-write of that user's
/// entry set without blocking other users.
#[derive(Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, user_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(user_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Drop a user's lock from the table unless someone still holds or waits on it
    pub fn forget(&self, user_id: Uuid) {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if locks
            .get(&user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&user_id);
        }
    }

    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Re-derives and persists `total_expenditure` for a user's entries
pub struct Recalculator {
    user_repository: Arc<dyn UserRepository>,
    budget_repository: Arc<dyn BudgetRepository>,
    locks: Arc<UserLocks>,
}

impl Recalculator {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        budget_repository: Arc<dyn BudgetRepository>,
        locks: Arc<UserLocks>,
    ) -> Self {
        Self {
            user_repository,
            budget_repository,
            locks,
        }
    }

    pub fn locks(&self) -> &UserLocks {
        &self.locks
    }

    /// Recompute one user's entries, taking that user's lock.
    ///
    /// Returns the number of entries whose stored value changed.
    pub async fn recompute(&self, user_id: Uuid) -> Result<usize, RecalcError> {
        let _guard = self.locks.acquire(user_id).await;
        self.recompute_locked(user_id).await
    }

    /// Recompute one user's entries. The caller must hold the user's lock.
    #[tracing::instrument(skip(self))]
    pub async fn recompute_locked(&self, user_id: Uuid) -> Result<usize, RecalcError> {
        let entries = self.budget_repository.find_by_user_ordered(user_id).await?;
        if entries.is_empty() {
            return Ok(0);
        }

        let user = self
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or(RecalcError::UserNotFound)?;
        let limit = usable_limit(&user)?;

        let totals = cumulative_percentages(limit, entries.iter().map(|e| e.price))?;
        let changed: Vec<(Uuid, Decimal)> = entries
            .iter()
            .zip(totals)
            .filter(|(entry, total)| entry.total_expenditure != *total)
            .map(|(entry, total)| (entry.id, total))
            .collect();

        if !changed.is_empty() {
            self.budget_repository
                .update_total_expenditures(&changed)
                .await?;
        }

        debug!(
            %user_id,
            entries = entries.len(),
            changed = changed.len(),
            "recomputed expenditure percentages"
        );
        Ok(changed.len())
    }

    /// Recompute every user in the system, one user lock at a time.
    ///
    /// The caller must not hold any user lock: the walk takes each one in
    /// turn, so a held lock would deadlock against a concurrent walk. Users
    /// that have entries but no usable budget limit are skipped with a warning.
    #[tracing::instrument(skip(self))]
    pub async fn recompute_all(&self) -> Result<usize, RecalcError> {
        let users = self.user_repository.find_all().await?;
        let mut changed = 0;

        for user in &users {
            match self.recompute(user.id).await {
                Ok(count) => changed += count,
                Err(RecalcError::InvalidConfiguration(reason)) => {
                    warn!(user_id = %user.id, %reason, "skipping recompute");
                }
                // Deleted between listing and recomputing
                Err(RecalcError::UserNotFound) => {}
                Err(e) => return Err(e),
            }
        }

        info!(users = users.len(), changed, "recomputed all users");
        Ok(changed)
    }
}
