use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::analysis::{AnalysisWindow, BudgetSummary};
use crate::repositories::budget_repository::BudgetRepository;
use crate::repositories::user_repository::UserRepository;

/// Analysis service errors
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("User not found")]
    UserNotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Trait defining read-only spend analysis
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Per-day totals of the user's spending inside `window`, resolved against `today`
    async fn summarize(
        &self,
        user_id: Uuid,
        window: AnalysisWindow,
        today: NaiveDate,
    ) -> Result<BudgetSummary, AnalysisError>;
}

/// Implementation of AnalysisService
pub struct AnalysisServiceImpl {
    budget_repository: Arc<dyn BudgetRepository>,
    user_repository: Arc<dyn UserRepository>,
}

impl AnalysisServiceImpl {
    pub fn new(
        budget_repository: Arc<dyn BudgetRepository>,
        user_repository: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            budget_repository,
            user_repository,
        }
    }
}

#[async_trait]
impl AnalysisService for AnalysisServiceImpl {
    async fn summarize(
        &self,
        user_id: Uuid,
        window: AnalysisWindow,
        today: NaiveDate,
    ) -> Result<BudgetSummary, AnalysisError> {
        let bounds = window.bounds(today);

        let entries = self
            .budget_repository
            .find_in_range(user_id, bounds.start, bounds.end)
            .await
            .map_err(|e| AnalysisError::DatabaseError(e.to_string()))?;

        let user = self
            .user_repository
            .find_by_id(user_id)
            .await
            .map_err(|e| AnalysisError::DatabaseError(e.to_string()))?
            .ok_or(AnalysisError::UserNotFound)?;

        let mut by_day: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
        for entry in &entries {
            *by_day.entry(entry.date).or_insert(Decimal::ZERO) += entry.price;
        }

        let total: Decimal = by_day.values().copied().sum();
        let limit_exceeded = user.budget_limit.is_some_and(|limit| total > limit);

        Ok(BudgetSummary {
            window: bounds,
            daily_totals: by_day.into_iter().collect(),
            total,
            limit_exceeded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::budget::BudgetEntry;
    use crate::models::user::Role;
    use crate::repositories::memory::InMemoryStore;
    use crate::repositories::user_repository::NewUser;
    use chrono::Utc;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn setup(limit: &str) -> (Arc<InMemoryStore>, Uuid) {
        let store = Arc::new(InMemoryStore::new());
        let user = UserRepository::create(
            &*store,
            NewUser {
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                email: "a@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
                budget_limit: Some(Decimal::from_str(limit).unwrap()),
            },
        )
        .await
        .unwrap();
        (store, user.id)
    }

    async fn add(store: &InMemoryStore, user_id: Uuid, on: NaiveDate, price: i64) {
        let now = Utc::now();
        BudgetRepository::create(
            store,
            BudgetEntry {
                id: Uuid::new_v4(),
                user_id,
                date: on,
                expense: "Item".to_string(),
                price: Decimal::from(price),
                total_expenditure: Decimal::ZERO,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_last_month_excludes_current_month() {
        let (store, user_id) = setup("1000").await;
        add(&store, user_id, date(2024, 1, 15), 100).await;
        add(&store, user_id, date(2024, 2, 15), 50).await;
        let service = AnalysisServiceImpl::new(store.clone(), store.clone());

        let summary = service
            .summarize(user_id, AnalysisWindow::LastMonth, date(2024, 2, 20))
            .await
            .unwrap();

        assert_eq!(summary.window.start, date(2024, 1, 1));
        assert_eq!(summary.window.end, date(2024, 2, 1));
        assert_eq!(
            summary.daily_totals,
            vec![(date(2024, 1, 15), Decimal::from(100))]
        );
        assert!(!summary.limit_exceeded);
    }

    #[tokio::test]
    async fn test_sums_per_day_and_flags_exceeded_limit() {
        let (store, user_id) = setup("150").await;
        add(&store, user_id, date(2024, 1, 3), 40).await;
        add(&store, user_id, date(2024, 1, 3), 60).await;
        add(&store, user_id, date(2024, 1, 10), 70).await;
        let service = AnalysisServiceImpl::new(store.clone(), store.clone());

        let summary = service
            .summarize(user_id, AnalysisWindow::LastMonth, date(2024, 2, 1))
            .await
            .unwrap();

        assert_eq!(
            summary.daily_totals,
            vec![
                (date(2024, 1, 3), Decimal::from(100)),
                (date(2024, 1, 10), Decimal::from(70)),
            ]
        );
        assert_eq!(summary.total, Decimal::from(170));
        assert!(summary.limit_exceeded);
    }

    #[tokio::test]
    async fn test_rolling_window_includes_current_month() {
        let (store, user_id) = setup("1000").await;
        add(&store, user_id, date(2023, 12, 1), 10).await;
        add(&store, user_id, date(2024, 2, 15), 50).await;
        add(&store, user_id, date(2023, 6, 1), 999).await;
        let service = AnalysisServiceImpl::new(store.clone(), store.clone());

        let summary = service
            .summarize(user_id, AnalysisWindow::Last6Months, date(2024, 2, 20))
            .await
            .unwrap();

        assert_eq!(summary.daily_totals.len(), 2);
        assert_eq!(summary.total, Decimal::from(60));
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let service = AnalysisServiceImpl::new(store.clone(), store.clone());

        let result = service
            .summarize(Uuid::new_v4(), AnalysisWindow::LastMonth, date(2024, 2, 20))
            .await;
        assert!(matches!(result, Err(AnalysisError::UserNotFound)));
    }
}
