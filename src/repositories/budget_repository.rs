use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::budget::BudgetEntry;
use crate::repositories::RepositoryError;

/// Optional equality filters for listing entries
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryFilters {
    /// Restrict to one owner; `None` lists every user's entries
    pub user_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
}

/// Trait defining budget entry repository operations
#[async_trait]
pub trait BudgetRepository: Send + Sync {
    /// Create a new budget entry
    async fn create(&self, entry: BudgetEntry) -> Result<BudgetEntry, RepositoryError>;

    /// Update expense, price and date of an existing entry
    async fn update(&self, entry: BudgetEntry) -> Result<BudgetEntry, RepositoryError>;

    /// Find a budget entry by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<BudgetEntry>, RepositoryError>;

    /// All entries of a user in recomputation order: date, then creation time, then id
    async fn find_by_user_ordered(&self, user_id: Uuid)
    -> Result<Vec<BudgetEntry>, RepositoryError>;

    /// Entries matching the filters, most recent date first
    async fn find_all(&self, filters: EntryFilters) -> Result<Vec<BudgetEntry>, RepositoryError>;

    /// Entries of a user dated within `[start, end)`, ascending by date
    async fn find_in_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<BudgetEntry>, RepositoryError>;

    /// Delete a budget entry by ID
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// Store recomputed cumulative percentages in one batch
    async fn update_total_expenditures(
        &self,
        updates: &[(Uuid, Decimal)],
    ) -> Result<(), RepositoryError>;
}

/// PostgreSQL implementation of BudgetRepository
pub struct PostgresBudgetRepository {
    pool: PgPool,
}

impl PostgresBudgetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ENTRY_COLUMNS: &str =
    "id, user_id, date, expense, price, total_expenditure, created_at, updated_at";

#[async_trait]
impl BudgetRepository for PostgresBudgetRepository {
    async fn create(&self, entry: BudgetEntry) -> Result<BudgetEntry, RepositoryError> {
        let query = format!(
            r#"
            INSERT INTO budget_entries (
                id, user_id, date, expense, price,
                total_expenditure, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ENTRY_COLUMNS}
            "#
        );

        let created = sqlx::query_as::<_, BudgetEntry>(&query)
            .bind(entry.id)
            .bind(entry.user_id)
            .bind(entry.date)
            .bind(&entry.expense)
            .bind(entry.price)
            .bind(entry.total_expenditure)
            .bind(entry.created_at)
            .bind(entry.updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn update(&self, entry: BudgetEntry) -> Result<BudgetEntry, RepositoryError> {
        // user_id and total_expenditure are deliberately absent from the SET list
        let query = format!(
            r#"
            UPDATE budget_entries
            SET expense = $2,
                price = $3,
                date = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ENTRY_COLUMNS}
            "#
        );

        sqlx::query_as::<_, BudgetEntry>(&query)
            .bind(entry.id)
            .bind(&entry.expense)
            .bind(entry.price)
            .bind(entry.date)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<BudgetEntry>, RepositoryError> {
        let query = format!("SELECT {ENTRY_COLUMNS} FROM budget_entries WHERE id = $1");

        let entry = sqlx::query_as::<_, BudgetEntry>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(entry)
    }

    async fn find_by_user_ordered(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<BudgetEntry>, RepositoryError> {
        let query = format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM budget_entries
            WHERE user_id = $1
            ORDER BY date ASC, created_at ASC, id ASC
            "#
        );

        let entries = sqlx::query_as::<_, BudgetEntry>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    async fn find_all(&self, filters: EntryFilters) -> Result<Vec<BudgetEntry>, RepositoryError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {ENTRY_COLUMNS} FROM budget_entries WHERE 1 = 1"
        ));

        if let Some(user_id) = filters.user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(date) = filters.date {
            builder.push(" AND date = ").push_bind(date);
        }
        builder.push(" ORDER BY date DESC, created_at DESC, id DESC");

        let entries = builder
            .build_query_as::<BudgetEntry>()
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    async fn find_in_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<BudgetEntry>, RepositoryError> {
        let query = format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM budget_entries
            WHERE user_id = $1 AND date >= $2 AND date < $3
            ORDER BY date ASC, created_at ASC, id ASC
            "#
        );

        let entries = sqlx::query_as::<_, BudgetEntry>(&query)
            .bind(user_id)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM budget_entries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn update_total_expenditures(
        &self,
        updates: &[(Uuid, Decimal)],
    ) -> Result<(), RepositoryError> {
        if updates.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for (id, total_expenditure) in updates {
            sqlx::query("UPDATE budget_entries SET total_expenditure = $2 WHERE id = $1")
                .bind(id)
                .bind(total_expenditure)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
