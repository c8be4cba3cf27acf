use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::validation::{validate_not_blank, validate_price};

/// Budget entry entity representing a single recorded expense
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BudgetEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(format = "date", example = "2024-01-15")]
    pub date: NaiveDate,
    pub expense: String,
    #[serde(rename = "pricePKR", with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 1500.0)]
    pub price: Decimal,
    /// Cumulative percentage of the owner's budget limit consumed through this entry
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 3.0)]
    pub total_expenditure: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for recording a new expense
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateBudgetEntryRequest {
    #[validate(custom(function = "validate_not_blank"))]
    #[schema(example = "Groceries")]
    pub expense: String,

    #[serde(rename = "pricePKR")]
    #[validate(custom(function = "validate_price"))]
    #[schema(value_type = f64, minimum = 0.01, example = 1500.0)]
    pub price: Decimal,

    #[schema(format = "date", example = "2024-01-15")]
    pub date: NaiveDate,
}

/// Request payload for patching an existing expense
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateBudgetEntryRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub expense: Option<String>,

    #[serde(rename = "pricePKR")]
    #[validate(custom(function = "validate_price"))]
    #[schema(value_type = Option<f64>, minimum = 0.01, example = 1750.0)]
    pub price: Option<Decimal>,

    #[schema(format = "date", example = "2024-01-16")]
    pub date: Option<NaiveDate>,
}

impl UpdateBudgetEntryRequest {
    pub fn is_empty(&self) -> bool {
        self.expense.is_none() && self.price.is_none() && self.date.is_none()
    }
}

/// Query parameters for listing entries
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BudgetQuery {
    /// Accepted for compatibility; the token's role decides the scope
    pub role: Option<String>,
    /// Only return entries recorded on this day
    pub date: Option<NaiveDate>,
}
