use rust_decimal::{Decimal, RoundingStrategy};
use validator::ValidationError;

/// Smallest budget limit a user may configure
pub const MIN_BUDGET_LIMIT: i64 = 1;
/// Largest budget limit a user may configure
pub const MAX_BUDGET_LIMIT: i64 = 99_999_999;

/// Largest price an entry may carry, 999999999999.99
pub const MAX_PRICE: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Validates that a price is at least one cent once rounded, and storable
pub fn validate_price(amount: &Decimal) -> Result<(), ValidationError> {
    let cents = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if cents <= Decimal::ZERO || *amount > MAX_PRICE {
        let mut error = ValidationError::new("invalid_amount");
        error.message = Some(format!("Price must be between 0.01 and {}", MAX_PRICE).into());
        return Err(error);
    }
    Ok(())
}

/// Validates that a budget limit lies within the accepted range
pub fn validate_budget_limit(limit: &Decimal) -> Result<(), ValidationError> {
    if *limit < Decimal::from(MIN_BUDGET_LIMIT) || *limit > Decimal::from(MAX_BUDGET_LIMIT) {
        let mut error = ValidationError::new("invalid_budget_limit");
        error.message = Some(
            format!(
                "Budget limit must be between {} and {}",
                MIN_BUDGET_LIMIT, MAX_BUDGET_LIMIT
            )
            .into(),
        );
        return Err(error);
    }
    Ok(())
}

/// Validates that a text field has at least one non-whitespace character
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("Value must not be blank".into());
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_price_bounds() {
        assert!(validate_price(&Decimal::from_str("0.01").unwrap()).is_ok());
        assert!(validate_price(&Decimal::from_str("0.005").unwrap()).is_ok());
        assert!(validate_price(&MAX_PRICE).is_ok());
        assert!(validate_price(&Decimal::ZERO).is_err());
        assert!(validate_price(&Decimal::from(-5)).is_err());
    }

    #[test]
    fn test_price_that_rounds_to_zero_is_rejected() {
        assert!(validate_price(&Decimal::from_str("0.004").unwrap()).is_err());
        assert!(validate_price(&Decimal::from_str("0.0049").unwrap()).is_err());
    }

    #[test]
    fn test_price_beyond_storage_is_rejected() {
        assert_eq!(MAX_PRICE, Decimal::from_str("999999999999.99").unwrap());
        assert!(validate_price(&Decimal::from_str("1000000000000").unwrap()).is_err());
        assert!(validate_price(&Decimal::MAX).is_err());
    }

    #[test]
    fn test_budget_limit_bounds() {
        assert!(validate_budget_limit(&Decimal::from(1)).is_ok());
        assert!(validate_budget_limit(&Decimal::from(99_999_999)).is_ok());
        assert!(validate_budget_limit(&Decimal::ZERO).is_err());
        assert!(validate_budget_limit(&Decimal::from(100_000_000)).is_err());
        assert!(validate_budget_limit(&Decimal::from_str("0.5").unwrap()).is_err());
    }

    #[test]
    fn test_not_blank() {
        assert!(validate_not_blank("Groceries").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("   ").is_err());
    }
}
