//! Pricing

use std::{fmt, str::FromStr};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::percentage::{Direction, Percentage, PercentageError};

/// Number of decimal places prices are stored with.
pub const PRICE_SCALE: u32 = 2;

/// Errors that can occur while computing adjusted prices.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    /// The percentage was outside `(0, 100]`.
    #[error(transparent)]
    InvalidPercentage(#[from] PercentageError),

    /// The computation produced a negative price.
    #[error("{field} would become negative ({value})")]
    NegativePrice {
        /// Field that went negative.
        field: PriceField,

        /// Offending value.
        value: Decimal,
    },

    /// Decimal arithmetic overflowed.
    #[error("price arithmetic overflowed")]
    Overflow,
}

/// One of the three price columns a product carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PriceField {
    /// Purchase cost.
    Cost,

    /// Cash sale price.
    Cash,

    /// List price.
    List,
}

impl PriceField {
    /// All fields, in audit order.
    pub const ALL: [Self; 3] = [Self::Cost, Self::Cash, Self::List];

    /// Name used for this field in audit details.
    pub fn audit_name(self) -> &'static str {
        match self {
            Self::Cost => "PCosto",
            Self::Cash => "PContado",
            Self::List => "PLista",
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.audit_name())
    }
}

/// Error returned when a field name is not one of the audit names.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown price field {0:?}")]
pub struct UnknownPriceField(pub String);

impl FromStr for PriceField {
    type Err = UnknownPriceField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.audit_name() == s)
            .ok_or_else(|| UnknownPriceField(s.to_string()))
    }
}

/// The cost, cash and list prices of a single product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceFields {
    /// Purchase cost.
    pub cost: Decimal,

    /// Cash sale price.
    pub cash: Decimal,

    /// List price.
    pub list: Decimal,
}

impl PriceFields {
    /// Creates a price triple.
    pub fn new(cost: Decimal, cash: Decimal, list: Decimal) -> Self {
        Self { cost, cash, list }
    }

    /// Reads a single field.
    pub fn get(&self, field: PriceField) -> Decimal {
        match field {
            PriceField::Cost => self.cost,
            PriceField::Cash => self.cash,
            PriceField::List => self.list,
        }
    }

    /// Overwrites a single field.
    pub fn set(&mut self, field: PriceField, value: Decimal) {
        match field {
            PriceField::Cost => self.cost = value,
            PriceField::Cash => self.cash = value,
            PriceField::List => self.list = value,
        }
    }

    /// Applies `percentage` in `direction` to every field.
    ///
    /// # Errors
    ///
    /// - [`PricingError::NegativePrice`]: a field is negative before or after adjustment.
    /// - [`PricingError::Overflow`]: decimal arithmetic overflowed.
    pub fn adjusted(
        &self,
        percentage: Percentage,
        direction: Direction,
    ) -> Result<Self, PricingError> {
        let mut adjusted = *self;

        for field in PriceField::ALL {
            let value = adjust_price(self.get(field), percentage, direction)?;

            adjusted.set(field, ensure_non_negative(field, value)?);
        }

        Ok(adjusted)
    }

    /// Checks the non-negativity invariant for every field.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::NegativePrice`] for the first negative field.
    pub fn validate(&self) -> Result<(), PricingError> {
        for field in PriceField::ALL {
            ensure_non_negative(field, self.get(field))?;
        }

        Ok(())
    }
}

/// Computes the new value of a price after a percentage change.
///
/// The result is rounded half-up (away from zero) to [`PRICE_SCALE`] places. The same function
/// backs previews and commits, so a preview is exactly what will be written.
///
/// # Errors
///
/// - [`PricingError::InvalidPercentage`]: `percentage` is outside `(0, 100]`.
/// - [`PricingError::Overflow`]: decimal arithmetic overflowed.
pub fn compute_new_price(
    old_value: Decimal,
    percentage: Decimal,
    is_increase: bool,
) -> Result<Decimal, PricingError> {
    let percentage = Percentage::new(percentage)?;

    adjust_price(old_value, percentage, Direction::from_is_increase(is_increase))
}

/// Applies an already validated percentage to a price.
///
/// # Errors
///
/// Returns [`PricingError::Overflow`] when the multiplication overflows.
pub fn adjust_price(
    old_value: Decimal,
    percentage: Percentage,
    direction: Direction,
) -> Result<Decimal, PricingError> {
    let applied = old_value
        .checked_mul(percentage.factor(direction))
        .ok_or(PricingError::Overflow)?;

    Ok(round_price(applied))
}

/// Rounds a price half-up to [`PRICE_SCALE`] decimal places.
pub fn round_price(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

fn ensure_non_negative(field: PriceField, value: Decimal) -> Result<Decimal, PricingError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(PricingError::NegativePrice { field, value });
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn ten_percent_increase() -> TestResult {
        assert_eq!(compute_new_price(dec!(100), dec!(10), true)?, dec!(110.00));
        assert_eq!(compute_new_price(dec!(150), dec!(10), true)?, dec!(165.00));
        assert_eq!(compute_new_price(dec!(180), dec!(10), true)?, dec!(198.00));

        Ok(())
    }

    #[test]
    fn rounds_half_up_to_cents() -> TestResult {
        // 10.05 * 1.5 = 15.075
        assert_eq!(compute_new_price(dec!(10.05), dec!(50), true)?, dec!(15.08));
        // 0.25 * 0.9 = 0.225
        assert_eq!(compute_new_price(dec!(0.25), dec!(10), false)?, dec!(0.23));

        Ok(())
    }

    #[test]
    fn full_decrease_yields_zero() -> TestResult {
        assert_eq!(compute_new_price(dec!(99.99), dec!(100), false)?, Decimal::ZERO);

        Ok(())
    }

    #[test]
    fn rejects_out_of_range_percentages() {
        assert!(matches!(
            compute_new_price(dec!(10), Decimal::ZERO, true),
            Err(PricingError::InvalidPercentage(PercentageError::NotPositive(_)))
        ));
        assert!(matches!(
            compute_new_price(dec!(10), dec!(100.5), false),
            Err(PricingError::InvalidPercentage(PercentageError::AboveHundred(_)))
        ));
    }

    #[test]
    fn adjusted_moves_every_field() -> TestResult {
        let prices = PriceFields::new(dec!(100), dec!(150), dec!(180));
        let adjusted = prices.adjusted(Percentage::new(dec!(10))?, Direction::Increase)?;

        assert_eq!(adjusted, PriceFields::new(dec!(110), dec!(165), dec!(198)));

        Ok(())
    }

    #[test]
    fn adjusted_rejects_corrupt_negative_input() -> TestResult {
        let prices = PriceFields::new(dec!(-1), dec!(150), dec!(180));
        let result = prices.adjusted(Percentage::new(dec!(10))?, Direction::Decrease);

        assert_eq!(
            result,
            Err(PricingError::NegativePrice {
                field: PriceField::Cost,
                value: dec!(-0.90),
            })
        );

        Ok(())
    }

    #[test]
    fn field_names_round_trip() -> TestResult {
        for field in PriceField::ALL {
            assert_eq!(field.audit_name().parse::<PriceField>()?, field);
        }

        assert!("PVenta".parse::<PriceField>().is_err());

        Ok(())
    }
}
