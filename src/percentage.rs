//! Percentages

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Most decimal places a percentage may carry; the storage column keeps exactly this many.
pub const PERCENTAGE_SCALE: u32 = 4;

/// Errors raised while constructing a [`Percentage`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PercentageError {
    /// The value was zero or negative.
    #[error("percentage must be greater than zero, got {0}")]
    NotPositive(Decimal),

    /// The value exceeded one hundred.
    #[error("percentage must not exceed 100, got {0}")]
    AboveHundred(Decimal),

    /// The value has more than [`PERCENTAGE_SCALE`] decimal places.
    #[error("percentage must have at most 4 decimal places, got {0}")]
    TooPrecise(Decimal),

    /// The text could not be read as a decimal.
    #[error("invalid percentage {0:?}")]
    Unparseable(String),
}

/// A percentage in the half-open range `(0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Percentage(Decimal);

impl Percentage {
    /// Validates and wraps a percentage value.
    ///
    /// # Errors
    ///
    /// - [`PercentageError::NotPositive`]: `value <= 0`.
    /// - [`PercentageError::AboveHundred`]: `value > 100`.
    /// - [`PercentageError::TooPrecise`]: more than [`PERCENTAGE_SCALE`] significant decimal places.
    pub fn new(value: Decimal) -> Result<Self, PercentageError> {
        if value <= Decimal::ZERO {
            return Err(PercentageError::NotPositive(value));
        }

        if value > Decimal::ONE_HUNDRED {
            return Err(PercentageError::AboveHundred(value));
        }

        if value.normalize().scale() > PERCENTAGE_SCALE {
            return Err(PercentageError::TooPrecise(value));
        }

        Ok(Self(value))
    }

    /// Returns the raw value, e.g. `10` for ten percent.
    pub fn value(self) -> Decimal {
        self.0
    }

    /// Returns the multiplier for this percentage applied in `direction`.
    ///
    /// A 10% increase yields `1.10`, a 10% decrease `0.90`.
    pub fn factor(self, direction: Direction) -> Decimal {
        let fraction = self.0 / Decimal::ONE_HUNDRED;

        match direction {
            Direction::Increase => Decimal::ONE + fraction,
            Direction::Decrease => Decimal::ONE - fraction,
        }
    }
}

impl TryFrom<Decimal> for Percentage {
    type Error = PercentageError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percentage> for Decimal {
    fn from(value: Percentage) -> Self {
        value.0
    }
}

impl FromStr for Percentage {
    type Err = PercentageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value =
            Decimal::from_str(s.trim()).map_err(|_err| PercentageError::Unparseable(s.to_string()))?;

        Self::new(value)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

/// Which way an adjustment moves prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Prices go up.
    Increase,

    /// Prices go down.
    Decrease,
}

impl Direction {
    /// Maps the boolean `is_increase` flag used by storage and callers.
    pub fn from_is_increase(is_increase: bool) -> Self {
        if is_increase {
            Self::Increase
        } else {
            Self::Decrease
        }
    }

    /// Returns `true` for [`Direction::Increase`].
    pub fn is_increase(self) -> bool {
        matches!(self, Self::Increase)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Increase => f.write_str("increase"),
            Self::Decrease => f.write_str("decrease"),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn accepts_upper_bound() -> TestResult {
        let percentage = Percentage::new(dec!(100))?;

        assert_eq!(percentage.value(), dec!(100));

        Ok(())
    }

    #[test]
    fn rejects_zero_and_negative() {
        assert_eq!(
            Percentage::new(Decimal::ZERO),
            Err(PercentageError::NotPositive(Decimal::ZERO))
        );
        assert_eq!(
            Percentage::new(dec!(-5)),
            Err(PercentageError::NotPositive(dec!(-5)))
        );
    }

    #[test]
    fn rejects_above_hundred() {
        assert_eq!(
            Percentage::new(dec!(100.01)),
            Err(PercentageError::AboveHundred(dec!(100.01)))
        );
    }

    #[test]
    fn rejects_more_than_four_decimal_places() -> TestResult {
        assert_eq!(
            Percentage::new(dec!(12.34567)),
            Err(PercentageError::TooPrecise(dec!(12.34567)))
        );
        assert_eq!(Percentage::new(dec!(12.3456))?.value(), dec!(12.3456));
        assert_eq!(Percentage::new(dec!(12.500000))?.value(), dec!(12.5));

        Ok(())
    }

    #[test]
    fn factor_follows_direction() -> TestResult {
        let ten = Percentage::new(dec!(10))?;

        assert_eq!(ten.factor(Direction::Increase), dec!(1.10));
        assert_eq!(ten.factor(Direction::Decrease), dec!(0.90));

        Ok(())
    }

    #[test]
    fn parses_from_text() -> TestResult {
        let percentage: Percentage = " 12.5 ".parse()?;

        assert_eq!(percentage.value(), dec!(12.5));
        assert!(matches!(
            "ten".parse::<Percentage>(),
            Err(PercentageError::Unparseable(_))
        ));

        Ok(())
    }

    #[test]
    fn displays_normalised_value() -> TestResult {
        assert_eq!(Percentage::new(dec!(10.00))?.to_string(), "10%");

        Ok(())
    }
}
