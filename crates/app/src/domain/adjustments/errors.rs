//! Adjustments service errors.

use repricer::{percentage::PercentageError, pricing::PricingError, products::ProductId};
use thiserror::Error;

use crate::domain::{
    adjustments::records::{AdjustmentState, InvalidWindow},
    errors::{ErrorKind, StoreError},
};

#[derive(Debug, Error)]
pub enum AdjustmentsServiceError {
    #[error("no products selected")]
    EmptyProductSet,

    #[error(transparent)]
    InvalidPercentage(#[from] PercentageError),

    #[error(transparent)]
    InvalidWindow(#[from] InvalidWindow),

    #[error("product id {0} is negative")]
    InvalidProductId(ProductId),

    #[error("window already ended")]
    WindowElapsed,

    #[error("category is required")]
    MissingCategory,

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("adjustment not found")]
    NotFound,

    #[error("adjustment is not temporal")]
    NotTemporal,

    #[error("cannot {operation} an adjustment that is {state}")]
    InvalidState {
        state: AdjustmentState,
        operation: &'static str,
    },

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AdjustmentsServiceError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyProductSet
            | Self::InvalidPercentage(_)
            | Self::InvalidWindow(_)
            | Self::InvalidProductId(_)
            | Self::WindowElapsed
            | Self::MissingCategory
            | Self::Pricing(_) => ErrorKind::InvalidArgument,
            Self::ProductNotFound(_) | Self::NotFound => ErrorKind::NotFound,
            Self::NotTemporal | Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::Store(error) => error.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn validation_failures_are_invalid_arguments() {
        let error = AdjustmentsServiceError::from(PercentageError::NotPositive(Decimal::ZERO));

        assert_eq!(error.kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            AdjustmentsServiceError::EmptyProductSet.kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn store_errors_keep_their_kind() {
        let error = AdjustmentsServiceError::from(StoreError::Conflict);

        assert_eq!(error.kind(), ErrorKind::Conflict);
    }
}
