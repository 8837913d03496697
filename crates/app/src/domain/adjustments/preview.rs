//! Adjustment previews.

use repricer::{
    percentage::{Direction, Percentage},
    pricing::{PriceFields, PricingError},
};
use serde::Serialize;

use crate::domain::products::records::{Product, ProductId};

/// Old and new prices of one product under a simulated adjustment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewRow {
    pub id: ProductId,
    pub name: String,
    pub old: PriceFields,
    pub new: PriceFields,
}

/// Preview of a temporal adjustment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporalPreview {
    pub rows: Vec<PreviewRow>,

    /// Window length in days, rounded up.
    pub duration_days: i64,
}

pub(crate) fn preview_rows(
    products: &[Product],
    percentage: Percentage,
    direction: Direction,
) -> Result<Vec<PreviewRow>, PricingError> {
    products
        .iter()
        .map(|product| {
            Ok(PreviewRow {
                id: product.id,
                name: product.name.clone(),
                old: product.prices,
                new: product.prices.adjusted(percentage, direction)?,
            })
        })
        .collect()
}
