//! Adjustments Data

use jiff::Timestamp;
use repricer::products::ProductId;
use rust_decimal::Decimal;

/// New Permanent Adjustment Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewPermanentAdjustment {
    pub product_ids: Vec<ProductId>,

    /// Percentage in `(0, 100]`.
    pub percentage: Decimal,

    pub is_increase: bool,
    pub description: String,
    pub actor: String,
}

/// New Temporal Adjustment Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewTemporalAdjustment {
    pub product_ids: Vec<ProductId>,
    pub percentage: Decimal,
    pub is_increase: bool,
    pub description: String,
    pub actor: String,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,

    /// Category label, e.g. `"promo"` or `"seasonal"`.
    pub category: String,
}
