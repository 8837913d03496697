//! Repricer prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    detail::{DetailError, FieldDiff, PriceDiff, encode_detail, parse_detail, parse_segment},
    percentage::{Direction, Percentage, PercentageError},
    pricing::{PriceField, PriceFields, PricingError, compute_new_price},
    products::ProductId,
};
