//! Product Records

use repricer::pricing::PriceFields;
use serde::{Deserialize, Serialize};

pub use repricer::products::ProductId;

/// Product Record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub prices: PriceFields,

    /// Row version, bumped on every price write.
    pub version: i64,
}

/// A guarded price write for one product.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceUpdate {
    pub id: ProductId,
    pub prices: PriceFields,

    /// Version the new prices were computed from.
    pub expected_version: i64,
}

impl PriceUpdate {
    /// Builds an update that only applies if `product` is unchanged in the store.
    #[must_use]
    pub fn for_product(product: &Product, prices: PriceFields) -> Self {
        Self {
            id: product.id,
            prices,
            expected_version: product.version,
        }
    }
}
