//! Product price store.

use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    errors::StoreError,
    products::records::{PriceUpdate, Product, ProductId},
};

#[automock]
#[async_trait]
pub trait ProductPriceStore: Send + Sync {
    /// Retrieve a single product.
    async fn get_product(&self, id: ProductId) -> Result<Product, StoreError>;

    /// Retrieve the products that exist among `ids`, in request order.
    ///
    /// Unknown ids are omitted rather than reported.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError>;

    /// Writes every update or none of them.
    ///
    /// Fails with [`StoreError::Conflict`] when any product's version no longer matches,
    /// [`StoreError::NotFound`] when a product is missing and [`StoreError::InvalidData`] when a
    /// price is negative.
    async fn update_prices(&self, updates: &[PriceUpdate]) -> Result<Vec<Product>, StoreError>;
}
