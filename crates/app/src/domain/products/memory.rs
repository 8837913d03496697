//! In-memory product price store.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use repricer::pricing::PriceFields;
use rustc_hash::FxHashMap;

use crate::domain::{
    errors::StoreError,
    products::{
        records::{PriceUpdate, Product, ProductId},
        store::ProductPriceStore,
    },
};

/// Product price store kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryProductPriceStore {
    products: Mutex<FxHashMap<ProductId, Product>>,
}

impl InMemoryProductPriceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a product at version zero.
    pub fn insert(&self, id: ProductId, name: &str, prices: PriceFields) -> Product {
        let product = Product {
            id,
            name: name.to_string(),
            prices,
            version: 0,
        };

        self.products
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, product.clone());

        product
    }

    /// Returns a copy of a product, if present.
    pub fn snapshot(&self, id: ProductId) -> Option<Product> {
        self.products
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }
}

#[async_trait]
impl ProductPriceStore for InMemoryProductPriceStore {
    async fn get_product(&self, id: ProductId) -> Result<Product, StoreError> {
        self.snapshot(id).ok_or(StoreError::NotFound)
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let products = self.products.lock().unwrap_or_else(PoisonError::into_inner);

        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }

    async fn update_prices(&self, updates: &[PriceUpdate]) -> Result<Vec<Product>, StoreError> {
        let mut products = self.products.lock().unwrap_or_else(PoisonError::into_inner);

        // Check everything before touching anything.
        for update in updates {
            let current = products.get(&update.id).ok_or(StoreError::NotFound)?;

            if current.version != update.expected_version {
                return Err(StoreError::Conflict);
            }

            update
                .prices
                .validate()
                .map_err(|_negative| StoreError::InvalidData)?;
        }

        let mut written = Vec::with_capacity(updates.len());

        for update in updates {
            if let Some(product) = products.get_mut(&update.id) {
                product.prices = update.prices;
                product.version += 1;

                written.push(product.clone());
            }
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use testresult::TestResult;

    use super::*;

    fn store_with_two() -> InMemoryProductPriceStore {
        let store = InMemoryProductPriceStore::new();

        store.insert(
            ProductId::new(1),
            "Yerba 1kg",
            PriceFields::new(dec!(100), dec!(150), dec!(180)),
        );
        store.insert(
            ProductId::new(2),
            "Mate",
            PriceFields::new(dec!(10), dec!(15), dec!(18)),
        );

        store
    }

    #[tokio::test]
    async fn get_products_skips_unknown_ids_and_keeps_order() -> TestResult {
        let store = store_with_two();

        let products = store
            .get_products(&[ProductId::new(2), ProductId::new(99), ProductId::new(1)])
            .await?;

        let ids: Vec<ProductId> = products.iter().map(|p| p.id).collect();

        assert_eq!(ids, vec![ProductId::new(2), ProductId::new(1)]);

        Ok(())
    }

    #[tokio::test]
    async fn update_prices_bumps_versions() -> TestResult {
        let store = store_with_two();
        let product = store.get_product(ProductId::new(1)).await?;

        let written = store
            .update_prices(&[PriceUpdate::for_product(
                &product,
                PriceFields::new(dec!(1), dec!(2), dec!(3)),
            )])
            .await?;

        assert_eq!(written.len(), 1);
        assert_eq!(store.get_product(ProductId::new(1)).await?.version, 1);

        Ok(())
    }

    #[tokio::test]
    async fn stale_version_rejects_the_whole_batch() -> TestResult {
        let store = store_with_two();
        let first = store.get_product(ProductId::new(1)).await?;
        let mut second = store.get_product(ProductId::new(2)).await?;

        second.version = 5;

        let result = store
            .update_prices(&[
                PriceUpdate::for_product(&first, PriceFields::new(dec!(1), dec!(1), dec!(1))),
                PriceUpdate::for_product(&second, PriceFields::new(dec!(2), dec!(2), dec!(2))),
            ])
            .await;

        assert!(
            matches!(result, Err(StoreError::Conflict)),
            "expected Conflict, got {result:?}"
        );
        assert_eq!(
            store.get_product(ProductId::new(1)).await?.prices,
            PriceFields::new(dec!(100), dec!(150), dec!(180)),
            "first product must not be written"
        );

        Ok(())
    }

    #[tokio::test]
    async fn negative_prices_are_rejected() -> TestResult {
        let store = store_with_two();
        let product = store.get_product(ProductId::new(2)).await?;

        let result = store
            .update_prices(&[PriceUpdate::for_product(
                &product,
                PriceFields::new(dec!(-1), dec!(1), dec!(1)),
            )])
            .await;

        assert!(
            matches!(result, Err(StoreError::InvalidData)),
            "expected InvalidData, got {result:?}"
        );

        Ok(())
    }
}
