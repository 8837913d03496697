//! In-memory sales store.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rustc_hash::FxHashMap;

use crate::domain::{
    errors::StoreError,
    sales::{
        records::{Sale, SaleId},
        store::SalesStore,
    },
};

/// Sales store kept in process memory.
#[derive(Debug, Default)]
pub struct InMemorySalesStore {
    sales: Mutex<FxHashMap<SaleId, Sale>>,
}

impl InMemorySalesStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, sale: Sale) {
        self.sales
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sale.id, sale);
    }

    pub fn contains(&self, id: SaleId) -> bool {
        self.sales
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }
}

#[async_trait]
impl SalesStore for InMemorySalesStore {
    async fn delete_sale(&self, id: SaleId) -> Result<bool, StoreError> {
        Ok(self
            .sales
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some())
    }
}
