//! Sales store.

use async_trait::async_trait;
use mockall::automock;

use crate::domain::{errors::StoreError, sales::records::SaleId};

#[automock]
#[async_trait]
pub trait SalesStore: Send + Sync {
    /// Deletes a sale, returning `false` when it did not exist.
    async fn delete_sale(&self, id: SaleId) -> Result<bool, StoreError>;
}
