//! Sales Repository

use async_trait::async_trait;
use sqlx::{PgPool, query};

use crate::domain::{
    errors::StoreError,
    sales::{records::SaleId, store::SalesStore},
};

const DELETE_SALE_SQL: &str = include_str!("sql/delete_sale.sql");

/// PostgreSQL-backed sales store.
#[derive(Debug, Clone)]
pub struct PgSalesStore {
    pool: PgPool,
}

impl PgSalesStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SalesStore for PgSalesStore {
    async fn delete_sale(&self, id: SaleId) -> Result<bool, StoreError> {
        let rows_affected = query(DELETE_SALE_SQL)
            .bind(id.get())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }
}
