//! Products Repository

use async_trait::async_trait;
use repricer::pricing::PriceFields;
use rustc_hash::FxHashMap;
use sqlx::{FromRow, PgPool, Postgres, Row, postgres::PgRow, query_as, query_scalar};

use crate::domain::{
    errors::StoreError,
    products::{
        records::{PriceUpdate, Product, ProductId},
        store::ProductPriceStore,
    },
};

const GET_PRODUCT_SQL: &str = include_str!("sql/get_product.sql");
const GET_PRODUCTS_SQL: &str = include_str!("sql/get_products.sql");
const UPDATE_PRODUCT_PRICES_SQL: &str = include_str!("sql/update_product_prices.sql");
const PRODUCT_EXISTS_SQL: &str = include_str!("sql/product_exists.sql");

/// PostgreSQL-backed product price store.
#[derive(Debug, Clone)]
pub struct PgProductPriceStore {
    pool: PgPool,
}

impl PgProductPriceStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductPriceStore for PgProductPriceStore {
    async fn get_product(&self, id: ProductId) -> Result<Product, StoreError> {
        query_as::<Postgres, Product>(GET_PRODUCT_SQL)
            .bind(id.get())
            .fetch_one(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let raw_ids: Vec<i64> = ids.iter().map(|id| id.get()).collect();

        let mut found: FxHashMap<ProductId, Product> =
            query_as::<Postgres, Product>(GET_PRODUCTS_SQL)
                .bind(raw_ids)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|product| (product.id, product))
                .collect();

        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    #[tracing::instrument(
        name = "products.store.update_prices",
        skip(self, updates),
        fields(update_count = updates.len()),
        err
    )]
    async fn update_prices(&self, updates: &[PriceUpdate]) -> Result<Vec<Product>, StoreError> {
        for update in updates {
            update
                .prices
                .validate()
                .map_err(|_negative| StoreError::InvalidData)?;
        }

        let mut tx = self.pool.begin().await?;
        let mut written = Vec::with_capacity(updates.len());

        for update in updates {
            let row = query_as::<Postgres, Product>(UPDATE_PRODUCT_PRICES_SQL)
                .bind(update.id.get())
                .bind(update.prices.cost)
                .bind(update.prices.cash)
                .bind(update.prices.list)
                .bind(update.expected_version)
                .fetch_optional(&mut *tx)
                .await?;

            match row {
                Some(product) => written.push(product),
                None => {
                    let exists: bool = query_scalar(PRODUCT_EXISTS_SQL)
                        .bind(update.id.get())
                        .fetch_one(&mut *tx)
                        .await?;

                    // Dropping the transaction rolls back earlier rows.
                    return Err(if exists {
                        StoreError::Conflict
                    } else {
                        StoreError::NotFound
                    });
                }
            }
        }

        tx.commit().await?;

        Ok(written)
    }
}

impl<'r> FromRow<'r, PgRow> for Product {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            prices: PriceFields::new(
                row.try_get("cost")?,
                row.try_get("cash_price")?,
                row.try_get("list_price")?,
            ),
            version: row.try_get("version")?,
        })
    }
}
