//! App Context

use std::{fmt, sync::Arc, time::Duration};

use sqlx::PgPool;
use thiserror::Error;

use crate::{
    database,
    domain::{
        adjustments::{
            AdjustmentStore, InMemoryAdjustmentStore, PermanentAdjustments,
            PermanentAdjustmentsService, PgAdjustmentStore, TemporalAdjustments,
            TemporalAdjustmentsService, TemporalSweeper,
        },
        audit::{AuditTrail, InMemoryAuditTrail, PgAuditTrail},
        products::{InMemoryProductPriceStore, PgProductPriceStore, ProductPriceStore},
        rollback::{RollbackService, Rollbacks, SegmentPolicy},
        sales::{InMemorySalesStore, PgSalesStore, SalesStore},
    },
    locks::KeyedLocks,
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),
}

/// The stores every service reads from and writes to.
#[derive(Clone)]
pub struct Stores {
    pub products: Arc<dyn ProductPriceStore>,
    pub sales: Arc<dyn SalesStore>,
    pub audit: Arc<dyn AuditTrail>,
    pub adjustments: Arc<dyn AdjustmentStore>,
}

impl fmt::Debug for Stores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

impl Stores {
    /// Stores backed by a `PostgreSQL` pool.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            products: Arc::new(PgProductPriceStore::new(pool.clone())),
            sales: Arc::new(PgSalesStore::new(pool.clone())),
            audit: Arc::new(PgAuditTrail::new(pool.clone())),
            adjustments: Arc::new(PgAdjustmentStore::new(pool)),
        }
    }

    /// Empty stores kept in process memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            products: Arc::new(InMemoryProductPriceStore::new()),
            sales: Arc::new(InMemorySalesStore::new()),
            audit: Arc::new(InMemoryAuditTrail::new()),
            adjustments: Arc::new(InMemoryAdjustmentStore::new()),
        }
    }
}

/// Behaviour switches shared by the services.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceOptions {
    pub segment_policy: SegmentPolicy,
}

#[derive(Clone)]
pub struct AppContext {
    pub stores: Stores,
    pub permanent: Arc<dyn PermanentAdjustmentsService>,
    pub temporal: Arc<dyn TemporalAdjustmentsService>,
    pub rollback: Arc<dyn RollbackService>,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("stores", &self.stores)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Build application context from a database URL.
    ///
    /// # Errors
    ///
    /// Returns an error when establishing a database connection fails.
    pub async fn from_database_url(
        url: &str,
        options: ServiceOptions,
    ) -> Result<Self, AppInitError> {
        let pool = database::connect(url)
            .await
            .map_err(AppInitError::Database)?;

        Ok(Self::from_stores(Stores::postgres(pool), options))
    }

    /// Build application context over empty in-memory stores.
    #[must_use]
    pub fn in_memory(options: ServiceOptions) -> Self {
        Self::from_stores(Stores::in_memory(), options)
    }

    /// Wire every service over `stores`.
    ///
    /// All services share one product lock table, so any two operations touching the same product
    /// run one after the other.
    #[must_use]
    pub fn from_stores(stores: Stores, options: ServiceOptions) -> Self {
        let product_locks = Arc::new(KeyedLocks::new());

        let permanent = PermanentAdjustments::new(
            Arc::clone(&stores.products),
            Arc::clone(&stores.audit),
            Arc::clone(&stores.adjustments),
            Arc::clone(&product_locks),
        );

        let temporal = TemporalAdjustments::new(
            Arc::clone(&stores.products),
            Arc::clone(&stores.audit),
            Arc::clone(&stores.adjustments),
            Arc::clone(&product_locks),
        );

        let rollback = Rollbacks::new(
            Arc::clone(&stores.products),
            Arc::clone(&stores.sales),
            Arc::clone(&stores.audit),
            Arc::clone(&stores.adjustments),
            product_locks,
            options.segment_policy,
        );

        Self {
            stores,
            permanent: Arc::new(permanent),
            temporal: Arc::new(temporal),
            rollback: Arc::new(rollback),
        }
    }

    /// A sweeper driving this context's temporal adjustments.
    #[must_use]
    pub fn sweeper(&self, interval: Duration) -> TemporalSweeper {
        TemporalSweeper::new(Arc::clone(&self.temporal), interval)
    }
}
