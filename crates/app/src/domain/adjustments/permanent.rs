//! Permanent Adjustments Service

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use repricer::percentage::{Direction, Percentage};
use rust_decimal::Decimal;
use tracing::{Span, info, warn};

use crate::{
    domain::{
        adjustments::{
            commit::{PricePlan, load_all, selected_ids, unique_ids},
            data::NewPermanentAdjustment,
            errors::AdjustmentsServiceError,
            preview::{PreviewRow, preview_rows},
            records::{AdjustmentRecord, AdjustmentUuid},
            store::AdjustmentStore,
        },
        audit::{
            records::{AuditAction, EntityType, NewAuditEntry},
            store::AuditTrail,
        },
        products::{records::ProductId, store::ProductPriceStore},
    },
    locks::KeyedLocks,
};

#[derive(Clone)]
pub struct PermanentAdjustments {
    products: Arc<dyn ProductPriceStore>,
    audit: Arc<dyn AuditTrail>,
    adjustments: Arc<dyn AdjustmentStore>,
    product_locks: Arc<KeyedLocks<ProductId>>,
}

impl fmt::Debug for PermanentAdjustments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermanentAdjustments")
            .field("product_locks", &self.product_locks)
            .finish_non_exhaustive()
    }
}

impl PermanentAdjustments {
    #[must_use]
    pub fn new(
        products: Arc<dyn ProductPriceStore>,
        audit: Arc<dyn AuditTrail>,
        adjustments: Arc<dyn AdjustmentStore>,
        product_locks: Arc<KeyedLocks<ProductId>>,
    ) -> Self {
        Self {
            products,
            audit,
            adjustments,
            product_locks,
        }
    }
}

#[async_trait]
impl PermanentAdjustmentsService for PermanentAdjustments {
    async fn simulate(
        &self,
        product_ids: &[ProductId],
        percentage: Decimal,
        is_increase: bool,
    ) -> Result<Vec<PreviewRow>, AdjustmentsServiceError> {
        if product_ids.is_empty() {
            return Err(AdjustmentsServiceError::EmptyProductSet);
        }

        let percentage = Percentage::new(percentage)?;
        let products = self.products.get_products(&unique_ids(product_ids)).await?;

        Ok(preview_rows(
            &products,
            percentage,
            Direction::from_is_increase(is_increase),
        )?)
    }

    #[tracing::instrument(
        name = "adjustments.service.apply",
        skip(self, adjustment),
        fields(
            actor = %adjustment.actor,
            product_count = adjustment.product_ids.len(),
            adjustment_uuid = tracing::field::Empty,
            audit_entry_uuid = tracing::field::Empty
        ),
        err
    )]
    async fn apply(
        &self,
        adjustment: NewPermanentAdjustment,
    ) -> Result<AdjustmentRecord, AdjustmentsServiceError> {
        let product_ids = selected_ids(&adjustment.product_ids)?;
        let percentage = Percentage::new(adjustment.percentage)?;
        let direction = Direction::from_is_increase(adjustment.is_increase);

        let uuid = AdjustmentUuid::new();
        let span = Span::current();

        span.record("adjustment_uuid", tracing::field::display(uuid));

        let _guards = self.product_locks.lock_all(product_ids.iter().copied()).await;

        let products = load_all(self.products.as_ref(), &product_ids).await?;
        let plan = PricePlan::adjust(&products, percentage, direction)?;
        let written = plan.commit(self.products.as_ref()).await?;

        let entry = NewAuditEntry::now(
            &adjustment.actor,
            EntityType::Product,
            AuditAction::UpdatePrices,
            uuid,
            plan.detail(),
        );

        let entry = match self.audit.append(entry).await {
            Ok(entry) => entry,
            Err(error) => {
                plan.undo(self.products.as_ref(), &written).await;

                return Err(error.into());
            }
        };

        span.record("audit_entry_uuid", tracing::field::display(entry.uuid));

        let inserted = self
            .adjustments
            .insert(AdjustmentRecord {
                uuid,
                product_ids,
                percentage,
                direction,
                description: adjustment.description,
                created_at: Timestamp::now(),
                created_by: adjustment.actor,
                audit_entry: Some(entry.uuid),
                is_reverted: false,
                temporal: None,
            })
            .await;

        let record = match inserted {
            Ok(record) => record,
            Err(error) => {
                plan.undo(self.products.as_ref(), &written).await;

                warn!(
                    audit_entry_uuid = %entry.uuid,
                    "adjustment record was not stored; prices restored"
                );

                return Err(error.into());
            }
        };

        info!(
            adjustment_uuid = %record.uuid,
            audit_entry_uuid = %entry.uuid,
            %percentage,
            %direction,
            "applied permanent adjustment"
        );

        Ok(record)
    }
}

#[automock]
#[async_trait]
pub trait PermanentAdjustmentsService: Send + Sync {
    /// Computes the prices an adjustment would produce without writing anything.
    ///
    /// Unknown product ids are left out of the preview.
    async fn simulate(
        &self,
        product_ids: &[ProductId],
        percentage: Decimal,
        is_increase: bool,
    ) -> Result<Vec<PreviewRow>, AdjustmentsServiceError>;

    /// Adjusts every listed product, records the audit entry and returns the new record.
    ///
    /// Prices are written as one batch: either every product changes or none does.
    async fn apply(
        &self,
        adjustment: NewPermanentAdjustment,
    ) -> Result<AdjustmentRecord, AdjustmentsServiceError>;
}

#[cfg(test)]
mod tests {
    use repricer::pricing::PriceFields;
    use rust_decimal_macros::dec;
    use testresult::TestResult;

    use crate::{
        domain::{
            adjustments::{InMemoryAdjustmentStore, MockAdjustmentStore},
            audit::InMemoryAuditTrail,
            errors::{ErrorKind, StoreError},
            products::{InMemoryProductPriceStore, MockProductPriceStore, records::Product},
        },
        test::TestContext,
    };

    use super::*;

    fn increase(ids: &[i64], percentage: Decimal) -> NewPermanentAdjustment {
        NewPermanentAdjustment {
            product_ids: ids.iter().copied().map(ProductId::new).collect(),
            percentage,
            is_increase: true,
            description: "Supplier list update".to_string(),
            actor: "admin".to_string(),
        }
    }

    #[tokio::test]
    async fn apply_writes_prices_and_audit_detail() -> TestResult {
        let ctx = TestContext::new();

        ctx.seed_product(101, dec!(100), dec!(150), dec!(180));

        let record = ctx.permanent.apply(increase(&[101], dec!(10))).await?;

        assert_eq!(
            ctx.prices(101)?,
            PriceFields::new(dec!(110.00), dec!(165.00), dec!(198.00))
        );

        let entries = ctx.audit.entries();
        let entry = entries.first().ok_or("missing audit entry")?;

        assert_eq!(entries.len(), 1);
        assert_eq!(entry.entity_type, EntityType::Product);
        assert_eq!(entry.action, AuditAction::UpdatePrices);
        assert_eq!(entry.primary_key, record.uuid.to_string());
        assert_eq!(entry.detail, "101:PCosto=100->110;PContado=150->165;PLista=180->198");
        assert_eq!(record.audit_entry, Some(entry.uuid));
        assert!(!record.is_temporal());

        Ok(())
    }

    #[tokio::test]
    async fn full_decrease_yields_zero_prices() -> TestResult {
        let ctx = TestContext::new();

        ctx.seed_product(1, dec!(12.34), dec!(20), dec!(25));

        let mut adjustment = increase(&[1], dec!(100));
        adjustment.is_increase = false;

        ctx.permanent.apply(adjustment).await?;

        assert_eq!(ctx.prices(1)?, PriceFields::default());

        Ok(())
    }

    #[tokio::test]
    async fn out_of_range_percentages_are_invalid_arguments() -> TestResult {
        let ctx = TestContext::new();

        ctx.seed_product(1, dec!(10), dec!(10), dec!(10));

        for percentage in [dec!(0), dec!(100.01), dec!(-5)] {
            let result = ctx.permanent.apply(increase(&[1], percentage)).await;

            assert!(
                matches!(&result, Err(error) if error.kind() == ErrorKind::InvalidArgument),
                "expected InvalidArgument for {percentage}, got {result:?}"
            );
        }

        assert!(ctx.audit.entries().is_empty());
        assert_eq!(ctx.prices(1)?, PriceFields::new(dec!(10), dec!(10), dec!(10)));

        Ok(())
    }

    #[tokio::test]
    async fn empty_product_set_is_rejected() -> TestResult {
        let ctx = TestContext::new();

        let result = ctx.permanent.apply(increase(&[], dec!(10))).await;

        assert!(
            matches!(result, Err(AdjustmentsServiceError::EmptyProductSet)),
            "expected EmptyProductSet, got {result:?}"
        );

        let result = ctx.permanent.simulate(&[], dec!(10), true).await;

        assert!(
            matches!(result, Err(AdjustmentsServiceError::EmptyProductSet)),
            "expected EmptyProductSet, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn unknown_product_aborts_before_any_write() -> TestResult {
        let ctx = TestContext::new();

        ctx.seed_product(1, dec!(10), dec!(10), dec!(10));

        let result = ctx.permanent.apply(increase(&[1, 2], dec!(10))).await;

        assert!(
            matches!(result, Err(AdjustmentsServiceError::ProductNotFound(id)) if id == ProductId::new(2)),
            "expected ProductNotFound(2), got {result:?}"
        );
        assert_eq!(ctx.prices(1)?, PriceFields::new(dec!(10), dec!(10), dec!(10)));
        assert!(ctx.audit.entries().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn simulate_skips_unknown_products() -> TestResult {
        let ctx = TestContext::new();

        ctx.seed_product(5, dec!(100), dec!(150), dec!(180));

        let rows = ctx
            .permanent
            .simulate(&[ProductId::new(5), ProductId::new(404)], dec!(10), true)
            .await?;

        assert_eq!(rows.len(), 1);

        let row = rows.first().ok_or("missing row")?;

        assert_eq!(row.id, ProductId::new(5));
        assert_eq!(row.new, PriceFields::new(dec!(110), dec!(165), dec!(198)));
        assert_eq!(ctx.prices(5)?, row.old, "simulation must not write");

        Ok(())
    }

    #[tokio::test]
    async fn conflicting_write_leaves_no_audit_trace() -> TestResult {
        let mut products = MockProductPriceStore::new();

        products.expect_get_products().returning(|ids| {
            Ok(ids
                .iter()
                .map(|id| Product {
                    id: *id,
                    name: "Mocked".to_string(),
                    prices: PriceFields::new(dec!(1), dec!(1), dec!(1)),
                    version: 0,
                })
                .collect())
        });
        products
            .expect_update_prices()
            .returning(|_| Err(StoreError::Conflict));

        let audit = Arc::new(InMemoryAuditTrail::new());
        let adjustments = Arc::new(InMemoryAdjustmentStore::new());

        let service = PermanentAdjustments::new(
            Arc::new(products),
            audit.clone(),
            adjustments,
            Arc::new(KeyedLocks::new()),
        );

        let result = service.apply(increase(&[1, 2], dec!(5))).await;

        assert!(
            matches!(&result, Err(error) if error.kind() == ErrorKind::Conflict),
            "expected Conflict, got {result:?}"
        );
        assert!(audit.entries().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn failed_audit_write_restores_prices() -> TestResult {
        let products = Arc::new(InMemoryProductPriceStore::new());

        products.insert(
            ProductId::new(1),
            "Yerba",
            PriceFields::new(dec!(100), dec!(150), dec!(180)),
        );

        let mut audit = crate::domain::audit::MockAuditTrail::new();

        audit
            .expect_append()
            .returning(|_| Err(StoreError::Sql(sqlx::Error::PoolTimedOut)));

        let service = PermanentAdjustments::new(
            products.clone(),
            Arc::new(audit),
            Arc::new(InMemoryAdjustmentStore::new()),
            Arc::new(KeyedLocks::new()),
        );

        let result = service.apply(increase(&[1], dec!(10))).await;

        assert!(
            matches!(&result, Err(error) if error.kind() == ErrorKind::Storage),
            "expected Storage, got {result:?}"
        );
        assert_eq!(
            products.snapshot(ProductId::new(1)).map(|p| p.prices),
            Some(PriceFields::new(dec!(100), dec!(150), dec!(180)))
        );

        Ok(())
    }

    #[tokio::test]
    async fn failed_record_insert_restores_prices() -> TestResult {
        let products = Arc::new(InMemoryProductPriceStore::new());

        products.insert(
            ProductId::new(1),
            "Yerba",
            PriceFields::new(dec!(100), dec!(150), dec!(180)),
        );

        let mut adjustments = MockAdjustmentStore::new();

        adjustments
            .expect_insert()
            .returning(|_| Err(StoreError::Sql(sqlx::Error::PoolTimedOut)));

        let service = PermanentAdjustments::new(
            products.clone(),
            Arc::new(InMemoryAuditTrail::new()),
            Arc::new(adjustments),
            Arc::new(KeyedLocks::new()),
        );

        let result = service.apply(increase(&[1], dec!(10))).await;

        assert!(
            matches!(&result, Err(error) if error.kind() == ErrorKind::Storage),
            "expected Storage, got {result:?}"
        );
        assert_eq!(
            products.snapshot(ProductId::new(1)).map(|p| p.prices),
            Some(PriceFields::new(dec!(100), dec!(150), dec!(180)))
        );

        Ok(())
    }

    #[tokio::test]
    async fn negative_product_ids_are_rejected() -> TestResult {
        let ctx = TestContext::new();

        ctx.seed_product(5, dec!(10), dec!(10), dec!(10));

        let result = ctx.permanent.apply(increase(&[5, -5], dec!(10))).await;

        assert!(
            matches!(result, Err(AdjustmentsServiceError::InvalidProductId(id)) if id == ProductId::new(-5)),
            "expected InvalidProductId(-5), got {result:?}"
        );
        assert_eq!(ctx.prices(5)?, PriceFields::new(dec!(10), dec!(10), dec!(10)));
        assert!(ctx.audit.entries().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn percentages_finer_than_the_stored_scale_are_rejected() -> TestResult {
        let ctx = TestContext::new();

        ctx.seed_product(1, dec!(10), dec!(10), dec!(10));

        let result = ctx.permanent.apply(increase(&[1], dec!(12.34567))).await;

        assert!(
            matches!(&result, Err(error) if error.kind() == ErrorKind::InvalidArgument),
            "expected InvalidArgument, got {result:?}"
        );
        assert!(ctx.audit.entries().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn concurrent_applies_compose_without_lost_updates() -> TestResult {
        let ctx = TestContext::new();

        ctx.seed_product(1, dec!(100), dec!(100), dec!(100));

        let first = ctx.permanent.clone();
        let second = ctx.permanent.clone();

        let (a, b) = tokio::join!(
            tokio::spawn(async move { first.apply(increase(&[1], dec!(10))).await }),
            tokio::spawn(async move { second.apply(increase(&[1], dec!(10))).await }),
        );

        a??;
        b??;

        assert_eq!(ctx.prices(1)?, PriceFields::new(dec!(121), dec!(121), dec!(121)));
        assert_eq!(ctx.audit.entries().len(), 2);

        Ok(())
    }
}
