//! Rollback Service
//!
//! Reverses a single audit entry. Price entries are undone by writing each recorded `old` value
//! back into its field; sale creations are undone by deleting the sale. An entry is reverted at
//! most once: the entry is locked for the whole operation and the final flag write is a
//! compare-and-set.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use repricer::{
    detail::{PriceDiff, parse_detail},
    pricing::PriceFields,
};
use rustc_hash::FxHashMap;
use tracing::{Span, info, warn};

use crate::{
    domain::{
        adjustments::{records::AdjustmentUuid, store::AdjustmentStore},
        audit::{
            records::{AuditAction, AuditEntry, AuditEntryUuid, EntityType},
            store::AuditTrail,
        },
        errors::StoreError,
        products::{
            records::{PriceUpdate, ProductId},
            store::ProductPriceStore,
        },
        rollback::{errors::RollbackServiceError, policy::SegmentPolicy},
        sales::{records::SaleId, store::SalesStore},
    },
    locks::KeyedLocks,
};

/// Result of a successful revert.
#[derive(Debug, Clone, PartialEq)]
pub struct RevertOutcome {
    /// The entry, now flagged as reverted.
    pub entry: AuditEntry,

    /// Products whose prices were written back.
    pub restored: Vec<ProductId>,

    /// Segments or targets that were skipped, as text.
    pub skipped: Vec<String>,
}

#[derive(Debug, Default)]
struct Undo {
    restored: Vec<ProductId>,
    skipped: Vec<String>,
}

#[derive(Clone)]
pub struct Rollbacks {
    products: Arc<dyn ProductPriceStore>,
    sales: Arc<dyn SalesStore>,
    audit: Arc<dyn AuditTrail>,
    adjustments: Arc<dyn AdjustmentStore>,
    product_locks: Arc<KeyedLocks<ProductId>>,
    entry_locks: Arc<KeyedLocks<AuditEntryUuid>>,
    policy: SegmentPolicy,
}

impl fmt::Debug for Rollbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rollbacks")
            .field("product_locks", &self.product_locks)
            .field("entry_locks", &self.entry_locks)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Rollbacks {
    #[must_use]
    pub fn new(
        products: Arc<dyn ProductPriceStore>,
        sales: Arc<dyn SalesStore>,
        audit: Arc<dyn AuditTrail>,
        adjustments: Arc<dyn AdjustmentStore>,
        product_locks: Arc<KeyedLocks<ProductId>>,
        policy: SegmentPolicy,
    ) -> Self {
        Self {
            products,
            sales,
            audit,
            adjustments,
            product_locks,
            entry_locks: Arc::new(KeyedLocks::new()),
            policy,
        }
    }

    async fn undo_sale(&self, entry: &AuditEntry) -> Result<Undo, RollbackServiceError> {
        let sale: SaleId = entry
            .primary_key
            .trim()
            .parse()
            .map_err(|_parse| RollbackServiceError::InvalidPrimaryKey(entry.primary_key.clone()))?;

        let mut undo = Undo::default();

        if !self.sales.delete_sale(sale).await? {
            if self.policy.is_strict() {
                return Err(RollbackServiceError::TargetNotFound(sale.to_string()));
            }

            warn!(audit_entry_uuid = %entry.uuid, %sale, "sale already gone, nothing to delete");

            undo.skipped.push(entry.primary_key.clone());
        }

        Ok(undo)
    }

    async fn undo_prices(&self, entry: &AuditEntry) -> Result<Undo, RollbackServiceError> {
        let mut undo = Undo::default();
        let mut diffs: Vec<PriceDiff> = Vec::new();

        for parsed in parse_detail(&entry.detail) {
            match parsed {
                Ok(diff) => diffs.push(diff),
                Err(error) if self.policy.is_strict() => {
                    return Err(RollbackServiceError::MalformedDetail(error));
                }
                Err(error) => {
                    warn!(
                        audit_entry_uuid = %entry.uuid,
                        segment = error.segment(),
                        %error,
                        "skipping malformed audit segment"
                    );

                    undo.skipped.push(error.segment().to_string());
                }
            }
        }

        let mut ids: Vec<ProductId> = diffs.iter().map(|diff| diff.product_id).collect();

        ids.sort_unstable();
        ids.dedup();

        let _guards = self.product_locks.lock_all(ids.iter().copied()).await;

        let products = self.products.get_products(&ids).await?;

        // Working copy per product; later segments are undone first so the earliest recorded
        // `old` value wins when a product appears twice.
        let mut restored: FxHashMap<ProductId, (PriceUpdate, PriceFields)> = products
            .iter()
            .map(|product| {
                (
                    product.id,
                    (PriceUpdate::for_product(product, product.prices), product.prices),
                )
            })
            .collect();

        for diff in diffs.iter().rev() {
            match restored.get_mut(&diff.product_id) {
                Some((_, prices)) => *prices = diff.restore_onto(prices),
                None if self.policy.is_strict() => {
                    return Err(RollbackServiceError::TargetNotFound(
                        diff.product_id.to_string(),
                    ));
                }
                None => {
                    warn!(
                        audit_entry_uuid = %entry.uuid,
                        product = %diff.product_id,
                        "skipping segment for unknown product"
                    );

                    undo.skipped.push(diff.to_string());
                }
            }
        }

        let updates: Vec<PriceUpdate> = products
            .iter()
            .filter_map(|product| restored.remove(&product.id))
            .map(|(mut update, prices)| {
                update.prices = prices;
                update
            })
            .collect();

        if !updates.is_empty() {
            self.products.update_prices(&updates).await?;
        }

        undo.restored = updates.iter().map(|update| update.id).collect();

        Ok(undo)
    }

    async fn unlink_adjustment(&self, entry: &AuditEntry) {
        let Ok(adjustment) = entry.primary_key.parse::<AdjustmentUuid>() else {
            return;
        };

        match self.adjustments.mark_reverted(adjustment).await {
            Ok(_) => {}
            Err(StoreError::NotFound) => {
                warn!(%adjustment, "reverted entry has no adjustment record");
            }
            Err(error) => {
                warn!(%adjustment, %error, "failed to flag adjustment as reverted");
            }
        }
    }
}

#[async_trait]
impl RollbackService for Rollbacks {
    #[tracing::instrument(
        name = "rollback.service.revert",
        skip(self),
        fields(
            audit_entry_uuid = %uuid,
            entity_type = tracing::field::Empty,
            action = tracing::field::Empty
        ),
        err
    )]
    async fn revert(
        &self,
        uuid: AuditEntryUuid,
        actor: &str,
    ) -> Result<RevertOutcome, RollbackServiceError> {
        let _entry_guard = self.entry_locks.lock(uuid).await;

        let entry = self.audit.get_entry(uuid).await.map_err(|error| match error {
            StoreError::NotFound => RollbackServiceError::NotFound,
            other => other.into(),
        })?;

        let span = Span::current();

        span.record("entity_type", tracing::field::display(&entry.entity_type));
        span.record("action", tracing::field::display(&entry.action));

        if entry.is_reverted {
            return Err(RollbackServiceError::AlreadyReverted);
        }

        let undo = match (&entry.entity_type, &entry.action) {
            (EntityType::Sale, AuditAction::Create) => self.undo_sale(&entry).await?,
            (EntityType::Product, AuditAction::UpdatePrices) => self.undo_prices(&entry).await?,
            (entity_type, action) => {
                return Err(RollbackServiceError::UnsupportedRollback {
                    entity_type: entity_type.clone(),
                    action: action.clone(),
                });
            }
        };

        if !self
            .audit
            .mark_reverted(uuid, actor.to_string(), Timestamp::now())
            .await?
        {
            return Err(RollbackServiceError::AlreadyReverted);
        }

        if entry.action == AuditAction::UpdatePrices {
            self.unlink_adjustment(&entry).await;
        }

        info!(
            restored = undo.restored.len(),
            skipped = undo.skipped.len(),
            "reverted audit entry"
        );

        Ok(RevertOutcome {
            entry: self.audit.get_entry(uuid).await?,
            restored: undo.restored,
            skipped: undo.skipped,
        })
    }
}

#[automock]
#[async_trait]
pub trait RollbackService: Send + Sync {
    /// Reverses the change recorded by an audit entry.
    async fn revert(
        &self,
        uuid: AuditEntryUuid,
        actor: &str,
    ) -> Result<RevertOutcome, RollbackServiceError>;
}
