//! Price commit path shared by permanent and temporal adjustments.
//!
//! Every price change is planned in full before anything is written: new prices are computed for
//! every product, checked for non-negativity, and only then handed to the store as one batch.

use repricer::{
    detail::{PriceDiff, encode_detail},
    percentage::{Direction, Percentage},
    pricing::PricingError,
};
use rustc_hash::FxHashSet;
use tracing::warn;

use crate::domain::{
    adjustments::{errors::AdjustmentsServiceError, records::PriceSnapshot},
    errors::StoreError,
    products::{
        records::{PriceUpdate, Product, ProductId},
        store::ProductPriceStore,
    },
};

/// A fully computed set of price writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricePlan {
    pub updates: Vec<PriceUpdate>,
    pub diffs: Vec<PriceDiff>,
    pub snapshot: Vec<PriceSnapshot>,
}

impl PricePlan {
    /// Plans `percentage` in `direction` across `products`.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if any product would end up with an invalid price; nothing is
    /// planned in that case.
    pub fn adjust(
        products: &[Product],
        percentage: Percentage,
        direction: Direction,
    ) -> Result<Self, PricingError> {
        let mut plan = Self::default();

        for product in products {
            let applied = product.prices.adjusted(percentage, direction)?;

            plan.updates.push(PriceUpdate::for_product(product, applied));
            plan.diffs
                .push(PriceDiff::between(product.id, &product.prices, &applied));
            plan.snapshot.push(PriceSnapshot {
                product_id: product.id,
                before: product.prices,
                applied,
            });
        }

        Ok(plan)
    }

    /// Plans writing each snapshot's `before` prices back onto the matching product.
    ///
    /// Snapshots without a loaded product are skipped.
    pub fn restore(products: &[Product], snapshot: &[PriceSnapshot]) -> Self {
        let mut plan = Self::default();

        for captured in snapshot {
            let Some(product) = products.iter().find(|p| p.id == captured.product_id) else {
                warn!(product = %captured.product_id, "product vanished, nothing to restore");

                continue;
            };

            plan.updates
                .push(PriceUpdate::for_product(product, captured.before));
            plan.diffs.push(PriceDiff::between(
                product.id,
                &product.prices,
                &captured.before,
            ));
        }

        plan
    }

    /// The audit detail describing this plan.
    pub fn detail(&self) -> String {
        encode_detail(&self.diffs)
    }

    /// Writes the whole plan as one batch.
    ///
    /// # Errors
    ///
    /// Propagates the store's failure; nothing is written in that case.
    pub async fn commit(&self, store: &dyn ProductPriceStore) -> Result<Vec<Product>, StoreError> {
        if self.updates.is_empty() {
            return Ok(Vec::new());
        }

        store.update_prices(&self.updates).await
    }

    /// Best-effort undo of a committed plan, used when a later step of the same operation fails.
    ///
    /// Each written product gets back the prices it had before the plan, guarded by the version
    /// the commit produced.
    pub async fn undo(&self, store: &dyn ProductPriceStore, written: &[Product]) {
        let updates: Vec<PriceUpdate> = written
            .iter()
            .filter_map(|product| {
                self.diffs
                    .iter()
                    .find(|diff| diff.product_id == product.id)
                    .map(|diff| {
                        PriceUpdate::for_product(product, diff.restore_onto(&product.prices))
                    })
            })
            .collect();

        if updates.is_empty() {
            return;
        }

        if let Err(error) = store.update_prices(&updates).await {
            warn!(%error, "failed to undo price writes");
        }
    }
}

/// Deduplicates a product selection.
///
/// # Errors
///
/// - [`AdjustmentsServiceError::EmptyProductSet`]: nothing was selected.
/// - [`AdjustmentsServiceError::InvalidProductId`]: an id is negative and could not be recorded
///   in an audit detail.
pub fn selected_ids(ids: &[ProductId]) -> Result<Vec<ProductId>, AdjustmentsServiceError> {
    if ids.is_empty() {
        return Err(AdjustmentsServiceError::EmptyProductSet);
    }

    if let Some(id) = ids.iter().find(|id| id.get() < 0) {
        return Err(AdjustmentsServiceError::InvalidProductId(*id));
    }

    Ok(unique_ids(ids))
}

/// Removes repeated ids, keeping the first occurrence of each.
pub fn unique_ids(ids: &[ProductId]) -> Vec<ProductId> {
    let mut seen = FxHashSet::default();

    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Loads every product in `ids`, in order.
///
/// # Errors
///
/// Returns [`AdjustmentsServiceError::ProductNotFound`] naming the first unknown id.
pub async fn load_all(
    store: &dyn ProductPriceStore,
    ids: &[ProductId],
) -> Result<Vec<Product>, AdjustmentsServiceError> {
    let products = store.get_products(ids).await?;

    if let Some(missing) = ids
        .iter()
        .find(|id| !products.iter().any(|product| product.id == **id))
    {
        return Err(AdjustmentsServiceError::ProductNotFound(*missing));
    }

    Ok(products)
}
