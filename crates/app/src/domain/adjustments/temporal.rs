//! Temporal Adjustments Service
//!
//! A temporal adjustment moves through `scheduled -> active -> finished`. Activation captures the
//! prices it is about to overwrite and finalisation writes exactly those prices back, so permanent
//! adjustments made before activation survive the round trip.
//!
//! Every transition first claims the record with a compare-and-set on its state and only then
//! touches prices. Two triggers racing on the same record therefore cannot both apply (or both
//! restore) prices: the loser observes the new state and returns it unchanged.

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
            data::NewTemporalAdjustment,
            errors::AdjustmentsServiceError,
            preview::{TemporalPreview, preview_rows},
            records::{
                AdjustmentRecord, AdjustmentState, AdjustmentUuid, StateTransition,
                TemporalDetails, TemporalWindow,
            },
            store::AdjustmentStore,
        },
        audit::{
            records::{AuditAction, AuditEntryUuid, EntityType, NewAuditEntry},
            store::AuditTrail,
        },
        errors::StoreError,
        products::{records::ProductId, store::ProductPriceStore},
    },
    locks::KeyedLocks,
};

#[derive(Clone)]
pub struct TemporalAdjustments {
    products: Arc<dyn ProductPriceStore>,
    audit: Arc<dyn AuditTrail>,
    adjustments: Arc<dyn AdjustmentStore>,
    product_locks: Arc<KeyedLocks<ProductId>>,
    record_locks: Arc<KeyedLocks<AdjustmentUuid>>,
}

impl fmt::Debug for TemporalAdjustments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporalAdjustments")
            .field("product_locks", &self.product_locks)
            .field("record_locks", &self.record_locks)
            .finish_non_exhaustive()
    }
}

impl TemporalAdjustments {
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
            record_locks: Arc::new(KeyedLocks::new()),
        }
    }

    async fn load(&self, uuid: AdjustmentUuid) -> Result<AdjustmentRecord, AdjustmentsServiceError> {
        self.adjustments.get(uuid).await.map_err(|error| match error {
            StoreError::NotFound => AdjustmentsServiceError::NotFound,
            other => other.into(),
        })
    }

    async fn record_audit(
        &self,
        actor: &str,
        action: AuditAction,
        uuid: AdjustmentUuid,
        detail: String,
    ) -> Result<AuditEntryUuid, StoreError> {
        let entry = self
            .audit
            .append(NewAuditEntry::now(
                actor,
                EntityType::TemporalAdjustment,
                action,
                uuid,
                detail,
            ))
            .await?;

        Ok(entry.uuid)
    }

    /// Claims `record` for `to`, writes `plan` and records the audit entry for the move.
    ///
    /// When the price write or the audit append fails, the written prices are undone and the claim
    /// is handed back so the same transition can be retried.
    async fn transition_with_prices(
        &self,
        record: &AdjustmentRecord,
        from: AdjustmentState,
        to: AdjustmentState,
        plan: &PricePlan,
        actor: &str,
        action: AuditAction,
    ) -> Result<bool, AdjustmentsServiceError> {
        let now = Timestamp::now();
        let snapshot = (to == AdjustmentState::Active).then(|| plan.snapshot.clone());

        let claimed = self
            .adjustments
            .transition(StateTransition {
                uuid: record.uuid,
                from,
                to,
                at: now,
                snapshot,
            })
            .await?;

        if !claimed {
            return Ok(false);
        }

        let written = match plan.commit(self.products.as_ref()).await {
            Ok(written) => written,
            Err(error) => {
                self.release(record, from, to, now).await;

                return Err(error.into());
            }
        };

        if let Err(error) = self.record_audit(actor, action, record.uuid, plan.detail()).await {
            plan.undo(self.products.as_ref(), &written).await;
            self.release(record, from, to, now).await;

            return Err(error.into());
        }

        Ok(true)
    }

    /// Moves a claimed record from `to` back to `from`.
    async fn release(
        &self,
        record: &AdjustmentRecord,
        from: AdjustmentState,
        to: AdjustmentState,
        now: Timestamp,
    ) {
        let previous_at = record
            .temporal
            .as_ref()
            .and_then(|temporal| temporal.activated_at)
            .unwrap_or(now);

        let release = StateTransition {
            uuid: record.uuid,
            from: to,
            to: from,
            at: previous_at,
            snapshot: (from == AdjustmentState::Scheduled).then(Vec::new),
        };

        match self.adjustments.transition(release).await {
            Ok(true) => {}
            Ok(false) => warn!(
                adjustment_uuid = %record.uuid,
                "adjustment moved on before its claim could be released"
            ),
            Err(error) => warn!(
                adjustment_uuid = %record.uuid,
                %error,
                "failed to release adjustment after a failed transition"
            ),
        }
    }

    async fn settled(
        &self,
        uuid: AdjustmentUuid,
        operation: &'static str,
        expected: AdjustmentState,
    ) -> Result<AdjustmentRecord, AdjustmentsServiceError> {
        let record = self.load(uuid).await?;

        match record.state() {
            Some(state) if state == expected => Ok(record),
            Some(state) => Err(AdjustmentsServiceError::InvalidState { state, operation }),
            None => Err(AdjustmentsServiceError::NotTemporal),
        }
    }
}

fn validate(
    adjustment: &NewTemporalAdjustment,
    now: Timestamp,
) -> Result<(Vec<ProductId>, Percentage, TemporalWindow), AdjustmentsServiceError> {
    let product_ids = selected_ids(&adjustment.product_ids)?;
    let percentage = Percentage::new(adjustment.percentage)?;
    let window = TemporalWindow::new(adjustment.starts_at, adjustment.ends_at)?;

    if adjustment.category.trim().is_empty() {
        return Err(AdjustmentsServiceError::MissingCategory);
    }

    if window.has_ended(now) {
        return Err(AdjustmentsServiceError::WindowElapsed);
    }

    Ok((product_ids, percentage, window))
}

fn details(record: &AdjustmentRecord) -> Result<&TemporalDetails, AdjustmentsServiceError> {
    record
        .temporal
        .as_ref()
        .ok_or(AdjustmentsServiceError::NotTemporal)
}

#[async_trait]
impl TemporalAdjustmentsService for TemporalAdjustments {
    async fn simulate(
        &self,
        product_ids: &[ProductId],
        percentage: Decimal,
        is_increase: bool,
        starts_at: Timestamp,
        ends_at: Timestamp,
    ) -> Result<TemporalPreview, AdjustmentsServiceError> {
        if product_ids.is_empty() {
            return Err(AdjustmentsServiceError::EmptyProductSet);
        }

        let percentage = Percentage::new(percentage)?;
        let window = TemporalWindow::new(starts_at, ends_at)?;
        let products = self.products.get_products(&unique_ids(product_ids)).await?;

        Ok(TemporalPreview {
            rows: preview_rows(
                &products,
                percentage,
                Direction::from_is_increase(is_increase),
            )?,
            duration_days: window.duration_days(),
        })
    }

    #[tracing::instrument(
        name = "adjustments.service.create_temporal",
        skip(self, adjustment),
        fields(
            actor = %adjustment.actor,
            category = %adjustment.category,
            adjustment_uuid = tracing::field::Empty,
            state = tracing::field::Empty
        ),
        err
    )]
    async fn create(
        &self,
        adjustment: NewTemporalAdjustment,
        now: Timestamp,
    ) -> Result<AdjustmentRecord, AdjustmentsServiceError> {
        let (product_ids, percentage, window) = validate(&adjustment, now)?;
        let direction = Direction::from_is_increase(adjustment.is_increase);

        let uuid = AdjustmentUuid::new();
        let span = Span::current();

        span.record("adjustment_uuid", tracing::field::display(uuid));

        let _product_guards = self.product_locks.lock_all(product_ids.iter().copied()).await;

        let products = load_all(self.products.as_ref(), &product_ids).await?;

        let mut temporal = TemporalDetails {
            window,
            category: adjustment.category.trim().to_string(),
            state: AdjustmentState::Scheduled,
            snapshot: Vec::new(),
            activated_at: None,
            finalized_at: None,
        };

        let mut plan = PricePlan::default();

        if window.has_started(now) {
            plan = PricePlan::adjust(&products, percentage, direction)?;

            temporal.state = AdjustmentState::Active;
            temporal.snapshot.clone_from(&plan.snapshot);
            temporal.activated_at = Some(now);
        }

        span.record("state", tracing::field::display(temporal.state));

        let written = plan.commit(self.products.as_ref()).await?;

        let audit_entry = match self
            .record_audit(
                &adjustment.actor,
                AuditAction::CreateAdjustment,
                uuid,
                plan.detail(),
            )
            .await
        {
            Ok(audit_entry) => audit_entry,
            Err(error) => {
                plan.undo(self.products.as_ref(), &written).await;

                return Err(error.into());
            }
        };

        let inserted = self
            .adjustments
            .insert(AdjustmentRecord {
                uuid,
                product_ids,
                percentage,
                direction,
                description: adjustment.description,
                created_at: now,
                created_by: adjustment.actor,
                audit_entry: Some(audit_entry),
                is_reverted: false,
                temporal: Some(temporal),
            })
            .await;

        let record = match inserted {
            Ok(record) => record,
            Err(error) => {
                plan.undo(self.products.as_ref(), &written).await;

                warn!(
                    adjustment_uuid = %uuid,
                    %audit_entry,
                    "adjustment record was not stored; prices restored"
                );

                return Err(error.into());
            }
        };

        info!(
            adjustment_uuid = %record.uuid,
            state = ?record.state(),
            "created temporal adjustment"
        );

        Ok(record)
    }

    #[tracing::instrument(
        name = "adjustments.service.activate",
        skip(self),
        fields(adjustment_uuid = %uuid),
        err
    )]
    async fn activate(
        &self,
        uuid: AdjustmentUuid,
        actor: &str,
    ) -> Result<AdjustmentRecord, AdjustmentsServiceError> {
        let _record_guard = self.record_locks.lock(uuid).await;

        let record = self.load(uuid).await?;

        match details(&record)?.state {
            AdjustmentState::Active => return Ok(record),
            state @ AdjustmentState::Finished => {
                return Err(AdjustmentsServiceError::InvalidState {
                    state,
                    operation: "activate",
                });
            }
            AdjustmentState::Scheduled => {}
        }

        let _product_guards = self
            .product_locks
            .lock_all(record.product_ids.iter().copied())
            .await;

        let products = load_all(self.products.as_ref(), &record.product_ids).await?;
        let plan = PricePlan::adjust(&products, record.percentage, record.direction)?;

        let claimed = self
            .transition_with_prices(
                &record,
                AdjustmentState::Scheduled,
                AdjustmentState::Active,
                &plan,
                actor,
                AuditAction::ActivateTemporal,
            )
            .await?;

        if !claimed {
            return self.settled(uuid, "activate", AdjustmentState::Active).await;
        }

        info!(adjustment_uuid = %uuid, product_count = products.len(), "activated temporal adjustment");

        self.load(uuid).await
    }

    #[tracing::instrument(
        name = "adjustments.service.finalize",
        skip(self),
        fields(adjustment_uuid = %uuid, drifted = tracing::field::Empty),
        err
    )]
    async fn finalize(
        &self,
        uuid: AdjustmentUuid,
        actor: &str,
    ) -> Result<AdjustmentRecord, AdjustmentsServiceError> {
        let _record_guard = self.record_locks.lock(uuid).await;

        let record = self.load(uuid).await?;
        let temporal = details(&record)?;

        match temporal.state {
            AdjustmentState::Finished => return Ok(record),
            state @ AdjustmentState::Scheduled => {
                return Err(AdjustmentsServiceError::InvalidState {
                    state,
                    operation: "finalize",
                });
            }
            AdjustmentState::Active => {}
        }

        let snapshot_ids: Vec<ProductId> = temporal
            .snapshot
            .iter()
            .map(|captured| captured.product_id)
            .collect();

        let _product_guards = self
            .product_locks
            .lock_all(snapshot_ids.iter().copied())
            .await;

        let products = self.products.get_products(&snapshot_ids).await?;

        let mut drifted = 0_usize;

        for captured in &temporal.snapshot {
            let current = products.iter().find(|p| p.id == captured.product_id);

            if let Some(current) = current.filter(|p| p.prices != captured.applied) {
                drifted += 1;

                warn!(
                    adjustment_uuid = %uuid,
                    product = %current.id,
                    "prices changed while the adjustment was active; restoring captured prices"
                );
            }
        }

        Span::current().record("drifted", drifted);

        let plan = PricePlan::restore(&products, &temporal.snapshot);

        let claimed = self
            .transition_with_prices(
                &record,
                AdjustmentState::Active,
                AdjustmentState::Finished,
                &plan,
                actor,
                AuditAction::FinalizeTemporal,
            )
            .await?;

        if !claimed {
            return self
                .settled(uuid, "finalize", AdjustmentState::Finished)
                .await;
        }

        info!(adjustment_uuid = %uuid, drifted, "finalized temporal adjustment");

        self.load(uuid).await
    }

    async fn list_by_state(
        &self,
        state: AdjustmentState,
    ) -> Result<Vec<AdjustmentRecord>, AdjustmentsServiceError> {
        Ok(self.adjustments.list_by_state(state).await?)
    }

    async fn get(&self, uuid: AdjustmentUuid) -> Result<AdjustmentRecord, AdjustmentsServiceError> {
        self.load(uuid).await
    }
}

#[automock]
#[async_trait]
pub trait TemporalAdjustmentsService: Send + Sync {
    /// Previews an adjustment over a window without writing anything.
    async fn simulate(
        &self,
        product_ids: &[ProductId],
        percentage: Decimal,
        is_increase: bool,
        starts_at: Timestamp,
        ends_at: Timestamp,
    ) -> Result<TemporalPreview, AdjustmentsServiceError>;

    /// Registers an adjustment, activating it at once when its window has already started.
    async fn create(
        &self,
        adjustment: NewTemporalAdjustment,
        now: Timestamp,
    ) -> Result<AdjustmentRecord, AdjustmentsServiceError>;

    /// Applies a scheduled adjustment. A no-op on an active one.
    async fn activate(
        &self,
        uuid: AdjustmentUuid,
        actor: &str,
    ) -> Result<AdjustmentRecord, AdjustmentsServiceError>;

    /// Restores the prices captured at activation. A no-op on a finished adjustment.
    async fn finalize(
        &self,
        uuid: AdjustmentUuid,
        actor: &str,
    ) -> Result<AdjustmentRecord, AdjustmentsServiceError>;

    async fn list_by_state(
        &self,
        state: AdjustmentState,
    ) -> Result<Vec<AdjustmentRecord>, AdjustmentsServiceError>;

    async fn get(&self, uuid: AdjustmentUuid) -> Result<AdjustmentRecord, AdjustmentsServiceError>;
}
