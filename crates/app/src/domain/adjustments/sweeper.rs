//! Temporal Sweeper
//!
//! Periodically activates scheduled adjustments whose window has started and finalises active ones
//! whose window has ended, through the same idempotent entry points an operator would use.

use std::{fmt, future::Future, sync::Arc, time::Duration};

use jiff::Timestamp;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use crate::domain::adjustments::{
    errors::AdjustmentsServiceError, records::AdjustmentState, temporal::TemporalAdjustmentsService,
};

/// Actor recorded on audit entries written by the sweeper.
pub const SWEEPER_ACTOR: &str = "system:sweeper";

/// Outcome of a single sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub activated: usize,
    pub finalized: usize,
    pub failed: usize,
}

impl SweepReport {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

pub struct TemporalSweeper {
    service: Arc<dyn TemporalAdjustmentsService>,
    interval: Duration,
    actor: String,
}

impl fmt::Debug for TemporalSweeper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporalSweeper")
            .field("interval", &self.interval)
            .field("actor", &self.actor)
            .finish_non_exhaustive()
    }
}

impl TemporalSweeper {
    #[must_use]
    pub fn new(service: Arc<dyn TemporalAdjustmentsService>, interval: Duration) -> Self {
        Self {
            service,
            interval,
            actor: SWEEPER_ACTOR.to_string(),
        }
    }

    /// Runs one pass against `now`.
    ///
    /// Failures on individual adjustments are logged and counted; only failing to list
    /// adjustments aborts the pass.
    ///
    /// # Errors
    ///
    /// Returns the error raised while listing scheduled or active adjustments.
    #[tracing::instrument(name = "adjustments.sweeper.run_once", skip(self), err)]
    pub async fn run_once(&self, now: Timestamp) -> Result<SweepReport, AdjustmentsServiceError> {
        let mut report = SweepReport::default();

        for record in self.service.list_by_state(AdjustmentState::Scheduled).await? {
            let due = record
                .temporal
                .as_ref()
                .is_some_and(|temporal| temporal.window.has_started(now));

            if !due {
                continue;
            }

            match self.service.activate(record.uuid, &self.actor).await {
                Ok(_) => report.activated += 1,
                Err(error) => {
                    report.failed += 1;

                    warn!(adjustment_uuid = %record.uuid, %error, "failed to activate adjustment");
                }
            }
        }

        for record in self.service.list_by_state(AdjustmentState::Active).await? {
            let expired = record
                .temporal
                .as_ref()
                .is_some_and(|temporal| temporal.window.has_ended(now));

            if !expired {
                continue;
            }

            match self.service.finalize(record.uuid, &self.actor).await {
                Ok(_) => report.finalized += 1,
                Err(error) => {
                    report.failed += 1;

                    warn!(adjustment_uuid = %record.uuid, %error, "failed to finalize adjustment");
                }
            }
        }

        if !report.is_idle() {
            info!(
                activated = report.activated,
                finalized = report.finalized,
                failed = report.failed,
                "sweep completed"
            );
        }

        Ok(report)
    }

    /// Sweeps on a fixed interval until `shutdown` resolves.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.interval);

        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);

        info!(interval = ?self.interval, "temporal sweeper started");

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => break,
                _ = ticker.tick() => {
                    if let Err(error) = self.run_once(Timestamp::now()).await {
                        warn!(%error, "sweep failed");
                    }
                }
            }
        }

        info!("temporal sweeper stopped");
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;
    use repricer::{
        percentage::{Direction, Percentage},
        pricing::PriceFields,
        products::ProductId,
    };
    use rust_decimal_macros::dec;
    use testresult::TestResult;

    use crate::{
        domain::adjustments::{
            data::NewTemporalAdjustment,
            records::{AdjustmentRecord, AdjustmentUuid, TemporalDetails, TemporalWindow},
            temporal::MockTemporalAdjustmentsService,
        },
        test::TestContext,
    };

    use super::*;

    fn promo(starts_at: Timestamp, ends_at: Timestamp) -> NewTemporalAdjustment {
        NewTemporalAdjustment {
            product_ids: vec![ProductId::new(1)],
            percentage: dec!(50),
            is_increase: false,
            description: "Clearance".to_string(),
            actor: "admin".to_string(),
            starts_at,
            ends_at,
            category: "clearance".to_string(),
        }
    }

    #[tokio::test]
    async fn sweep_drives_the_lifecycle() -> TestResult {
        let ctx = TestContext::new();
        let now = Timestamp::now();
        let hour = SignedDuration::from_hours(1);

        ctx.seed_product(1, dec!(10), dec!(20), dec!(30));

        let record = ctx.temporal.create(promo(now + hour, now + hour * 3), now).await?;
        let sweeper = TemporalSweeper::new(ctx.temporal_service(), Duration::from_secs(60));

        assert!(sweeper.run_once(now).await?.is_idle());

        let report = sweeper.run_once(now + hour * 2).await?;

        assert_eq!(report.activated, 1);
        assert_eq!(ctx.prices(1)?, PriceFields::new(dec!(5), dec!(10), dec!(15)));

        let report = sweeper.run_once(now + hour * 3).await?;

        assert_eq!(report.finalized, 1);
        assert_eq!(ctx.prices(1)?, PriceFields::new(dec!(10), dec!(20), dec!(30)));
        assert_eq!(
            ctx.temporal.get(record.uuid).await?.state(),
            Some(AdjustmentState::Finished)
        );

        let entries = ctx.audit.entries();

        assert!(entries.iter().skip(1).all(|entry| entry.actor == SWEEPER_ACTOR));

        Ok(())
    }

    #[tokio::test]
    async fn missed_window_is_activated_and_finalized_in_one_pass() -> TestResult {
        let ctx = TestContext::new();
        let now = Timestamp::now();
        let hour = SignedDuration::from_hours(1);

        ctx.seed_product(1, dec!(10), dec!(20), dec!(30));

        ctx.temporal.create(promo(now + hour, now + hour * 2), now).await?;

        let sweeper = TemporalSweeper::new(ctx.temporal_service(), Duration::from_secs(60));
        let report = sweeper.run_once(now + hour * 5).await?;

        assert_eq!(
            report,
            SweepReport {
                activated: 1,
                finalized: 1,
                failed: 0
            }
        );
        assert_eq!(ctx.prices(1)?, PriceFields::new(dec!(10), dec!(20), dec!(30)));

        Ok(())
    }

    #[tokio::test]
    async fn failures_are_counted_not_raised() -> TestResult {
        let now = Timestamp::now();
        let hour = SignedDuration::from_hours(1);
        let window = TemporalWindow::new(now - hour, now + hour)?;

        let record = AdjustmentRecord {
            uuid: AdjustmentUuid::new(),
            product_ids: vec![ProductId::new(1)],
            percentage: Percentage::new(dec!(5))?,
            direction: Direction::Increase,
            description: String::new(),
            created_at: now,
            created_by: "admin".to_string(),
            audit_entry: None,
            is_reverted: false,
            temporal: Some(TemporalDetails {
                window,
                category: "promo".to_string(),
                state: AdjustmentState::Scheduled,
                snapshot: Vec::new(),
                activated_at: None,
                finalized_at: None,
            }),
        };

        let mut service = MockTemporalAdjustmentsService::new();

        service
            .expect_list_by_state()
            .returning(move |state| {
                Ok(if state == AdjustmentState::Scheduled {
                    vec![record.clone()]
                } else {
                    Vec::new()
                })
            });
        service
            .expect_activate()
            .returning(|_, _| Err(AdjustmentsServiceError::ProductNotFound(ProductId::new(1))));

        let sweeper = TemporalSweeper::new(Arc::new(service), Duration::from_secs(60));
        let report = sweeper.run_once(now).await?;

        assert_eq!(report.failed, 1);
        assert_eq!(report.activated, 0);

        Ok(())
    }

    #[tokio::test]
    async fn run_until_stops_on_shutdown() -> TestResult {
        let ctx = TestContext::new();
        let sweeper = TemporalSweeper::new(ctx.temporal_service(), Duration::from_millis(5));

        tokio::time::timeout(
            Duration::from_secs(5),
            sweeper.run_until(tokio::time::sleep(Duration::from_millis(20))),
        )
        .await?;

        Ok(())
    }
}
