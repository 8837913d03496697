//! Adjustments Repository

use async_trait::async_trait;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use repricer::{
    percentage::{Direction, Percentage},
    products::ProductId,
};
use rust_decimal::Decimal;
use sqlx::{
    FromRow, PgPool, Postgres, Row, postgres::PgRow, query, query_as, query_scalar, types::Json,
};
use uuid::Uuid;

use crate::domain::{
    adjustments::{
        records::{
            AdjustmentRecord, AdjustmentState, AdjustmentUuid, PriceSnapshot, StateTransition,
            TemporalDetails, TemporalWindow,
        },
        store::AdjustmentStore,
    },
    audit::records::AuditEntryUuid,
    errors::StoreError,
};

const INSERT_ADJUSTMENT_SQL: &str = include_str!("sql/insert_adjustment.sql");
const GET_ADJUSTMENT_SQL: &str = include_str!("sql/get_adjustment.sql");
const LIST_ADJUSTMENTS_BY_STATE_SQL: &str = include_str!("sql/list_adjustments_by_state.sql");
const TRANSITION_ADJUSTMENT_SQL: &str = include_str!("sql/transition_adjustment.sql");
const MARK_ADJUSTMENT_REVERTED_SQL: &str = include_str!("sql/mark_adjustment_reverted.sql");
const ADJUSTMENT_EXISTS_SQL: &str = include_str!("sql/adjustment_exists.sql");

/// PostgreSQL-backed adjustment store.
#[derive(Debug, Clone)]
pub struct PgAdjustmentStore {
    pool: PgPool,
}

impl PgAdjustmentStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, uuid: AdjustmentUuid) -> Result<bool, StoreError> {
        query_scalar(ADJUSTMENT_EXISTS_SQL)
            .bind(uuid.into_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl AdjustmentStore for PgAdjustmentStore {
    async fn insert(&self, record: AdjustmentRecord) -> Result<AdjustmentRecord, StoreError> {
        let product_ids: Vec<i64> = record.product_ids.iter().map(|id| id.get()).collect();
        let temporal = record.temporal.as_ref();

        query_as::<Postgres, AdjustmentRecord>(INSERT_ADJUSTMENT_SQL)
            .bind(record.uuid.into_uuid())
            .bind(product_ids)
            .bind(record.percentage.value())
            .bind(record.direction.is_increase())
            .bind(&record.description)
            .bind(SqlxTimestamp::from(record.created_at))
            .bind(&record.created_by)
            .bind(record.audit_entry.map(AuditEntryUuid::into_uuid))
            .bind(record.is_reverted)
            .bind(temporal.is_some())
            .bind(temporal.map(|t| SqlxTimestamp::from(t.window.starts_at())))
            .bind(temporal.map(|t| SqlxTimestamp::from(t.window.ends_at())))
            .bind(temporal.map(|t| t.category.clone()))
            .bind(temporal.map(|t| t.state.as_str()))
            .bind(Json(temporal.map(|t| t.snapshot.clone()).unwrap_or_default()))
            .bind(temporal.and_then(|t| t.activated_at).map(SqlxTimestamp::from))
            .bind(temporal.and_then(|t| t.finalized_at).map(SqlxTimestamp::from))
            .fetch_one(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn get(&self, uuid: AdjustmentUuid) -> Result<AdjustmentRecord, StoreError> {
        query_as::<Postgres, AdjustmentRecord>(GET_ADJUSTMENT_SQL)
            .bind(uuid.into_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn list_by_state(
        &self,
        state: AdjustmentState,
    ) -> Result<Vec<AdjustmentRecord>, StoreError> {
        query_as::<Postgres, AdjustmentRecord>(LIST_ADJUSTMENTS_BY_STATE_SQL)
            .bind(state.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    #[tracing::instrument(
        name = "adjustments.store.transition",
        skip(self, transition),
        fields(
            adjustment = %transition.uuid,
            from = %transition.from,
            to = %transition.to,
        ),
        err
    )]
    async fn transition(&self, transition: StateTransition) -> Result<bool, StoreError> {
        let rows_affected = query(TRANSITION_ADJUSTMENT_SQL)
            .bind(transition.uuid.into_uuid())
            .bind(transition.from.as_str())
            .bind(transition.to.as_str())
            .bind(transition.snapshot.map(Json))
            .bind(SqlxTimestamp::from(transition.at))
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows_affected > 0 {
            return Ok(true);
        }

        if self.exists(transition.uuid).await? {
            Ok(false)
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn mark_reverted(&self, uuid: AdjustmentUuid) -> Result<bool, StoreError> {
        let rows_affected = query(MARK_ADJUSTMENT_REVERTED_SQL)
            .bind(uuid.into_uuid())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows_affected > 0 {
            return Ok(true);
        }

        if self.exists(uuid).await? {
            Ok(false)
        } else {
            Err(StoreError::NotFound)
        }
    }
}

fn decode_error(column: &str, source: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}

fn temporal_details(row: &PgRow) -> sqlx::Result<Option<TemporalDetails>> {
    if !row.try_get::<bool, _>("is_temporal")? {
        return Ok(None);
    }

    let starts_at = row.try_get::<SqlxTimestamp, _>("starts_at")?.to_jiff();
    let ends_at = row.try_get::<SqlxTimestamp, _>("ends_at")?.to_jiff();
    let window =
        TemporalWindow::new(starts_at, ends_at).map_err(|error| decode_error("ends_at", error))?;

    let state = row
        .try_get::<String, _>("state")?
        .parse::<AdjustmentState>()
        .map_err(|error| decode_error("state", error))?;

    let Json(snapshot) = row.try_get::<Json<Vec<PriceSnapshot>>, _>("snapshot")?;

    Ok(Some(TemporalDetails {
        window,
        category: row.try_get("category")?,
        state,
        snapshot,
        activated_at: row
            .try_get::<Option<SqlxTimestamp>, _>("activated_at")?
            .map(SqlxTimestamp::to_jiff),
        finalized_at: row
            .try_get::<Option<SqlxTimestamp>, _>("finalized_at")?
            .map(SqlxTimestamp::to_jiff),
    }))
}

impl<'r> FromRow<'r, PgRow> for AdjustmentRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let percentage = Percentage::new(row.try_get::<Decimal, _>("percentage")?)
            .map_err(|error| decode_error("percentage", error))?;

        Ok(Self {
            uuid: AdjustmentUuid::from_uuid(row.try_get("uuid")?),
            product_ids: row
                .try_get::<Vec<i64>, _>("product_ids")?
                .into_iter()
                .map(ProductId::new)
                .collect(),
            percentage,
            direction: Direction::from_is_increase(row.try_get("is_increase")?),
            description: row.try_get("description")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            created_by: row.try_get("created_by")?,
            audit_entry: row
                .try_get::<Option<Uuid>, _>("audit_entry_uuid")?
                .map(AuditEntryUuid::from_uuid),
            is_reverted: row.try_get("is_reverted")?,
            temporal: temporal_details(row)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use jiff::{SignedDuration, Timestamp};
    use rust_decimal_macros::dec;
    use testresult::TestResult;

    use crate::test::TestDb;

    use super::*;

    fn scheduled(now: Timestamp) -> TestResult<AdjustmentRecord> {
        Ok(AdjustmentRecord {
            uuid: AdjustmentUuid::new(),
            product_ids: vec![ProductId::new(1), ProductId::new(2)],
            percentage: Percentage::new(dec!(12.5))?,
            direction: Direction::Increase,
            description: "Winter".to_string(),
            created_at: now,
            created_by: "admin".to_string(),
            audit_entry: None,
            is_reverted: false,
            temporal: Some(TemporalDetails {
                window: TemporalWindow::new(now, now + SignedDuration::from_hours(24))?,
                category: "seasonal".to_string(),
                state: AdjustmentState::Scheduled,
                snapshot: Vec::new(),
                activated_at: None,
                finalized_at: None,
            }),
        })
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for the Postgres container"]
    async fn transitions_are_compare_and_set() -> TestResult {
        let db = TestDb::new().await;
        let store = PgAdjustmentStore::new(db.pool().clone());
        let now = Timestamp::now();

        let record = store.insert(scheduled(now)?).await?;

        let activate = StateTransition {
            uuid: record.uuid,
            from: AdjustmentState::Scheduled,
            to: AdjustmentState::Active,
            at: now,
            snapshot: Some(Vec::new()),
        };

        assert!(store.transition(activate.clone()).await?);
        assert!(!store.transition(activate).await?);

        let active = store.list_by_state(AdjustmentState::Active).await?;

        assert_eq!(active.len(), 1);
        assert_eq!(active.first().map(|r| r.percentage.value()), Some(dec!(12.5)));

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon for the Postgres container"]
    async fn missing_adjustment_is_not_found() -> TestResult {
        let db = TestDb::new().await;
        let store = PgAdjustmentStore::new(db.pool().clone());

        let result = store.mark_reverted(AdjustmentUuid::new()).await;

        assert!(
            matches!(result, Err(StoreError::NotFound)),
            "expected NotFound, got {result:?}"
        );

        Ok(())
    }
}
