//! Audit Repository

use async_trait::async_trait;
use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, PgPool, Postgres, Row, postgres::PgRow, query, query_as, query_scalar};

use crate::domain::{
    audit::{
        records::{AuditAction, AuditEntry, AuditEntryUuid, EntityType, NewAuditEntry},
        store::AuditTrail,
    },
    errors::StoreError,
};

const APPEND_ENTRY_SQL: &str = include_str!("sql/append_entry.sql");
const GET_ENTRY_SQL: &str = include_str!("sql/get_entry.sql");
const LIST_ENTRIES_SQL: &str = include_str!("sql/list_entries.sql");
const MARK_REVERTED_SQL: &str = include_str!("sql/mark_reverted.sql");
const ENTRY_EXISTS_SQL: &str = include_str!("sql/entry_exists.sql");

/// PostgreSQL-backed audit trail.
#[derive(Debug, Clone)]
pub struct PgAuditTrail {
    pool: PgPool,
}

impl PgAuditTrail {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditTrail for PgAuditTrail {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, StoreError> {
        query_as::<Postgres, AuditEntry>(APPEND_ENTRY_SQL)
            .bind(entry.uuid.into_uuid())
            .bind(SqlxTimestamp::from(entry.occurred_at))
            .bind(entry.actor)
            .bind(String::from(entry.entity_type))
            .bind(String::from(entry.action))
            .bind(entry.primary_key)
            .bind(entry.detail)
            .fetch_one(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn get_entry(&self, uuid: AuditEntryUuid) -> Result<AuditEntry, StoreError> {
        query_as::<Postgres, AuditEntry>(GET_ENTRY_SQL)
            .bind(uuid.into_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn list_entries(&self, limit: usize) -> Result<Vec<AuditEntry>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        query_as::<Postgres, AuditEntry>(LIST_ENTRIES_SQL)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn mark_reverted(
        &self,
        uuid: AuditEntryUuid,
        reverted_by: String,
        reverted_at: Timestamp,
    ) -> Result<bool, StoreError> {
        let rows_affected = query(MARK_REVERTED_SQL)
            .bind(uuid.into_uuid())
            .bind(reverted_by)
            .bind(SqlxTimestamp::from(reverted_at))
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows_affected > 0 {
            return Ok(true);
        }

        let exists: bool = query_scalar(ENTRY_EXISTS_SQL)
            .bind(uuid.into_uuid())
            .fetch_one(&self.pool)
            .await?;

        if exists {
            Ok(false)
        } else {
            Err(StoreError::NotFound)
        }
    }
}

impl<'r> FromRow<'r, PgRow> for AuditEntry {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: AuditEntryUuid::from_uuid(row.try_get("uuid")?),
            occurred_at: row.try_get::<SqlxTimestamp, _>("occurred_at")?.to_jiff(),
            actor: row.try_get("actor")?,
            entity_type: EntityType::from(row.try_get::<String, _>("entity_type")?),
            action: AuditAction::from(row.try_get::<String, _>("action")?),
            primary_key: row.try_get("primary_key")?,
            detail: row.try_get("detail")?,
            is_reverted: row.try_get("is_reverted")?,
            reverted_by: row.try_get("reverted_by")?,
            reverted_at: row
                .try_get::<Option<SqlxTimestamp>, _>("reverted_at")?
                .map(SqlxTimestamp::to_jiff),
        })
    }
}
