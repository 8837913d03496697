//! Audit trail store.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;

use crate::domain::{
    audit::records::{AuditEntry, AuditEntryUuid, NewAuditEntry},
    errors::StoreError,
};

#[automock]
#[async_trait]
pub trait AuditTrail: Send + Sync {
    /// Appends a new entry.
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, StoreError>;

    /// Retrieve a single entry.
    async fn get_entry(&self, uuid: AuditEntryUuid) -> Result<AuditEntry, StoreError>;

    /// Most recent entries first.
    async fn list_entries(&self, limit: usize) -> Result<Vec<AuditEntry>, StoreError>;

    /// Flags an entry as reverted unless it already is.
    ///
    /// Returns `false` when another caller reverted it first.
    async fn mark_reverted(
        &self,
        uuid: AuditEntryUuid,
        reverted_by: String,
        reverted_at: Timestamp,
    ) -> Result<bool, StoreError>;
}
