//! In-memory audit trail.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use jiff::Timestamp;

use crate::domain::{
    audit::{
        records::{AuditEntry, AuditEntryUuid, NewAuditEntry},
        store::AuditTrail,
    },
    errors::StoreError,
};

/// Audit trail kept in process memory, in append order.
#[derive(Debug, Default)]
pub struct InMemoryAuditTrail {
    entries: Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditTrail {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every entry in append order.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AuditTrail for InMemoryAuditTrail {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if entries.iter().any(|existing| existing.uuid == entry.uuid) {
            return Err(StoreError::AlreadyExists);
        }

        let entry = AuditEntry::from(entry);

        entries.push(entry.clone());

        Ok(entry)
    }

    async fn get_entry(&self, uuid: AuditEntryUuid) -> Result<AuditEntry, StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|entry| entry.uuid == uuid)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_entries(&self, limit: usize) -> Result<Vec<AuditEntry>, StoreError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_reverted(
        &self,
        uuid: AuditEntryUuid,
        reverted_by: String,
        reverted_at: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        let entry = entries
            .iter_mut()
            .find(|entry| entry.uuid == uuid)
            .ok_or(StoreError::NotFound)?;

        if entry.is_reverted {
            return Ok(false);
        }

        entry.is_reverted = true;
        entry.reverted_by = Some(reverted_by);
        entry.reverted_at = Some(reverted_at);

        Ok(true)
    }
}
