//! In-memory adjustment store.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rustc_hash::FxHashMap;

use crate::domain::{
    adjustments::{
        records::{AdjustmentRecord, AdjustmentState, AdjustmentUuid, StateTransition},
        store::AdjustmentStore,
    },
    errors::StoreError,
};

/// Adjustment store kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryAdjustmentStore {
    records: Mutex<FxHashMap<AdjustmentUuid, AdjustmentRecord>>,
}

impl InMemoryAdjustmentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AdjustmentStore for InMemoryAdjustmentStore {
    async fn insert(&self, record: AdjustmentRecord) -> Result<AdjustmentRecord, StoreError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);

        if records.contains_key(&record.uuid) {
            return Err(StoreError::AlreadyExists);
        }

        records.insert(record.uuid, record.clone());

        Ok(record)
    }

    async fn get(&self, uuid: AdjustmentUuid) -> Result<AdjustmentRecord, StoreError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&uuid)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_by_state(
        &self,
        state: AdjustmentState,
    ) -> Result<Vec<AdjustmentRecord>, StoreError> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);

        let mut matching: Vec<AdjustmentRecord> = records
            .values()
            .filter(|record| record.state() == Some(state))
            .cloned()
            .collect();

        matching.sort_by_key(|record| (record.created_at, record.uuid));

        Ok(matching)
    }

    async fn transition(&self, transition: StateTransition) -> Result<bool, StoreError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);

        let record = records.get_mut(&transition.uuid).ok_or(StoreError::NotFound)?;
        let temporal = record.temporal.as_mut().ok_or(StoreError::InvalidData)?;

        if temporal.state != transition.from {
            return Ok(false);
        }

        temporal.state = transition.to;

        match transition.to {
            AdjustmentState::Active => {
                temporal.activated_at = Some(transition.at);
                temporal.finalized_at = None;
            }
            AdjustmentState::Finished => temporal.finalized_at = Some(transition.at),
            AdjustmentState::Scheduled => temporal.activated_at = None,
        }

        if let Some(snapshot) = transition.snapshot {
            temporal.snapshot = snapshot;
        }

        Ok(true)
    }

    async fn mark_reverted(&self, uuid: AdjustmentUuid) -> Result<bool, StoreError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);

        let record = records.get_mut(&uuid).ok_or(StoreError::NotFound)?;

        if record.is_reverted {
            return Ok(false);
        }

        record.is_reverted = true;

        Ok(true)
    }
}
