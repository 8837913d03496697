//! Adjustment record store.

use async_trait::async_trait;
use mockall::automock;

use crate::domain::{
    adjustments::records::{AdjustmentRecord, AdjustmentState, AdjustmentUuid, StateTransition},
    errors::StoreError,
};

#[automock]
#[async_trait]
pub trait AdjustmentStore: Send + Sync {
    /// Persists a new adjustment record.
    async fn insert(&self, record: AdjustmentRecord) -> Result<AdjustmentRecord, StoreError>;

    /// Retrieve a single adjustment.
    async fn get(&self, uuid: AdjustmentUuid) -> Result<AdjustmentRecord, StoreError>;

    /// Temporal adjustments currently in `state`, oldest first.
    async fn list_by_state(
        &self,
        state: AdjustmentState,
    ) -> Result<Vec<AdjustmentRecord>, StoreError>;

    /// Moves a temporal adjustment from `transition.from` to `transition.to`.
    ///
    /// Returns `false` without writing when the stored state is no longer `transition.from`.
    async fn transition(&self, transition: StateTransition) -> Result<bool, StoreError>;

    /// Flags an adjustment as reverted, returning `false` if it already was.
    async fn mark_reverted(&self, uuid: AdjustmentUuid) -> Result<bool, StoreError>;
}
