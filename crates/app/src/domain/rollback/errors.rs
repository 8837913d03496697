//! Rollback service errors.

use repricer::detail::DetailError;
use thiserror::Error;

use crate::domain::{
    audit::records::{AuditAction, EntityType},
    errors::{ErrorKind, StoreError},
};

#[derive(Debug, Error)]
pub enum RollbackServiceError {
    #[error("audit entry not found")]
    NotFound,

    #[error("audit entry was already reverted")]
    AlreadyReverted,

    #[error("cannot roll back {action} on {entity_type}")]
    UnsupportedRollback {
        entity_type: EntityType,
        action: AuditAction,
    },

    #[error("malformed audit detail")]
    MalformedDetail(#[source] DetailError),

    #[error("rollback target {0} no longer exists")]
    TargetNotFound(String),

    #[error("invalid primary key {0:?}")]
    InvalidPrimaryKey(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RollbackServiceError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound | Self::TargetNotFound(_) => ErrorKind::NotFound,
            Self::AlreadyReverted => ErrorKind::AlreadyReverted,
            Self::UnsupportedRollback { .. } => ErrorKind::UnsupportedRollback,
            Self::MalformedDetail(_) | Self::InvalidPrimaryKey(_) => ErrorKind::InvalidState,
            Self::Store(error) => error.kind(),
        }
    }
}
