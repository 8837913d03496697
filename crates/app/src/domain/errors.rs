//! Shared storage errors and error classification.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind as SqlErrorKind},
};
use thiserror::Error;

/// Errors raised by the price, audit, sale and adjustment stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    AlreadyExists,

    #[error("record was modified concurrently")]
    Conflict,

    #[error("related resource not found")]
    InvalidReference,

    #[error("invalid data")]
    InvalidData,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for StoreError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(SqlErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(SqlErrorKind::ForeignKeyViolation) => Self::InvalidReference,
            Some(SqlErrorKind::NotNullViolation | SqlErrorKind::CheckViolation) => {
                Self::InvalidData
            }
            _ => Self::Sql(error),
        }
    }
}

/// Coarse classification of service failures for the calling layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input failed validation; nothing was written.
    InvalidArgument,

    /// A referenced record does not exist.
    NotFound,

    /// The record is not in a state that allows the operation.
    InvalidState,

    /// The audit entry was already rolled back.
    AlreadyReverted,

    /// The audit entry's entity and action cannot be rolled back.
    UnsupportedRollback,

    /// A concurrent writer changed the data first; the operation may be retried.
    Conflict,

    /// The backing store failed.
    Storage,
}

impl StoreError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound => ErrorKind::NotFound,
            Self::Conflict | Self::AlreadyExists => ErrorKind::Conflict,
            Self::InvalidReference | Self::InvalidData => ErrorKind::InvalidArgument,
            Self::Sql(_) => ErrorKind::Storage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let error = StoreError::from(Error::RowNotFound);

        assert!(matches!(error, StoreError::NotFound));
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn other_sqlx_errors_are_storage_failures() {
        let error = StoreError::from(Error::PoolTimedOut);

        assert!(matches!(error, StoreError::Sql(_)));
        assert_eq!(error.kind(), ErrorKind::Storage);
    }
}
