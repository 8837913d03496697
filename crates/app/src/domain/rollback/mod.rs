//! Rollback
//!
//! Reverting audited changes.

pub mod errors;
pub mod policy;
pub mod service;

pub use errors::RollbackServiceError;
pub use policy::SegmentPolicy;
pub use service::*;
