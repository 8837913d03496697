//! Adjustments
//!
//! Permanent and temporal percentage adjustments, their records and the sweeper driving temporal
//! lifecycles.

pub mod commit;
pub mod data;
pub mod errors;
mod memory;
pub mod permanent;
pub mod preview;
pub mod records;
mod repository;
pub mod store;
pub mod sweeper;
pub mod temporal;

pub use errors::AdjustmentsServiceError;
pub use memory::InMemoryAdjustmentStore;
pub use permanent::*;
pub use repository::PgAdjustmentStore;
pub use store::*;
pub use sweeper::{SweepReport, TemporalSweeper};
pub use temporal::*;
