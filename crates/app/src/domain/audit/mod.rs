//! Audit
//!
//! Append-only change records. Price actions carry a reversible diff in `detail`.

mod memory;
pub mod records;
mod repository;
pub mod store;

pub use memory::InMemoryAuditTrail;
pub use repository::PgAuditTrail;
pub use store::*;
