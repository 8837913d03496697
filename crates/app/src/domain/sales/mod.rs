//! Sales
//!
//! Only the slice of sales the rollback path needs: undoing a recorded sale creation.

mod memory;
pub mod records;
mod repository;
pub mod store;

pub use memory::InMemorySalesStore;
pub use repository::PgSalesStore;
pub use store::*;
