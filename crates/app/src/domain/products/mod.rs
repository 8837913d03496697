//! Products
//!
//! The price store holding each product's cost, cash and list prices.

mod memory;
pub mod records;
mod repository;
pub mod store;

pub use memory::InMemoryProductPriceStore;
pub use repository::PgProductPriceStore;
pub use store::*;
