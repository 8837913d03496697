//! Repricer Domain Concerns

pub mod adjustments;
pub mod audit;
pub mod errors;
pub mod products;
pub mod rollback;
pub mod sales;
