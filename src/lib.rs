//! Repricer
//!
//! Percentage price adjustments for a retail catalogue, and the reversible text encoding used to
//! record them in an audit trail.

pub mod detail;
pub mod percentage;
pub mod prelude;
pub mod pricing;
pub mod products;
