//! Stores, services and scheduling for percentage price adjustments.

pub mod context;
pub mod database;
pub mod domain;
pub mod locks;

#[cfg(test)]
mod test;

pub mod uuids;
