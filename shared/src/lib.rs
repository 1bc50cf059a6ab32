//! Shared types and domain rules for the Inventory Management API
//!
//! This crate holds everything that does not need a database or an HTTP stack:
//! roles, order status rules, stock arithmetic, pagination and validation helpers.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
