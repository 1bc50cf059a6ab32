//! Domain models for the Inventory Management API

mod order;
mod stock;
mod user;

pub use order::*;
pub use stock::*;
pub use user::*;
