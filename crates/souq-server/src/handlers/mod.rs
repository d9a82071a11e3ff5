//! Request handlers, one module per resource.

pub mod health;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod storefront;
