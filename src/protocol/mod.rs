//! Wire formats for each store's proof of entitlement.

pub mod app_store;
pub mod platform;
pub mod play_store;
pub mod steam;
