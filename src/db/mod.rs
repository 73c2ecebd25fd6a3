//! Database module for StatusWatch.
//!
//! Provides SQLite storage for websites and their ticks.

mod models;
mod store;

pub use models::*;
pub use store::*;
