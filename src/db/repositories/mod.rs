//! Database repositories

pub mod message;
pub mod transaction;
