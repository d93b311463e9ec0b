//! Shared identifier types for the saga workspace.

pub mod types;

pub use types::{TransactionId, prefixed_id};
