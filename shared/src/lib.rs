//! Shared types and utilities for passcount
//!
//! This crate contains the identifier, value and report types shared between
//! the collection scheduler (`passcount-gpu`) and the command-line front end.

pub mod types;
pub mod utils;

// Re-export commonly used types
pub use types::{counters::*, report::*, value::*};
