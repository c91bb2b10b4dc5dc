//! Counter, metric and report type definitions

pub mod counters;
pub mod report;
pub mod value;
