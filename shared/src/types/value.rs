//! Kind-tagged metric values
//!
//! A derived metric can be reported in one of several representations. The
//! value always carries its kind so consumers format it without guessing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Representation reported for a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricValueKind {
    Uint64,
    Int64,
    Double,
    Percent,
    Throughput,
    UtilizationLevel,
}

impl MetricValueKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Uint64 => "uint64",
            Self::Int64 => "int64",
            Self::Double => "double",
            Self::Percent => "percent",
            Self::Throughput => "throughput",
            Self::UtilizationLevel => "utilization_level",
        }
    }
}

/// A derived metric value tagged with its kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
    Uint64(u64),
    Int64(i64),
    Double(f64),
    /// Percentage in `[0, 100]`
    Percent(f64),
    /// Bytes per second
    Throughput(u64),
    /// Utilization on the device's 0..=10 scale
    UtilizationLevel(u32),
}

impl MetricValue {
    pub fn kind(&self) -> MetricValueKind {
        match self {
            Self::Uint64(_) => MetricValueKind::Uint64,
            Self::Int64(_) => MetricValueKind::Int64,
            Self::Double(_) => MetricValueKind::Double,
            Self::Percent(_) => MetricValueKind::Percent,
            Self::Throughput(_) => MetricValueKind::Throughput,
            Self::UtilizationLevel(_) => MetricValueKind::UtilizationLevel,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint64(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{:.6}", v),
            Self::Percent(v) => write!(f, "{:.2}%", v),
            Self::Throughput(v) => write!(f, "{} bytes/sec", v),
            Self::UtilizationLevel(v) => write!(f, "utilization level {}", v),
        }
    }
}
