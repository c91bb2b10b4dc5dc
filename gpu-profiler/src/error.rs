//! Error types for counter collection
//!
//! Every error is fatal for the measurement: hardware counter collection has no
//! meaningful partial-success state, so nothing here is retried.

use passcount_shared::EventId;
use thiserror::Error;

use crate::interceptor::LaunchSite;

pub type Result<T> = std::result::Result<T, ProfilerError>;

#[derive(Error, Debug)]
pub enum ProfilerError {
    #[error("no device supporting counter collection is present")]
    NoDevice,

    #[error("device index {index} out of range ({count} devices present)")]
    DeviceOutOfRange { index: u32, count: u32 },

    #[error("event '{name}' does not exist on device {device}")]
    UnknownEvent { name: String, device: u32 },

    #[error("metric '{name}' does not exist on device {device}")]
    UnknownMetric { name: String, device: u32 },

    #[error("a session must request at least one event or metric")]
    EmptyRequest,

    #[error("unexpected launch callback id {got} (subscribed to {expected})")]
    UnexpectedCallback { got: u32, expected: u32 },

    #[error("unbalanced launch {site:?} during pass {pass}")]
    UnbalancedLaunch { pass: usize, site: LaunchSite },

    #[error("{operation} failed: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },

    #[error("pass {pass} collected {collected} of {expected} events; the workload ran fewer times than required")]
    UnderCollected {
        pass: usize,
        expected: usize,
        collected: usize,
    },

    #[error("no collected value for requested {0}")]
    MissingEventValue(EventId),

    #[error("derived {got} values for {expected} requested metrics")]
    MetricCountMismatch { expected: usize, got: usize },
}

impl ProfilerError {
    /// Failure reported by a counter backend call.
    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            message: message.into(),
        }
    }
}
