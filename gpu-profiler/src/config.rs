//! Configuration types for a collection session

use serde::{Deserialize, Serialize};

use crate::{ProfilerError, Result};

/// What to collect and where
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Raw event names, results are reported in this order
    pub events: Vec<String>,

    /// Metric names, results are reported in this order
    pub metrics: Vec<String>,

    /// Device index
    pub device: u32,

    /// Fail `finalize` when the workload ran fewer times than required
    /// instead of reporting zero for the missing values
    pub strict: bool,
}

impl SessionConfig {
    pub fn new<E, M>(events: E, metrics: M) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        Self {
            events: events.into_iter().map(Into::into).collect(),
            metrics: metrics.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_device(mut self, device: u32) -> Self {
        self.device = device;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.events.is_empty() && self.metrics.is_empty() {
            return Err(ProfilerError::EmptyRequest);
        }

        Ok(())
    }
}
