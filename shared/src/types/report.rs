//! Collection report
//!
//! A serializable snapshot of a finalized collection session, suitable for
//! JSON output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::counters::{EventId, MetricId};
use super::value::MetricValue;

/// Final value of one requested raw event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventReading {
    pub name: String,
    pub id: EventId,
    pub value: u64,
}

/// Final value of one requested metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReading {
    pub name: String,
    pub id: MetricId,
    pub value: MetricValue,
}

/// Per-pass collection summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSummary {
    pub index: usize,
    /// "metric" or "event"
    pub kind: String,
    pub groups: usize,
    pub expected_events: usize,
    pub collected_events: usize,
    pub elapsed_ns: u64,
}

impl PassSummary {
    pub fn is_complete(&self) -> bool {
        self.collected_events == self.expected_events
    }
}

/// Results of one collection session, in request order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub collected_at: DateTime<Utc>,
    pub device: u32,
    pub passes: Vec<PassSummary>,
    pub events: Vec<EventReading>,
    pub metrics: Vec<MetricReading>,
}

impl SessionReport {
    pub fn new(device: u32) -> Self {
        Self {
            collected_at: Utc::now(),
            device,
            passes: Vec::new(),
            events: Vec::new(),
            metrics: Vec::new(),
        }
    }

    /// True when every pass produced all of its expected raw events.
    pub fn is_complete(&self) -> bool {
        self.passes.iter().all(PassSummary::is_complete)
    }

    pub fn event(&self, name: &str) -> Option<&EventReading> {
        self.events.iter().find(|e| e.name == name)
    }

    pub fn metric(&self, name: &str) -> Option<&MetricReading> {
        self.metrics.iter().find(|m| m.name == name)
    }
}
