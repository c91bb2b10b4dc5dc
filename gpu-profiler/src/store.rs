//! Result store
//!
//! Final raw event values and derived metric values, aligned with the order in
//! which they were requested.

use passcount_shared::{EventReading, EventSpec, MetricReading, MetricSpec, MetricValue};

use crate::aggregate::EventValueMap;
use crate::{ProfilerError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ResultStore {
    events: Vec<EventSpec>,
    event_values: Vec<u64>,
    metrics: Vec<MetricSpec>,
    metric_values: Vec<MetricValue>,
}

impl ResultStore {
    /// Look up each requested event in the event map.
    ///
    /// Every requested event is read by some event pass, so a missing
    /// identifier is a planner bug and fails the session.
    pub fn resolve(
        events: Vec<EventSpec>,
        event_map: &EventValueMap,
        metrics: Vec<MetricSpec>,
        metric_values: Vec<MetricValue>,
    ) -> Result<Self> {
        if metric_values.len() != metrics.len() {
            return Err(ProfilerError::MetricCountMismatch {
                expected: metrics.len(),
                got: metric_values.len(),
            });
        }

        let event_values = events
            .iter()
            .map(|event| {
                event_map
                    .get(&event.id)
                    .copied()
                    .ok_or(ProfilerError::MissingEventValue(event.id))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            events,
            event_values,
            metrics,
            metric_values,
        })
    }

    pub fn event_values(&self) -> &[u64] {
        &self.event_values
    }

    pub fn metric_values(&self) -> &[MetricValue] {
        &self.metric_values
    }

    pub fn event(&self, name: &str) -> Option<u64> {
        self.events
            .iter()
            .position(|e| e.name == name)
            .map(|i| self.event_values[i])
    }

    pub fn metric(&self, name: &str) -> Option<MetricValue> {
        self.metrics
            .iter()
            .position(|m| m.name == name)
            .map(|i| self.metric_values[i])
    }

    pub fn event_at(&self, index: usize) -> Option<u64> {
        self.event_values.get(index).copied()
    }

    pub fn metric_at(&self, index: usize) -> Option<MetricValue> {
        self.metric_values.get(index).copied()
    }

    pub fn event_readings(&self) -> Vec<EventReading> {
        self.events
            .iter()
            .zip(&self.event_values)
            .map(|(spec, value)| EventReading {
                name: spec.name.clone(),
                id: spec.id,
                value: *value,
            })
            .collect()
    }

    pub fn metric_readings(&self) -> Vec<MetricReading> {
        self.metrics
            .iter()
            .zip(&self.metric_values)
            .map(|(spec, value)| MetricReading {
                name: spec.name.clone(),
                id: spec.id,
                value: *value,
            })
            .collect()
    }
}
