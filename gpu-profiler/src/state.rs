//! Per-pass accumulation state

use passcount_shared::EventId;
use std::time::Duration;

use crate::schedule::PassDescriptor;

/// Raw event identifiers and normalized values observed during one pass
///
/// Filled once, while handling the launch exit of its pass. The identifier and
/// value lists always have the same length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassState {
    event_ids: Vec<EventId>,
    values: Vec<u64>,
    elapsed: Duration,
}

impl PassState {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            event_ids: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            elapsed: Duration::ZERO,
        }
    }

    pub fn push(&mut self, event: EventId, value: u64) {
        self.event_ids.push(event);
        self.values.push(value);
    }

    pub fn event_ids(&self) -> &[EventId] {
        &self.event_ids
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.event_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.event_ids.is_empty()
    }

    /// Time between enabling the pass's groups and the exit barrier.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub(crate) fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    pub fn is_complete(&self, pass: &PassDescriptor) -> bool {
        self.len() == pass.total_events
    }

    pub fn pairs(&self) -> impl Iterator<Item = (EventId, u64)> + '_ {
        self.event_ids
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }

    /// Collected pairs followed by the pass's remaining expected events at 0.
    ///
    /// Values are read group by group in the descriptor's event order, so an
    /// interrupted pass is always a prefix of `pass.event_ids`.
    pub fn padded_pairs<'a>(
        &'a self,
        pass: &'a PassDescriptor,
    ) -> impl Iterator<Item = (EventId, u64)> + 'a {
        let missing = pass.event_ids.get(self.len()..).unwrap_or_default();
        self.pairs()
            .chain(missing.iter().map(|event| (*event, 0)))
    }
}
