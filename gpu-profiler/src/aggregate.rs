//! Aggregation of per-pass raw values
//!
//! Metric passes are concatenated into one buffer for metric derivation; event
//! passes are folded into an identifier → value map. Unread events of an
//! incomplete pass contribute 0.

use passcount_shared::EventId;
use std::collections::HashMap;

use crate::schedule::{PassDescriptor, PassKind, PassSchedule};
use crate::state::PassState;

/// Raw event values of every metric pass, in pass order
///
/// Duplicates across passes are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricBuffer {
    event_ids: Vec<EventId>,
    values: Vec<u64>,
}

impl MetricBuffer {
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
}

impl FromIterator<(EventId, u64)> for MetricBuffer {
    fn from_iter<I: IntoIterator<Item = (EventId, u64)>>(iter: I) -> Self {
        let (event_ids, values) = iter.into_iter().unzip();
        Self { event_ids, values }
    }
}

/// Final raw value of every event read in an event pass
pub type EventValueMap = HashMap<EventId, u64>;

/// Concatenate the metric passes in ascending pass order.
pub fn metric_buffer(schedule: &PassSchedule, states: &[PassState]) -> MetricBuffer {
    passes_with_states(schedule, PassKind::Metric, states)
        .flat_map(|(pass, state)| state.padded_pairs(pass))
        .collect()
}

/// Fold the event passes into a map; a later pass overwrites an earlier one.
pub fn event_value_map(schedule: &PassSchedule, states: &[PassState]) -> EventValueMap {
    let mut map = EventValueMap::new();
    for (pass, state) in passes_with_states(schedule, PassKind::Event, states) {
        map.extend(state.padded_pairs(pass));
    }
    map
}

fn passes_with_states<'a>(
    schedule: &'a PassSchedule,
    kind: PassKind,
    states: &'a [PassState],
) -> impl Iterator<Item = (&'a PassDescriptor, &'a PassState)> + 'a {
    schedule
        .of_kind(kind)
        .filter_map(move |pass| states.get(pass.index).map(|state| (pass, state)))
}
