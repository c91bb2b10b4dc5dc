//! Pass schedule construction
//!
//! Turns planner output into an ordered, immutable list of pass descriptors.
//! Metric passes occupy global indices `[0, M)` and event passes `[M, M + E)`,
//! so metric passes always run first.

use passcount_shared::{DeviceId, EventId, GroupId};
use std::fmt;
use tracing::debug;

use crate::backend::{CounterGroups, PassGroups};
use crate::planner::PassSets;
use crate::{ProfilerError, Result};

/// Which pass-set a pass belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    Metric,
    Event,
}

impl PassKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Event => "event",
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One required execution of the workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassDescriptor {
    /// Global pass index
    pub index: usize,

    pub kind: PassKind,

    pub device: DeviceId,

    /// Counter groups enabled during this pass
    pub groups: Vec<GroupId>,

    /// Sum of the event counts of all groups
    pub total_events: usize,

    /// Raw events the pass produces, in read order
    pub event_ids: Vec<EventId>,
}

/// Ordered pass descriptors for one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSchedule {
    passes: Vec<PassDescriptor>,
    metric_passes: usize,
}

impl PassSchedule {
    /// Build the schedule, querying each counter group for its events.
    ///
    /// Event counts come from the groups rather than from the request: one
    /// metric may need many raw events and one raw event may appear in groups
    /// of several metrics.
    pub fn build<B: CounterGroups + ?Sized>(
        backend: &B,
        device: DeviceId,
        sets: &PassSets,
    ) -> Result<Self> {
        let mut passes = Vec::with_capacity(sets.total_passes());

        let tagged = sets
            .metric
            .iter()
            .map(|groups| (PassKind::Metric, groups))
            .chain(sets.event.iter().map(|groups| (PassKind::Event, groups)));

        for (index, (kind, groups)) in tagged.enumerate() {
            passes.push(describe_pass(backend, device, index, kind, groups)?);
        }

        Ok(Self {
            passes,
            metric_passes: sets.metric_passes(),
        })
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn metric_passes(&self) -> usize {
        self.metric_passes
    }

    pub fn event_passes(&self) -> usize {
        self.passes.len() - self.metric_passes
    }

    pub fn get(&self, index: usize) -> Option<&PassDescriptor> {
        self.passes.get(index)
    }

    pub fn passes(&self) -> &[PassDescriptor] {
        &self.passes
    }

    pub fn iter(&self) -> impl Iterator<Item = &PassDescriptor> {
        self.passes.iter()
    }

    /// Passes of one pass-set, in ascending index order.
    pub fn of_kind(&self, kind: PassKind) -> impl Iterator<Item = &PassDescriptor> {
        self.passes.iter().filter(move |pass| pass.kind == kind)
    }
}

fn describe_pass<B: CounterGroups + ?Sized>(
    backend: &B,
    device: DeviceId,
    index: usize,
    kind: PassKind,
    groups: &PassGroups,
) -> Result<PassDescriptor> {
    debug!("[{}] Looking at set (pass) {}", kind, index);

    let mut total_events = 0usize;
    let mut event_ids = Vec::new();

    for (i, group) in groups.iter().enumerate() {
        let count = backend.group_event_count(*group)?;
        debug!("  Event Group {}, #Events = {}", i, count);
        total_events += count as usize;
        event_ids.extend(backend.group_events(*group)?);
    }

    if event_ids.len() != total_events {
        return Err(ProfilerError::backend(
            "group event query",
            format!(
                "pass {} groups report {} events but list {}",
                index,
                total_events,
                event_ids.len()
            ),
        ));
    }

    Ok(PassDescriptor {
        index,
        kind,
        device,
        groups: groups.clone(),
        total_events,
        event_ids,
    })
}
