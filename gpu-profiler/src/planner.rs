//! Group planner integration
//!
//! Splits the request into two independent pass-sets: one for metrics and one
//! for raw events. Each pass-set is planned separately by the backend.

use passcount_shared::{ContextId, EventId, MetricId};
use tracing::info;

use crate::backend::{GroupPlanner, PassGroups};
use crate::{ProfilerError, Result};

/// Planner output for one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSets {
    pub metric: Vec<PassGroups>,
    pub event: Vec<PassGroups>,
}

impl PassSets {
    pub fn metric_passes(&self) -> usize {
        self.metric.len()
    }

    pub fn event_passes(&self) -> usize {
        self.event.len()
    }

    pub fn total_passes(&self) -> usize {
        self.metric.len() + self.event.len()
    }
}

/// Plan both pass-sets.
///
/// An empty identifier list yields zero passes for its pass-set without
/// consulting the planner. A request with nothing to collect is rejected.
pub fn plan<P: GroupPlanner + ?Sized>(
    planner: &mut P,
    context: ContextId,
    metrics: &[MetricId],
    events: &[EventId],
) -> Result<PassSets> {
    if metrics.is_empty() && events.is_empty() {
        return Err(ProfilerError::EmptyRequest);
    }

    let mut sets = PassSets::default();

    if !metrics.is_empty() {
        sets.metric = planner.metric_pass_sets(context, metrics)?;
    }
    if !events.is_empty() {
        sets.event = planner.event_pass_sets(context, events)?;
    }

    info!("# Metric Passes: {}", sets.metric_passes());
    info!("# Event Passes: {}", sets.event_passes());

    if sets.total_passes() == 0 {
        return Err(ProfilerError::backend(
            "group planning",
            "planner returned no passes for a non-empty request",
        ));
    }

    Ok(sets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use passcount_shared::GroupId;

    /// Puts `per_pass` identifiers into each pass, one group per identifier.
    struct ChunkPlanner {
        per_pass: usize,
        calls: Vec<&'static str>,
        fail: bool,
    }

    impl ChunkPlanner {
        fn new(per_pass: usize) -> Self {
            Self {
                per_pass,
                calls: Vec::new(),
                fail: false,
            }
        }

        fn chunk(&self, ids: impl Iterator<Item = u32>) -> Vec<PassGroups> {
            let ids: Vec<GroupId> = ids.map(GroupId).collect();
            ids.chunks(self.per_pass).map(<[GroupId]>::to_vec).collect()
        }
    }

    impl GroupPlanner for ChunkPlanner {
        fn metric_pass_sets(
            &mut self,
            _context: ContextId,
            metrics: &[MetricId],
        ) -> Result<Vec<PassGroups>> {
            self.calls.push("metrics");
            if self.fail {
                return Err(ProfilerError::backend("metric planning", "injected"));
            }
            Ok(self.chunk(metrics.iter().map(|m| m.0)))
        }

        fn event_pass_sets(
            &mut self,
            _context: ContextId,
            events: &[EventId],
        ) -> Result<Vec<PassGroups>> {
            self.calls.push("events");
            Ok(self.chunk(events.iter().map(|e| e.0)))
        }
    }

    #[test]
    fn test_total_is_sum_of_both_sets() {
        let mut planner = ChunkPlanner::new(2);
        let metrics = [MetricId(1), MetricId(2), MetricId(3)];
        let events = [EventId(10)];

        let sets = plan(&mut planner, ContextId(0), &metrics, &events).unwrap();

        assert_eq!(sets.metric_passes(), 2);
        assert_eq!(sets.event_passes(), 1);
        assert_eq!(sets.total_passes(), 3);
    }

    #[test]
    fn test_empty_list_skips_planner() {
        let mut planner = ChunkPlanner::new(1);

        let sets = plan(&mut planner, ContextId(0), &[], &[EventId(1)]).unwrap();

        assert_eq!(sets.metric_passes(), 0);
        assert_eq!(sets.event_passes(), 1);
        assert_eq!(planner.calls, vec!["events"]);
    }

    #[test]
    fn test_empty_request_fails_fast() {
        let mut planner = ChunkPlanner::new(1);

        let err = plan(&mut planner, ContextId(0), &[], &[]).unwrap_err();

        assert!(matches!(err, ProfilerError::EmptyRequest));
        assert!(planner.calls.is_empty());
    }

    #[test]
    fn test_planner_failure_is_fatal() {
        let mut planner = ChunkPlanner::new(1);
        planner.fail = true;

        let err = plan(&mut planner, ContextId(0), &[MetricId(1)], &[EventId(1)]).unwrap_err();

        assert!(matches!(err, ProfilerError::Backend { .. }));
        assert_eq!(planner.calls, vec!["metrics"]);
    }
}
