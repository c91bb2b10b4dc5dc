//! Counter backend interface
//!
//! The scheduler never talks to a driver directly. Everything it needs from the
//! device (name resolution, the group planner, counter group attributes, raw
//! reads, metric derivation and launch subscription) goes through these traits,
//! implemented by a native binding or by [`crate::sim::SimulatedDevice`].
//!
//! Backend calls report failure as [`ProfilerError::Backend`]
//! (see [`ProfilerError::backend`]); the session treats every such failure as
//! fatal.
//!
//! [`ProfilerError::Backend`]: crate::ProfilerError::Backend
//! [`ProfilerError::backend`]: crate::ProfilerError::backend

use passcount_shared::{
    ContextId, DeviceId, DomainId, EventId, GroupId, MetricId, MetricValue,
};

use crate::Result;

/// Counter groups that can be profiled concurrently in one pass
pub type PassGroups = Vec<GroupId>;

/// Identifier of a launch operation reported to launch callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(pub u32);

/// Runtime kernel launch (`cudaLaunch_v3020` in the CUDA runtime callback domain)
pub const KERNEL_LAUNCH: CallbackId = CallbackId(13);

/// An active launch-boundary subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    pub handle: u64,
    /// The only launch operation the subscription delivers.
    pub callback: CallbackId,
}

/// Device and context lifecycle, name resolution and launch subscription
pub trait DeviceRuntime {
    fn init(&mut self) -> Result<()>;

    fn device_count(&self) -> Result<u32>;

    fn device(&self, index: u32) -> Result<DeviceId>;

    fn create_context(&mut self, device: DeviceId) -> Result<ContextId>;

    /// Subscribe to entry/exit notifications of exactly one launch operation.
    fn subscribe_launches(&mut self, context: ContextId) -> Result<Subscription>;

    fn unsubscribe(&mut self, subscription: Subscription) -> Result<()>;

    /// Block until all work queued on the device has retired.
    fn synchronize(&mut self) -> Result<()>;

    /// Restrict counting to the duration of each kernel.
    fn set_kernel_collection_mode(&mut self, context: ContextId) -> Result<()>;

    /// Resolve an event name, `None` if the device has no such event.
    fn event_id(&self, device: DeviceId, name: &str) -> Result<Option<EventId>>;

    /// Resolve a metric name, `None` if the device has no such metric.
    fn metric_id(&self, device: DeviceId, name: &str) -> Result<Option<MetricId>>;

    fn event_name(&self, event: EventId) -> Result<String>;
}

/// Partitioning of requested counters into passes
///
/// Within one returned entry all groups can be enabled together. Callers never
/// invoke the planner with an empty slice.
pub trait GroupPlanner {
    fn metric_pass_sets(
        &mut self,
        context: ContextId,
        metrics: &[MetricId],
    ) -> Result<Vec<PassGroups>>;

    fn event_pass_sets(&mut self, context: ContextId, events: &[EventId])
        -> Result<Vec<PassGroups>>;
}

/// Counter group attributes and control
pub trait CounterGroups {
    fn group_event_count(&self, group: GroupId) -> Result<u32>;

    /// Raw events of the group, in the order they are read.
    fn group_events(&self, group: GroupId) -> Result<Vec<EventId>>;

    fn group_domain(&self, group: GroupId) -> Result<DomainId>;

    /// Domain instances the group actually samples.
    fn group_instance_count(&self, group: GroupId) -> Result<u32>;

    /// Domain instances present on the whole device.
    fn domain_total_instances(&self, device: DeviceId, domain: DomainId) -> Result<u32>;

    fn profile_all_instances(&mut self, group: GroupId) -> Result<()>;

    fn enable_group(&mut self, group: GroupId) -> Result<()>;

    fn disable_group(&mut self, group: GroupId) -> Result<()>;

    /// Per-instance values of one event since the group was enabled.
    fn read_event(&mut self, group: GroupId, event: EventId) -> Result<Vec<u64>>;
}

/// Metric derivation from raw event values
pub trait MetricEvaluator {
    /// `event_ids` and `values` are parallel and have equal length.
    fn metric_value(
        &self,
        device: DeviceId,
        metric: MetricId,
        event_ids: &[EventId],
        values: &[u64],
    ) -> Result<MetricValue>;
}

/// Everything a collection session needs from a device
pub trait CounterBackend: DeviceRuntime + GroupPlanner + CounterGroups + MetricEvaluator {}

impl<T> CounterBackend for T where T: DeviceRuntime + GroupPlanner + CounterGroups + MetricEvaluator {}
