//! Simulated counter device
//!
//! [`SimulatedDevice`] implements every backend trait over an in-memory
//! [`Catalog`]. Each call to [`SimulatedDevice::run_kernel`] adds the catalog's
//! per-kernel values to the events of every enabled group, so a workload that
//! "launches a kernel" produces deterministic counts.
//!
//! The planner packs requested events by domain into groups of
//! `events_per_group` and puts at most one group per domain into a pass.
//! Enabling two groups of the same domain at once is rejected, the same way
//! counter hardware rejects an over-subscribed domain.
//!
//! All mutating calls are recorded as [`SimCall`]s and any operation can be
//! made to fail with [`SimulatedDevice::fail_on`].

mod catalog;

pub use catalog::{Catalog, Formula, SimDomain, SimEvent, SimMetric};

use passcount_shared::{
    ContextId, DeviceId, DomainId, EventId, GroupId, MetricId, MetricValue,
};
use tracing::debug;

use crate::backend::{
    CounterGroups, DeviceRuntime, GroupPlanner, MetricEvaluator, PassGroups, Subscription,
    KERNEL_LAUNCH,
};
use crate::{ProfilerError, Result};

/// A recorded backend call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimCall {
    Init,
    CreateContext(DeviceId),
    Subscribe(u64),
    Unsubscribe(u64),
    Synchronize,
    KernelCollectionMode(ContextId),
    PlanMetrics(usize),
    PlanEvents(usize),
    ProfileAllInstances(GroupId),
    Enable(GroupId),
    Read(GroupId, EventId),
    Disable(GroupId),
    Kernel,
}

#[derive(Debug, Clone)]
struct SimGroup {
    id: GroupId,
    domain: DomainId,
    events: Vec<EventId>,
    all_instances: bool,
    enabled: bool,
    /// Per-event, per-sampled-instance counts since the last enable
    counts: Vec<Vec<u64>>,
}

#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    catalog: Catalog,
    device_count: u32,
    initialized: bool,
    contexts: u32,
    groups: Vec<SimGroup>,
    next_handle: u64,
    subscriptions: Vec<u64>,
    kernel_mode: bool,
    kernels: u64,
    calls: Vec<SimCall>,
    failures: Vec<&'static str>,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new(Catalog::reference())
    }
}

impl SimulatedDevice {
    /// A single device exposing `catalog`.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            device_count: 1,
            initialized: false,
            contexts: 0,
            groups: Vec::new(),
            next_handle: 1,
            subscriptions: Vec::new(),
            kernel_mode: false,
            kernels: 0,
            calls: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Number of identical devices reported. 0 simulates a host with no GPU.
    pub fn with_device_count(mut self, count: u32) -> Self {
        self.device_count = count;
        self
    }

    /// Make `operation` fail from now on.
    ///
    /// Operation names match those in [`ProfilerError::Backend`]: `init`,
    /// `create context`, `subscribe`, `unsubscribe`, `synchronize`,
    /// `collection mode`, `metric pass sets`, `event pass sets`,
    /// `profile all instances`, `enable group`, `disable group`, `read event`,
    /// `metric value`.
    pub fn fail_on(&mut self, operation: &'static str) {
        self.failures.push(operation);
    }

    /// Stop failing any operation.
    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn calls(&self) -> &[SimCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Kernels run so far.
    pub fn kernels(&self) -> u64 {
        self.kernels
    }

    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn enabled_groups(&self) -> Vec<GroupId> {
        self.groups.iter().filter(|g| g.enabled).map(|g| g.id).collect()
    }

    /// Execute one kernel: every enabled group accumulates one kernel's worth
    /// of counts.
    pub fn run_kernel(&mut self) {
        self.kernels += 1;
        self.calls.push(SimCall::Kernel);

        let catalog = &self.catalog;
        for group in self.groups.iter_mut().filter(|g| g.enabled) {
            for (event, counts) in group.events.iter().zip(&mut group.counts) {
                let Some(spec) = catalog.event_by_id(*event) else {
                    continue;
                };
                for (count, add) in counts.iter_mut().zip(&spec.per_kernel) {
                    *count = count.saturating_add(*add);
                }
            }
        }

        debug!(
            "Kernel {} ran with {} enabled groups (per-kernel mode: {})",
            self.kernels,
            self.enabled_groups().len(),
            self.kernel_mode
        );
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        if self.failures.contains(&operation) {
            return Err(ProfilerError::backend(operation, "injected failure"));
        }
        Ok(())
    }

    fn check_device(&self, operation: &'static str, device: DeviceId) -> Result<()> {
        if device.0 >= self.device_count {
            return Err(ProfilerError::backend(
                operation,
                format!("no such device {}", device),
            ));
        }
        Ok(())
    }

    fn group(&self, id: GroupId) -> Result<&SimGroup> {
        self.groups
            .iter()
            .find(|g| g.id == id)
            .ok_or_else(|| ProfilerError::backend("group lookup", format!("no such group {}", id)))
    }

    fn group_mut(&mut self, id: GroupId) -> Result<&mut SimGroup> {
        self.groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| ProfilerError::backend("group lookup", format!("no such group {}", id)))
    }

    fn domain(&self, id: DomainId) -> Result<&SimDomain> {
        self.catalog
            .domain_by_id(id)
            .ok_or_else(|| ProfilerError::backend("domain lookup", format!("no such domain {}", id)))
    }

    fn create_group(&mut self, domain: DomainId, events: Vec<EventId>) -> GroupId {
        let id = GroupId(self.groups.len() as u32 + 1);
        self.groups.push(SimGroup {
            id,
            domain,
            counts: vec![Vec::new(); events.len()],
            events,
            all_instances: false,
            enabled: false,
        });
        id
    }

    /// Pack events into groups by domain and groups into passes, at most one
    /// group per domain per pass. Duplicates are dropped.
    fn partition(&mut self, events: &[EventId]) -> Result<Vec<PassGroups>> {
        let mut by_domain: Vec<(DomainId, Vec<EventId>)> = Vec::new();
        for id in events {
            let domain = self
                .catalog
                .event_by_id(*id)
                .map(|e| e.domain)
                .ok_or_else(|| {
                    ProfilerError::backend("event pass sets", format!("no such event {}", id))
                })?;

            match by_domain.iter_mut().find(|(d, _)| *d == domain) {
                Some((_, list)) if list.contains(id) => {}
                Some((_, list)) => list.push(*id),
                None => by_domain.push((domain, vec![*id])),
            }
        }

        let per_group = self.catalog.events_per_group;
        let mut passes: Vec<PassGroups> = Vec::new();
        for (domain, list) in by_domain {
            for (i, chunk) in list.chunks(per_group).enumerate() {
                let group = self.create_group(domain, chunk.to_vec());
                if passes.len() <= i {
                    passes.push(Vec::new());
                }
                passes[i].push(group);
            }
        }

        Ok(passes)
    }
}

impl DeviceRuntime for SimulatedDevice {
    fn init(&mut self) -> Result<()> {
        self.check("init")?;
        self.calls.push(SimCall::Init);
        self.initialized = true;
        Ok(())
    }

    fn device_count(&self) -> Result<u32> {
        Ok(self.device_count)
    }

    fn device(&self, index: u32) -> Result<DeviceId> {
        let device = DeviceId(index);
        self.check_device("device", device)?;
        Ok(device)
    }

    fn create_context(&mut self, device: DeviceId) -> Result<ContextId> {
        self.check("create context")?;
        self.check_device("create context", device)?;
        if !self.initialized {
            return Err(ProfilerError::backend("create context", "runtime not initialized"));
        }

        self.calls.push(SimCall::CreateContext(device));
        let context = ContextId(self.contexts);
        self.contexts += 1;
        Ok(context)
    }

    fn subscribe_launches(&mut self, _context: ContextId) -> Result<Subscription> {
        self.check("subscribe")?;

        let handle = self.next_handle;
        self.next_handle += 1;
        self.subscriptions.push(handle);
        self.calls.push(SimCall::Subscribe(handle));

        Ok(Subscription {
            handle,
            callback: KERNEL_LAUNCH,
        })
    }

    fn unsubscribe(&mut self, subscription: Subscription) -> Result<()> {
        self.check("unsubscribe")?;

        let Some(pos) = self.subscriptions.iter().position(|h| *h == subscription.handle) else {
            return Err(ProfilerError::backend(
                "unsubscribe",
                format!("unknown subscription {}", subscription.handle),
            ));
        };
        self.subscriptions.remove(pos);
        self.calls.push(SimCall::Unsubscribe(subscription.handle));
        Ok(())
    }

    fn synchronize(&mut self) -> Result<()> {
        self.check("synchronize")?;
        self.calls.push(SimCall::Synchronize);
        Ok(())
    }

    fn set_kernel_collection_mode(&mut self, context: ContextId) -> Result<()> {
        self.check("collection mode")?;
        self.calls.push(SimCall::KernelCollectionMode(context));
        self.kernel_mode = true;
        Ok(())
    }

    fn event_id(&self, device: DeviceId, name: &str) -> Result<Option<EventId>> {
        self.check_device("event lookup", device)?;
        Ok(self.catalog.event_named(name).map(|e| e.id))
    }

    fn metric_id(&self, device: DeviceId, name: &str) -> Result<Option<MetricId>> {
        self.check_device("metric lookup", device)?;
        Ok(self.catalog.metric_named(name).map(|m| m.id))
    }

    fn event_name(&self, event: EventId) -> Result<String> {
        self.catalog
            .event_by_id(event)
            .map(|e| e.name.clone())
            .ok_or_else(|| ProfilerError::backend("event name", format!("no such event {}", event)))
    }
}

impl GroupPlanner for SimulatedDevice {
    fn metric_pass_sets(
        &mut self,
        _context: ContextId,
        metrics: &[MetricId],
    ) -> Result<Vec<PassGroups>> {
        self.check("metric pass sets")?;
        self.calls.push(SimCall::PlanMetrics(metrics.len()));

        let mut events = Vec::new();
        for id in metrics {
            let metric = self.catalog.metric_by_id(*id).ok_or_else(|| {
                ProfilerError::backend("metric pass sets", format!("no such metric {}", id))
            })?;
            for name in metric.formula.event_names() {
                let event = self.catalog.event_named(name).ok_or_else(|| {
                    ProfilerError::backend(
                        "metric pass sets",
                        format!("{} reads unknown event {}", metric.name, name),
                    )
                })?;
                events.push(event.id);
            }
        }

        self.partition(&events)
    }

    fn event_pass_sets(
        &mut self,
        _context: ContextId,
        events: &[EventId],
    ) -> Result<Vec<PassGroups>> {
        self.check("event pass sets")?;
        self.calls.push(SimCall::PlanEvents(events.len()));
        self.partition(events)
    }
}

impl CounterGroups for SimulatedDevice {
    fn group_event_count(&self, group: GroupId) -> Result<u32> {
        Ok(self.group(group)?.events.len() as u32)
    }

    fn group_events(&self, group: GroupId) -> Result<Vec<EventId>> {
        Ok(self.group(group)?.events.clone())
    }

    fn group_domain(&self, group: GroupId) -> Result<DomainId> {
        Ok(self.group(group)?.domain)
    }

    fn group_instance_count(&self, group: GroupId) -> Result<u32> {
        let group = self.group(group)?;
        if group.all_instances {
            Ok(self.domain(group.domain)?.sampled_instances)
        } else {
            Ok(1)
        }
    }

    fn domain_total_instances(&self, device: DeviceId, domain: DomainId) -> Result<u32> {
        self.check_device("domain instances", device)?;
        Ok(self.domain(domain)?.total_instances)
    }

    fn profile_all_instances(&mut self, group: GroupId) -> Result<()> {
        self.check("profile all instances")?;
        self.calls.push(SimCall::ProfileAllInstances(group));
        self.group_mut(group)?.all_instances = true;
        Ok(())
    }

    fn enable_group(&mut self, group: GroupId) -> Result<()> {
        self.check("enable group")?;

        let domain = self.group(group)?.domain;
        if let Some(other) = self
            .groups
            .iter()
            .find(|g| g.enabled && g.domain == domain && g.id != group)
        {
            return Err(ProfilerError::backend(
                "enable group",
                format!("{} conflicts with enabled {} in {}", group, other.id, domain),
            ));
        }

        let sampled = self.domain(domain)?.sampled_instances as usize;
        let entry = self.group_mut(group)?;
        entry.enabled = true;
        for counts in &mut entry.counts {
            *counts = vec![0; sampled];
        }

        self.calls.push(SimCall::Enable(group));
        Ok(())
    }

    fn disable_group(&mut self, group: GroupId) -> Result<()> {
        self.check("disable group")?;
        self.group_mut(group)?.enabled = false;
        self.calls.push(SimCall::Disable(group));
        Ok(())
    }

    fn read_event(&mut self, group: GroupId, event: EventId) -> Result<Vec<u64>> {
        self.check("read event")?;
        self.calls.push(SimCall::Read(group, event));

        let instances = self.group_instance_count(group)? as usize;
        let entry = self.group(group)?;
        if !entry.enabled {
            return Err(ProfilerError::backend(
                "read event",
                format!("{} is not enabled", group),
            ));
        }

        let Some(pos) = entry.events.iter().position(|e| *e == event) else {
            return Err(ProfilerError::backend(
                "read event",
                format!("{} is not in {}", event, group),
            ));
        };

        Ok(entry.counts[pos].iter().take(instances).copied().collect())
    }
}

impl MetricEvaluator for SimulatedDevice {
    fn metric_value(
        &self,
        device: DeviceId,
        metric: MetricId,
        event_ids: &[EventId],
        values: &[u64],
    ) -> Result<MetricValue> {
        self.check("metric value")?;
        self.check_device("metric value", device)?;

        let spec = self.catalog.metric_by_id(metric).ok_or_else(|| {
            ProfilerError::backend("metric value", format!("no such metric {}", metric))
        })?;

        let value_of = |name: &str| {
            let id = self.catalog.event_named(name)?.id;
            let pos = event_ids.iter().position(|e| *e == id)?;
            values.get(pos).copied()
        };

        spec.formula.evaluate(value_of).ok_or_else(|| {
            ProfilerError::backend(
                "metric value",
                format!("{} needs events that were not collected", spec.name),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> SimulatedDevice {
        let catalog = Catalog::new(2)
            .domain("sm", 4, 2)
            .domain("fb", 1, 1)
            .event("a", "sm", &[10, 20])
            .event("b", "sm", &[1, 1])
            .event("c", "sm", &[5, 5])
            .event("d", "fb", &[7])
            .metric("a_plus_d", Formula::Sum(vec!["a".into(), "d".into()]));
        let mut device = SimulatedDevice::new(catalog);
        device.init().unwrap();
        device
    }

    fn id(device: &SimulatedDevice, name: &str) -> EventId {
        device.catalog().event_named(name).unwrap().id
    }

    #[test]
    fn test_partition_one_group_per_domain_per_pass() {
        let mut device = device();
        let events = [id(&device, "a"), id(&device, "b"), id(&device, "c"), id(&device, "d")];

        let passes = device.event_pass_sets(ContextId(0), &events).unwrap();

        assert_eq!(passes.len(), 2);
        assert_eq!(passes[0].len(), 2);
        assert_eq!(passes[1].len(), 1);
        assert_eq!(
            device.group_events(passes[0][0]).unwrap(),
            vec![events[0], events[1]]
        );
        assert_eq!(device.group_events(passes[1][0]).unwrap(), vec![events[2]]);
    }

    #[test]
    fn test_partition_drops_duplicates() {
        let mut device = device();
        let a = id(&device, "a");

        let passes = device.event_pass_sets(ContextId(0), &[a, a, a]).unwrap();

        assert_eq!(passes.len(), 1);
        assert_eq!(device.group_event_count(passes[0][0]).unwrap(), 1);
    }

    #[test]
    fn test_enabled_group_counts_kernels() {
        let mut device = device();
        let a = id(&device, "a");
        let group = device.event_pass_sets(ContextId(0), &[a]).unwrap()[0][0];

        device.profile_all_instances(group).unwrap();
        device.enable_group(group).unwrap();
        device.run_kernel();
        device.run_kernel();

        assert_eq!(device.group_instance_count(group).unwrap(), 2);
        assert_eq!(device.read_event(group, a).unwrap(), vec![20, 40]);

        device.disable_group(group).unwrap();
        assert!(device.read_event(group, a).is_err());
    }

    #[test]
    fn test_single_instance_without_profile_all() {
        let mut device = device();
        let a = id(&device, "a");
        let group = device.event_pass_sets(ContextId(0), &[a]).unwrap()[0][0];

        device.enable_group(group).unwrap();
        device.run_kernel();

        assert_eq!(device.read_event(group, a).unwrap(), vec![10]);
    }

    #[test]
    fn test_same_domain_groups_conflict() {
        let mut device = device();
        let events = [id(&device, "a"), id(&device, "b"), id(&device, "c")];
        let passes = device.event_pass_sets(ContextId(0), &events).unwrap();

        device.enable_group(passes[0][0]).unwrap();
        let err = device.enable_group(passes[1][0]).unwrap_err();

        assert!(matches!(err, ProfilerError::Backend { operation: "enable group", .. }));
    }

    #[test]
    fn test_metric_value_reads_buffer() {
        let device = device();
        let metric = device.catalog().metric_named("a_plus_d").unwrap().id;
        let ids = [id(&device, "d"), id(&device, "a")];

        let value = device
            .metric_value(DeviceId(0), metric, &ids, &[7, 60])
            .unwrap();
        assert_eq!(value, MetricValue::Uint64(67));

        let err = device
            .metric_value(DeviceId(0), metric, &ids[..1], &[7])
            .unwrap_err();
        assert!(matches!(err, ProfilerError::Backend { operation: "metric value", .. }));
    }

    #[test]
    fn test_injected_failure() {
        let mut device = device();
        device.fail_on("synchronize");

        let err = device.synchronize().unwrap_err();

        assert_eq!(err.to_string(), "synchronize failed: injected failure");
    }

    #[test]
    fn test_every_group_control_can_fail() {
        let mut device = device();
        let a = id(&device, "a");
        let group = device.event_pass_sets(ContextId(0), &[a]).unwrap()[0][0];
        device.fail_on("profile all instances");

        let err = device.profile_all_instances(group).unwrap_err();

        assert!(matches!(
            err,
            ProfilerError::Backend {
                operation: "profile all instances",
                ..
            }
        ));
        assert_eq!(device.group_instance_count(group).unwrap(), 1);
    }

    #[test]
    fn test_subscription_lifecycle() {
        let mut device = device();
        let subscription = device.subscribe_launches(ContextId(0)).unwrap();

        assert_eq!(subscription.callback, KERNEL_LAUNCH);
        assert_eq!(device.active_subscriptions(), 1);

        device.unsubscribe(subscription).unwrap();
        assert_eq!(device.active_subscriptions(), 0);
        assert!(device.unsubscribe(subscription).is_err());
    }
}
