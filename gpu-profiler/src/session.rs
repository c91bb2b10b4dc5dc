//! Collection session
//!
//! A session resolves the requested names on one device, plans the passes,
//! subscribes to launch boundaries and owns all per-pass state. The workload is
//! then run once per required pass (see [`Session::required_pass_count`]),
//! with the launch interceptor doing the per-pass work, and [`Session::finalize`]
//! turns the collected raw values into results.
//!
//! Sessions are driven through `&mut self` from a single thread. Launching the
//! workload from several threads at once is not supported.

use passcount_shared::{
    ContextId, DeviceId, EventId, EventSpec, MetricId, MetricSpec, MetricValue, PassSummary,
    SessionReport,
};
use tracing::{info, warn};

use crate::aggregate::{event_value_map, metric_buffer};
use crate::backend::{CallbackId, CounterBackend, Subscription};
use crate::config::SessionConfig;
use crate::interceptor::Phase;
use crate::metrics::derive_metrics;
use crate::planner;
use crate::schedule::PassSchedule;
use crate::state::PassState;
use crate::store::ResultStore;
use crate::{ProfilerError, Result};

pub struct Session<B: CounterBackend> {
    pub(crate) backend: B,
    pub(crate) device: DeviceId,
    pub(crate) context: ContextId,
    pub(crate) subscription: Option<Subscription>,
    /// Launch operation of the subscription, kept after it is released
    pub(crate) launch_callback: CallbackId,
    pub(crate) schedule: PassSchedule,
    pub(crate) states: Vec<PassState>,
    pub(crate) cursor: usize,
    pub(crate) phase: Phase,
    device_index: u32,
    strict: bool,
    events: Vec<EventSpec>,
    metrics: Vec<MetricSpec>,
    results: Option<ResultStore>,
}

impl<B: CounterBackend> Session<B> {
    /// Create a session on the configured device.
    ///
    /// Fails before any pass runs if no device is present, a name does not
    /// resolve, or the planner fails.
    pub fn new(mut backend: B, config: &SessionConfig) -> Result<Self> {
        config.validate()?;

        backend.init()?;
        let count = backend.device_count()?;
        if count == 0 {
            return Err(ProfilerError::NoDevice);
        }
        if config.device >= count {
            return Err(ProfilerError::DeviceOutOfRange {
                index: config.device,
                count,
            });
        }

        let device = backend.device(config.device)?;
        let context = backend.create_context(device)?;

        let metrics = resolve_metrics(&backend, device, config)?;
        let events = resolve_events(&backend, device, config)?;

        let metric_ids: Vec<MetricId> = metrics.iter().map(|m| m.id).collect();
        let event_ids: Vec<EventId> = events.iter().map(|e| e.id).collect();

        let sets = planner::plan(&mut backend, context, &metric_ids, &event_ids)?;
        let schedule = PassSchedule::build(&backend, device, &sets)?;

        let states = schedule
            .iter()
            .map(|pass| PassState::with_capacity(pass.total_events))
            .collect();

        let subscription = backend.subscribe_launches(context)?;

        info!(
            "Session on device {}: {} metrics, {} events, {} passes",
            config.device,
            metrics.len(),
            events.len(),
            schedule.len()
        );

        Ok(Self {
            backend,
            device,
            context,
            subscription: Some(subscription),
            launch_callback: subscription.callback,
            schedule,
            states,
            cursor: 0,
            phase: Phase::Idle,
            device_index: config.device,
            strict: config.strict,
            events,
            metrics,
            results: None,
        })
    }

    /// Number of times the workload must be launched.
    pub fn required_pass_count(&self) -> usize {
        self.schedule.len()
    }

    /// Index of the pass the next launch collects.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_collection_complete(&self) -> bool {
        self.cursor >= self.schedule.len()
    }

    pub fn schedule(&self) -> &PassSchedule {
        &self.schedule
    }

    pub fn pass_state(&self, index: usize) -> Option<&PassState> {
        self.states.get(index)
    }

    pub fn events(&self) -> &[EventSpec] {
        &self.events
    }

    pub fn metrics(&self) -> &[MetricSpec] {
        &self.metrics
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Aggregate the collected passes, derive metrics and store the results.
    ///
    /// Only the first call does any work and releases the launch subscription;
    /// later calls return the stored results. A launch that entered but never
    /// exited has its groups disabled and its pass counts as under-collected.
    ///
    /// If the workload ran fewer times than required, the unread events are
    /// reported as 0 and the derived metrics are meaningless. With
    /// `strict` set this is an error instead.
    pub fn finalize(&mut self) -> Result<&ResultStore> {
        let store = match self.results.take() {
            Some(store) => store,
            None => {
                self.abandon_pass();
                let store = self.collect_results()?;
                self.release_subscription()?;
                store
            }
        };

        Ok(self.results.insert(store))
    }

    pub fn results(&self) -> Option<&ResultStore> {
        self.results.as_ref()
    }

    pub fn is_finalized(&self) -> bool {
        self.results.is_some()
    }

    /// Raw event values in request order, empty before `finalize`.
    pub fn event_values(&self) -> &[u64] {
        self.results
            .as_ref()
            .map(ResultStore::event_values)
            .unwrap_or_default()
    }

    /// Derived metric values in request order, empty before `finalize`.
    pub fn metric_values(&self) -> &[MetricValue] {
        self.results
            .as_ref()
            .map(ResultStore::metric_values)
            .unwrap_or_default()
    }

    /// Finalize and build a serializable report.
    pub fn report(&mut self) -> Result<SessionReport> {
        self.finalize()?;

        let mut report = SessionReport::new(self.device_index);
        report.passes = self
            .schedule
            .iter()
            .zip(&self.states)
            .map(|(pass, state)| PassSummary {
                index: pass.index,
                kind: pass.kind.label().to_string(),
                groups: pass.groups.len(),
                expected_events: pass.total_events,
                collected_events: state.len(),
                elapsed_ns: u64::try_from(state.elapsed().as_nanos()).unwrap_or(u64::MAX),
            })
            .collect();

        if let Some(store) = &self.results {
            report.events = store.event_readings();
            report.metrics = store.metric_readings();
        }

        Ok(report)
    }

    fn collect_results(&self) -> Result<ResultStore> {
        self.check_collection()?;

        let buffer = metric_buffer(&self.schedule, &self.states);
        let event_map = event_value_map(&self.schedule, &self.states);

        let metric_values = derive_metrics(&self.backend, self.device, &self.metrics, &buffer)?;

        ResultStore::resolve(
            self.events.clone(),
            &event_map,
            self.metrics.clone(),
            metric_values,
        )
    }

    fn check_collection(&self) -> Result<()> {
        for (pass, state) in self.schedule.iter().zip(&self.states) {
            if state.is_complete(pass) {
                continue;
            }

            if self.strict {
                return Err(ProfilerError::UnderCollected {
                    pass: pass.index,
                    expected: pass.total_events,
                    collected: state.len(),
                });
            }

            warn!(
                "Pass {} ({}) collected {} of {} events; missing values are reported as 0",
                pass.index,
                pass.kind,
                state.len(),
                pass.total_events
            );
        }

        Ok(())
    }

    fn release_subscription(&mut self) -> Result<()> {
        if let Some(subscription) = self.subscription.take() {
            self.backend.unsubscribe(subscription)?;
        }
        Ok(())
    }
}

impl<B: CounterBackend> Drop for Session<B> {
    fn drop(&mut self) {
        self.abandon_pass();
        if let Err(e) = self.release_subscription() {
            warn!("Failed to release launch subscription: {}", e);
        }
    }
}

fn resolve_metrics<B: CounterBackend>(
    backend: &B,
    device: DeviceId,
    config: &SessionConfig,
) -> Result<Vec<MetricSpec>> {
    config
        .metrics
        .iter()
        .map(|name| match backend.metric_id(device, name)? {
            Some(id) => Ok(MetricSpec {
                name: name.clone(),
                id,
            }),
            None => Err(ProfilerError::UnknownMetric {
                name: name.clone(),
                device: config.device,
            }),
        })
        .collect()
}

fn resolve_events<B: CounterBackend>(
    backend: &B,
    device: DeviceId,
    config: &SessionConfig,
) -> Result<Vec<EventSpec>> {
    config
        .events
        .iter()
        .map(|name| match backend.event_id(device, name)? {
            Some(id) => Ok(EventSpec {
                name: name.clone(),
                id,
            }),
            None => Err(ProfilerError::UnknownEvent {
                name: name.clone(),
                device: config.device,
            }),
        })
        .collect()
}
