//! Launch interceptor
//!
//! Two-state machine driven by the workload's launch boundaries:
//!
//! - `on_launch_enter`: synchronize the device, switch to per-kernel collection
//!   and enable every counter group of the current pass (`Idle` → `Collecting`)
//! - `on_launch_exit`: synchronize, read and normalize every event of every
//!   group into the current pass state, disable the groups and advance the
//!   cursor (`Collecting` → `Idle`)
//!
//! Once the cursor reaches the pass count, or the session is finalized, further
//! launches are ignored so a workload run more often than required cannot
//! over-collect. A pass's values are stored only after its groups have been
//! read and disabled; a failed exit leaves the pass empty and `Collecting`.

use passcount_shared::{DeviceId, GroupId};
use std::time::Instant;
use tracing::{debug, enabled, info, warn, Level};

use crate::backend::{CallbackId, CounterBackend};
use crate::session::Session;
use crate::state::PassState;
use crate::{ProfilerError, Result};

/// Which side of a launch a callback reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchSite {
    Enter,
    Exit,
}

/// A launch-boundary notification from the instrumentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchCallback {
    pub id: CallbackId,
    pub site: LaunchSite,
}

impl LaunchCallback {
    pub fn enter(id: CallbackId) -> Self {
        Self {
            id,
            site: LaunchSite::Enter,
        }
    }

    pub fn exit(id: CallbackId) -> Self {
        Self {
            id,
            site: LaunchSite::Exit,
        }
    }
}

/// Interceptor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No pass groups enabled
    Idle,
    /// Groups of the current pass enabled, workload executing
    Collecting { started: Instant },
}

/// Scale a sampled sum up to every domain instance on the device.
///
/// `normalized = sum * total_instances / active_instances`, truncating. The
/// product is computed in 128 bits and saturates at `u64::MAX`. A group with no
/// active instances normalizes to 0.
pub fn normalize(sum: u64, total_instances: u32, active_instances: u32) -> u64 {
    if active_instances == 0 {
        return 0;
    }

    let scaled = u128::from(sum) * u128::from(total_instances) / u128::from(active_instances);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// Sum per-instance values, saturating.
pub fn sum_instances(values: &[u64]) -> u64 {
    values.iter().fold(0u64, |acc, v| acc.saturating_add(*v))
}

impl<B: CounterBackend> Session<B> {
    /// Dispatch a native launch callback.
    ///
    /// The subscription delivers exactly one launch operation; any other
    /// callback id means the instrumentation is broken.
    pub fn on_callback(&mut self, callback: LaunchCallback) -> Result<()> {
        if callback.id != self.launch_callback {
            return Err(ProfilerError::UnexpectedCallback {
                got: callback.id.0,
                expected: self.launch_callback.0,
            });
        }

        if self.subscription.is_none() {
            debug!("Launch callback after finalize ignored");
            return Ok(());
        }

        match callback.site {
            LaunchSite::Enter => self.on_launch_enter(),
            LaunchSite::Exit => self.on_launch_exit(),
        }
    }

    pub fn on_launch_enter(&mut self) -> Result<()> {
        if self.ignores_launches() {
            return Ok(());
        }
        if let Phase::Collecting { .. } = self.phase {
            return Err(ProfilerError::UnbalancedLaunch {
                pass: self.cursor,
                site: LaunchSite::Enter,
            });
        }

        self.backend.synchronize()?;
        self.backend.set_kernel_collection_mode(self.context)?;

        let pass = &self.schedule.passes()[self.cursor];
        for (i, group) in pass.groups.iter().enumerate() {
            debug!("  Enabling group {} ({})", i, group);
            let enabled = self
                .backend
                .profile_all_instances(*group)
                .and_then(|()| self.backend.enable_group(*group));

            if let Err(e) = enabled {
                disable_groups(&mut self.backend, &pass.groups[..i]);
                return Err(e);
            }
        }

        self.phase = Phase::Collecting {
            started: Instant::now(),
        };
        Ok(())
    }

    pub fn on_launch_exit(&mut self) -> Result<()> {
        if self.ignores_launches() {
            return Ok(());
        }
        let Phase::Collecting { started } = self.phase else {
            return Err(ProfilerError::UnbalancedLaunch {
                pass: self.cursor,
                site: LaunchSite::Exit,
            });
        };

        self.backend.synchronize()?;

        let pass = &self.schedule.passes()[self.cursor];

        // Only a fully read and disabled pass is stored, so a failed exit can
        // be retried without duplicating values.
        let mut state = PassState::with_capacity(pass.total_events);
        for group in &pass.groups {
            read_group(&mut self.backend, self.device, *group, &mut state)?;
        }

        for (i, group) in pass.groups.iter().enumerate() {
            debug!("  Disabling group {} ({})", i, group);
            self.backend.disable_group(*group)?;
        }

        state.set_elapsed(started.elapsed());
        info!(
            "Pass {}/{} ({}) collected {} events",
            pass.index + 1,
            self.schedule.len(),
            pass.kind,
            state.len()
        );

        self.states[self.cursor] = state;
        self.cursor += 1;
        self.phase = Phase::Idle;
        Ok(())
    }

    /// Disable the groups of a pass whose launch never exited.
    ///
    /// The pass keeps no values and is reported as under-collected.
    pub(crate) fn abandon_pass(&mut self) {
        if !matches!(self.phase, Phase::Collecting { .. }) {
            return;
        }
        self.phase = Phase::Idle;

        let Some(pass) = self.schedule.get(self.cursor) else {
            return;
        };
        warn!(
            "Pass {} ({}) abandoned before its launch exited, disabling {} groups",
            pass.index,
            pass.kind,
            pass.groups.len()
        );
        disable_groups(&mut self.backend, &pass.groups);
    }

    /// Run one instrumented launch of `workload`.
    ///
    /// The workload receives the backend so it can issue its kernel. The exit
    /// side only runs once the workload has returned.
    pub fn launch<F, R>(&mut self, workload: F) -> Result<R>
    where
        F: FnOnce(&mut B) -> R,
    {
        self.on_launch_enter()?;
        let output = workload(&mut self.backend);
        self.on_launch_exit()?;
        Ok(output)
    }

    /// Launch `workload` once per required pass.
    pub fn run_passes<F>(&mut self, mut workload: F) -> Result<()>
    where
        F: FnMut(&mut B),
    {
        for _ in 0..self.required_pass_count() {
            self.launch(&mut workload)?;
        }
        Ok(())
    }

    fn ignores_launches(&self) -> bool {
        if self.subscription.is_none() {
            debug!("Launch after finalize ignored");
            return true;
        }
        if self.cursor >= self.schedule.len() {
            debug!("All {} passes collected, launch ignored", self.schedule.len());
            return true;
        }
        false
    }
}

/// Disable `groups`, logging failures instead of returning them.
fn disable_groups<B: CounterBackend>(backend: &mut B, groups: &[GroupId]) {
    for group in groups {
        if let Err(e) = backend.disable_group(*group) {
            warn!("Failed to disable {}: {}", group, e);
        }
    }
}

fn read_group<B: CounterBackend>(
    backend: &mut B,
    device: DeviceId,
    group: GroupId,
    state: &mut PassState,
) -> Result<()> {
    let domain = backend.group_domain(group)?;
    let total_instances = backend.domain_total_instances(device, domain)?;
    let instances = backend.group_instance_count(group)?;

    for event in backend.group_events(group)? {
        let values = backend.read_event(group, event)?;
        if values.len() != instances as usize {
            return Err(ProfilerError::backend(
                "event read",
                format!(
                    "{} returned {} instance values, {} has {} instances",
                    event,
                    values.len(),
                    group,
                    instances
                ),
            ));
        }

        let sum = sum_instances(&values);
        let normalized = normalize(sum, total_instances, instances);

        if enabled!(Level::DEBUG) {
            let name = backend.event_name(event)?;
            debug!("\t{} = {} ({:?})", name, sum, values);
            debug!(
                "\t{} (normalized) ({} * {}) / {} = {}",
                name, sum, total_instances, instances, normalized
            );
        }

        state.push(event, normalized);
    }

    Ok(())
}
