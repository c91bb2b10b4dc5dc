//! Multi-pass hardware counter collection
//!
//! A device can only count a few hardware events at a time, so a request for
//! many events and metrics is split into passes. The workload is launched once
//! per pass; each launch enables one pass's counter groups, reads and
//! normalizes their values, and advances to the next pass. Finalizing the
//! session aggregates the passes and derives the metrics.
//!
//! ```
//! use passcount_gpu::sim::SimulatedDevice;
//! use passcount_gpu::{Session, SessionConfig};
//!
//! # fn main() -> passcount_gpu::Result<()> {
//! let config = SessionConfig::new(["inst_executed"], ["ipc", "sm_efficiency"]);
//! let mut session = Session::new(SimulatedDevice::default(), &config)?;
//!
//! session.run_passes(|device| device.run_kernel())?;
//!
//! let results = session.finalize()?;
//! assert_eq!(results.event("inst_executed"), Some(4400));
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod backend;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod metrics;
pub mod planner;
pub mod schedule;
pub mod session;
pub mod sim;
pub mod state;
pub mod store;

pub use aggregate::{EventValueMap, MetricBuffer};
pub use backend::{
    CallbackId, CounterBackend, CounterGroups, DeviceRuntime, GroupPlanner, MetricEvaluator,
    PassGroups, Subscription, KERNEL_LAUNCH,
};
pub use config::SessionConfig;
pub use error::{ProfilerError, Result};
pub use interceptor::{normalize, LaunchCallback, LaunchSite};
pub use planner::PassSets;
pub use schedule::{PassDescriptor, PassKind, PassSchedule};
pub use session::Session;
pub use state::PassState;
pub use store::ResultStore;
