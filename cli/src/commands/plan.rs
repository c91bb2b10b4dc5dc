//! Plan command implementation

use anyhow::{Context, Result};
use clap::Args;
use passcount_gpu::sim::SimulatedDevice;
use passcount_gpu::{DeviceRuntime, Session};

use crate::output;
use crate::settings::RequestArgs;

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub request: RequestArgs,
}

pub fn run(args: PlanArgs) -> Result<()> {
    let config = args.request.load()?;

    let session = Session::new(SimulatedDevice::default(), &config)
        .context("Failed to plan collection session")?;
    let schedule = session.schedule();

    output::section("Pass Schedule");
    println!(
        "  {} metric passes, {} event passes",
        schedule.metric_passes(),
        schedule.event_passes()
    );
    println!("\n  {:>4} {:<7} {:>6}  EVENTS", "PASS", "KIND", "GROUPS");

    for pass in schedule.iter() {
        let names = pass
            .event_ids
            .iter()
            .map(|id| session.backend().event_name(*id))
            .collect::<passcount_gpu::Result<Vec<_>>>()?;

        println!(
            "  {:>4} {:<7} {:>6}  {}",
            pass.index,
            pass.kind.label(),
            pass.groups.len(),
            names.join(", ")
        );
    }

    output::info(&format!(
        "The workload must run {} times",
        session.required_pass_count()
    ));
    Ok(())
}
