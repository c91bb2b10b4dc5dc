//! Run command implementation

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use passcount_gpu::sim::SimulatedDevice;
use passcount_gpu::Session;
use passcount_shared::SessionReport;

use crate::output;
use crate::settings::RequestArgs;

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Workload launches (defaults to the required pass count)
    #[arg(short, long)]
    pub launches: Option<usize>,

    /// Kernels issued by each workload launch
    #[arg(short, long, default_value = "1")]
    pub kernels: u32,

    /// Write the report as JSON instead of printing it
    #[arg(long)]
    pub json: Option<PathBuf>,
}

pub fn run(args: RunArgs) -> Result<()> {
    let config = args.request.load()?;

    let mut session = Session::new(SimulatedDevice::default(), &config)
        .context("Failed to start collection session")?;

    let required = session.required_pass_count();
    let launches = args.launches.unwrap_or(required);
    output::info(&format!(
        "{} passes required, launching the workload {} times",
        required, launches
    ));

    let progress = ProgressBar::new(launches as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let kernels = args.kernels;
    for _ in 0..launches {
        progress.set_message(format!("pass {}", (session.cursor() + 1).min(required)));
        session
            .launch(|device| {
                for _ in 0..kernels {
                    device.run_kernel();
                }
            })
            .context("Workload launch failed")?;
        progress.inc(1);
    }
    progress.finish_and_clear();

    let report = session.report().context("Failed to finalize session")?;

    match &args.json {
        Some(path) => {
            let json = serde_json::to_string_pretty(&report)?;
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            output::success(&format!("Report written to {}", path.display()));
        }
        None => print_report(&report),
    }

    if report.is_complete() {
        output::success("Collection complete");
    } else {
        output::warning(&format!(
            "Workload ran {} of {} required times; missing values are reported as 0",
            launches.min(required),
            required
        ));
    }

    Ok(())
}

fn print_report(report: &SessionReport) {
    output::section(&format!(
        "Device {} ({})",
        report.device,
        report.collected_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output::print_passes(&report.passes);

    if !report.events.is_empty() {
        output::section("Events");
        output::print_events(&report.events);
    }
    if !report.metrics.is_empty() {
        output::section("Metrics");
        output::print_metrics(&report.metrics);
    }
}
