//! List command implementation

use anyhow::Result;
use clap::Args;
use passcount_gpu::sim::{Catalog, SimulatedDevice};

use crate::output;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only list events
    #[arg(long, conflicts_with = "metrics_only")]
    pub events_only: bool,

    /// Only list metrics
    #[arg(long)]
    pub metrics_only: bool,
}

pub fn run(args: ListArgs) -> Result<()> {
    let device = SimulatedDevice::default();
    let catalog = device.catalog();

    if !args.metrics_only {
        print_events(catalog);
    }
    if !args.events_only {
        print_metrics(catalog);
    }

    output::info(&format!(
        "Up to {} events per counter group",
        catalog.events_per_group
    ));
    Ok(())
}

fn print_events(catalog: &Catalog) {
    output::section("Events");
    println!("  {:<20} {:>8} {:<6} {:>10}", "EVENT", "ID", "DOMAIN", "INSTANCES");

    for event in &catalog.events {
        let (domain, instances) = match catalog.domain_by_id(event.domain) {
            Some(d) => (
                d.name.as_str(),
                format!("{}/{}", d.sampled_instances, d.total_instances),
            ),
            None => ("?", String::new()),
        };
        println!(
            "  {:<20} {:>8} {:<6} {:>10}",
            event.name,
            format!("{:#x}", event.id.0),
            domain,
            instances
        );
    }
}

fn print_metrics(catalog: &Catalog) {
    output::section("Metrics");
    println!("  {:<24} {:<18}  EVENTS", "METRIC", "KIND");

    for metric in &catalog.metrics {
        println!(
            "  {:<24} {:<18}  {}",
            metric.name,
            metric.formula.kind().label(),
            metric.formula.event_names().join(", ")
        );
    }
}
