//! Output formatting utilities for CLI commands

use colored::Colorize;
use passcount_shared::{EventReading, MetricReading, PassSummary};

/// Print success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print warning message
pub fn warning(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

pub fn section(title: &str) {
    println!("\n=== {} ===", title.bold());
}

pub fn print_passes(passes: &[PassSummary]) {
    println!(
        "  {:>4} {:<7} {:>6} {:>9} {:>10}",
        "PASS", "KIND", "GROUPS", "EVENTS", "TIME(us)"
    );
    for pass in passes {
        let events = format!("{}/{}", pass.collected_events, pass.expected_events);
        let events = if pass.is_complete() {
            events.normal()
        } else {
            events.yellow()
        };
        println!(
            "  {:>4} {:<7} {:>6} {:>9} {:>10.1}",
            pass.index,
            pass.kind,
            pass.groups,
            events,
            pass.elapsed_ns as f64 / 1000.0
        );
    }
}

pub fn print_events(events: &[EventReading]) {
    println!("  {:<24} {:>20}", "EVENT", "VALUE");
    for event in events {
        println!("  {:<24} {:>20}", event.name, event.value);
    }
}

pub fn print_metrics(metrics: &[MetricReading]) {
    println!("  {:<24} {:<18} {:>20}", "METRIC", "KIND", "VALUE");
    for metric in metrics {
        println!(
            "  {:<24} {:<18} {:>20}",
            metric.name,
            metric.value.kind().label(),
            metric.value.to_string()
        );
    }
}
