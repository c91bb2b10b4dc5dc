//! CLI for passcount
//!
//! Drives a collection session against the simulated device:
//! - run: collect the requested events and metrics over as many passes as needed
//! - plan: show the pass schedule without running anything
//! - list: show the events and metrics the device exposes
//! - init-config: print a sample session configuration

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod output;
mod settings;

#[derive(Parser)]
#[command(name = "passcount")]
#[command(about = "passcount - multi-pass hardware counter collection", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect events and metrics from a workload
    Run(commands::run::RunArgs),

    /// Show the pass schedule for a request
    Plan(commands::plan::PlanArgs),

    /// List the events and metrics of the device
    List(commands::list::ListArgs),

    /// Print a sample configuration file
    InitConfig(commands::init_config::InitConfigArgs),
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Plan(args) => commands::plan::run(args),
        Commands::List(args) => commands::list::run(args),
        Commands::InitConfig(args) => commands::init_config::run(args),
    };

    if let Err(e) = result {
        output::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
