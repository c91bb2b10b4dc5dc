//! Init-config command implementation

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use passcount_gpu::SessionConfig;

use crate::output;

#[derive(Args, Debug)]
pub struct InitConfigArgs {
    /// Write the sample to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn sample() -> SessionConfig {
    SessionConfig::new(
        ["inst_executed", "l2_read_hit"],
        ["ipc", "sm_efficiency", "dram_read_throughput"],
    )
}

pub fn render(config: &SessionConfig) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize configuration")
}

pub fn run(args: InitConfigArgs) -> Result<()> {
    let text = render(&sample())?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            output::success(&format!("Sample configuration written to {}", path.display()));
        }
        None => print!("{}", text),
    }

    Ok(())
}
