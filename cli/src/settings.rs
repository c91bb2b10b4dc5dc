//! Session configuration loading
//!
//! Sources, lowest precedence first: optional TOML file, `PASSCOUNT_*`
//! environment variables, command-line flags.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use config::{Config, Environment, File, FileFormat};
use passcount_gpu::SessionConfig;
use passcount_shared::utils::parse_name_list;

pub const ENV_PREFIX: &str = "PASSCOUNT";

/// What to collect, shared by `run` and `plan`
#[derive(Args, Debug, Default)]
pub struct RequestArgs {
    /// Configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Comma-separated raw event names
    #[arg(short, long)]
    pub events: Option<String>,

    /// Comma-separated metric names
    #[arg(short, long)]
    pub metrics: Option<String>,

    /// Device index
    #[arg(short, long)]
    pub device: Option<u32>,

    /// Fail when the workload ran fewer times than required
    #[arg(long)]
    pub strict: bool,
}

impl RequestArgs {
    pub fn load(&self) -> Result<SessionConfig> {
        self.load_with(Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with(&self, env: Environment) -> Result<SessionConfig> {
        let mut builder = Config::builder();

        if let Some(path) = &self.config {
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml));
        }

        let env = env
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("events")
            .with_list_parse_key("metrics");

        let mut config: SessionConfig = builder
            .add_source(env)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        if let Some(events) = &self.events {
            config.events = parse_name_list(events);
        }
        if let Some(metrics) = &self.metrics {
            config.metrics = parse_name_list(metrics);
        }
        if let Some(device) = self.device {
            config.device = device;
        }
        if self.strict {
            config.strict = true;
        }

        config.validate()?;
        Ok(config)
    }
}
