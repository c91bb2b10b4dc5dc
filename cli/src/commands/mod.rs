//! CLI command implementations

pub mod init_config;
pub mod list;
pub mod plan;
pub mod run;
