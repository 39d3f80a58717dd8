//! Dormant - unified CLI entrypoint.
//!
//! Usage:
//!   dormant hibernate --snapshot cluster.toml [--simulate] [--max-passes N]
//!   dormant check --snapshot cluster.toml [--format json]
//!   dormant config validate --config config/dormant.toml

use anyhow::Result;
use clap::Parser;
use dormant::cli::commands::{run_check, run_config, run_hibernate};
use dormant::cli::{init_tracing, Cli, Commands};
use dormant::core::config::{Config, ConfigOverrides};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine config path - use global --config or default
    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config/dormant.toml"));

    // Config commands report problems with the file themselves.
    let command = match cli.command {
        Commands::Config(args) => {
            init_tracing(cli.log_level.as_deref().unwrap_or("info"));
            return run_config(&config_path, args);
        }
        command => command,
    };

    let mut config = Config::from_file_or_default(&config_path)?;
    config.apply_overrides(&ConfigOverrides {
        log_level: cli.log_level,
        ..Default::default()
    });
    config.validate()?;
    init_tracing(&config.telemetry.log_level);

    match command {
        Commands::Hibernate(args) => run_hibernate(config, args).await,
        Commands::Check(args) => run_check(args),
        Commands::Config(_) => Ok(()),
    }
}
