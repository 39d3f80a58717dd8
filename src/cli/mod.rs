//! Command-line interface.
//!
//! Unified CLI for hibernation operations.

pub mod commands;

use clap::{Parser, Subcommand};

/// Dormant - hibernate stateful database clusters without losing storage.
#[derive(Parser, Debug)]
#[command(name = "dormant")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path.
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run hibernation passes over a cluster snapshot until hibernated.
    Hibernate(commands::HibernateArgs),
    /// Report the hibernation phase of a snapshot without changing it.
    Check(commands::CheckArgs),
    /// Configuration operations.
    Config(commands::ConfigArgs),
}

/// Initialize the tracing subscriber if the telemetry feature is enabled.
///
/// `RUST_LOG` takes precedence over the configured level.
#[cfg(feature = "telemetry")]
pub fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init();
}

#[cfg(not(feature = "telemetry"))]
pub fn init_tracing(_level: &str) {}
