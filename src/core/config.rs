//! Configuration parsing and validation.
//!
//! Configuration is loaded from a TOML file with CLI overrides. Every section
//! is optional; an empty file yields the defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Reconcile loop scheduling.
    #[serde(default)]
    pub reconcile: ReconcileConfig,

    /// Logging configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Filesystem paths.
    #[serde(default)]
    pub paths: PathConfig,
}

/// Reconcile loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Delay between passes while waiting, in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Deadline for a single pass, in milliseconds.
    #[serde(default = "default_pass_deadline_ms")]
    pub pass_deadline_ms: u64,

    /// Stop after this many passes even if not hibernated.
    #[serde(default)]
    pub max_passes: Option<u64>,
}

impl ReconcileConfig {
    /// Delay between passes.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Deadline for a single pass.
    pub fn pass_deadline(&self) -> Duration {
        Duration::from_millis(self.pass_deadline_ms)
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            pass_deadline_ms: default_pass_deadline_ms(),
            max_passes: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Filesystem path configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathConfig {
    /// Cluster snapshot file (JSON or TOML).
    #[serde(default)]
    pub snapshot: Option<PathBuf>,
}

// Default value functions

fn default_interval_ms() -> u64 {
    5_000
}

fn default_pass_deadline_ms() -> u64 {
    30_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).with_context(|| "failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file if it exists, otherwise use defaults.
    pub fn from_file_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply CLI overrides to the configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref log_level) = overrides.log_level {
            self.telemetry.log_level = log_level.clone();
        }
        if let Some(interval_ms) = overrides.interval_ms {
            self.reconcile.interval_ms = interval_ms;
        }
        if let Some(max_passes) = overrides.max_passes {
            self.reconcile.max_passes = Some(max_passes);
        }
        if let Some(ref snapshot) = overrides.snapshot {
            self.paths.snapshot = Some(snapshot.clone());
        }
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<()> {
        self.validate_reconcile()?;
        self.validate_telemetry()?;
        Ok(())
    }

    fn validate_reconcile(&self) -> Result<()> {
        if self.reconcile.interval_ms == 0 {
            anyhow::bail!("reconcile.interval_ms must be > 0");
        }
        if self.reconcile.pass_deadline_ms == 0 {
            anyhow::bail!("reconcile.pass_deadline_ms must be > 0");
        }
        if self.reconcile.max_passes == Some(0) {
            anyhow::bail!("reconcile.max_passes must be > 0 when set");
        }
        Ok(())
    }

    fn validate_telemetry(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.telemetry.log_level.as_str()) {
            anyhow::bail!(
                "telemetry.log_level must be one of {:?}, got: {}",
                valid_levels,
                self.telemetry.log_level
            );
        }
        Ok(())
    }
}

/// CLI override options that can be applied to configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override log level.
    pub log_level: Option<String>,
    /// Override pass interval.
    pub interval_ms: Option<u64>,
    /// Override pass limit.
    pub max_passes: Option<u64>,
    /// Override snapshot path.
    pub snapshot: Option<PathBuf>,
}
