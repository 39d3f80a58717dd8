//! Config command implementation.

use crate::core::config::Config;
use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

/// Configuration operations.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Validate the configuration file.
    Validate,
    /// Print configuration with defaults.
    Show {
        /// Output format (toml, json).
        #[arg(long, default_value = "toml")]
        format: String,
    },
    /// Generate a configuration template.
    Generate {
        /// Output file path.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show configuration diff between two files.
    Diff {
        /// First config file.
        file1: PathBuf,
        /// Second config file.
        file2: PathBuf,
    },
}

/// Run the config command against the file named by the global `--config`.
pub fn run_config(config_path: &Path, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Validate => validate_config(config_path),
        ConfigCommand::Show { format } => show_config(config_path, &format),
        ConfigCommand::Generate { output } => generate_config(output.as_deref()),
        ConfigCommand::Diff { file1, file2 } => diff_configs(&file1, &file2),
    }
}

fn validate_config(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("Config file not found: {:?}", path);
    }

    let config = Config::from_file(path)?;
    println!("✓ Configuration is valid");

    if config.paths.snapshot.is_none() {
        println!("  ⚠ Warning: paths.snapshot not set; hibernate requires --snapshot");
    }
    if config.reconcile.max_passes.is_none() {
        println!("  ⚠ Warning: reconcile.max_passes not set; hibernate runs until done or interrupted");
    }

    Ok(())
}

fn show_config(path: &Path, format: &str) -> Result<()> {
    let config = Config::from_file_or_default(path)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&config)?),
        _ => println!("{}", toml::to_string_pretty(&config)?), // Default to TOML output
    }

    Ok(())
}

fn generate_config(output: Option<&Path>) -> Result<()> {
    let template = generate_template();

    match output {
        Some(path) => {
            std::fs::write(path, &template)?;
            println!("Generated config template: {:?}", path);
        }
        None => {
            println!("{}", template);
        }
    }

    Ok(())
}

fn generate_template() -> String {
    r#"# Dormant Configuration

[reconcile]
# Delay between passes while waiting for instances or volumes.
interval_ms = 5000
# No deletions are issued after a pass has run this long.
pass_deadline_ms = 30000
# max_passes = 120

[telemetry]
log_level = "info"

[paths]
# snapshot = "cluster.toml"
"#
    .to_string()
}

fn diff_configs(file1: &Path, file2: &Path) -> Result<()> {
    if !file1.exists() {
        anyhow::bail!("File not found: {:?}", file1);
    }
    if !file2.exists() {
        anyhow::bail!("File not found: {:?}", file2);
    }

    // Compare effective configurations so defaults count as set.
    let config1 = toml::Value::try_from(Config::from_file(file1)?)?;
    let config2 = toml::Value::try_from(Config::from_file(file2)?)?;

    println!("Comparing {:?} and {:?}", file1, file2);
    println!();

    for line in diff_toml_values("", &config1, &config2) {
        println!("{}", line);
    }

    Ok(())
}

fn diff_toml_values(path: &str, v1: &toml::Value, v2: &toml::Value) -> Vec<String> {
    let mut lines = Vec::new();
    let join = |key: &str| {
        if path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", path, key)
        }
    };

    match (v1, v2) {
        (toml::Value::Table(t1), toml::Value::Table(t2)) => {
            for (key, value) in t1 {
                match t2.get(key) {
                    Some(other) => lines.extend(diff_toml_values(&join(key), value, other)),
                    None => lines.push(format!("- {}: {}", join(key), value)),
                }
            }
            for (key, value) in t2 {
                if !t1.contains_key(key) {
                    lines.push(format!("+ {}: {}", join(key), value));
                }
            }
        }
        (v1, v2) if v1 != v2 => lines.push(format!("~ {}: {} -> {}", path, v1, v2)),
        _ => {}
    }
    lines
}
