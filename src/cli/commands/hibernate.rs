//! Hibernate command implementation.

use crate::core::config::{Config, ConfigOverrides};
use crate::core::runtime::{Runtime, StopReason};
use crate::store::MemoryStore;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

/// Run hibernation passes over a cluster snapshot.
#[derive(Args, Debug)]
pub struct HibernateArgs {
    /// Cluster snapshot file (JSON or TOML). Defaults to paths.snapshot.
    #[arg(short, long)]
    pub snapshot: Option<PathBuf>,

    /// Delay between passes in milliseconds.
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Stop after this many passes.
    #[arg(long)]
    pub max_passes: Option<u64>,

    /// Stop instances and annotate their volumes between passes, standing in
    /// for the instance manager and the volume annotator.
    #[arg(long)]
    pub simulate: bool,

    /// Write the resulting snapshot to this file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Run the hibernate command.
pub async fn run_hibernate(mut config: Config, args: HibernateArgs) -> Result<()> {
    config.apply_overrides(&ConfigOverrides {
        log_level: None,
        interval_ms: args.interval_ms,
        max_passes: args.max_passes,
        snapshot: args.snapshot.clone(),
    });
    config.validate().context("invalid configuration")?;

    let snapshot_path = config
        .paths
        .snapshot
        .clone()
        .context("no snapshot given; pass --snapshot or set paths.snapshot")?;

    let store = Arc::new(MemoryStore::load(&snapshot_path)?);
    let mut runtime = Runtime::new(
        config.reconcile.clone(),
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&store),
    );

    let shutdown = runtime.shutdown_handle();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("shutdown signal received (SIGINT)");
            shutdown.shutdown();
        }
    });

    let simulator = args.simulate.then(|| {
        let store = Arc::clone(&store);
        let interval = config.reconcile.interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let annotated = store.step_shutdown();
                if annotated > 0 {
                    tracing::info!(volumes = annotated, "simulated volume annotation");
                }
            }
        })
    });

    let summary = runtime.run().await;
    signal_task.abort();
    if let Some(task) = simulator {
        task.abort();
    }
    let summary = summary?;

    println!("Hibernation Summary");
    println!("===================");
    println!("Snapshot:     {}", snapshot_path.display());
    println!("Passes:       {}", summary.passes);
    println!("Failed:       {}", summary.failed_passes);
    if let Some(phase) = summary.last_phase {
        println!("Phase:        {}", phase);
    }
    println!("Deleted:      {}", summary.deleted.join(", "));
    println!("Volumes kept: {}", store.volume_count());

    if let Some(ref output) = args.output {
        write_snapshot(&store, output)?;
        println!("Snapshot written to {}", output.display());
    }

    match summary.stop_reason {
        StopReason::Hibernated => Ok(()),
        StopReason::PassLimit => anyhow::bail!(
            "cluster not hibernated after {} passes",
            summary.passes
        ),
        StopReason::Shutdown => anyhow::bail!("interrupted before hibernation completed"),
    }
}

fn write_snapshot(store: &MemoryStore, path: &PathBuf) -> Result<()> {
    let snapshot = store.to_snapshot();
    let content = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::to_string_pretty(&snapshot)?,
        _ => toml::to_string_pretty(&snapshot)?,
    };
    std::fs::write(path, content)
        .with_context(|| format!("failed to write snapshot: {}", path.display()))
}
