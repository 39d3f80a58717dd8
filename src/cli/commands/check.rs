//! Check command implementation.

use crate::control::context::PassContext;
use crate::control::hibernate::HibernationCoordinator;
use crate::control::phase::{HibernationCondition, HibernationPhase, PendingVolume};
use crate::store::{ClusterSnapshot, MemoryStore};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

/// Report the hibernation phase of a snapshot.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Cluster snapshot file (JSON or TOML).
    #[arg(short, long)]
    pub snapshot: PathBuf,

    /// Output format (text, json).
    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    cluster: String,
    phase: HibernationPhase,
    condition: HibernationCondition,
    deletion_allowed: bool,
    instances: Vec<String>,
    pending_volumes: Vec<PendingVolume>,
}

/// Run the check command.
pub fn run_check(args: CheckArgs) -> Result<()> {
    let snapshot = ClusterSnapshot::from_file(&args.snapshot)?;
    let report = build_report(snapshot)?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => show_report_text(&report), // Default to text output
    }
    Ok(())
}

fn build_report(snapshot: ClusterSnapshot) -> Result<CheckReport> {
    let (cluster, resources) = snapshot.into_parts();
    let store = MemoryStore::new(cluster.clone(), resources.clone())?;
    let coordinator = HibernationCoordinator::new(&store, &store);
    let ctx = PassContext::new(cluster.name.clone(), 0);

    let observation = coordinator.inspect(&ctx, &cluster, &resources)?;
    let phase = observation.phase;
    Ok(CheckReport {
        cluster: cluster.qualified_name(),
        phase,
        condition: phase.condition(),
        deletion_allowed: phase.allows_deletion(),
        instances: resources
            .instance_names()
            .into_iter()
            .map(String::from)
            .collect(),
        pending_volumes: observation.pending,
    })
}

fn show_report_text(report: &CheckReport) {
    println!("Hibernation Status");
    println!("==================");
    println!("Cluster:   {}", report.cluster);
    println!("Phase:     {}", report.phase);
    println!(
        "Condition: {}={} ({})",
        report.condition.condition_type, report.condition.status, report.condition.reason
    );
    println!(
        "Deletion:  {}",
        if report.deletion_allowed {
            "next pass deletes instances"
        } else {
            "blocked"
        }
    );
    println!();

    println!("Instances: {}", report.instances.len());
    for name in &report.instances {
        println!("  {}", name);
    }
    println!();

    if report.pending_volumes.is_empty() {
        return;
    }
    println!("Pending volumes:");
    println!("  {:<24} {:<12} {}", "NAME", "STATUS", "MISSING");
    for volume in &report.pending_volumes {
        println!(
            "  {:<24} {:<12} {}",
            volume.name,
            if volume.status.is_empty() {
                "-"
            } else {
                volume.status.as_str()
            },
            volume.readiness.missing().join(",")
        );
    }
}
