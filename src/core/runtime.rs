//! Reconcile loop.
//!
//! The runtime owns scheduling: it lists resources, runs one coordinator
//! pass, and either stops (hibernated, pass limit, shutdown) or sleeps for the
//! configured interval and tries again. Pass errors are logged and answered
//! with another pass; nothing is retried inside a pass.

use crate::control::collaborators::{ObjectDeleter, ResourceSource, StopProbe};
use crate::control::context::{CancelFlag, PassContext};
use crate::control::hibernate::HibernationCoordinator;
use crate::control::phase::{HibernationOutcome, HibernationPhase, WaitReason};
use crate::core::config::ReconcileConfig;
use crate::core::error::HibernationResult;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The cluster reached the hibernated state.
    Hibernated,
    /// The configured pass limit was reached first.
    PassLimit,
    /// Shutdown was requested.
    Shutdown,
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Why the loop stopped.
    pub stop_reason: StopReason,
    /// Value of the runtime's pass counter when the run stopped.
    pub passes: u64,
    /// Passes in this run that ended in an error.
    pub failed_passes: u64,
    /// Phase observed by the last pass that did not fail.
    pub last_phase: Option<HibernationPhase>,
    /// Instances deleted across all passes.
    pub deleted: Vec<String>,
}

impl RunSummary {
    /// Check if the run ended hibernated.
    pub fn is_hibernated(&self) -> bool {
        self.stop_reason == StopReason::Hibernated
    }
}

/// Handle used to stop a running loop from another task.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
    cancel: CancelFlag,
}

impl ShutdownHandle {
    /// Request shutdown. An in-flight pass stops before its next deletion.
    pub fn shutdown(&self) {
        tracing::info!("shutdown requested");
        self.cancel.cancel();
        let _ = self.tx.send(true);
    }
}

/// Drives hibernation passes for one cluster until a terminal result.
pub struct Runtime<S, P, D> {
    /// Scheduling configuration.
    config: ReconcileConfig,

    /// Where each pass gets its snapshot.
    source: S,

    /// The coordinator run by each pass.
    coordinator: HibernationCoordinator<P, D>,

    /// Cancellation shared with every pass context.
    cancel: CancelFlag,

    /// Shutdown signal sender.
    shutdown_tx: Arc<watch::Sender<bool>>,

    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,

    /// Passes executed so far.
    passes: u64,
}

impl<S, P, D> Runtime<S, P, D>
where
    S: ResourceSource,
    P: StopProbe,
    D: ObjectDeleter,
{
    /// Create a runtime.
    pub fn new(config: ReconcileConfig, source: S, probe: P, deleter: D) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            config,
            source,
            coordinator: HibernationCoordinator::new(probe, deleter),
            cancel: CancelFlag::new(),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
            passes: 0,
        }
    }

    /// Get a handle that can stop the loop.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
            cancel: self.cancel.clone(),
        }
    }

    /// Passes executed over the lifetime of this runtime.
    ///
    /// Pass numbers in logs and contexts come from this counter, and
    /// `max_passes` bounds it.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    fn pass_limit_reached(&self) -> bool {
        self.config
            .max_passes
            .is_some_and(|max| self.passes >= max)
    }

    /// Run a single pass against a fresh snapshot.
    pub fn run_pass(&mut self) -> HibernationResult<HibernationOutcome> {
        self.passes += 1;
        let cluster = self.source.cluster()?;
        let ctx = PassContext::new(cluster.name.clone(), self.passes)
            .with_timeout(self.config.pass_deadline())
            .with_cancel(self.cancel.clone());
        let resources = self.source.list()?;
        self.coordinator.reconcile(&ctx, &cluster, &resources)
    }

    /// Run passes until hibernated, the pass limit, or shutdown.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary {
            stop_reason: StopReason::Shutdown,
            passes: 0,
            failed_passes: 0,
            last_phase: None,
            deleted: Vec::new(),
        };

        tracing::info!(
            interval_ms = self.config.interval_ms,
            max_passes = ?self.config.max_passes,
            "starting reconcile loop"
        );

        loop {
            if self.shutdown_requested() {
                summary.stop_reason = StopReason::Shutdown;
                break;
            }
            if self.pass_limit_reached() {
                tracing::warn!(passes = self.passes, "pass limit reached");
                summary.stop_reason = StopReason::PassLimit;
                break;
            }

            let result = self.run_pass();

            match result {
                Ok(outcome) => {
                    let phase = outcome.phase();
                    summary.last_phase = Some(phase);
                    match outcome {
                        HibernationOutcome::Hibernated { deleted, .. } => {
                            summary.deleted.extend(deleted);
                        }
                        HibernationOutcome::Waiting(reason) => {
                            tracing::debug!(
                                pass = self.passes,
                                reason = ?reason,
                                "waiting for next pass"
                            );
                            if let WaitReason::Interrupted { deleted, .. } = reason {
                                summary.deleted.extend(deleted);
                            }
                        }
                    }
                    if phase.is_terminal() {
                        summary.stop_reason = StopReason::Hibernated;
                        tracing::info!(passes = self.passes, "cluster hibernated");
                        break;
                    }
                }
                Err(e) => {
                    summary.failed_passes += 1;
                    tracing::warn!(pass = self.passes, error = %e, "hibernation pass failed");
                }
            }

            if self.wait_interval().await {
                summary.stop_reason = StopReason::Shutdown;
                break;
            }
        }

        summary.passes = self.passes;
        tracing::info!(
            passes = summary.passes,
            failed = summary.failed_passes,
            reason = ?summary.stop_reason,
            "reconcile loop stopped"
        );
        Ok(summary)
    }

    /// Sleep for the pass interval. Returns true if shutdown arrived first.
    async fn wait_interval(&mut self) -> bool {
        let mut shutdown_rx = self.shutdown_rx.clone();
        tokio::select! {
            _ = tokio::time::sleep(self.config.interval()) => false,
            _ = async {
                while !*shutdown_rx.borrow() {
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            } => true,
        }
    }
}
