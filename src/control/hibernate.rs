//! Hibernation coordinator.
//!
//! One call to [`HibernationCoordinator::advance`] is one reconciliation pass.
//! It moves through three gates and stops at the first that does not pass:
//!
//! 1. every instance reports stopped (asked of the [`StopProbe`]),
//! 2. every volume is `detached` and carries both the manifest and the
//!    control data annotations,
//! 3. every instance object is deleted through the [`ObjectDeleter`].
//!
//! Volumes are never deleted. The coordinator keeps no state between calls;
//! the caller re-invokes it until it reports [`HibernationOutcome::Hibernated`].

use crate::control::collaborators::{ObjectDeleter, StopProbe};
use crate::control::context::{InterruptReason, PassContext};
use crate::control::phase::{
    HibernationOutcome, HibernationPhase, Observation, PendingVolume, WaitReason,
};
use crate::control::resources::{Cluster, Instance, ManagedResources};
use crate::core::error::{HibernationError, HibernationResult, ObjectError};

/// Result of a single deletion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The instance object was removed.
    Deleted,
    /// The instance object was already gone.
    AlreadyGone,
    /// Deletion failed and the pass must stop.
    Failed(ObjectError),
}

impl From<Result<(), ObjectError>> for DeleteOutcome {
    fn from(result: Result<(), ObjectError>) -> Self {
        match result {
            Ok(()) => Self::Deleted,
            Err(err) if err.is_not_found() => Self::AlreadyGone,
            Err(err) => Self::Failed(err),
        }
    }
}

#[derive(Debug, Default)]
struct DeletionTally {
    deleted: Vec<String>,
    already_gone: Vec<String>,
}

enum DeletionHalt {
    Interrupted(InterruptReason, DeletionTally),
    Failed(String, ObjectError),
}

/// Drives a cluster towards hibernation one pass at a time.
pub struct HibernationCoordinator<P, D> {
    probe: P,
    deleter: D,
}

impl<P: StopProbe, D: ObjectDeleter> HibernationCoordinator<P, D> {
    /// Create a coordinator over the given collaborators.
    pub fn new(probe: P, deleter: D) -> Self {
        Self { probe, deleter }
    }

    /// Run a pass only if the cluster asks for hibernation.
    pub fn reconcile(
        &self,
        ctx: &PassContext,
        cluster: &Cluster,
        resources: &ManagedResources,
    ) -> HibernationResult<HibernationOutcome> {
        let intent = cluster.hibernation_intent();
        if !intent.is_requested() {
            tracing::debug!(
                cluster = %cluster.name,
                pass = ctx.pass,
                intent = ?intent,
                "hibernation not requested"
            );
            return Ok(HibernationOutcome::Waiting(WaitReason::NotRequested));
        }
        self.advance(ctx, cluster, resources)
    }

    /// Run one hibernation pass.
    ///
    /// `Ok(Waiting(_))` and `Err(_)` both mean the caller must invoke again
    /// later. Deletions issued before an error are not undone.
    pub fn advance(
        &self,
        ctx: &PassContext,
        cluster: &Cluster,
        resources: &ManagedResources,
    ) -> HibernationResult<HibernationOutcome> {
        tracing::info!(cluster = %cluster.name, pass = ctx.pass, "hibernating cluster");

        if let Some(reason) = self.check_gates(ctx, cluster, resources)? {
            return Ok(HibernationOutcome::Waiting(reason));
        }

        tracing::info!(
            cluster = %cluster.name,
            pass = ctx.pass,
            "done waiting for volumes for cluster hibernation"
        );

        self.delete_instances(ctx, cluster, &resources.instances)
    }

    /// Report the phase the next pass would act in, without deleting anything.
    pub fn observe(
        &self,
        ctx: &PassContext,
        cluster: &Cluster,
        resources: &ManagedResources,
    ) -> HibernationResult<HibernationPhase> {
        Ok(self.inspect(ctx, cluster, resources)?.phase)
    }

    /// Run the gates a pass would run and report what they found.
    ///
    /// `Hibernated` needs both gates to pass on a snapshot with no instances,
    /// which is exactly when `advance` would return `Hibernated` without
    /// deleting.
    pub fn inspect(
        &self,
        ctx: &PassContext,
        cluster: &Cluster,
        resources: &ManagedResources,
    ) -> HibernationResult<Observation> {
        if !cluster.hibernation_intent().is_requested() {
            return Ok(Observation::new(HibernationPhase::Running));
        }
        Ok(match self.check_gates(ctx, cluster, resources)? {
            Some(WaitReason::VolumesNotReady { pending }) => Observation {
                phase: HibernationPhase::VolumesDetaching,
                pending,
            },
            Some(reason) => Observation::new(reason.phase()),
            None if resources.instances.is_empty() => {
                Observation::new(HibernationPhase::Hibernated)
            }
            None => Observation::new(HibernationPhase::Deleting),
        })
    }

    /// Gates A and B. `None` means deletion may proceed.
    fn check_gates(
        &self,
        ctx: &PassContext,
        cluster: &Cluster,
        resources: &ManagedResources,
    ) -> HibernationResult<Option<WaitReason>> {
        if !self.probe.all_stopped(ctx, &resources.instances)? {
            tracing::info!(cluster = %cluster.name, pass = ctx.pass, "instances are not stopped");
            return Ok(Some(WaitReason::InstancesNotStopped));
        }

        let pending = self.pending_volumes(ctx, cluster, resources);
        if !pending.is_empty() {
            return Ok(Some(WaitReason::VolumesNotReady { pending }));
        }

        Ok(None)
    }

    /// Inspect every volume and collect those missing a marker.
    fn pending_volumes(
        &self,
        ctx: &PassContext,
        cluster: &Cluster,
        resources: &ManagedResources,
    ) -> Vec<PendingVolume> {
        let mut pending = Vec::new();
        for volume in &resources.volumes {
            tracing::info!(
                cluster = %cluster.name,
                pass = ctx.pass,
                volume = %volume.name,
                annotations = ?volume.annotations,
                "checking volume annotations"
            );
            let readiness = volume.readiness();
            if !readiness.is_ready() {
                tracing::info!(
                    cluster = %cluster.name,
                    pass = ctx.pass,
                    volume = %volume.name,
                    status = volume.status(),
                    missing = ?readiness.missing(),
                    "volume does not have hibernation annotations; continue waiting"
                );
                pending.push(PendingVolume {
                    name: volume.name.clone(),
                    status: volume.status().to_string(),
                    readiness,
                });
            }
        }
        pending
    }

    /// Gate C: delete every instance object, stopping at the first failure.
    fn delete_instances(
        &self,
        ctx: &PassContext,
        cluster: &Cluster,
        instances: &[Instance],
    ) -> HibernationResult<HibernationOutcome> {
        let folded = instances
            .iter()
            .try_fold(DeletionTally::default(), |mut tally, instance| {
                if let Some(reason) = ctx.interrupted() {
                    return Err(DeletionHalt::Interrupted(reason, tally));
                }
                match self.delete_one(ctx, cluster, instance) {
                    DeleteOutcome::Deleted => tally.deleted.push(instance.name.clone()),
                    DeleteOutcome::AlreadyGone => tally.already_gone.push(instance.name.clone()),
                    DeleteOutcome::Failed(err) => {
                        return Err(DeletionHalt::Failed(instance.name.clone(), err))
                    }
                }
                Ok(tally)
            });

        match folded {
            Ok(tally) => Ok(HibernationOutcome::Hibernated {
                deleted: tally.deleted,
                already_gone: tally.already_gone,
            }),
            Err(DeletionHalt::Interrupted(reason, tally)) => {
                tracing::warn!(
                    cluster = %cluster.name,
                    pass = ctx.pass,
                    reason = %reason,
                    deleted = tally.deleted.len(),
                    "pass interrupted before all instances were deleted"
                );
                Ok(HibernationOutcome::Waiting(WaitReason::Interrupted {
                    reason,
                    deleted: tally.deleted,
                }))
            }
            Err(DeletionHalt::Failed(instance, err)) => {
                tracing::error!(
                    cluster = %cluster.name,
                    pass = ctx.pass,
                    instance = %instance,
                    error = %err,
                    "cannot delete instance for cluster hibernation"
                );
                Err(HibernationError::delete_failed(instance, err))
            }
        }
    }

    fn delete_one(&self, ctx: &PassContext, cluster: &Cluster, instance: &Instance) -> DeleteOutcome {
        let outcome = DeleteOutcome::from(self.deleter.delete(ctx, instance));
        match &outcome {
            DeleteOutcome::Deleted => tracing::info!(
                cluster = %cluster.name,
                pass = ctx.pass,
                instance = %instance.name,
                "deleting instance for cluster hibernation"
            ),
            DeleteOutcome::AlreadyGone => tracing::debug!(
                cluster = %cluster.name,
                pass = ctx.pass,
                instance = %instance.name,
                "instance already deleted"
            ),
            DeleteOutcome::Failed(_) => {}
        }
        outcome
    }
}
