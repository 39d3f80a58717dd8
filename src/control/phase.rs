//! Hibernation phases and pass outcomes.
//!
//! The phase is never stored. Each pass derives it again from what it
//! observes, so a pass that starts after a crash lands in the same phase the
//! interrupted pass was in.

use crate::control::annotations::HIBERNATION_CONDITION;
use crate::control::context::InterruptReason;
use crate::control::resources::VolumeReadiness;
use serde::{Deserialize, Serialize};

/// Observed hibernation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HibernationPhase {
    /// Hibernation not requested.
    Running,
    /// Waiting for instances to stop.
    InstancesStopping,
    /// Waiting for the annotator to mark every volume.
    VolumesDetaching,
    /// Both gates passed; instance objects are being deleted.
    Deleting,
    /// No instances remain; only volumes are left.
    Hibernated,
}

impl HibernationPhase {
    /// Check if instance objects may be deleted in this phase.
    pub fn allows_deletion(&self) -> bool {
        matches!(self, Self::Deleting)
    }

    /// Check if this is the terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Hibernated)
    }

    /// Stable condition reason for this phase.
    pub fn condition_reason(&self) -> &'static str {
        match self {
            Self::Running => "NotRequested",
            Self::InstancesStopping => "WaitingInstancesStop",
            Self::VolumesDetaching => "WaitingVolumesDetach",
            Self::Deleting => "DeletingInstances",
            Self::Hibernated => "Hibernated",
        }
    }

    /// Condition describing this phase.
    pub fn condition(&self) -> HibernationCondition {
        let (status, message) = match self {
            Self::Running => (false, "hibernation not requested"),
            Self::InstancesStopping => (false, "waiting for instances to stop"),
            Self::VolumesDetaching => (false, "waiting for volumes to be detached and captured"),
            Self::Deleting => (false, "deleting instances"),
            Self::Hibernated => (true, "cluster has been hibernated"),
        };
        HibernationCondition {
            condition_type: HIBERNATION_CONDITION.to_string(),
            status,
            reason: self.condition_reason().to_string(),
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for HibernationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "Running"),
            Self::InstancesStopping => write!(f, "InstancesStopping"),
            Self::VolumesDetaching => write!(f, "VolumesDetaching"),
            Self::Deleting => write!(f, "Deleting"),
            Self::Hibernated => write!(f, "Hibernated"),
        }
    }
}

/// Cluster condition reported for hibernation progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HibernationCondition {
    /// Condition type.
    #[serde(rename = "type")]
    pub condition_type: String,
    /// True once hibernation is complete.
    pub status: bool,
    /// Stable reason string.
    pub reason: String,
    /// Human-readable message.
    pub message: String,
}

/// A volume still missing hibernation markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingVolume {
    /// Volume name.
    pub name: String,
    /// Observed status label.
    pub status: String,
    /// Which markers were present.
    pub readiness: VolumeReadiness,
}

/// What a dry run of the gates found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Phase the next pass would act in.
    pub phase: HibernationPhase,
    /// Volumes holding up deletion. Empty unless the phase is
    /// `VolumesDetaching`.
    pub pending: Vec<PendingVolume>,
}

impl Observation {
    /// An observation with no pending volumes.
    pub fn new(phase: HibernationPhase) -> Self {
        Self {
            phase,
            pending: Vec::new(),
        }
    }
}

/// Why a pass asked to be re-invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitReason {
    /// Hibernation has not been requested on the cluster.
    NotRequested,
    /// At least one instance is still running.
    InstancesNotStopped,
    /// Volumes missing markers, in snapshot order.
    VolumesNotReady { pending: Vec<PendingVolume> },
    /// The pass stopped before issuing every deletion.
    Interrupted {
        reason: InterruptReason,
        deleted: Vec<String>,
    },
}

impl WaitReason {
    /// The phase this wait corresponds to.
    pub fn phase(&self) -> HibernationPhase {
        match self {
            Self::NotRequested => HibernationPhase::Running,
            Self::InstancesNotStopped => HibernationPhase::InstancesStopping,
            Self::VolumesNotReady { .. } => HibernationPhase::VolumesDetaching,
            Self::Interrupted { .. } => HibernationPhase::Deleting,
        }
    }
}

/// Result of a successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HibernationOutcome {
    /// Nothing more can happen yet; schedule another pass.
    Waiting(WaitReason),
    /// Every instance deletion was issued or was already done.
    Hibernated {
        /// Instances deleted by this pass.
        deleted: Vec<String>,
        /// Instances that were already gone.
        already_gone: Vec<String>,
    },
}

impl HibernationOutcome {
    /// Whether the caller should invoke the coordinator again later.
    pub fn must_wait_longer(&self) -> bool {
        matches!(self, Self::Waiting(_))
    }

    /// The phase observed by the pass.
    pub fn phase(&self) -> HibernationPhase {
        match self {
            Self::Waiting(reason) => reason.phase(),
            Self::Hibernated { .. } => HibernationPhase::Hibernated,
        }
    }

    /// Number of deletion attempts that succeeded or were no-ops.
    pub fn deletions(&self) -> usize {
        match self {
            Self::Hibernated {
                deleted,
                already_gone,
            } => deleted.len() + already_gone.len(),
            Self::Waiting(WaitReason::Interrupted { deleted, .. }) => deleted.len(),
            Self::Waiting(_) => 0,
        }
    }
}
