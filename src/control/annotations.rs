//! Annotation keys and hibernation intent.
//!
//! Volumes carry their hibernation markers as annotations written by the
//! volume annotator once it has seen the owning instance stop. The cluster
//! carries the operator's intent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Volume status label.
pub const VOLUME_STATUS: &str = "cnpg.io/pvcStatus";

/// Status value of a volume that has been safely unbound from its instance.
pub const VOLUME_STATUS_DETACHED: &str = "detached";

/// Present once the cluster manifest has been captured on the volume.
pub const HIBERNATION_MANIFEST: &str = "cnpg.io/hibernateClusterManifest";

/// Present once the control data has been captured on the volume.
pub const HIBERNATION_CONTROL_DATA: &str = "cnpg.io/hibernatePgControlData";

/// Cluster annotation selecting hibernation on or off.
pub const HIBERNATION: &str = "cnpg.io/hibernation";

/// Condition type reported for hibernation progress.
pub const HIBERNATION_CONDITION: &str = "cnpg.io/hibernation";

/// Annotation map, ordered so logs are deterministic.
pub type Annotations = BTreeMap<String, String>;

/// Hibernation intent declared on a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HibernationIntent {
    /// Hibernation requested.
    On,
    /// Hibernation explicitly switched off (rehydrate).
    Off,
    /// No annotation, or a value that is neither `on` nor `off`.
    Unset,
}

impl HibernationIntent {
    /// Read the intent from cluster annotations.
    pub fn from_annotations(annotations: &Annotations) -> Self {
        match annotations.get(HIBERNATION).map(|v| v.trim()) {
            Some(v) if v.eq_ignore_ascii_case("on") => Self::On,
            Some(v) if v.eq_ignore_ascii_case("off") => Self::Off,
            _ => Self::Unset,
        }
    }

    /// Check if hibernation has been requested.
    pub fn is_requested(&self) -> bool {
        matches!(self, Self::On)
    }
}
