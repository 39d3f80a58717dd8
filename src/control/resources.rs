//! Observed cluster resources.
//!
//! A [`ManagedResources`] snapshot is what one reconciliation pass sees: the
//! instances and volumes currently associated with a cluster. Nothing here is
//! mutated by the coordinator.

use crate::control::annotations::{
    Annotations, HibernationIntent, HIBERNATION, HIBERNATION_CONTROL_DATA, HIBERNATION_MANIFEST,
    VOLUME_STATUS, VOLUME_STATUS_DETACHED,
};
use serde::{Deserialize, Serialize};

/// Cluster identity and declared intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Cluster name.
    pub name: String,

    /// Namespace the cluster lives in.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Cluster annotations.
    #[serde(default)]
    pub annotations: Annotations,
}

impl Cluster {
    /// Create a cluster with no annotations in the default namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: default_namespace(),
            annotations: Annotations::new(),
        }
    }

    /// Builder-style helper that requests hibernation.
    pub fn hibernating(mut self) -> Self {
        self.annotations
            .insert(HIBERNATION.to_string(), "on".to_string());
        self
    }

    /// The declared hibernation intent.
    pub fn hibernation_intent(&self) -> HibernationIntent {
        HibernationIntent::from_annotations(&self.annotations)
    }

    /// `namespace/name`, used in log fields.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

fn default_namespace() -> String {
    "default".to_string()
}

/// Observed lifecycle state of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceState {
    /// The database process is serving.
    #[default]
    Running,
    /// Shutdown requested but not finished.
    Stopping,
    /// The database process has exited.
    Stopped,
}

impl InstanceState {
    /// Check if the instance has fully stopped.
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

/// A compute unit belonging to the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Instance name.
    pub name: String,

    /// Last observed lifecycle state.
    #[serde(default)]
    pub state: InstanceState,
}

impl Instance {
    /// Create an instance in the given state.
    pub fn new(name: impl Into<String>, state: InstanceState) -> Self {
        Self {
            name: name.into(),
            state,
        }
    }
}

/// A persistent volume bound to one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    /// Volume name.
    pub name: String,

    /// Name of the instance the volume is bound to.
    #[serde(default)]
    pub instance: Option<String>,

    /// Volume annotations.
    #[serde(default)]
    pub annotations: Annotations,
}

impl Volume {
    /// Create a volume with no annotations.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance: None,
            annotations: Annotations::new(),
        }
    }

    /// Bind the volume to an instance.
    pub fn bound_to(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Set the status label.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.annotations
            .insert(VOLUME_STATUS.to_string(), status.into());
        self
    }

    /// Mark the manifest as captured.
    pub fn with_manifest(mut self, manifest: impl Into<String>) -> Self {
        self.annotations
            .insert(HIBERNATION_MANIFEST.to_string(), manifest.into());
        self
    }

    /// Mark the control data as captured.
    pub fn with_control_data(mut self, control_data: impl Into<String>) -> Self {
        self.annotations
            .insert(HIBERNATION_CONTROL_DATA.to_string(), control_data.into());
        self
    }

    /// Status label, empty when unset.
    pub fn status(&self) -> &str {
        self.annotations
            .get(VOLUME_STATUS)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Check whether the manifest annotation is present.
    pub fn has_manifest(&self) -> bool {
        self.annotations.contains_key(HIBERNATION_MANIFEST)
    }

    /// Check whether the control data annotation is present.
    pub fn has_control_data(&self) -> bool {
        self.annotations.contains_key(HIBERNATION_CONTROL_DATA)
    }

    /// Evaluate the three hibernation markers.
    pub fn readiness(&self) -> VolumeReadiness {
        VolumeReadiness {
            detached: self.status() == VOLUME_STATUS_DETACHED,
            has_manifest: self.has_manifest(),
            has_control_data: self.has_control_data(),
        }
    }
}

/// Which hibernation markers a volume carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeReadiness {
    /// Status label equals `detached`.
    pub detached: bool,
    /// Manifest captured.
    pub has_manifest: bool,
    /// Control data captured.
    pub has_control_data: bool,
}

impl VolumeReadiness {
    /// All three markers present.
    pub fn is_ready(&self) -> bool {
        self.detached && self.has_manifest && self.has_control_data
    }

    /// Names of the missing markers, for diagnostics.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.detached {
            missing.push("detached");
        }
        if !self.has_manifest {
            missing.push("manifest");
        }
        if !self.has_control_data {
            missing.push("control-data");
        }
        missing
    }
}

/// Instances and volumes observed for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedResources {
    /// Instances, in observation order.
    #[serde(default)]
    pub instances: Vec<Instance>,

    /// Volumes, in observation order.
    #[serde(default)]
    pub volumes: Vec<Volume>,
}

impl ManagedResources {
    /// Create a snapshot from instances and volumes.
    pub fn new(instances: Vec<Instance>, volumes: Vec<Volume>) -> Self {
        Self { instances, volumes }
    }

    /// Names of all instances in the snapshot.
    pub fn instance_names(&self) -> Vec<&str> {
        self.instances.iter().map(|i| i.name.as_str()).collect()
    }

    /// Check that instance names are unique.
    pub fn duplicate_instance(&self) -> Option<&str> {
        let mut seen = std::collections::HashSet::new();
        self.instances
            .iter()
            .map(|i| i.name.as_str())
            .find(|name| !seen.insert(*name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_requires_all_markers() {
        let volume = Volume::new("v1")
            .with_status("detached")
            .with_manifest("{}");
        let readiness = volume.readiness();
        assert!(!readiness.is_ready());
        assert_eq!(readiness.missing(), vec!["control-data"]);

        let volume = volume.with_control_data("");
        assert!(volume.readiness().is_ready());
    }

    #[test]
    fn status_is_case_sensitive() {
        let volume = Volume::new("v1")
            .with_status("Detached")
            .with_manifest("{}")
            .with_control_data("{}");
        assert!(!volume.readiness().detached);
    }

    #[test]
    fn duplicate_instance_detected() {
        let resources = ManagedResources::new(
            vec![
                Instance::new("a", InstanceState::Stopped),
                Instance::new("a", InstanceState::Stopped),
            ],
            vec![],
        );
        assert_eq!(resources.duplicate_instance(), Some("a"));
    }
}
