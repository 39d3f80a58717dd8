//! In-memory cluster store.
//!
//! Holds one cluster, its instances and its volumes behind a single lock and
//! implements every collaborator trait the coordinator consumes. The CLI uses
//! it to drive hibernation over a snapshot file; tests use its fault hooks to
//! make probes and deletions fail on demand.

use crate::control::annotations::{
    HIBERNATION_CONTROL_DATA, HIBERNATION_MANIFEST, VOLUME_STATUS, VOLUME_STATUS_DETACHED,
};
use crate::control::collaborators::{ObjectDeleter, ResourceSource, StopProbe};
use crate::control::context::PassContext;
use crate::control::resources::{Cluster, Instance, InstanceState, ManagedResources, Volume};
use crate::core::error::{HibernationError, HibernationResult, ObjectError};
use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Serialized form of a cluster and its resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    /// The cluster object.
    pub cluster: Cluster,

    /// Instances.
    #[serde(default)]
    pub instances: Vec<Instance>,

    /// Volumes.
    #[serde(default)]
    pub volumes: Vec<Volume>,
}

impl ClusterSnapshot {
    /// Load a snapshot from a `.json` or `.toml` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot file: {}", path.display()))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("failed to parse JSON snapshot: {}", path.display())),
            _ => toml::from_str(&content)
                .with_context(|| format!("failed to parse TOML snapshot: {}", path.display())),
        }
    }

    /// Split into cluster and observed resources.
    pub fn into_parts(self) -> (Cluster, ManagedResources) {
        (
            self.cluster,
            ManagedResources::new(self.instances, self.volumes),
        )
    }
}

#[derive(Debug, Default)]
struct Faults {
    probe: Option<String>,
    list: Option<String>,
    delete: HashMap<String, String>,
}

#[derive(Debug)]
struct StoreState {
    cluster: Cluster,
    instances: Vec<Instance>,
    volumes: Vec<Volume>,
    deletions: Vec<String>,
    faults: Faults,
}

/// Thread-safe in-memory store for one cluster.
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    /// Create a store from a cluster and its resources.
    pub fn new(cluster: Cluster, resources: ManagedResources) -> HibernationResult<Self> {
        if let Some(name) = resources.duplicate_instance() {
            return Err(HibernationError::invalid_snapshot(format!(
                "duplicate instance name: {}",
                name
            )));
        }
        Ok(Self {
            state: RwLock::new(StoreState {
                cluster,
                instances: resources.instances,
                volumes: resources.volumes,
                deletions: Vec::new(),
                faults: Faults::default(),
            }),
        })
    }

    /// Create a store from a snapshot.
    pub fn from_snapshot(snapshot: ClusterSnapshot) -> HibernationResult<Self> {
        let (cluster, resources) = snapshot.into_parts();
        Self::new(cluster, resources)
    }

    /// Load a store from a snapshot file.
    pub fn load(path: &Path) -> Result<Self> {
        let snapshot = ClusterSnapshot::from_file(path)?;
        Ok(Self::from_snapshot(snapshot)?)
    }

    /// Current contents as a snapshot.
    pub fn to_snapshot(&self) -> ClusterSnapshot {
        let state = self.state.read();
        ClusterSnapshot {
            cluster: state.cluster.clone(),
            instances: state.instances.clone(),
            volumes: state.volumes.clone(),
        }
    }

    /// Names of the instances still present.
    pub fn instance_names(&self) -> Vec<String> {
        self.state
            .read()
            .instances
            .iter()
            .map(|i| i.name.clone())
            .collect()
    }

    /// Number of volumes held.
    pub fn volume_count(&self) -> usize {
        self.state.read().volumes.len()
    }

    /// Every deletion request received, in order, including failed ones.
    pub fn deletion_log(&self) -> Vec<String> {
        self.state.read().deletions.clone()
    }

    /// Set the lifecycle state of an instance. Returns false if it is absent.
    pub fn set_instance_state(&self, name: &str, new_state: InstanceState) -> bool {
        let mut state = self.state.write();
        match state.instances.iter_mut().find(|i| i.name == name) {
            Some(instance) => {
                instance.state = new_state;
                true
            }
            None => false,
        }
    }

    /// Write the detached status and both capture annotations on a volume.
    pub fn mark_volume_detached(&self, name: &str) -> bool {
        let mut state = self.state.write();
        match state.volumes.iter_mut().find(|v| v.name == name) {
            Some(volume) => {
                mark_detached(volume);
                true
            }
            None => false,
        }
    }

    /// Advance instances one lifecycle step towards stopped and annotate the
    /// volumes of instances that have stopped.
    ///
    /// Stands in for the instance manager and the volume annotator. Returns the
    /// number of volumes newly annotated.
    pub fn step_shutdown(&self) -> usize {
        let mut state = self.state.write();
        let mut stopped = Vec::new();
        for instance in state.instances.iter_mut() {
            instance.state = match instance.state {
                InstanceState::Running => InstanceState::Stopping,
                InstanceState::Stopping | InstanceState::Stopped => InstanceState::Stopped,
            };
            if instance.state.is_stopped() {
                stopped.push(instance.name.clone());
            }
        }

        let mut annotated = 0;
        for volume in state.volumes.iter_mut() {
            let bound_stopped = volume
                .instance
                .as_ref()
                .is_some_and(|owner| stopped.contains(owner));
            if bound_stopped && !volume.readiness().is_ready() {
                mark_detached(volume);
                annotated += 1;
            }
        }
        annotated
    }

    /// Make the stop probe fail until cleared.
    pub fn fail_probe(&self, message: Option<String>) {
        self.state.write().faults.probe = message;
    }

    /// Make listing fail until cleared.
    pub fn fail_list(&self, message: Option<String>) {
        self.state.write().faults.list = message;
    }

    /// Make deletion of one instance fail with an API error.
    pub fn fail_delete(&self, instance: impl Into<String>, message: impl Into<String>) {
        self.state
            .write()
            .faults
            .delete
            .insert(instance.into(), message.into());
    }

    /// Clear a deletion fault.
    pub fn clear_delete_fault(&self, instance: &str) {
        self.state.write().faults.delete.remove(instance);
    }
}

fn mark_detached(volume: &mut Volume) {
    volume
        .annotations
        .insert(VOLUME_STATUS.to_string(), VOLUME_STATUS_DETACHED.to_string());
    volume
        .annotations
        .entry(HIBERNATION_MANIFEST.to_string())
        .or_default();
    volume
        .annotations
        .entry(HIBERNATION_CONTROL_DATA.to_string())
        .or_default();
}

impl ResourceSource for MemoryStore {
    fn cluster(&self) -> HibernationResult<Cluster> {
        Ok(self.state.read().cluster.clone())
    }

    fn list(&self) -> HibernationResult<ManagedResources> {
        let state = self.state.read();
        if let Some(ref message) = state.faults.list {
            return Err(HibernationError::observation(message.clone()));
        }
        Ok(ManagedResources::new(
            state.instances.clone(),
            state.volumes.clone(),
        ))
    }
}

impl StopProbe for MemoryStore {
    fn all_stopped(&self, _ctx: &PassContext, instances: &[Instance]) -> HibernationResult<bool> {
        let state = self.state.read();
        if let Some(ref message) = state.faults.probe {
            return Err(HibernationError::observation(message.clone()));
        }
        // Instances missing from the store have been deleted, so they are stopped.
        Ok(instances.iter().all(|observed| {
            state
                .instances
                .iter()
                .find(|i| i.name == observed.name)
                .map_or(true, |current| current.state.is_stopped())
        }))
    }
}

impl ObjectDeleter for MemoryStore {
    fn delete(&self, _ctx: &PassContext, instance: &Instance) -> Result<(), ObjectError> {
        let mut state = self.state.write();
        state.deletions.push(instance.name.clone());

        if let Some(message) = state.faults.delete.get(&instance.name) {
            return Err(ObjectError::api(message.clone()));
        }

        let before = state.instances.len();
        state.instances.retain(|i| i.name != instance.name);
        if state.instances.len() == before {
            return Err(ObjectError::not_found(&instance.name));
        }
        Ok(())
    }
}
