//! Common test utilities.
//!
//! This module contains shared helpers for integration tests.
//! Import with `mod common;` in test files.

#![allow(dead_code)]

use dormant::collaborators::{ObjectDeleter, StopProbe};
use dormant::context::PassContext;
use dormant::core::config::Config;
use dormant::core::error::{HibernationError, HibernationResult, ObjectError};
use dormant::resources::{Cluster, Instance, InstanceState, ManagedResources, Volume};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use tempfile::NamedTempFile;

// ============================================================================
// Fixtures
// ============================================================================

/// Cluster "pg1" with hibernation requested.
pub fn pg1() -> Cluster {
    Cluster::new("pg1").hibernating()
}

/// A stopped instance.
pub fn stopped(name: &str) -> Instance {
    Instance::new(name, InstanceState::Stopped)
}

/// A running instance.
pub fn running(name: &str) -> Instance {
    Instance::new(name, InstanceState::Running)
}

/// A volume carrying every hibernation marker.
pub fn ready_volume(name: &str, instance: &str) -> Volume {
    Volume::new(name)
        .bound_to(instance)
        .with_status("detached")
        .with_manifest(r#"{"kind":"Cluster"}"#)
        .with_control_data("Database cluster state: shut down")
}

/// A volume whose annotator has not run yet.
pub fn pending_volume(name: &str, instance: &str) -> Volume {
    Volume::new(name).bound_to(instance).with_status("pending")
}

/// Two stopped instances with one ready and one pending volume.
pub fn pg1_waiting_on_v2() -> ManagedResources {
    ManagedResources::new(
        vec![stopped("A"), stopped("B")],
        vec![ready_volume("V1", "A"), pending_volume("V2", "B")],
    )
}

/// Two stopped instances with both volumes ready.
pub fn pg1_ready() -> ManagedResources {
    ManagedResources::new(
        vec![stopped("A"), stopped("B")],
        vec![ready_volume("V1", "A"), ready_volume("V2", "B")],
    )
}

/// Pass context for cluster pg1.
pub fn ctx() -> PassContext {
    PassContext::new("pg1", 1)
}

// ============================================================================
// Scripted collaborators
// ============================================================================

/// Stop probe returning a fixed answer and recording what it was asked.
pub struct ScriptedProbe {
    answer: Result<bool, String>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedProbe {
    /// Probe reporting every instance stopped.
    pub fn stopped() -> Self {
        Self::answering(Ok(true))
    }

    /// Probe reporting some instance still running.
    pub fn running() -> Self {
        Self::answering(Ok(false))
    }

    /// Probe that cannot observe instances.
    pub fn failing(message: &str) -> Self {
        Self::answering(Err(message.to_string()))
    }

    fn answering(answer: Result<bool, String>) -> Self {
        Self {
            answer,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Instance names passed to each call.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }
}

impl StopProbe for ScriptedProbe {
    fn all_stopped(&self, _ctx: &PassContext, instances: &[Instance]) -> HibernationResult<bool> {
        self.calls
            .lock()
            .push(instances.iter().map(|i| i.name.clone()).collect());
        self.answer
            .clone()
            .map_err(HibernationError::observation)
    }
}

/// Deleter that remembers deleted objects and reports NotFound afterwards.
#[derive(Default)]
pub struct RecordingDeleter {
    calls: Mutex<Vec<String>>,
    gone: Mutex<HashSet<String>>,
    failures: Mutex<HashMap<String, String>>,
}

impl RecordingDeleter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make deletion of `instance` fail with an API error.
    pub fn failing_on(self, instance: &str, message: &str) -> Self {
        self.failures
            .lock()
            .insert(instance.to_string(), message.to_string());
        self
    }

    /// Treat `instance` as already deleted.
    pub fn already_gone(self, instance: &str) -> Self {
        self.gone.lock().insert(instance.to_string());
        self
    }

    /// Every deletion attempt, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl ObjectDeleter for RecordingDeleter {
    fn delete(&self, _ctx: &PassContext, instance: &Instance) -> Result<(), ObjectError> {
        self.calls.lock().push(instance.name.clone());
        if let Some(message) = self.failures.lock().get(&instance.name) {
            return Err(ObjectError::api(message.clone()));
        }
        if !self.gone.lock().insert(instance.name.clone()) {
            return Err(ObjectError::not_found(&instance.name));
        }
        Ok(())
    }
}

// ============================================================================
// Files
// ============================================================================

/// Write `content` to a temp file with the given extension.
pub fn write_temp_file(content: &str, extension: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(&format!(".{}", extension))
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp file");
    file
}

/// Snapshot of pg1 in TOML with one running instance and one pending volume.
pub const PG1_SNAPSHOT_TOML: &str = r#"
[cluster]
name = "pg1"
namespace = "prod"

[cluster.annotations]
"cnpg.io/hibernation" = "on"

[[instances]]
name = "pg1-1"
state = "running"

[[instances]]
name = "pg1-2"
state = "stopped"

[[volumes]]
name = "pg1-1"
instance = "pg1-1"

[[volumes]]
name = "pg1-2"
instance = "pg1-2"

[volumes.annotations]
"cnpg.io/pvcStatus" = "detached"
"cnpg.io/hibernateClusterManifest" = "{}"
"cnpg.io/hibernatePgControlData" = ""
"#;

/// Load a config from a TOML string.
pub fn load_config(content: &str) -> Config {
    Config::from_toml(content).expect("Failed to load config")
}

/// Assert that a result is Ok and return the value.
#[track_caller]
pub fn assert_ok<T, E: std::fmt::Debug>(result: Result<T, E>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("Expected Ok, got Err: {:?}", e),
    }
}

/// Assert that a result is Err.
#[track_caller]
pub fn assert_err<T: std::fmt::Debug, E>(result: Result<T, E>) -> E {
    match result {
        Ok(v) => panic!("Expected Err, got Ok: {:?}", v),
        Err(e) => e,
    }
}
