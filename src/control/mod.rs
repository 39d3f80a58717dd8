//! Hibernation control logic.
//!
//! - [`resources`] - Cluster, instance and volume model
//! - [`annotations`] - Annotation keys and hibernation intent
//! - [`collaborators`] - Capabilities consumed from the cluster API
//! - [`context`] - Per-pass context (deadline, cancellation)
//! - [`phase`] - Observed phases, wait reasons and outcomes
//! - [`hibernate`] - The hibernation coordinator
//!
//! # Gates
//!
//! A pass deletes instance objects only after it has observed, in that same
//! pass, that every instance is stopped and every volume is detached with its
//! manifest and control data captured. Volumes are the source of truth for
//! whether an instance may be discarded.

pub mod annotations;
pub mod collaborators;
pub mod context;
pub mod hibernate;
pub mod phase;
pub mod resources;
