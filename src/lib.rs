//! Dormant - hibernation controller for stateful database clusters.
//!
//! Dormant quiesces a cluster down to its storage. Once every instance has
//! stopped and every volume has been marked as detached with the cluster
//! manifest and control data captured, it deletes the instance objects.
//! Volumes are never deleted, so the cluster can be rehydrated from them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Reconcile Loop                           │
//! │        pass scheduling │ interval │ pass limit │ shutdown       │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Hibernation Coordinator                      │
//! │   instances stopped? → volumes detached? → delete instances     │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Collaborators                           │
//! │        ResourceSource │ StopProbe │ ObjectDeleter               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! ## Core
//! - [`core::config`] - Configuration parsing and validation
//! - [`core::runtime`] - Reconcile loop
//! - [`core::error`] - Error types
//!
//! ## Control
//! - [`control::resources`] - Cluster, instance and volume model
//! - [`control::annotations`] - Annotation keys and hibernation intent
//! - [`control::collaborators`] - Capability traits
//! - [`control::context`] - Per-pass context
//! - [`control::phase`] - Phases, wait reasons, outcomes
//! - [`control::hibernate`] - Hibernation coordinator
//!
//! ## Store
//! - [`store::memory`] - In-memory cluster store
//!
//! ## CLI
//! - [`cli::commands`] - CLI command implementations
//!
//! # Key Invariants
//!
//! - No instance is deleted unless every volume is detached and carries both
//!   the manifest and control data annotations, observed in the same pass
//! - Volumes are never deleted
//! - The phase is recomputed from observed state on every pass

// Core infrastructure
pub mod core;

// Hibernation control logic
pub mod control;

// Cluster stores
pub mod store;

// CLI
pub mod cli;

// Re-exports for convenience
pub use self::core::{config, error, runtime};
pub use control::hibernate::HibernationCoordinator;
pub use control::phase::{HibernationOutcome, HibernationPhase, WaitReason};
pub use control::{annotations, collaborators, context, phase, resources};
pub use store::MemoryStore;
