//! Cluster stores.
//!
//! A store answers the questions a pass asks of the cluster API: what
//! resources exist, whether instances have stopped, and how to delete an
//! instance object.
//!
//! # Modules
//!
//! - [`memory`] - Single-cluster in-memory store with fault hooks
//!
//! # Invariants
//!
//! - Volumes are only ever annotated, never removed
//! - Deleting an absent instance reports NotFound

pub mod memory;

// Re-exports for convenience
pub use memory::{ClusterSnapshot, MemoryStore};
