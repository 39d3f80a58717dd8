//! Core runtime infrastructure.
//!
//! - [`config`] - Configuration parsing and validation
//! - [`runtime`] - Reconcile loop scheduling
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod runtime;
