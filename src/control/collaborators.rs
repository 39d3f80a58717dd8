//! Capabilities the coordinator consumes.
//!
//! The coordinator never talks to the cluster API directly. Whether an
//! instance has stopped and how an instance object is removed are supplied by
//! implementations of these traits.

use crate::control::context::PassContext;
use crate::control::resources::{Cluster, Instance, ManagedResources};
use crate::core::error::{HibernationResult, ObjectError};

/// Decides whether instances have finished stopping.
pub trait StopProbe {
    /// Return true only if every supplied instance is stopped.
    ///
    /// Errors mean the state could not be observed and are fatal for the pass.
    fn all_stopped(&self, ctx: &PassContext, instances: &[Instance]) -> HibernationResult<bool>;
}

/// Removes instance objects.
pub trait ObjectDeleter {
    /// Request removal of an instance.
    ///
    /// Must return [`ObjectError::NotFound`] when the instance is already gone.
    fn delete(&self, ctx: &PassContext, instance: &Instance) -> Result<(), ObjectError>;
}

impl<T: StopProbe + ?Sized> StopProbe for &T {
    fn all_stopped(&self, ctx: &PassContext, instances: &[Instance]) -> HibernationResult<bool> {
        (**self).all_stopped(ctx, instances)
    }
}

impl<T: ObjectDeleter + ?Sized> ObjectDeleter for &T {
    fn delete(&self, ctx: &PassContext, instance: &Instance) -> Result<(), ObjectError> {
        (**self).delete(ctx, instance)
    }
}

impl<T: StopProbe + ?Sized> StopProbe for std::sync::Arc<T> {
    fn all_stopped(&self, ctx: &PassContext, instances: &[Instance]) -> HibernationResult<bool> {
        (**self).all_stopped(ctx, instances)
    }
}

impl<T: ObjectDeleter + ?Sized> ObjectDeleter for std::sync::Arc<T> {
    fn delete(&self, ctx: &PassContext, instance: &Instance) -> Result<(), ObjectError> {
        (**self).delete(ctx, instance)
    }
}

/// Probe that trusts the lifecycle state recorded on each instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordedStateProbe;

impl StopProbe for RecordedStateProbe {
    fn all_stopped(&self, _ctx: &PassContext, instances: &[Instance]) -> HibernationResult<bool> {
        Ok(instances.iter().all(|i| i.state.is_stopped()))
    }
}

/// Lists the cluster and its resources at the start of each pass.
pub trait ResourceSource {
    /// The cluster object.
    fn cluster(&self) -> HibernationResult<Cluster>;

    /// Instances and volumes currently associated with the cluster.
    fn list(&self) -> HibernationResult<ManagedResources>;
}

impl<T: ResourceSource + ?Sized> ResourceSource for std::sync::Arc<T> {
    fn cluster(&self) -> HibernationResult<Cluster> {
        (**self).cluster()
    }

    fn list(&self) -> HibernationResult<ManagedResources> {
        (**self).list()
    }
}
