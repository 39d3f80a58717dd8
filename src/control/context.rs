//! Per-pass reconciliation context.
//!
//! Every collaborator call receives the [`PassContext`] explicitly. It names
//! the cluster and pass for log fields and carries the pass deadline and a
//! cancellation flag shared with whoever scheduled the pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cancellation flag shared between the scheduler and running passes.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Why a pass stopped before finishing its deletions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptReason {
    /// The scheduler cancelled the pass.
    Cancelled,
    /// The pass deadline elapsed.
    DeadlineExceeded,
}

impl std::fmt::Display for InterruptReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => write!(f, "Cancelled"),
            Self::DeadlineExceeded => write!(f, "DeadlineExceeded"),
        }
    }
}

/// Context for one reconciliation pass.
#[derive(Debug, Clone)]
pub struct PassContext {
    /// Cluster being reconciled.
    pub cluster: String,

    /// Monotonic pass number assigned by the scheduler.
    pub pass: u64,

    /// Instant after which no further deletions are issued.
    pub deadline: Option<Instant>,

    cancel: CancelFlag,
}

impl PassContext {
    /// Create a context without deadline or shared cancellation.
    pub fn new(cluster: impl Into<String>, pass: u64) -> Self {
        Self {
            cluster: cluster.into(),
            pass,
            deadline: None,
            cancel: CancelFlag::new(),
        }
    }

    /// Set a deadline relative to now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Set an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Share a cancellation flag with the scheduler.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Check whether the pass must stop issuing work.
    pub fn interrupted(&self) -> Option<InterruptReason> {
        if self.cancel.is_cancelled() {
            return Some(InterruptReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Some(InterruptReason::DeadlineExceeded)
            }
            _ => None,
        }
    }
}
