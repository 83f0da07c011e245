//! Crate error hierarchy.
//!
//! Protocol violations (start while running) and kernel faults are both
//! terminal for the run they occur in: the driver moves to `Done` with a
//! reason and never retries. Nothing here is recovered silently.

use thiserror::Error;

use crate::kernel::KernelFault;

/// Root error type for driver and host failures.
#[derive(Error, Debug)]
pub enum Error {
    /// `start` was called while a run is already in progress.
    #[error("driver busy: a run is already in progress")]
    Busy,

    /// The kernel signalled a fault during init or step.
    #[error("kernel fault: {0}")]
    Kernel(#[from] KernelFault),

    /// The worker failed to load its kernel.
    #[error("worker load failed: {0}")]
    Load(String),

    /// The worker thread is gone (channel disconnected).
    #[error("worker unavailable: request channel disconnected")]
    WorkerGone,

    /// A raw form field failed to parse or was out of range.
    #[error("invalid field `{field}`: {reason}")]
    Field {
        field: &'static str,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
