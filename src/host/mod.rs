//! Execution hosts - where the stepping driver runs.
//!
//! Two configurations, identical in protocol semantics and differing only
//! in isolation:
//!
//! - [`InlineHost`]: the driver shares the caller's thread; a "scheduled
//!   tick" is a bounded slice of work per cooperative turn of the caller's
//!   own loop. Responsiveness depends on individual steps being short.
//! - [`WorkerHost`]: the driver is isolated on its own thread with its own
//!   memory; the caller talks to it over channels using a closed
//!   tagged-union protocol, matched exhaustively on both ends.
//!
//! The protocol mirrors the driver lifecycle one-to-one: `load` prepares
//! the kernel (acknowledged by `done`), `start` begins a run, `stop`
//! cancels it, `datum` carries one point per successful step, and `done`
//! is the run's single completion signal. Delivery is FIFO per direction.

pub mod inline_host;
pub mod worker;

pub use inline_host::{InlineHost, Pump};
pub use worker::WorkerHost;

use crate::buffer::DataPoint;
use crate::params::ParameterRecord;

/// Caller → worker control messages.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Instantiate and prepare the kernel. Acknowledged by
    /// `Done(Loaded)` or `Done(LoadFailed)`.
    Load,
    /// Begin a run with the given parameters.
    Start(ParameterRecord),
    /// Cancel the in-progress run. No-op when no run is active.
    Stop,
}

/// Worker → caller messages.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// One point, emitted per successful step, in strict step order.
    Datum(DataPoint),
    /// Terminal signal for a load attempt or a run. Under correct
    /// operation no `Datum` follows the `Done` of its run; callers
    /// tolerate (ignore) one anyway rather than crash.
    Done(DoneReason),
}

/// Why the worker reported `Done`.
#[derive(Debug, Clone, PartialEq)]
pub enum DoneReason {
    /// Load acknowledgement: kernel ready, runs may be started.
    Loaded,
    /// Kernel load failed. Fatal: the worker exits, no respawn.
    LoadFailed(String),
    /// Run finished by kernel exhaustion.
    Completed,
    /// Run cancelled by the caller.
    Cancelled,
    /// Run ended by a kernel fault.
    Faulted(String),
}
