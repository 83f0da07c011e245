//! Kernel bridge - the boundary to the numerical engine.
//!
//! A kernel exposes exactly two operations:
//!
//! ```text
//! init(params, buffer) -> run handle
//! step(handle, buffer) -> More | Exhausted
//! ```
//!
//! `init` prepares a fresh run and must be called exactly once per run
//! before any `step`. Each `step` advances the kernel by one unit of work,
//! writes one `(E, I)` tuple into the scratch buffer slots, and reports
//! whether further steps remain. Calls are synchronous; the bridge does no
//! buffering and no retry. Ordering (`init` before `step`, no `step` after
//! `Exhausted`) is enforced by the driver's loop, nowhere else.
//!
//! The ABI is handle-based: `init` returns an opaque run value that every
//! `step` takes `&mut`, so concurrent kernel instances are possible and a
//! stale handle cannot outlive its kernel's borrow rules. Kernels whose
//! state is genuinely a singleton can use a unit handle.

mod webcv;

pub use webcv::WebcvKernel;

use thiserror::Error;

use crate::buffer::ScratchBuffer;
use crate::params::ParameterRecord;

/// Continuation flag returned by [`Kernel::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepFlow {
    /// Further steps remain; the driver may schedule another tick.
    More,
    /// The run is complete; calling `step` again is a contract violation.
    Exhausted,
}

/// A kernel-side failure. Fatal to the current run: kernel state is
/// untrustworthy afterwards and the driver never retries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelFault {
    /// A parameter was NaN or infinite.
    #[error("non-finite parameter `{0}`")]
    NonFinite(&'static str),

    /// A parameter value makes the discretisation degenerate
    /// (e.g. zero step size, expansion factor below 1).
    #[error("degenerate discretisation: {0}")]
    Degenerate(&'static str),
}

/// The opaque numerical engine behind the bridge.
pub trait Kernel {
    /// Per-run kernel state, threaded through every `step`.
    type Run;

    /// Prepare a fresh run. Called exactly once per run, before any `step`.
    /// The buffer is handed over so the kernel can clear its slots.
    fn init(
        &self,
        params: &ParameterRecord,
        buf: &mut ScratchBuffer,
    ) -> Result<Self::Run, KernelFault>;

    /// Advance one unit of work and write one result tuple into the buffer.
    fn step(&self, run: &mut Self::Run, buf: &mut ScratchBuffer) -> Result<StepFlow, KernelFault>;
}
