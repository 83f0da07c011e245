//! # voltagram
//!
//! Incremental cyclic-voltammetry simulation with a cancellable stepping
//! driver and a live terminal plot.
//!
//! The numerical kernel is opaque behind a two-call bridge (`init`,
//! `step`) and exchanges one result tuple per step through a fixed
//! 16-byte scratch buffer. The driver turns that synchronous primitive
//! into a cooperative, cancellable stream of points; hosts decide where
//! the loop runs; the render loop consumes the accumulated trace on its
//! own frame cadence.
//!
//! ## Architecture
//!
//! ```text
//! FormController ──ParameterRecord──▶ SteppingDriver ──init/step──▶ Kernel
//!        ▲                                │    ▲                      │
//!        │ state signal                   │    └──── ScratchBuffer ◀──┘
//!        │                          Datum │ Done        (E, I)
//!        │                                ▼
//!   DriverState ◀── ExecutionHost (inline | worker + message protocol)
//!                                         │
//!                                         ▼
//!                                   Trace ──▶ RenderLoop ──▶ AsciiChart
//! ```
//!
//! ## Modules
//!
//! - [`params`] - the immutable parameter record
//! - [`buffer`] - the 16-byte scratch buffer and [`DataPoint`]
//! - [`kernel`] - the kernel bridge trait and the reference CV kernel
//! - [`driver`] - the stepping driver: lifecycle, ticks, cancellation
//! - [`host`] - inline and worker execution hosts, message protocol
//! - [`render`] - trace, frame pacing, terminal chart
//! - [`form`] - parameter collection and driver-state-driven locking

pub mod buffer;
pub mod driver;
pub mod error;
pub mod form;
pub mod host;
pub mod kernel;
pub mod params;
pub mod render;

pub use buffer::{DataPoint, ScratchBuffer};
pub use driver::{DriverEvent, DriverState, EventSink, RunOutcome, SteppingDriver, Tick};
pub use error::{Error, Result};
pub use form::{Controls, FormController, RawParameters};
pub use host::{DoneReason, InlineHost, Pump, Reply, Request, WorkerHost};
pub use kernel::{Kernel, KernelFault, StepFlow, WebcvKernel};
pub use params::{ParameterRecord, RedoxKind};
pub use render::{AsciiChart, Frame, FramePacer, RenderLoop, Trace};
