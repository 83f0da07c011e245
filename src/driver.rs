//! Stepping driver - turns the synchronous kernel step into an
//! incremental, cancellable, non-blocking stream of points.
//!
//! The driver owns the kernel, the scratch buffer, the run handle and the
//! accumulated trace. It never schedules itself: a host calls [`tick`]
//! once per cooperative turn, and each tick performs exactly one step,
//! one buffer read and one emission, then yields. Cancellation therefore
//! takes effect at the next tick boundary; a step already in flight is
//! never interrupted (steps are short; the kernel offers nothing finer).
//!
//! Lifecycle:
//!
//! ```text
//! Idle ──start──▶ Running ──exhausted/fault──▶ Done
//!                    │
//!                  cancel
//!                    ▼
//!                 Stopping ──▶ Done
//! ```
//!
//! Exactly one `Done` event is emitted per run, whatever ends it.
//!
//! [`tick`]: SteppingDriver::tick

use crate::buffer::{DataPoint, ScratchBuffer};
use crate::error::{Error, Result};
use crate::kernel::{Kernel, KernelFault, StepFlow};
use crate::params::ParameterRecord;

// =============================================================================
// States and events
// =============================================================================

/// Driver lifecycle state. Transitions are the single source of truth for
/// everything downstream (form locking, render-loop scheduling).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// No run yet.
    Idle,
    /// A run is in progress; ticks may be scheduled.
    Running,
    /// Cancellation observed; no further tick will be scheduled.
    Stopping,
    /// Run finished: completed, cancelled or faulted.
    Done,
}

/// Why a run reached `Done`.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The kernel reported exhaustion.
    Completed,
    /// The caller cancelled between ticks.
    Cancelled,
    /// The kernel faulted; its state is untrustworthy, nothing is retried.
    Faulted(KernelFault),
}

/// One event out of the driver, in strict step order.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    /// One point, read from the scratch buffer after a successful step.
    Datum(DataPoint),
    /// The run's single completion signal.
    Done(RunOutcome),
}

/// Downstream consumer of driver events.
pub trait EventSink {
    fn emit(&mut self, event: DriverEvent);
}

/// Plain event collection, used by tests and by inline callers that want
/// to inspect a run after the fact.
impl EventSink for Vec<DriverEvent> {
    fn emit(&mut self, event: DriverEvent) {
        self.push(event);
    }
}

/// What a tick decided: schedule another, or stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// More work remains and the driver is still running.
    Again,
    /// The run is over (or the tick was refused); do not reschedule.
    Finished,
}

// =============================================================================
// Driver
// =============================================================================

/// The stepping driver. One instance has sole authority to step its
/// kernel, so the scratch buffer needs ordering discipline, not locks.
pub struct SteppingDriver<K: Kernel> {
    kernel: K,
    buffer: ScratchBuffer,
    run: Option<K::Run>,
    state: DriverState,
    trace: Vec<DataPoint>,
}

impl<K: Kernel> SteppingDriver<K> {
    pub fn new(kernel: K) -> Self {
        Self {
            kernel,
            buffer: ScratchBuffer::new(),
            run: None,
            state: DriverState::Idle,
            trace: Vec::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// The append-only point sequence for the current (or last) run.
    pub fn points(&self) -> &[DataPoint] {
        &self.trace
    }

    /// Begin a run. Rejected with [`Error::Busy`] unless the driver is
    /// `Idle` or `Done`; an in-progress run is left untouched.
    ///
    /// On success the driver is `Running` and has performed no steps;
    /// stepping happens only through [`Self::tick`], so this returns
    /// immediately and never blocks the caller on the full run.
    ///
    /// An init fault ends the run before it begins: the driver moves to
    /// `Done`, emits `Done(Faulted)` and returns the fault.
    pub fn start(&mut self, params: &ParameterRecord, sink: &mut dyn EventSink) -> Result<()> {
        match self.state {
            DriverState::Idle | DriverState::Done => {}
            DriverState::Running | DriverState::Stopping => return Err(Error::Busy),
        }

        self.trace.clear();
        match self.kernel.init(params, &mut self.buffer) {
            Ok(run) => {
                self.run = Some(run);
                self.state = DriverState::Running;
                Ok(())
            }
            Err(fault) => {
                log::error!("kernel init fault: {fault}");
                self.run = None;
                self.state = DriverState::Done;
                sink.emit(DriverEvent::Done(RunOutcome::Faulted(fault.clone())));
                Err(Error::Kernel(fault))
            }
        }
    }

    /// Execute one scheduled tick: one kernel step, one buffer read, one
    /// `Datum` emission. Returns whether the host should schedule another.
    ///
    /// Calling this in any state but `Running` is a host bug; it is
    /// refused (no step occurs) and asserted in debug builds.
    pub fn tick(&mut self, sink: &mut dyn EventSink) -> Tick {
        if self.state != DriverState::Running {
            debug_assert!(false, "tick outside Running (state: {:?})", self.state);
            log::error!("tick refused in state {:?}", self.state);
            return Tick::Finished;
        }
        let Some(run) = self.run.as_mut() else {
            debug_assert!(false, "running without a kernel run handle");
            log::error!("tick refused: no run handle");
            return Tick::Finished;
        };

        match self.kernel.step(run, &mut self.buffer) {
            Ok(flow) => {
                // Step returned: buffer ownership is back with us
                let point = self.buffer.read_point();
                self.trace.push(point);
                sink.emit(DriverEvent::Datum(point));

                match flow {
                    StepFlow::More => Tick::Again,
                    StepFlow::Exhausted => {
                        self.finish(RunOutcome::Completed, sink);
                        Tick::Finished
                    }
                }
            }
            Err(fault) => {
                log::error!("kernel step fault: {fault}");
                self.finish(RunOutcome::Faulted(fault), sink);
                Tick::Finished
            }
        }
    }

    /// Cancel the run. Valid in any state and idempotent: outside
    /// `Running` this is a no-op. Returns whether a run was cancelled.
    ///
    /// Cancellation is cooperative: it prevents the *next* tick, it does
    /// not interrupt one in flight.
    pub fn cancel(&mut self, sink: &mut dyn EventSink) -> bool {
        match self.state {
            DriverState::Running => {
                self.state = DriverState::Stopping;
                self.finish(RunOutcome::Cancelled, sink);
                true
            }
            DriverState::Idle | DriverState::Stopping | DriverState::Done => false,
        }
    }

    /// Terminal transition. Only reachable once per run, so the `Done`
    /// event cannot be duplicated.
    fn finish(&mut self, outcome: RunOutcome, sink: &mut dyn EventSink) {
        self.run = None;
        self.state = DriverState::Done;
        sink.emit(DriverEvent::Done(outcome));
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::test_record;

    /// Scripted kernel: emits a fixed point list, optionally faulting.
    struct StubKernel {
        points: Vec<(f64, f64)>,
        fail_init: bool,
        fail_at: Option<usize>,
    }

    impl StubKernel {
        fn with_points(n: usize) -> Self {
            Self {
                points: (0..n).map(|i| (i as f64, -(i as f64))).collect(),
                fail_init: false,
                fail_at: None,
            }
        }
    }

    struct StubRun {
        cursor: usize,
    }

    impl Kernel for StubKernel {
        type Run = StubRun;

        fn init(
            &self,
            _params: &ParameterRecord,
            buf: &mut ScratchBuffer,
        ) -> std::result::Result<StubRun, KernelFault> {
            if self.fail_init {
                return Err(KernelFault::NonFinite("k0"));
            }
            buf.write_x(0.0);
            buf.write_y(0.0);
            Ok(StubRun { cursor: 0 })
        }

        fn step(
            &self,
            run: &mut StubRun,
            buf: &mut ScratchBuffer,
        ) -> std::result::Result<StepFlow, KernelFault> {
            if Some(run.cursor) == self.fail_at {
                return Err(KernelFault::Degenerate("scripted fault"));
            }
            let (e, i) = self.points[run.cursor];
            buf.write_x(e);
            buf.write_y(i);
            run.cursor += 1;
            if run.cursor == self.points.len() {
                Ok(StepFlow::Exhausted)
            } else {
                Ok(StepFlow::More)
            }
        }
    }

    fn pump(driver: &mut SteppingDriver<StubKernel>, events: &mut Vec<DriverEvent>) {
        while driver.tick(events) == Tick::Again {}
    }

    fn done_count(events: &[DriverEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, DriverEvent::Done(_)))
            .count()
    }

    #[test]
    fn test_run_to_completion_in_step_order() {
        let mut driver = SteppingDriver::new(StubKernel::with_points(5));
        let mut events = Vec::new();

        driver.start(&test_record(), &mut events).unwrap();
        assert_eq!(driver.state(), DriverState::Running);
        pump(&mut driver, &mut events);

        assert_eq!(driver.state(), DriverState::Done);
        assert_eq!(events.len(), 6);
        for (i, event) in events[..5].iter().enumerate() {
            assert_eq!(
                *event,
                DriverEvent::Datum(DataPoint {
                    e: i as f64,
                    i: -(i as f64),
                })
            );
        }
        assert_eq!(events[5], DriverEvent::Done(RunOutcome::Completed));
        assert_eq!(driver.points().len(), 5);
    }

    #[test]
    fn test_cancel_before_start_is_noop() {
        let mut driver = SteppingDriver::new(StubKernel::with_points(3));
        let mut events = Vec::new();

        assert!(!driver.cancel(&mut events));
        assert_eq!(driver.state(), DriverState::Idle);
        assert!(events.is_empty());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut driver = SteppingDriver::new(StubKernel::with_points(10));
        let mut events = Vec::new();

        driver.start(&test_record(), &mut events).unwrap();
        driver.tick(&mut events);

        assert!(driver.cancel(&mut events));
        assert!(!driver.cancel(&mut events));
        assert_eq!(driver.state(), DriverState::Done);
        assert_eq!(done_count(&events), 1);
        assert_eq!(
            events.last(),
            Some(&DriverEvent::Done(RunOutcome::Cancelled))
        );
    }

    #[test]
    fn test_no_tick_after_done() {
        let mut driver = SteppingDriver::new(StubKernel::with_points(2));
        let mut events = Vec::new();

        driver.start(&test_record(), &mut events).unwrap();
        pump(&mut driver, &mut events);

        // A stray tick after completion must not step or emit.
        // (debug_assert fires in debug builds; the release path refuses.)
        let before = events.len();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            driver.tick(&mut events)
        }));
        if let Ok(tick) = result {
            assert_eq!(tick, Tick::Finished);
        }
        assert_eq!(events.len(), before);
    }

    #[test]
    fn test_start_while_running_is_rejected() {
        let mut driver = SteppingDriver::new(StubKernel::with_points(5));
        let mut events = Vec::new();

        driver.start(&test_record(), &mut events).unwrap();
        driver.tick(&mut events);
        let trace_len = driver.points().len();

        assert!(matches!(
            driver.start(&test_record(), &mut events),
            Err(Error::Busy)
        ));
        // In-progress run untouched
        assert_eq!(driver.state(), DriverState::Running);
        assert_eq!(driver.points().len(), trace_len);

        pump(&mut driver, &mut events);
        assert_eq!(done_count(&events), 1);
    }

    #[test]
    fn test_step_fault_is_terminal() {
        let mut kernel = StubKernel::with_points(10);
        kernel.fail_at = Some(3);
        let mut driver = SteppingDriver::new(kernel);
        let mut events = Vec::new();

        driver.start(&test_record(), &mut events).unwrap();
        pump(&mut driver, &mut events);

        assert_eq!(driver.state(), DriverState::Done);
        assert_eq!(driver.points().len(), 3);
        assert_eq!(done_count(&events), 1);
        assert!(matches!(
            events.last(),
            Some(DriverEvent::Done(RunOutcome::Faulted(_)))
        ));
    }

    #[test]
    fn test_init_fault_emits_done_and_errors() {
        let mut kernel = StubKernel::with_points(3);
        kernel.fail_init = true;
        let mut driver = SteppingDriver::new(kernel);
        let mut events = Vec::new();

        assert!(matches!(
            driver.start(&test_record(), &mut events),
            Err(Error::Kernel(_))
        ));
        assert_eq!(driver.state(), DriverState::Done);
        assert_eq!(
            events,
            vec![DriverEvent::Done(RunOutcome::Faulted(
                KernelFault::NonFinite("k0")
            ))]
        );
    }

    #[test]
    fn test_restart_after_done_resets_trace() {
        let mut driver = SteppingDriver::new(StubKernel::with_points(4));
        let mut events = Vec::new();

        driver.start(&test_record(), &mut events).unwrap();
        pump(&mut driver, &mut events);
        assert_eq!(driver.points().len(), 4);

        driver.start(&test_record(), &mut events).unwrap();
        assert!(driver.points().is_empty());
        driver.tick(&mut events);
        assert_eq!(driver.points().len(), 1);
    }

    #[test]
    fn test_cancel_during_run_emits_exactly_one_done() {
        let mut driver = SteppingDriver::new(StubKernel::with_points(100));
        let mut events = Vec::new();

        driver.start(&test_record(), &mut events).unwrap();
        for _ in 0..5 {
            driver.tick(&mut events);
        }
        driver.cancel(&mut events);

        assert_eq!(done_count(&events), 1);
        // No datum may follow the done signal
        let done_at = events
            .iter()
            .position(|e| matches!(e, DriverEvent::Done(_)))
            .unwrap();
        assert_eq!(done_at, events.len() - 1);
    }
}
