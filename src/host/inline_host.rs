//! Inline execution host.
//!
//! Runs the driver on the caller's thread. The caller's event loop calls
//! [`InlineHost::pump`] once per cooperative turn; the host performs at
//! most `budget` ticks and yields, so interactive input stays responsive
//! as long as individual kernel steps are short. The return value tells
//! the loop whether another turn needs to be scheduled.

use crate::driver::{DriverState, EventSink, SteppingDriver, Tick};
use crate::error::Result;
use crate::kernel::Kernel;
use crate::params::ParameterRecord;

/// What a cooperative turn accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pump {
    /// Nothing is running; no turn needs scheduling.
    Idle,
    /// Budget exhausted with work remaining; schedule another turn.
    Yielded,
    /// The run reached `Done` during this turn.
    Finished,
}

/// Driver plus a per-turn tick budget.
pub struct InlineHost<K: Kernel> {
    driver: SteppingDriver<K>,
    budget: usize,
}

impl<K: Kernel> InlineHost<K> {
    /// Host with the default budget of one tick per turn, the direct
    /// analogue of scheduling each step as its own task.
    pub fn new(kernel: K) -> Self {
        Self::with_budget(kernel, 1)
    }

    /// Host performing up to `budget` ticks per turn (minimum 1). Larger
    /// budgets trade input latency for throughput.
    pub fn with_budget(kernel: K, budget: usize) -> Self {
        Self {
            driver: SteppingDriver::new(kernel),
            budget: budget.max(1),
        }
    }

    /// Read access to the driver (state, accumulated points).
    pub fn driver(&self) -> &SteppingDriver<K> {
        &self.driver
    }

    /// Begin a run. See [`SteppingDriver::start`]; no stepping happens
    /// until the next [`Self::pump`].
    pub fn start(&mut self, params: &ParameterRecord, sink: &mut dyn EventSink) -> Result<()> {
        self.driver.start(params, sink)
    }

    /// Cancel between turns. Idempotent; see [`SteppingDriver::cancel`].
    pub fn cancel(&mut self, sink: &mut dyn EventSink) -> bool {
        self.driver.cancel(sink)
    }

    /// One cooperative turn: up to `budget` ticks, then yield.
    pub fn pump(&mut self, sink: &mut dyn EventSink) -> Pump {
        if self.driver.state() != DriverState::Running {
            return Pump::Idle;
        }
        for _ in 0..self.budget {
            if self.driver.tick(sink) == Tick::Finished {
                return Pump::Finished;
            }
        }
        Pump::Yielded
    }
}
