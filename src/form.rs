//! Form controller - parameter collection and input gating.
//!
//! Two jobs, both at the edge of the system:
//!
//! - turn raw field strings into a [`ParameterRecord`] (parsing only; all
//!   numeric semantics belong to the kernel),
//! - lock and unlock controls as the driver's lifecycle moves. Driver
//!   state is the single source of truth: the controller observes a
//!   `Signal<DriverState>` through a registered effect and reacts, never
//!   the reverse. While a run is in progress the inputs and the submit
//!   action are disabled and cancel is enabled; `Done` reverses it.

use std::cell::Cell;
use std::rc::Rc;

use bitflags::bitflags;
use spark_signals::{Signal, effect};

use crate::driver::DriverState;
use crate::error::{Error, Result};
use crate::params::{ParameterRecord, RedoxKind};

bitflags! {
    /// The gateable controls of the form.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Controls: u8 {
        /// The parameter input fields.
        const INPUTS = 1 << 0;
        /// The submit (start run) action.
        const SUBMIT = 1 << 1;
        /// The cancel action.
        const CANCEL = 1 << 2;
    }
}

// =============================================================================
// Raw field collection
// =============================================================================

/// The thirteen raw form fields, exactly as a front end collects them.
#[derive(Debug, Clone)]
pub struct RawParameters {
    pub redox: String,
    pub e0: String,
    pub k0: String,
    pub alpha: String,
    pub ei: String,
    pub ef: String,
    pub radius: String,
    pub scan_rate: String,
    pub conc: String,
    pub diffusion: String,
    pub t_density: String,
    pub h0: String,
    pub gamma: String,
}

fn field(name: &'static str, raw: &str) -> Result<f64> {
    raw.trim().parse().map_err(|_| Error::Field {
        field: name,
        reason: format!("`{raw}` is not a number"),
    })
}

// =============================================================================
// Controller
// =============================================================================

/// Gates form controls from observed driver state and builds parameter
/// records on submission.
pub struct FormController {
    disabled: Rc<Cell<Controls>>,
    stop_effect: Option<Box<dyn FnOnce()>>,
}

impl FormController {
    /// A controller in the idle configuration: inputs and submit enabled,
    /// cancel disabled.
    pub fn new() -> Self {
        Self {
            disabled: Rc::new(Cell::new(Controls::CANCEL)),
            stop_effect: None,
        }
    }

    /// Subscribe to driver state. The effect re-fires on every state
    /// transition and holds the lock mask in sync; it is stopped when the
    /// controller drops (or on a later `bind`).
    pub fn bind(&mut self, state: &Signal<DriverState>) {
        self.unbind();

        let disabled = self.disabled.clone();
        let state = state.clone();
        let stop_fn = effect(move || {
            let locked = matches!(
                state.get(),
                DriverState::Running | DriverState::Stopping
            );
            disabled.set(if locked {
                Controls::INPUTS | Controls::SUBMIT
            } else {
                Controls::CANCEL
            });
        });
        self.stop_effect = Some(Box::new(stop_fn));
    }

    fn unbind(&mut self) {
        if let Some(stop) = self.stop_effect.take() {
            stop();
        }
    }

    /// Whether every control in `controls` is currently enabled.
    pub fn is_enabled(&self, controls: Controls) -> bool {
        !self.disabled.get().intersects(controls)
    }

    /// Build a [`ParameterRecord`] from raw fields. Parsing only;
    /// in-range semantics are the kernel's to enforce.
    pub fn collect(&self, raw: &RawParameters) -> Result<ParameterRecord> {
        let redox = match raw.redox.trim().to_ascii_lowercase().as_str() {
            "oxidation" | "ox" | "1" | "+1" => RedoxKind::Oxidation,
            "reduction" | "red" | "-1" => RedoxKind::Reduction,
            other => {
                return Err(Error::Field {
                    field: "redox",
                    reason: format!("`{other}` is neither oxidation nor reduction"),
                });
            }
        };

        Ok(ParameterRecord {
            redox,
            e0: field("e0", &raw.e0)?,
            k0: field("k0", &raw.k0)?,
            alpha: field("alpha", &raw.alpha)?,
            ei: field("ei", &raw.ei)?,
            ef: field("ef", &raw.ef)?,
            radius: field("radius", &raw.radius)?,
            scan_rate: field("scan_rate", &raw.scan_rate)?,
            conc: field("conc", &raw.conc)?,
            diffusion: field("diffusion", &raw.diffusion)?,
            t_density: field("t_density", &raw.t_density)?,
            h0: field("h0", &raw.h0)?,
            gamma: field("gamma", &raw.gamma)?,
        })
    }
}

impl Default for FormController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FormController {
    fn drop(&mut self) {
        self.unbind();
    }
}

// =============================================================================
// Tests
// =============================================================================
