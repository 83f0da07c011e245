//! Simulation parameters.
//!
//! A [`ParameterRecord`] is the validated, immutable input to a run. The
//! driver never interprets it; it is handed through to the kernel, which
//! owns the numeric semantics (units are domain convention, not enforced
//! here). Validation from raw user input lives in [`crate::form`].

/// Direction of the electron transfer under study.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedoxKind {
    /// Species is oxidised on the forward sweep.
    Oxidation,
    /// Species is reduced on the forward sweep.
    Reduction,
}

impl RedoxKind {
    /// Sign convention used when converting dimensionless current back to
    /// amperes: +1 for oxidation, -1 for reduction.
    pub fn sign(self) -> f64 {
        match self {
            RedoxKind::Oxidation => 1.0,
            RedoxKind::Reduction => -1.0,
        }
    }
}

/// Fixed set of named numeric fields describing one voltammetry run.
///
/// Field order and meaning match the kernel's init contract exactly.
/// Immutable once passed to `start`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRecord {
    /// Redox direction selector.
    pub redox: RedoxKind,
    /// Formal potential E0 (V).
    pub e0: f64,
    /// Standard heterogeneous rate constant k0 (m/s).
    pub k0: f64,
    /// Charge-transfer coefficient alpha (dimensionless, 0..1).
    pub alpha: f64,
    /// Initial potential Ei (V), start of the forward sweep.
    pub ei: f64,
    /// Final potential Ef (V), the switching potential.
    pub ef: f64,
    /// Electrode radius re (m).
    pub radius: f64,
    /// Potential scan rate (V/s).
    pub scan_rate: f64,
    /// Bulk concentration of the electroactive species.
    pub conc: f64,
    /// Diffusion coefficient D (m^2/s).
    pub diffusion: f64,
    /// Time-discretisation density: steps per unit of dimensionless potential.
    pub t_density: f64,
    /// Initial spatial grid step (dimensionless).
    pub h0: f64,
    /// Spatial grid expansion factor, >= 1.
    pub gamma: f64,
}

#[cfg(test)]
pub(crate) fn test_record() -> ParameterRecord {
    ParameterRecord {
        redox: RedoxKind::Oxidation,
        e0: 0.0,
        k0: 1.0e-2,
        alpha: 0.5,
        ei: -0.3,
        ef: 0.3,
        radius: 5.0e-6,
        scan_rate: 0.1,
        conc: 1.0,
        diffusion: 1.0e-9,
        t_density: 20.0,
        h0: 1.0e-4,
        gamma: 1.1,
    }
}
