//! Reference voltammetry kernel.
//!
//! Simulates one-electron transfer at a (hemi)spherical electrode in
//! dimensionless form: a triangular potential ramp (forward sweep then
//! mirrored reverse), diffusion on an exponentially expanding radial grid,
//! an implicit finite-difference step per ramp index, and a Butler-Volmer
//! boundary at the electrode surface. Each `step` solves one tridiagonal
//! system (Thomas algorithm) and emits one `(E, I)` tuple.
//!
//! All run state lives in [`WebcvRun`]; the kernel value itself is
//! stateless, so independent runs can coexist.

use crate::buffer::ScratchBuffer;
use crate::params::ParameterRecord;

use super::{Kernel, KernelFault, StepFlow};

/// Faraday constant (C/mol).
const FARADAY: f64 = 96_485.33212;
/// Molar gas constant (J/(mol K)).
const GAS: f64 = 8.314_462_618;
/// Temperature (K).
const TEMP: f64 = 298.15;
/// F/RT - volts to dimensionless potential.
const F_RT: f64 = FARADAY / (GAS * TEMP);
/// RT/F - dimensionless potential back to volts.
const RT_F: f64 = (GAS * TEMP) / FARADAY;

/// Upper bound on ramp points per run. A sweep needing more than this is
/// not something an interactive run can finish; init rejects it instead
/// of allocating the ramp.
const MAX_RAMP_POINTS: usize = 10_000_000;
/// Upper bound on spatial grid nodes.
const MAX_GRID_NODES: usize = 1_000_000;

// =============================================================================
// Dimensionless run state
// =============================================================================

/// Butler-Volmer rate state for the surface boundary row.
#[derive(Debug)]
struct Surface {
    /// Dimensionless standard rate constant, k0 * re / D.
    k0: f64,
    /// Exponent factor for the anodic rate.
    ka_factor: f64,
    /// Exponent factor for the cathodic rate.
    kb_factor: f64,
    /// First spatial grid interval.
    h0: f64,
}

impl Surface {
    /// Rewrite the surface boundary row of the system for potential `e`.
    ///
    /// The flux condition at the electrode is
    /// `dc/dr = kA.c - kB.(1 - c)`, discretised over the first interval.
    fn apply(&self, e: f64, system: &mut Tridiagonal) {
        let ka = self.k0 * (e * self.ka_factor).exp();
        let kb = self.k0 * (e * self.kb_factor).exp();

        system.lower[0] = 0.0;
        system.diag[0] = 1.0 + self.h0 * (ka + kb);
        system.upper[0] = -1.0;
        system.rhs[0] = self.h0 * kb;
    }
}

/// Tridiagonal system for the implicit diffusion step.
///
/// Interior coefficients are fixed for the whole run; row 0 is rewritten
/// each step by [`Surface::apply`], and `rhs` doubles as the concentration
/// profile (the solve leaves the new profile in place, which is the next
/// step's right-hand side).
#[derive(Debug)]
struct Tridiagonal {
    lower: Vec<f64>,
    diag: Vec<f64>,
    upper: Vec<f64>,
    rhs: Vec<f64>,
    /// Scratch for the forward elimination pass.
    scratch: Vec<f64>,
}

impl Tridiagonal {
    /// Build the interior rows from the spatial grid and time step.
    ///
    /// The discretised equation is spherical diffusion,
    /// `dc/dt = (2/r) dc/dr + d2c/dr2`, with central differences on a
    /// non-uniform grid. Outer boundary is held at bulk concentration;
    /// the profile starts at bulk everywhere.
    fn new(grid: &[f64], dt: f64) -> Self {
        let n = grid.len();
        let mut lower = vec![0.0; n];
        let mut diag = vec![0.0; n];
        let mut upper = vec![0.0; n];

        for i in 1..n - 1 {
            let span = grid[i + 1] - grid[i - 1];
            let fore = grid[i + 1] - grid[i];
            let back = grid[i] - grid[i - 1];
            lower[i] = (-2.0 * dt * grid[i - 1]) / (grid[i] * span * back);
            diag[i] = 1.0 + (2.0 * dt) / (fore * back);
            upper[i] = (-2.0 * dt * grid[i + 1]) / (grid[i] * span * fore);
        }

        lower[n - 1] = 0.0;
        diag[n - 1] = 1.0;
        upper[n - 1] = 0.0;

        Self {
            lower,
            diag,
            upper,
            rhs: vec![1.0; n],
            scratch: vec![0.0; n],
        }
    }

    /// Thomas algorithm, in place. `rhs` holds the solution afterwards.
    fn solve(&mut self) {
        let n = self.rhs.len();
        let (a, b, c) = (&self.lower, &self.diag, &self.upper);
        let x = &mut self.rhs;
        let cp = &mut self.scratch;

        cp[0] = c[0] / b[0];
        x[0] /= b[0];
        for i in 1..n {
            let m = 1.0 / (b[i] - a[i] * cp[i - 1]);
            cp[i] = c[i] * m;
            x[i] = (x[i] - a[i] * x[i - 1]) * m;
        }
        for i in (0..n - 1).rev() {
            x[i] -= cp[i] * x[i + 1];
        }
    }
}

/// Per-run state: ramp, system, output conversion, step cursor.
#[derive(Debug)]
pub struct WebcvRun {
    /// Dimensionless triangular potential ramp, one entry per step.
    ramp: Vec<f64>,
    /// Next ramp index to execute.
    cursor: usize,
    surface: Surface,
    system: Tridiagonal,
    /// Adds the formal potential back when converting E out.
    e_offset: f64,
    /// Converts dimensionless flux to amperes, sign included.
    i_factor: f64,
}

// =============================================================================
// Kernel implementation
// =============================================================================

/// The reference kernel. Stateless; all run state is in [`WebcvRun`].
#[derive(Debug, Default, Clone, Copy)]
pub struct WebcvKernel;

impl WebcvKernel {
    pub fn new() -> Self {
        Self
    }
}

impl Kernel for WebcvKernel {
    type Run = WebcvRun;

    fn init(
        &self,
        params: &ParameterRecord,
        buf: &mut ScratchBuffer,
    ) -> Result<WebcvRun, KernelFault> {
        validate(params)?;
        buf.write_x(0.0);
        buf.write_y(0.0);

        // Dimensionless transforms
        let (ka_factor, kb_factor) = match params.redox {
            crate::params::RedoxKind::Oxidation => (1.0 - params.alpha, -params.alpha),
            crate::params::RedoxKind::Reduction => (-params.alpha, 1.0 - params.alpha),
        };
        let k0 = params.k0 * (params.radius / params.diffusion);
        let ei = F_RT * (params.ei - params.e0);
        let ef = F_RT * (params.ef - params.e0);
        let sigma =
            params.scan_rate * F_RT * (params.radius * params.radius) / params.diffusion;

        let de = 1.0 / params.t_density;
        let dt = de / sigma;
        let ramp = build_ramp(ei, ef, de)?;
        let grid = build_grid(params.h0, params.gamma, dt, ramp.len())?;

        let i_factor = params.redox.sign()
            * 2.0
            * std::f64::consts::PI
            * FARADAY
            * params.diffusion
            * params.radius
            * params.conc
            * 1.0e-6;

        Ok(WebcvRun {
            system: Tridiagonal::new(&grid, dt),
            surface: Surface {
                k0,
                ka_factor,
                kb_factor,
                h0: params.h0,
            },
            ramp,
            cursor: 0,
            e_offset: params.e0,
            i_factor,
        })
    }

    fn step(&self, run: &mut WebcvRun, buf: &mut ScratchBuffer) -> Result<StepFlow, KernelFault> {
        let e = run.ramp[run.cursor];

        run.surface.apply(e, &mut run.system);
        run.system.solve();
        let flux = (run.system.rhs[1] - run.system.rhs[0]) / run.surface.h0;

        buf.write_x(e * RT_F + run.e_offset);
        buf.write_y(flux * run.i_factor);

        run.cursor += 1;
        if run.cursor == run.ramp.len() {
            Ok(StepFlow::Exhausted)
        } else {
            Ok(StepFlow::More)
        }
    }
}

// =============================================================================
// Discretisation
// =============================================================================

/// Triangular ramp: forward sweep from `ei` to (or just past) `ef`, then
/// the same points mirrored back, ending at `ei`.
///
/// The forward length is computed arithmetically, never by accumulating
/// `de` until the endpoint is passed: when `de` is too small to move the
/// floating-point sweep, accumulation would not terminate. A sweep whose
/// step count cannot be represented, or exceeds [`MAX_RAMP_POINTS`], is a
/// degenerate fault.
fn build_ramp(ei: f64, ef: f64, de: f64) -> Result<Vec<f64>, KernelFault> {
    let steps = ((ef - ei).abs() / de).ceil();
    if !steps.is_finite() || steps >= MAX_RAMP_POINTS as f64 {
        return Err(KernelFault::Degenerate(
            "t_density too fine for the potential window",
        ));
    }
    let mut forward = (steps as usize).max(1);

    let dir = if ef > ei { de } else { -de };
    // Rounding in the division can leave the last point a hair short of ef
    if (ei + forward as f64 * dir - ef) * dir.signum() < 0.0 {
        forward += 1;
    }

    let mut ramp = Vec::with_capacity(2 * (forward + 1));
    for k in 0..=forward {
        ramp.push(ei + k as f64 * dir);
    }
    for i in (0..=forward).rev() {
        ramp.push(ramp[i]);
    }
    Ok(ramp)
}

/// Expanding radial grid from the electrode surface (r = 1) out to past
/// the diffusion-layer extent for the full run duration.
///
/// Faults instead of looping when `h0` is too small to advance the grid
/// coordinate, and instead of allocating without bound when the diffusion
/// layer needs more than [`MAX_GRID_NODES`] nodes.
fn build_grid(h0: f64, gamma: f64, dt: f64, steps: usize) -> Result<Vec<f64>, KernelFault> {
    let limit = 1.0 + 6.0 * (dt * steps as f64).sqrt();
    let mut grid = vec![1.0];
    let mut dr = h0;
    while *grid.last().unwrap() < limit {
        let next = grid.last().unwrap() + dr;
        if next == *grid.last().unwrap() || grid.len() == MAX_GRID_NODES {
            return Err(KernelFault::Degenerate(
                "h0 too fine for the diffusion layer",
            ));
        }
        grid.push(next);
        dr *= gamma;
    }
    Ok(grid)
}

fn validate(params: &ParameterRecord) -> Result<(), KernelFault> {
    let finite_fields: [(&'static str, f64); 12] = [
        ("e0", params.e0),
        ("k0", params.k0),
        ("alpha", params.alpha),
        ("ei", params.ei),
        ("ef", params.ef),
        ("radius", params.radius),
        ("scan_rate", params.scan_rate),
        ("conc", params.conc),
        ("diffusion", params.diffusion),
        ("t_density", params.t_density),
        ("h0", params.h0),
        ("gamma", params.gamma),
    ];
    for (name, value) in finite_fields {
        if !value.is_finite() {
            return Err(KernelFault::NonFinite(name));
        }
    }

    if params.ei == params.ef {
        return Err(KernelFault::Degenerate("potential window is empty"));
    }
    if params.t_density <= 0.0 {
        return Err(KernelFault::Degenerate("t_density must be positive"));
    }
    if params.h0 <= 0.0 {
        return Err(KernelFault::Degenerate("h0 must be positive"));
    }
    if params.gamma < 1.0 {
        return Err(KernelFault::Degenerate("gamma must be >= 1"));
    }
    if params.radius <= 0.0 || params.diffusion <= 0.0 || params.scan_rate <= 0.0 {
        return Err(KernelFault::Degenerate(
            "radius, diffusion and scan_rate must be positive",
        ));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::DataPoint;
    use crate::params::test_record;

    fn run_to_completion(params: &ParameterRecord) -> Vec<DataPoint> {
        let kernel = WebcvKernel::new();
        let mut buf = ScratchBuffer::new();
        let mut run = kernel.init(params, &mut buf).unwrap();

        let mut points = Vec::new();
        loop {
            let flow = kernel.step(&mut run, &mut buf).unwrap();
            points.push(buf.read_point());
            if flow == StepFlow::Exhausted {
                return points;
            }
        }
    }

    #[test]
    fn test_first_point_starts_at_ei() {
        let params = test_record();
        let points = run_to_completion(&params);
        assert!((points[0].e - params.ei).abs() < 1e-9);
    }

    #[test]
    fn test_triangular_sweep_shape() {
        let params = test_record();
        let points = run_to_completion(&params);

        // Forward half rises monotonically past Ef, reverse half mirrors it
        let half = points.len() / 2;
        assert_eq!(points.len(), 2 * half);
        for pair in points[..half].windows(2) {
            assert!(pair[1].e > pair[0].e);
        }
        for pair in points[half..].windows(2) {
            assert!(pair[1].e < pair[0].e);
        }
        assert!(points[half - 1].e >= params.ef);
        assert!((points.last().unwrap().e - params.ei).abs() < 1e-9);
    }

    #[test]
    fn test_run_is_finite_and_bounded() {
        let points = run_to_completion(&test_record());
        assert!(!points.is_empty());
        assert!(points.iter().all(|p| p.e.is_finite() && p.i.is_finite()));
    }

    #[test]
    fn test_oxidation_produces_anodic_wave() {
        let points = run_to_completion(&test_record());
        let peak = points.iter().map(|p| p.i).fold(f64::MIN, f64::max);
        assert!(peak > 0.0);
    }

    #[test]
    fn test_reduction_flips_current_sign() {
        let mut params = test_record();
        params.redox = crate::params::RedoxKind::Reduction;
        std::mem::swap(&mut params.ei, &mut params.ef);
        let points = run_to_completion(&params);
        let trough = points.iter().map(|p| p.i).fold(f64::MAX, f64::min);
        assert!(trough < 0.0);
    }

    #[test]
    fn test_init_rejects_non_finite() {
        let mut params = test_record();
        params.k0 = f64::NAN;
        let err = WebcvKernel::new()
            .init(&params, &mut ScratchBuffer::new())
            .unwrap_err();
        assert_eq!(err, KernelFault::NonFinite("k0"));
    }

    #[test]
    fn test_init_rejects_degenerate_grid() {
        let mut params = test_record();
        params.gamma = 0.5;
        assert!(matches!(
            WebcvKernel::new().init(&params, &mut ScratchBuffer::new()),
            Err(KernelFault::Degenerate(_))
        ));

        let mut params = test_record();
        params.t_density = 0.0;
        assert!(matches!(
            WebcvKernel::new().init(&params, &mut ScratchBuffer::new()),
            Err(KernelFault::Degenerate(_))
        ));
    }

    #[test]
    fn test_init_rejects_unresolvable_step_density() {
        // Finite but absurd t_density: de underflows against the sweep,
        // so the ramp could never be walked. Init must fault, not spin.
        let mut params = test_record();
        params.t_density = 1e300;
        assert!(matches!(
            WebcvKernel::new().init(&params, &mut ScratchBuffer::new()),
            Err(KernelFault::Degenerate(_))
        ));
    }

    #[test]
    fn test_init_rejects_vanishing_grid_step() {
        // h0 too small to advance the grid coordinate past r = 1
        let mut params = test_record();
        params.h0 = 1e-300;
        params.gamma = 1.0;
        assert!(matches!(
            WebcvKernel::new().init(&params, &mut ScratchBuffer::new()),
            Err(KernelFault::Degenerate(_))
        ));
    }

    #[test]
    fn test_ramp_mirrors_forward_sweep() {
        let ramp = build_ramp(-2.0, 2.0, 1.0).unwrap();
        assert_eq!(ramp, vec![-2.0, -1.0, 0.0, 1.0, 2.0, 2.0, 1.0, 0.0, -1.0, -2.0]);
    }

    #[test]
    fn test_grid_expands_monotonically() {
        let grid = build_grid(0.1, 1.5, 0.5, 100).unwrap();
        assert!(grid.len() > 2);
        for pair in grid.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        assert!(*grid.last().unwrap() >= 1.0 + 6.0 * (0.5f64 * 100.0).sqrt());
    }
}
