//! Render loop - pull-based redraw on the host's frame cadence.
//!
//! The render side never receives points directly; it reads the
//! accumulated trace and redraws from scratch each due frame (no
//! incremental diffing). Step cadence and frame cadence are independent:
//! the driver may produce hundreds of points between two frames, or none.
//!
//! The loop keeps rescheduling itself only while a run is in progress;
//! once `Done` is observed it draws one final frame and stops for good,
//! so no background work outlives the run.

pub mod chart;

pub use chart::AsciiChart;

use std::time::{Duration, Instant};

use crate::buffer::DataPoint;
use crate::driver::DriverState;

// =============================================================================
// Trace
// =============================================================================

/// Caller-side append-only point sequence, the only state the render
/// loop observes. In the isolated configuration this is rebuilt from
/// `datum` messages; inline, the driver's own trace can be read instead.
#[derive(Debug, Default, Clone)]
pub struct Trace {
    points: Vec<DataPoint>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one point; order of appends is step order.
    pub fn push(&mut self, point: DataPoint) {
        self.points.push(point);
    }

    /// Drop all points (a new run starts from an empty sequence).
    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// =============================================================================
// Frame pacing
// =============================================================================

/// Gates redraws to a fixed cadence, independent of how often the caller's
/// loop spins.
#[derive(Debug)]
pub struct FramePacer {
    interval: Duration,
    last: Option<Instant>,
}

impl FramePacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Forget the last frame time; the next check fires immediately.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// True when a frame is due at `now`; advances the cadence when so.
    pub fn due(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

// =============================================================================
// Render loop
// =============================================================================

/// What the caller should do this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Loop not scheduled (no run observed, or already stopped).
    Idle,
    /// Scheduled but not yet due; draw nothing.
    Waiting,
    /// Due: redraw the full trace.
    Draw,
    /// Run is done: redraw once more, then the loop stops permanently.
    Last,
}

/// Frame-cadence redraw scheduler tied to the driver lifecycle.
#[derive(Debug)]
pub struct RenderLoop {
    pacer: FramePacer,
    active: bool,
}

impl RenderLoop {
    pub fn new(interval: Duration) -> Self {
        Self {
            pacer: FramePacer::new(interval),
            active: false,
        }
    }

    /// Arm the loop when a run starts. The first frame fires immediately.
    pub fn start(&mut self) {
        self.pacer.reset();
        self.active = true;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Decide this frame's action from the observed driver state.
    pub fn on_frame(&mut self, now: Instant, state: DriverState) -> Frame {
        if !self.active {
            return Frame::Idle;
        }
        if state == DriverState::Done {
            // One closing redraw so the final points are visible
            self.active = false;
            return Frame::Last;
        }
        if self.pacer.due(now) {
            Frame::Draw
        } else {
            Frame::Waiting
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_preserves_append_order() {
        let mut trace = Trace::new();
        for i in 0..5 {
            trace.push(DataPoint {
                e: i as f64,
                i: 0.0,
            });
        }
        let es: Vec<f64> = trace.points().iter().map(|p| p.e).collect();
        assert_eq!(es, vec![0.0, 1.0, 2.0, 3.0, 4.0]);

        trace.clear();
        assert!(trace.is_empty());
    }

    #[test]
    fn test_pacer_gates_to_interval() {
        let mut pacer = FramePacer::new(Duration::from_millis(100));
        let t0 = Instant::now();

        assert!(pacer.due(t0));
        assert!(!pacer.due(t0 + Duration::from_millis(50)));
        assert!(pacer.due(t0 + Duration::from_millis(150)));
        assert!(!pacer.due(t0 + Duration::from_millis(160)));
    }

    #[test]
    fn test_loop_idle_until_started() {
        let mut rl = RenderLoop::new(Duration::from_millis(16));
        assert_eq!(
            rl.on_frame(Instant::now(), DriverState::Idle),
            Frame::Idle
        );
    }

    #[test]
    fn test_loop_draws_then_waits_then_draws() {
        let mut rl = RenderLoop::new(Duration::from_millis(100));
        let t0 = Instant::now();

        rl.start();
        assert_eq!(rl.on_frame(t0, DriverState::Running), Frame::Draw);
        assert_eq!(
            rl.on_frame(t0 + Duration::from_millis(10), DriverState::Running),
            Frame::Waiting
        );
        assert_eq!(
            rl.on_frame(t0 + Duration::from_millis(120), DriverState::Running),
            Frame::Draw
        );
    }

    #[test]
    fn test_loop_stops_permanently_after_done() {
        let mut rl = RenderLoop::new(Duration::from_millis(16));
        let t0 = Instant::now();

        rl.start();
        assert_eq!(rl.on_frame(t0, DriverState::Running), Frame::Draw);
        assert_eq!(
            rl.on_frame(t0 + Duration::from_secs(1), DriverState::Done),
            Frame::Last
        );
        // No further frames, however much time passes
        assert_eq!(
            rl.on_frame(t0 + Duration::from_secs(2), DriverState::Done),
            Frame::Idle
        );
        assert!(!rl.is_active());
    }

    #[test]
    fn test_restart_rearms_the_loop() {
        let mut rl = RenderLoop::new(Duration::from_millis(16));
        let t0 = Instant::now();

        rl.start();
        rl.on_frame(t0, DriverState::Done);
        assert!(!rl.is_active());

        rl.start();
        assert_eq!(
            rl.on_frame(t0 + Duration::from_secs(1), DriverState::Running),
            Frame::Draw
        );
    }
}
