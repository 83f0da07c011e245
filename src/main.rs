//! voltagram demo front end.
//!
//! Terminal analogue of the original web page: a parameter form (taken
//! from CLI flags), a submit/cancel pair gated by driver state, and a
//! live voltammogram redrawn on a fixed frame cadence while the
//! simulation streams points. The driver runs on a worker thread by
//! default; `--inline` runs it cooperatively on this thread instead.
//!
//! Keys: `s` start, `c` cancel, `q` quit.

use std::io::{self, Write};
use std::process;
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{execute, queue};
use spark_signals::{Signal, signal};

use voltagram::{
    AsciiChart, Controls, DoneReason, DriverEvent, DriverState, Frame, FormController,
    InlineHost, RawParameters, Reply, RenderLoop, RunOutcome, Trace, WebcvKernel, WorkerHost,
};

/// Interactive cyclic-voltammetry simulator.
#[derive(Parser, Debug)]
#[command(name = "voltagram", version, about)]
struct Cli {
    /// Redox direction: oxidation or reduction
    #[arg(long, default_value = "oxidation")]
    redox: String,
    /// Formal potential E0 (V)
    #[arg(long, default_value = "0.0")]
    e0: String,
    /// Rate constant k0 (m/s)
    #[arg(long, default_value = "1e-2")]
    k0: String,
    /// Transfer coefficient alpha
    #[arg(long, default_value = "0.5")]
    alpha: String,
    /// Initial potential Ei (V)
    #[arg(long, default_value = "-0.3")]
    ei: String,
    /// Final potential Ef (V)
    #[arg(long, default_value = "0.3")]
    ef: String,
    /// Electrode radius (m)
    #[arg(long, default_value = "5e-6")]
    radius: String,
    /// Scan rate (V/s)
    #[arg(long, default_value = "0.1")]
    scan_rate: String,
    /// Bulk concentration
    #[arg(long, default_value = "1.0")]
    conc: String,
    /// Diffusion coefficient (m^2/s)
    #[arg(long, default_value = "1e-9")]
    diffusion: String,
    /// Time steps per unit dimensionless potential
    #[arg(long, default_value = "100")]
    t_density: String,
    /// Initial spatial grid step
    #[arg(long, default_value = "1e-4")]
    h0: String,
    /// Spatial grid expansion factor
    #[arg(long, default_value = "1.1")]
    gamma: String,

    /// Run the driver on this thread (cooperative) instead of a worker
    #[arg(long)]
    inline: bool,
    /// Ticks per cooperative turn in inline mode
    #[arg(long, default_value_t = 32)]
    budget: usize,
}

impl Cli {
    fn raw_parameters(&self) -> RawParameters {
        RawParameters {
            redox: self.redox.clone(),
            e0: self.e0.clone(),
            k0: self.k0.clone(),
            alpha: self.alpha.clone(),
            ei: self.ei.clone(),
            ef: self.ef.clone(),
            radius: self.radius.clone(),
            scan_rate: self.scan_rate.clone(),
            conc: self.conc.clone(),
            diffusion: self.diffusion.clone(),
            t_density: self.t_density.clone(),
            h0: self.h0.clone(),
            gamma: self.gamma.clone(),
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

// =============================================================================
// Execution host selection
// =============================================================================

enum Host {
    Worker(WorkerHost),
    Inline(InlineHost<WebcvKernel>),
}

impl Host {
    /// Forward run events into the trace and the state signal. Returns
    /// the outcome when a `done` was observed this turn.
    fn pump(&mut self, trace: &mut Trace, state: &Signal<DriverState>) -> Option<String> {
        let mut outcome = None;
        match self {
            Host::Worker(host) => {
                while let Some(reply) = host.try_reply() {
                    match reply {
                        // A datum after done is tolerated, never fatal
                        Reply::Datum(point) => {
                            if state.get() == DriverState::Running {
                                trace.push(point);
                            }
                        }
                        Reply::Done(reason) => {
                            outcome = Some(describe_done(&reason));
                            set_state(state, DriverState::Done);
                        }
                    }
                }
            }
            Host::Inline(host) => {
                let mut events: Vec<DriverEvent> = Vec::new();
                host.pump(&mut events);
                for event in events {
                    match event {
                        DriverEvent::Datum(point) => trace.push(point),
                        DriverEvent::Done(reason) => {
                            outcome = Some(describe_outcome(&reason));
                            set_state(state, DriverState::Done);
                        }
                    }
                }
            }
        }
        outcome
    }

    fn start(&mut self, params: voltagram::ParameterRecord) -> voltagram::Result<()> {
        match self {
            Host::Worker(host) => host.start(params),
            Host::Inline(host) => {
                let mut events: Vec<DriverEvent> = Vec::new();
                host.start(&params, &mut events).map(|_| ())
            }
        }
    }

    fn cancel(&mut self) {
        match self {
            Host::Worker(host) => {
                let _ = host.stop();
            }
            Host::Inline(host) => {
                let mut events: Vec<DriverEvent> = Vec::new();
                host.cancel(&mut events);
            }
        }
    }
}

fn set_state(state: &Signal<DriverState>, next: DriverState) {
    if state.get() != next {
        state.set(next);
    }
}

fn describe_done(reason: &DoneReason) -> String {
    match reason {
        DoneReason::Loaded => "kernel loaded".to_string(),
        DoneReason::LoadFailed(e) => format!("load failed: {e}"),
        DoneReason::Completed => "completed".to_string(),
        DoneReason::Cancelled => "cancelled".to_string(),
        DoneReason::Faulted(e) => format!("faulted: {e}"),
    }
}

fn describe_outcome(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Completed => "completed".to_string(),
        RunOutcome::Cancelled => "cancelled".to_string(),
        RunOutcome::Faulted(e) => format!("faulted: {e}"),
    }
}

/// Spawn and load the worker, blocking until its load acknowledgement.
fn load_worker() -> Result<WorkerHost, Box<dyn std::error::Error>> {
    let host = WorkerHost::spawn(|| Ok(WebcvKernel::new()))?;
    host.load()?;
    match host.replies().recv_timeout(Duration::from_secs(10))? {
        Reply::Done(DoneReason::Loaded) => Ok(host),
        Reply::Done(DoneReason::LoadFailed(e)) => Err(voltagram::Error::Load(e).into()),
        other => Err(voltagram::Error::Load(format!("unexpected reply: {other:?}")).into()),
    }
}

// =============================================================================
// Terminal session
// =============================================================================

/// Raw-mode + alternate-screen guard; restores the terminal on drop.
struct Session;

impl Session {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, Hide)?;
        Ok(Self)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let raw = cli.raw_parameters();

    let mut host = if cli.inline {
        Host::Inline(InlineHost::with_budget(WebcvKernel::new(), cli.budget))
    } else {
        Host::Worker(load_worker()?)
    };

    let state: Signal<DriverState> = signal(DriverState::Idle);
    let mut form = FormController::new();
    form.bind(&state);

    let (cols, rows) = terminal::size().unwrap_or((80, 24));
    let mut chart = AsciiChart::new(cols as usize, rows.saturating_sub(3) as usize);
    let mut trace = Trace::new();
    let mut render_loop = RenderLoop::new(Duration::from_millis(33));
    let mut status = "press `s` to start".to_string();

    let _session = Session::enter()?;
    let mut stdout = io::stdout();
    draw(&mut stdout, &chart, &trace, &state, &status)?;

    loop {
        // 1. Run events (points, completion) observed this turn
        if let Some(outcome) = host.pump(&mut trace, &state) {
            status = outcome;
            log::info!("run finished: {status}");
        }

        // 2. Interactive input, never blocked by the simulation
        if event::poll(Duration::from_millis(5))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match (key.code, key.modifiers) {
                    (KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => break,
                    (KeyCode::Char('s'), _) if form.is_enabled(Controls::SUBMIT) => {
                        match form.collect(&raw) {
                            Ok(params) => {
                                chart.init(params.ei, params.ef);
                                trace.clear();
                                match host.start(params) {
                                    Ok(()) => {
                                        set_state(&state, DriverState::Running);
                                        render_loop.start();
                                        status = "running".to_string();
                                    }
                                    Err(e) => status = format!("start failed: {e}"),
                                }
                            }
                            Err(e) => status = format!("{e}"),
                        }
                        draw(&mut stdout, &chart, &trace, &state, &status)?;
                    }
                    (KeyCode::Char('c'), _) if form.is_enabled(Controls::CANCEL) => {
                        host.cancel();
                        status = "cancelling".to_string();
                    }
                    (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => break,
                    _ => {}
                }
            }
        }

        // 3. Frame-cadence redraw while the run is live
        match render_loop.on_frame(Instant::now(), state.get()) {
            Frame::Draw | Frame::Last => {
                draw(&mut stdout, &chart, &trace, &state, &status)?;
            }
            Frame::Waiting | Frame::Idle => {}
        }
    }

    if state.get() == DriverState::Running {
        host.cancel();
    }
    Ok(())
}

fn draw(
    out: &mut io::Stdout,
    chart: &AsciiChart,
    trace: &Trace,
    state: &Signal<DriverState>,
    status: &str,
) -> io::Result<()> {
    let header = format!(
        "voltagram | {:?} | {} points | {status}",
        state.get(),
        trace.len()
    );

    queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;
    queue!(out, crossterm::style::Print(header))?;
    queue!(out, MoveTo(0, 1), crossterm::style::Print("[s] start  [c] cancel  [q] quit"))?;

    let mut frame = Vec::new();
    chart.render(trace.points(), &mut frame)?;
    for (i, line) in String::from_utf8_lossy(&frame).lines().enumerate() {
        queue!(out, MoveTo(0, 2 + i as u16), crossterm::style::Print(line))?;
    }
    out.flush()
}
