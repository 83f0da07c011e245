//! Isolated execution host - driver on a dedicated worker thread.
//!
//! The worker owns its kernel and driver outright; the only shared state
//! with the caller is the two mpsc channels, so message payloads are the
//! whole memory-sharing story. Control messages are drained between ticks,
//! which is exactly the tick-boundary cancellation the driver promises:
//! a `Stop` never interrupts a step in flight, it prevents the next one.
//!
//! Lifecycle of the thread:
//!
//! 1. Block on the request channel until `Load` arrives
//! 2. Build the kernel via the factory; ack `Done(Loaded)` (or
//!    `Done(LoadFailed)` and exit, no respawn)
//! 3. For each `Start`: run the step loop, interleaving `try_recv` with
//!    ticks, forwarding `Datum`/`Done` replies
//! 4. Exit when the request channel disconnects (host dropped)

use std::io;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::driver::{DriverEvent, DriverState, EventSink, RunOutcome, SteppingDriver};
use crate::error::{Error, Result};
use crate::kernel::{Kernel, KernelFault};
use crate::params::ParameterRecord;

use super::{DoneReason, Reply, Request};

// =============================================================================
// Host handle (caller side)
// =============================================================================

/// Caller-side handle to the worker thread.
///
/// Dropping the host disconnects the request channel; the worker cancels
/// any in-progress run, exits, and is joined.
pub struct WorkerHost {
    tx: Option<Sender<Request>>,
    rx: Receiver<Reply>,
    handle: Option<JoinHandle<()>>,
}

impl WorkerHost {
    /// Spawn the worker thread. The factory runs on the worker when the
    /// `Load` request arrives, so kernel construction cost (and failure)
    /// stays off the caller's thread.
    pub fn spawn<K, F>(factory: F) -> io::Result<Self>
    where
        K: Kernel + 'static,
        F: FnOnce() -> std::result::Result<K, KernelFault> + Send + 'static,
    {
        let (req_tx, req_rx) = mpsc::channel();
        let (reply_tx, reply_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("voltagram-worker".to_string())
            .spawn(move || {
                worker_main(factory, req_rx, reply_tx);
            })?;

        Ok(Self {
            tx: Some(req_tx),
            rx: reply_rx,
            handle: Some(handle),
        })
    }

    /// Request kernel load. Acked by `Done(Loaded)` / `Done(LoadFailed)`.
    pub fn load(&self) -> Result<()> {
        self.send(Request::Load)
    }

    /// Request a run.
    pub fn start(&self, params: ParameterRecord) -> Result<()> {
        self.send(Request::Start(params))
    }

    /// Request cancellation of the in-progress run.
    pub fn stop(&self) -> Result<()> {
        self.send(Request::Stop)
    }

    /// The reply channel. FIFO; one `Done` terminates each load attempt
    /// and each run.
    pub fn replies(&self) -> &Receiver<Reply> {
        &self.rx
    }

    /// Non-blocking poll for the next reply.
    pub fn try_reply(&self) -> Option<Reply> {
        self.rx.try_recv().ok()
    }

    fn send(&self, request: Request) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(Error::WorkerGone)?;
        tx.send(request).map_err(|_| Error::WorkerGone)
    }
}

impl Drop for WorkerHost {
    fn drop(&mut self) {
        // Disconnect first so a parked or mid-run worker observes it
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// =============================================================================
// Worker thread
// =============================================================================

/// Adapts driver events onto the reply channel. Send failures mean the
/// caller is gone; the run loop notices via its own disconnect check.
struct ReplySink<'a> {
    tx: &'a Sender<Reply>,
}

impl EventSink for ReplySink<'_> {
    fn emit(&mut self, event: DriverEvent) {
        let reply = match event {
            DriverEvent::Datum(point) => Reply::Datum(point),
            DriverEvent::Done(RunOutcome::Completed) => Reply::Done(DoneReason::Completed),
            DriverEvent::Done(RunOutcome::Cancelled) => Reply::Done(DoneReason::Cancelled),
            DriverEvent::Done(RunOutcome::Faulted(fault)) => {
                Reply::Done(DoneReason::Faulted(fault.to_string()))
            }
        };
        let _ = self.tx.send(reply);
    }
}

fn worker_main<K, F>(factory: F, rx: Receiver<Request>, tx: Sender<Reply>)
where
    K: Kernel,
    F: FnOnce() -> std::result::Result<K, KernelFault>,
{
    let mut factory = Some(factory);
    let mut driver: Option<SteppingDriver<K>> = None;

    loop {
        let request = match rx.recv() {
            Ok(request) => request,
            Err(_) => return, // host dropped
        };

        match request {
            Request::Load => match factory.take() {
                Some(build) => match build() {
                    Ok(kernel) => {
                        driver = Some(SteppingDriver::new(kernel));
                        let _ = tx.send(Reply::Done(DoneReason::Loaded));
                        log::debug!("worker: kernel loaded");
                    }
                    Err(fault) => {
                        log::error!("worker: kernel load failed: {fault}");
                        let _ = tx.send(Reply::Done(DoneReason::LoadFailed(fault.to_string())));
                        return;
                    }
                },
                // Repeated load: kernel already prepared, re-ack
                None => {
                    log::warn!("worker: duplicate load request");
                    let _ = tx.send(Reply::Done(DoneReason::Loaded));
                }
            },
            Request::Start(params) => match driver.as_mut() {
                Some(driver) => {
                    if run(driver, &params, &rx, &tx) == RunExit::Disconnected {
                        return;
                    }
                }
                None => {
                    log::error!("worker: start before load");
                    let _ = tx.send(Reply::Done(DoneReason::Faulted(
                        "start before load".to_string(),
                    )));
                }
            },
            // No run in progress: cancellation is an idempotent no-op
            Request::Stop => {}
        }
    }
}

#[derive(PartialEq)]
enum RunExit {
    Finished,
    Disconnected,
}

/// One run: start, then tick until done, draining control messages at
/// every tick boundary.
fn run<K: Kernel>(
    driver: &mut SteppingDriver<K>,
    params: &ParameterRecord,
    rx: &Receiver<Request>,
    tx: &Sender<Reply>,
) -> RunExit {
    let mut sink = ReplySink { tx };

    // An init fault has already emitted its Done(Faulted) through the sink
    if driver.start(params, &mut sink).is_err() {
        return RunExit::Finished;
    }

    while driver.state() == DriverState::Running {
        match rx.try_recv() {
            Ok(Request::Stop) => {
                driver.cancel(&mut sink);
                log::debug!("worker: run cancelled");
                return RunExit::Finished;
            }
            Ok(Request::Start(_)) => {
                // Rejected without touching the run in progress
                log::error!("worker: start while running rejected");
            }
            Ok(Request::Load) => {
                log::error!("worker: load while running rejected");
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                driver.cancel(&mut sink);
                return RunExit::Disconnected;
            }
        }

        driver.tick(&mut sink);
    }

    RunExit::Finished
}

// =============================================================================
// Tests
// =============================================================================
