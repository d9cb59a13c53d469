//! Periodic task interfaces
//!
//! Each task in `truck_exec` runs on its own thread with a fixed period.
//! Implementing [`Task`] gives the task a uniform lifecycle: the runner owns
//! the pacing (monotonic, drift-free) and the shutdown check, the task only
//! provides its cyclic processing in `tick`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

// Internal imports
use crate::time::Ticker;

// ---------------------------------------------------------------------------
// TASK TRAIT
// ---------------------------------------------------------------------------

/// A periodic task.
pub trait Task {
    /// An error which can occur during cyclic processing.
    ///
    /// Tick errors are routine (a bad command, a failed write) and are logged
    /// by the runner rather than stopping the task.
    type TickError: std::fmt::Display;

    /// Short name of the task, used for the thread name and log lines.
    fn name(&self) -> &'static str;

    /// The task period.
    fn period(&self) -> Duration;

    /// Perform one cycle of processing.
    fn tick(&mut self) -> Result<(), Self::TickError>;
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Run a task until the shutdown flag is raised.
///
/// The flag is checked once per period, so a raised flag is observed within
/// one cycle. Overruns are logged and do not shift later wake instants.
pub fn run<T: Task>(mut task: T, shutdown: Arc<AtomicBool>) {
    let name = task.name();
    let mut ticker = Ticker::new(task.period());

    info!("{}: task started ({:?} period)", name, task.period());

    while !shutdown.load(Ordering::Relaxed) {
        if let Err(e) = task.tick() {
            warn!("{}: tick error: {}", name, e);
        }

        if let Some(overrun) = ticker.wait() {
            warn!("{}: cycle overran by {:.6} s", name, overrun.as_secs_f64());
        }
    }

    info!("{}: task stopped", name);
}

/// Spawn a task on its own named thread.
pub fn spawn<T>(task: T, shutdown: &Arc<AtomicBool>) -> JoinHandle<()>
where
    T: Task + Send + 'static,
{
    let shutdown = shutdown.clone();

    thread::Builder::new()
        .name(task.name().to_string())
        .spawn(move || run(task, shutdown))
        .expect("Could not spawn task thread")
}
