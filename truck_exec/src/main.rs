//! Truck-side executable entry point.
//!
//! # Architecture
//!
//! The executable wires together the set of periodic tasks that make up the
//! on-vehicle control core:
//!
//!     - Mine simulator (20 Hz): integrates the vehicle dynamics
//!     - Sensor processing (10 Hz): filters the raw samples
//!     - Command logic (10 Hz): the status/mode state machine
//!     - Navigation control (20 Hz): the dual PID loop
//!     - Route planner (2 Hz): waypoint sequencing
//!     - Fault monitor (2 Hz): thermal and stochastic fault checks
//!     - Data collector (1 Hz): CSV telemetry
//!     - Messaging adapter (optional): pub/sub bridge to the mine broker
//!
//! Each task runs on its own thread against a shared context: the state
//! store, the event hub, the sample ring and the command queue. On shutdown
//! a STOP is issued, the shutdown flag is raised, and every task is joined
//! with a bounded timeout.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{ensure, WrapErr},
    Report,
};
use log::info;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use structopt::StructOpt;

// Internal
use comms_if::net::{zmq, NetParams};
use comms_if::tc::TruckCmd;
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

use truck_lib::bus::{spawn_inbound, OutboundBus};
use truck_lib::params::TruckParams;
use truck_lib::sim::SensorFeed;
use truck_lib::state::StateStore;
use truck_lib::sync::cmd_queue::submit;
use truck_lib::sync::{CommandQueue, EventManager, SampleBuffer};
use truck_lib::tasks::{
    CollectorTask, FaultTask, LogicTask, NavTask, RouteTask, SensorTask, SimulatorTask, TaskSet,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Time the task set gets to wind down before stragglers are abandoned.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// On-vehicle control core for an autonomous haul truck.
#[derive(Debug, StructOpt)]
#[structopt(name = "truck_exec")]
struct Opt {
    /// Identifier of this truck (positive integer)
    truck_id: u32,

    /// Enable the messaging adapter (requires a reachable broker)
    #[structopt(long)]
    bus: bool,

    /// Stop cleanly after this many seconds; without it the truck runs until
    /// killed
    #[structopt(long)]
    duration: Option<f64>,

    /// Truck parameter file
    #[structopt(long, default_value = "truck.toml")]
    params: PathBuf,

    /// Network parameter file
    #[structopt(long, default_value = "net.toml")]
    net_params: PathBuf,

    /// Directory sessions are created in
    #[structopt(long, default_value = "sessions")]
    sessions_dir: PathBuf,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    let opt = Opt::from_args();
    ensure!(opt.truck_id > 0, "The truck id must be a positive integer");

    let session = Session::new("truck_exec", &opt.sessions_dir)
        .wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Haul Truck Executable\n");
    info!("Truck id: {}", opt.truck_id);
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let params: TruckParams = util::params::load_or_default(&opt.params)
        .wrap_err("Could not load the truck parameters")?;

    info!("Truck parameters loaded");

    // ---- SHARED CONTEXT ----

    let store = Arc::new(StateStore::new(opt.truck_id));
    let events = Arc::new(EventManager::new());
    let buffer = Arc::new(SampleBuffer::new(params.queues.samples));
    let feed = Arc::new(SensorFeed::new());
    let queue = CommandQueue::new(params.queues.commands);
    let shutdown = Arc::new(AtomicBool::new(false));

    // ---- SPAWN TASKS ----

    let mut tasks = TaskSet::new();

    tasks.spawn(
        SimulatorTask::new(store.clone(), feed.clone(), &params)
            .wrap_err("Failed to initialise the simulator")?,
        &shutdown,
    );
    tasks.spawn(
        SensorTask::new(feed, store.clone(), buffer, &params),
        &shutdown,
    );
    tasks.spawn(
        LogicTask::new(
            store.clone(),
            events.clone(),
            queue.clone(),
            params.periods.logic(),
        ),
        &shutdown,
    );
    tasks.spawn(NavTask::new(store.clone(), events.clone(), &params), &shutdown);
    tasks.spawn(RouteTask::new(store.clone(), &params), &shutdown);
    tasks.spawn(
        FaultTask::new(store.clone(), events.clone(), queue.clone(), &params),
        &shutdown,
    );

    let telemetry_dir = params
        .telemetry
        .dir
        .clone()
        .unwrap_or_else(|| session.data_root.clone());
    tasks.spawn(
        CollectorTask::new(store.clone(), &telemetry_dir, params.periods.log()),
        &shutdown,
    );

    // ---- MESSAGING ADAPTER ----

    if opt.bus {
        let net_params: NetParams = util::params::load_or_default(&opt.net_params)
            .wrap_err("Could not load the network parameters")?;

        let zmq_ctx = zmq::Context::new();

        let inbound = spawn_inbound(
            &zmq_ctx,
            &net_params,
            opt.truck_id,
            queue.clone(),
            store.clone(),
            shutdown.clone(),
        )
        .wrap_err("Failed to initialise the inbound bus")?;
        tasks.adopt(inbound);

        tasks.spawn(
            OutboundBus::new(&zmq_ctx, &net_params, store.clone(), params.periods.bus())
                .wrap_err("Failed to initialise the outbound bus")?,
            &shutdown,
        );

        info!("Messaging adapter connected to {}", net_params.pub_endpoint);
    } else {
        info!("Messaging adapter disabled, running without network traffic");
    }

    info!("All tasks started\n");

    // ---- RUN ----

    match opt.duration {
        Some(seconds) => {
            thread::sleep(Duration::from_secs_f64(seconds));
            info!("Run duration elapsed, stopping");
        }
        None => loop {
            thread::sleep(Duration::from_secs(1));
        },
    }

    // ---- SHUTDOWN ----

    // Zero the actuation through the normal command path before pulling the
    // tasks down, then raise the flag; every task observes it within one
    // period.
    submit(&queue, &store, TruckCmd::Stop);
    thread::sleep(2 * params.periods.logic());

    shutdown.store(true, Ordering::Relaxed);
    events.request_shutdown();

    tasks.join_all(SHUTDOWN_TIMEOUT);

    info!("End of execution");

    Ok(())
}
