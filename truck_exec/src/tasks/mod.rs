//! # Periodic tasks
//!
//! One module per task. Each task separates its cyclic processing (`tick`)
//! from its pacing, so the closed-loop scenarios at the bottom of this file
//! can drive the whole stack tick by tick, deterministically and without
//! threads.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod collector;
pub mod fault;
pub mod logic;
pub mod nav;
pub mod route;
pub mod sensors;
pub mod simulator;

// ---------------------------------------------------------------------------
// RE-EXPORTS
// ---------------------------------------------------------------------------

pub use collector::CollectorTask;
pub use fault::FaultTask;
pub use logic::LogicTask;
pub use nav::NavTask;
pub use route::RouteTask;
pub use sensors::SensorTask;
pub use simulator::SimulatorTask;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, warn};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use util::module::{self, Task};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The set of spawned task threads, joined as a group on shutdown.
pub struct TaskSet {
    handles: Vec<JoinHandle<()>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TaskSet {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    /// Spawn a task on its own thread, paced by the shared shutdown flag.
    pub fn spawn<T>(&mut self, task: T, shutdown: &Arc<AtomicBool>)
    where
        T: Task + Send + 'static,
    {
        self.handles.push(module::spawn(task, shutdown));
    }

    /// Adopt an externally spawned thread so it is joined with the rest.
    pub fn adopt(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    /// Join every task, giving the whole set up to `timeout`.
    ///
    /// Tasks still alive after the timeout are abandoned with a log line;
    /// they hold no resources that outlive the process.
    pub fn join_all(self, timeout: Duration) {
        let deadline = Instant::now() + timeout;

        for handle in self.handles {
            let name = handle
                .thread()
                .name()
                .unwrap_or("unnamed")
                .to_string();

            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }

            if handle.is_finished() {
                handle.join().ok();
                debug!("{}: joined", name);
            } else {
                warn!("{}: still alive after shutdown timeout, abandoning", name);
            }
        }
    }
}

impl Default for TaskSet {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// CLOSED-LOOP SCENARIOS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    use comms_if::tc::TruckCmd;
    use comms_if::tm::{OpMode, TruckStatus};

    use crate::params::TruckParams;
    use crate::sim::SensorFeed;
    use crate::state::StateStore;
    use crate::sync::{CommandQueue, EventManager, SampleBuffer};

    /// The full on-truck stack, driven synchronously.
    struct Truck {
        store: Arc<StateStore>,
        queue: CommandQueue,
        simulator: SimulatorTask,
        sensors: SensorTask,
        logic: LogicTask,
        nav: NavTask,
        route: RouteTask,
        fault: FaultTask,
        /// Number of 50 ms base steps taken so far.
        steps: u64,
    }

    impl Truck {
        /// Build a deterministic truck: no noise, no stochastic faults.
        fn new(mut params: TruckParams) -> Self {
            params.noise.enabled = false;
            params.faults.injection_enabled = false;

            let store = Arc::new(StateStore::new(1));
            let events = Arc::new(EventManager::new());
            let buffer = Arc::new(SampleBuffer::new(100));
            let feed = Arc::new(SensorFeed::new());
            let queue = CommandQueue::new(params.queues.commands);

            Self {
                simulator: SimulatorTask::new(store.clone(), feed.clone(), &params).unwrap(),
                sensors: SensorTask::new(feed, store.clone(), buffer, &params),
                logic: LogicTask::new(
                    store.clone(),
                    events.clone(),
                    queue.clone(),
                    params.periods.logic(),
                ),
                nav: NavTask::new(store.clone(), events.clone(), &params),
                route: RouteTask::new(store.clone(), &params),
                fault: FaultTask::new(store.clone(), events, queue.clone(), &params),
                store,
                queue,
                steps: 0,
            }
        }

        /// Advance simulated time by one 50 ms base step, ticking each task
        /// at its own rate (sim/nav every step, sensors/logic every 2nd,
        /// route/fault every 10th).
        fn step(&mut self) {
            self.simulator.tick().unwrap();
            if self.steps % 2 == 0 {
                self.sensors.tick().unwrap();
                self.logic.tick().unwrap();
            }
            if self.steps % 10 == 0 {
                self.route.tick().unwrap();
                self.fault.tick().unwrap();
            }
            self.nav.tick().unwrap();
            self.steps += 1;
        }

        /// Run `seconds` of simulated time.
        fn run(&mut self, seconds: f64) {
            for _ in 0..(seconds / 0.05) as u64 {
                self.step();
            }
        }

        fn send(&self, cmd: TruckCmd) {
            self.queue.push(cmd);
        }
    }

    #[test]
    fn scenario_simple_route() {
        let mut truck = Truck::new(TruckParams::default());

        truck.send(TruckCmd::SetMode(OpMode::AutomaticRemote));
        truck.send(TruckCmd::SetRoute(vec![[10.0, 0.0]]));
        truck.send(TruckCmd::SetStatus(TruckStatus::Running));

        // The waypoint must be accepted within 10 s of simulated time
        let mut accepted = false;
        for _ in 0..(10.0 / 0.05) as u64 {
            truck.step();
            if truck.store.snapshot().current_waypoint == 1 {
                accepted = true;
                break;
            }
        }
        assert!(accepted, "waypoint not accepted within 10 s");

        let at_acceptance = truck.store.snapshot();
        assert!(at_acceptance.last_event.contains("route complete"));

        // At the tick the index advanced the truck was inside the
        // acceptance radius of the target
        let dist = ((at_acceptance.position.x - 10.0).powi(2)
            + at_acceptance.position.y.powi(2))
        .sqrt();
        assert!(dist <= 2.0 + 1e-9, "accepted at distance {:.2}", dist);

        // With the setpoints zeroed the truck slows and stays near the target
        truck.run(1.0);
        let snap = truck.store.snapshot();
        assert!(
            snap.velocity < at_acceptance.velocity && snap.velocity < 1.5,
            "velocity did not decay: {} -> {}",
            at_acceptance.velocity,
            snap.velocity
        );
        assert!(
            (snap.position.x - 10.0).abs() <= 2.0 && snap.position.y.abs() <= 2.0,
            "final position ({:.2}, {:.2}) too far from target",
            snap.position.x,
            snap.position.y
        );
    }

    #[test]
    fn scenario_emergency_overrides_setpoint() {
        let mut truck = Truck::new(TruckParams::default());

        truck.send(TruckCmd::SetMode(OpMode::ManualRemote));
        truck.send(TruckCmd::SetSetpointVelocity(5.0));
        truck.send(TruckCmd::SetStatus(TruckStatus::Running));
        truck.run(2.0);

        assert!(truck.store.snapshot().velocity_cmd > 0.0);

        truck.send(TruckCmd::Emergency);
        // One logic cycle to latch the emergency, one nav cycle to zero
        truck.step();
        truck.step();

        let snap = truck.store.snapshot();
        assert_eq!(snap.status, TruckStatus::Emergency);
        assert_eq!(snap.velocity_cmd, 0.0);
        assert_eq!(snap.angular_cmd, 0.0);
        // Setpoint preserved through the emergency
        assert_eq!(snap.setpoint_velocity, 5.0);
    }

    #[test]
    fn scenario_bumpless_transfer() {
        let mut params = TruckParams::default();
        // Cruise at the manual speed so the automatic setpoint matches
        params.route.cruise_velocity_ms = 3.0;
        let mut truck = Truck::new(params);

        // Stabilise in manual at 3 m/s; the integral term converges slowly
        truck.send(TruckCmd::SetMode(OpMode::ManualRemote));
        truck.send(TruckCmd::SetSetpointVelocity(3.0));
        truck.send(TruckCmd::SetStatus(TruckStatus::Running));
        truck.run(60.0);

        let before = truck.store.snapshot();
        assert!(
            (before.velocity - 3.0).abs() < 0.1,
            "did not stabilise: {}",
            before.velocity
        );

        // Switch to automatic with a far waypoint dead ahead. One step
        // applies the commands, plans the route and runs the first
        // automatic navigation tick.
        truck.send(TruckCmd::SetRoute(vec![[1000.0, 0.0]]));
        truck.send(TruckCmd::SetMode(OpMode::AutomaticRemote));
        truck.step();

        let after = truck.store.snapshot();
        assert!(
            (after.velocity_cmd - before.velocity_cmd).abs() <= 0.01,
            "transfer bumped: {} -> {}",
            before.velocity_cmd,
            after.velocity_cmd
        );
    }

    #[test]
    fn scenario_thermal_fault() {
        let mut truck = Truck::new(TruckParams::default());

        truck.send(TruckCmd::SetStatus(TruckStatus::Running));
        truck.step();
        truck.step();

        // Force a critical temperature and run one fault-monitor period.
        // The simulator is not stepped here so the reading stays forced.
        truck.store.update(|s| s.temperature = 121.0);
        truck.fault.tick().unwrap();
        truck.logic.tick().unwrap();
        truck.nav.tick().unwrap();

        let snap = truck.store.snapshot();
        assert_eq!(snap.status, TruckStatus::Emergency);
        assert_eq!(snap.velocity_cmd, 0.0);
        assert!(
            snap.last_event.contains("critical temperature"),
            "cause not recorded: {:?}",
            snap.last_event
        );
    }

    #[test]
    fn scenario_multi_waypoint_route() {
        let mut truck = Truck::new(TruckParams::default());

        truck.send(TruckCmd::SetMode(OpMode::AutomaticRemote));
        truck.send(TruckCmd::SetRoute(vec![[5.0, 0.0], [5.0, 5.0], [0.0, 5.0]]));
        truck.send(TruckCmd::SetStatus(TruckStatus::Running));

        truck.run(90.0);

        let snap = truck.store.snapshot();
        assert_eq!(snap.current_waypoint, 3, "route not completed");
        assert_eq!(snap.setpoint_velocity, 0.0);
        assert_eq!(snap.setpoint_angular, 0.0);
        assert!(snap.last_event.contains("route complete"));
    }

    #[test]
    fn scenario_command_queue_saturation() {
        let mut params = TruckParams::default();
        params.queues.commands = 4;
        let mut truck = Truck::new(params);

        // Logic is paused (not ticked): overfill the queue
        for i in 0..5 {
            crate::sync::cmd_queue::submit(
                &truck.queue,
                &truck.store,
                TruckCmd::SetSetpointVelocity(i as f64),
            );
        }

        assert!(truck
            .store
            .snapshot()
            .last_event
            .contains("command queue overflow"));

        // Resume logic: the oldest command was dropped, the newest applied
        truck.logic.tick().unwrap();
        assert_eq!(truck.store.snapshot().setpoint_velocity, 4.0);
    }
}
