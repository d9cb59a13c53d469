//! # Command logic task
//!
//! The truck's state machine. Drains the command queue at 10 Hz and applies
//! each command to the shared state according to the transition table:
//!
//! | Current status | Event                       | Next status |
//! |----------------|-----------------------------|-------------|
//! | STOPPED        | SET_STATUS(RUNNING)         | RUNNING     |
//! | RUNNING        | SET_STATUS(STOPPED) or STOP | STOPPED     |
//! | any            | EMERGENCY or fault detected | EMERGENCY   |
//! | EMERGENCY      | RESET                       | STOPPED     |
//!
//! Mode transitions are independent of status. Entering AUTOMATIC_REMOTE
//! signals the navigation task so it can bumpless-initialise its
//! controllers. Illegal transitions are ignored and recorded in
//! `last_event`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use comms_if::tc::TruckCmd;
use comms_if::tm::{FaultFlags, OpMode, TruckStatus};
use util::module::Task;

use crate::state::StateStore;
use crate::sync::{CommandQueue, EventManager, SystemEvent};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The command logic task.
pub struct LogicTask {
    store: Arc<StateStore>,
    events: Arc<EventManager>,
    queue: CommandQueue,
    period: Duration,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LogicTask {
    pub fn new(
        store: Arc<StateStore>,
        events: Arc<EventManager>,
        queue: CommandQueue,
        period: Duration,
    ) -> Self {
        Self {
            store,
            events,
            queue,
            period,
        }
    }

    /// Apply one command to the shared state.
    pub fn apply(&self, cmd: TruckCmd) {
        match cmd {
            TruckCmd::SetStatus(target) => self.apply_status(target),
            TruckCmd::Stop => self.apply_status(TruckStatus::Stopped),

            TruckCmd::Emergency => {
                let snap = self.store.snapshot();
                if snap.status != TruckStatus::Emergency {
                    warn!("Emergency stop engaged");

                    // Keep the fault monitor's cause description if it just
                    // recorded one, the cause reads better than the effect
                    let keep_cause = snap.faults.electrical
                        || snap.faults.hydraulic
                        || snap.last_event.contains("critical temperature");

                    self.store.update(|s| {
                        s.status = TruckStatus::Emergency;
                        if !keep_cause {
                            s.last_event = String::from("emergency stop engaged");
                        }
                    });
                }
            }

            TruckCmd::Reset => {
                let snap = self.store.snapshot();
                if snap.status == TruckStatus::Emergency {
                    info!("Emergency reset, faults cleared");
                    self.store.update(|s| {
                        s.status = TruckStatus::Stopped;
                        s.faults = FaultFlags::default();
                        s.last_event = String::from("emergency reset");
                    });
                } else {
                    self.ignore(format!("reset while {}", snap.status));
                }
            }

            TruckCmd::SetMode(mode) => {
                let snap = self.store.snapshot();
                if snap.mode != mode {
                    info!("Mode changed: {} -> {}", snap.mode, mode);
                    self.store.update(|s| {
                        s.mode = mode;
                        s.last_event = format!("mode changed to {}", mode);
                    });

                    // Wake the navigation task so it can bumpless-init
                    if mode == OpMode::AutomaticRemote {
                        self.events.signal(SystemEvent::ModeChanged);
                    }
                }
            }

            TruckCmd::SetSetpointVelocity(v) => {
                debug!("Velocity setpoint: {:.2} m/s", v);
                self.store.update(|s| s.setpoint_velocity = v);
            }

            TruckCmd::SetSetpointAngular(w) => {
                debug!("Angular setpoint: {:.3} rad/s", w);
                self.store.update(|s| s.setpoint_angular = w);
            }

            TruckCmd::SetRoute(waypoints) => {
                // Replace-on-receipt: a route received mid-drive supersedes
                // the active one.
                info!("Route received with {} waypoints", waypoints.len());
                self.store.update(|s| {
                    s.last_event = format!("route received ({} waypoints)", waypoints.len());
                    s.route = waypoints;
                    s.current_waypoint = 0;
                });
            }
        }
    }

    /// Apply a status transition, honouring the transition table.
    fn apply_status(&self, target: TruckStatus) {
        let snap = self.store.snapshot();

        // Duplicate commands are tolerated silently
        if snap.status == target {
            return;
        }

        let legal = matches!(
            (snap.status, target),
            (TruckStatus::Stopped, TruckStatus::Running)
                | (TruckStatus::Running, TruckStatus::Stopped)
        );

        if legal {
            info!("Status changed: {} -> {}", snap.status, target);
            self.store.update(|s| {
                s.status = target;
                s.last_event = format!("status changed to {}", target);
            });
        } else {
            self.ignore(format!("status transition {} -> {}", snap.status, target));
        }
    }

    fn ignore(&self, what: String) {
        warn!("Ignored illegal command: {}", what);
        self.store.record_event(format!("ignored {}", what));
    }
}

impl Task for LogicTask {
    type TickError = Infallible;

    fn name(&self) -> &'static str {
        "logic"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn tick(&mut self) -> Result<(), Self::TickError> {
        // Consume the fault wake-up, the fault itself arrives as a command
        if self.events.check(SystemEvent::FaultRaised) {
            debug!("Woken by fault event");
        }

        for cmd in self.queue.drain() {
            self.apply(cmd);
        }

        Ok(())
    }
}
