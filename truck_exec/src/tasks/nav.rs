//! # Navigation controller task
//!
//! Runs the dual PID loop at 20 Hz: the linear velocity controller and the
//! angular rate controller, both reading the filtered measurements and the
//! commanded setpoints from the shared state and writing the actuator
//! demands back.
//!
//! When the status is not RUNNING the demands are zero; the controllers are
//! still ticked with a zero setpoint to keep their state fresh, with the
//! integral frozen in EMERGENCY. A mode-change event triggers a bumpless
//! re-initialisation from the current demands.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use comms_if::tm::TruckStatus;
use util::module::Task;

use crate::ctrl::PidController;
use crate::params::TruckParams;
use crate::state::StateStore;
use crate::sync::{EventManager, SystemEvent};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The navigation controller task.
pub struct NavTask {
    store: Arc<StateStore>,
    events: Arc<EventManager>,

    velocity_ctrl: PidController,
    angular_ctrl: PidController,

    period: Duration,
    dt: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl NavTask {
    pub fn new(store: Arc<StateStore>, events: Arc<EventManager>, params: &TruckParams) -> Self {
        let period = params.periods.nav();

        Self {
            store,
            events,
            velocity_ctrl: PidController::new(&params.pid_linear),
            angular_ctrl: PidController::new(&params.pid_angular),
            dt: period.as_secs_f64(),
            period,
        }
    }
}

impl Task for NavTask {
    type TickError = Infallible;

    fn name(&self) -> &'static str {
        "nav"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn tick(&mut self) -> Result<(), Self::TickError> {
        let snap = self.store.snapshot();

        // On a mode change pick up from the demands currently applied, so
        // the first automatic output matches the last manual one.
        if self.events.check(SystemEvent::ModeChanged) {
            self.velocity_ctrl.reinit(
                snap.velocity_cmd,
                snap.setpoint_velocity,
                snap.velocity,
                self.dt,
            );
            self.angular_ctrl.reinit(
                snap.angular_cmd,
                snap.setpoint_angular,
                snap.angular_velocity,
                self.dt,
            );
            info!("Controllers re-initialised (bumpless transfer)");
        }

        let (velocity_cmd, angular_cmd) = match snap.status {
            TruckStatus::Running => (
                self.velocity_ctrl
                    .update(snap.setpoint_velocity, snap.velocity, self.dt),
                self.angular_ctrl
                    .update(snap.setpoint_angular, snap.angular_velocity, self.dt),
            ),
            TruckStatus::Stopped => {
                self.velocity_ctrl.update(0.0, snap.velocity, self.dt);
                self.angular_ctrl.update(0.0, snap.angular_velocity, self.dt);
                (0.0, 0.0)
            }
            TruckStatus::Emergency => {
                // Tick with the integral frozen so nothing winds up against
                // the zeroed actuation
                self.velocity_ctrl.update_held(0.0, snap.velocity, self.dt);
                self.angular_ctrl
                    .update_held(0.0, snap.angular_velocity, self.dt);
                (0.0, 0.0)
            }
        };

        self.store.update(|s| {
            s.velocity_cmd = velocity_cmd;
            s.angular_cmd = angular_cmd;
        });

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn harness() -> (Arc<StateStore>, Arc<EventManager>, NavTask) {
        let store = Arc::new(StateStore::new(1));
        let events = Arc::new(EventManager::new());
        let task = NavTask::new(store.clone(), events.clone(), &TruckParams::default());
        (store, events, task)
    }

    #[test]
    fn test_emergency_zeroes_demands() {
        let (store, _, mut nav) = harness();

        store.update(|s| {
            s.status = TruckStatus::Running;
            s.setpoint_velocity = 5.0;
        });
        nav.tick().unwrap();
        assert!(store.snapshot().velocity_cmd > 0.0);

        store.update(|s| s.status = TruckStatus::Emergency);
        nav.tick().unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.velocity_cmd, 0.0);
        assert_eq!(snap.angular_cmd, 0.0);
    }

    #[test]
    fn test_stopped_zeroes_demands() {
        let (store, _, mut nav) = harness();

        store.update(|s| s.setpoint_velocity = 5.0);
        nav.tick().unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.velocity_cmd, 0.0);
        assert_eq!(snap.angular_cmd, 0.0);
    }

    #[test]
    fn test_running_tracks_setpoint() {
        let (store, _, mut nav) = harness();

        store.update(|s| {
            s.status = TruckStatus::Running;
            s.setpoint_velocity = 5.0;
            s.velocity = 1.0;
        });
        nav.tick().unwrap();

        // Positive error, positive demand
        assert!(store.snapshot().velocity_cmd > 0.0);
    }

    #[test]
    fn test_bumpless_transfer_on_mode_change() {
        let (store, events, mut nav) = harness();

        // Steady manual operation at 3 m/s
        store.update(|s| {
            s.status = TruckStatus::Running;
            s.setpoint_velocity = 3.0;
            s.velocity = 3.0;
            s.velocity_cmd = 3.0;
        });

        events.signal(SystemEvent::ModeChanged);
        nav.tick().unwrap();

        let first = store.snapshot().velocity_cmd;
        assert!(
            (first - 3.0).abs() <= 1e-6,
            "first automatic demand stepped to {}",
            first
        );
    }
}
