//! # Route planner task
//!
//! Sequences the truck through its waypoint route at 2 Hz. Active only in
//! AUTOMATIC_REMOTE: computes the heading to the active waypoint, writes an
//! angular rate setpoint proportional to the heading error and a velocity
//! setpoint that backs off the cruise speed while misaligned. A waypoint
//! inside the acceptance radius advances the index; running off the end of
//! the route zeroes both setpoints and records completion.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;
use std::convert::Infallible;
use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;
use std::time::Duration;

use comms_if::tm::OpMode;
use util::maths::{norm2, wrap_pi};
use util::module::Task;

use crate::params::{RouteParams, TruckParams};
use crate::state::StateStore;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The route planner task.
pub struct RouteTask {
    store: Arc<StateStore>,
    params: RouteParams,

    /// Limit on the angular rate setpoint, taken from the angular
    /// controller's saturation.
    angular_limit: f64,

    period: Duration,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RouteTask {
    pub fn new(store: Arc<StateStore>, params: &TruckParams) -> Self {
        Self {
            store,
            params: params.route.clone(),
            angular_limit: params.pid_angular.saturation,
            period: params.periods.route(),
        }
    }
}

impl Task for RouteTask {
    type TickError = Infallible;

    fn name(&self) -> &'static str {
        "route"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn tick(&mut self) -> Result<(), Self::TickError> {
        let snap = self.store.snapshot();

        // The planner owns the setpoints only in automatic mode
        if snap.mode != OpMode::AutomaticRemote || snap.route.is_empty() {
            return Ok(());
        }

        if snap.route_complete() {
            return Ok(());
        }

        let mut index = snap.current_waypoint;

        let mut target = snap.route[index];
        let mut dx = target[0] - snap.position.x;
        let mut dy = target[1] - snap.position.y;

        if norm2(dx, dy) <= self.params.accept_radius_m {
            index += 1;

            if index >= snap.route.len() {
                info!("Route complete ({} waypoints)", snap.route.len());
                self.store.update(|s| {
                    s.current_waypoint = index;
                    s.setpoint_velocity = 0.0;
                    s.setpoint_angular = 0.0;
                    s.last_event = String::from("route complete");
                });
                return Ok(());
            }

            info!("Waypoint {}/{} reached", index, snap.route.len());
            target = snap.route[index];
            dx = target[0] - snap.position.x;
            dy = target[1] - snap.position.y;
        }

        let desired_heading = dy.atan2(dx);
        let heading_error = wrap_pi(desired_heading - snap.position.theta);

        let setpoint_angular = (self.params.heading_gain * heading_error)
            .clamp(-self.angular_limit, self.angular_limit);

        // Back off the cruise speed while misaligned, down to zero at 90deg
        let setpoint_velocity = if heading_error.abs() >= FRAC_PI_2 {
            0.0
        } else {
            self.params.cruise_velocity_ms * heading_error.cos().powi(2)
        };

        self.store.update(|s| {
            s.current_waypoint = index;
            s.setpoint_velocity = setpoint_velocity;
            s.setpoint_angular = setpoint_angular;
        });

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::tm::Position;
    use std::f64::consts::PI;

    fn harness() -> (Arc<StateStore>, RouteTask) {
        let store = Arc::new(StateStore::new(1));
        let task = RouteTask::new(store.clone(), &TruckParams::default());
        (store, task)
    }

    #[test]
    fn test_inactive_outside_automatic_mode() {
        let (store, mut route) = harness();

        store.update(|s| {
            s.route = vec![[10.0, 0.0]];
            s.setpoint_velocity = 1.25;
        });

        route.tick().unwrap();

        // Setpoints untouched in manual mode
        assert_eq!(store.snapshot().setpoint_velocity, 1.25);
    }

    #[test]
    fn test_drives_toward_waypoint() {
        let (store, mut route) = harness();

        store.update(|s| {
            s.mode = OpMode::AutomaticRemote;
            s.route = vec![[10.0, 0.0]];
        });

        route.tick().unwrap();

        let snap = store.snapshot();
        // Aligned with the target: full cruise, no turn
        assert!((snap.setpoint_velocity - 5.0).abs() < 1e-9);
        assert!(snap.setpoint_angular.abs() < 1e-9);
    }

    #[test]
    fn test_slows_when_misaligned() {
        let (store, mut route) = harness();

        store.update(|s| {
            s.mode = OpMode::AutomaticRemote;
            s.route = vec![[0.0, 10.0]]; // straight to the left, error pi/2
        });

        route.tick().unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.setpoint_velocity, 0.0);
        // Turn demand clamped at the angular saturation
        assert_eq!(snap.setpoint_angular, 1.0);
    }

    #[test]
    fn test_waypoint_accepted_within_radius() {
        let (store, mut route) = harness();

        store.update(|s| {
            s.mode = OpMode::AutomaticRemote;
            s.route = vec![[1.0, 0.0], [10.0, 0.0]];
            s.position = Position {
                x: 0.0,
                y: 0.0,
                theta: 0.0,
            };
        });

        // First waypoint is inside the 2 m acceptance radius
        route.tick().unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.current_waypoint, 1);
        assert!(snap.setpoint_velocity > 0.0);
    }

    #[test]
    fn test_route_completion_zeroes_setpoints() {
        let (store, mut route) = harness();

        store.update(|s| {
            s.mode = OpMode::AutomaticRemote;
            s.route = vec![[1.0, 0.0]];
            s.setpoint_velocity = 5.0;
        });

        route.tick().unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.current_waypoint, 1);
        assert_eq!(snap.setpoint_velocity, 0.0);
        assert_eq!(snap.setpoint_angular, 0.0);
        assert!(snap.last_event.contains("route complete"));

        // Further ticks leave the completed route alone
        route.tick().unwrap();
        assert_eq!(store.snapshot().current_waypoint, 1);
    }

    #[test]
    fn test_heading_error_wraps() {
        let (store, mut route) = harness();

        store.update(|s| {
            s.mode = OpMode::AutomaticRemote;
            s.route = vec![[-10.0, -0.1]];
            s.position = Position {
                x: 0.0,
                y: 0.0,
                theta: PI - 0.05,
            };
        });

        route.tick().unwrap();

        // Target bearing ~ -pi; the short way round from theta ~ pi is a
        // small negative error, not a full turn
        let snap = store.snapshot();
        assert!(snap.setpoint_angular.abs() < 0.2);
    }
}
