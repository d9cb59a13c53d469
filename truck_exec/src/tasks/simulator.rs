//! # Mine simulator task
//!
//! Integrates the vehicle dynamics at 20 Hz from the actuator demands in the
//! shared state and publishes noisy raw sensor samples to the feed, closing
//! the control loop.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use comms_if::tm::TruckStatus;
use rand_distr::NormalError;
use util::module::Task;
use util::time::unix_timestamp_s;

use crate::params::TruckParams;
use crate::sim::{NoiseModel, SensorFeed, SensorSample, VehicleDynamics};
use crate::state::StateStore;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Ambient engine temperature with the truck at rest.
const AMBIENT_TEMP_C: f64 = 25.0;

/// Temperature rise per meter/second of speed.
const TEMP_SPEED_COEFF: f64 = 2.0;

/// Temperature rise at full speed demand.
const TEMP_DEMAND_COEFF: f64 = 5.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The mine simulator task.
pub struct SimulatorTask {
    store: Arc<StateStore>,
    feed: Arc<SensorFeed>,

    dynamics: VehicleDynamics,
    noise: Option<NoiseModel>,
    max_velocity_ms: f64,

    period: Duration,
    dt: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimulatorTask {
    pub fn new(
        store: Arc<StateStore>,
        feed: Arc<SensorFeed>,
        params: &TruckParams,
    ) -> Result<Self, NormalError> {
        let noise = if params.noise.enabled {
            Some(NoiseModel::new(&params.noise)?)
        } else {
            None
        };

        let period = params.periods.sim();

        Ok(Self {
            store,
            feed,
            dynamics: VehicleDynamics::new(params.dynamics.clone()),
            noise,
            max_velocity_ms: params.dynamics.max_velocity_ms,
            dt: period.as_secs_f64(),
            period,
        })
    }
}

impl Task for SimulatorTask {
    type TickError = Infallible;

    fn name(&self) -> &'static str {
        "simulator"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn tick(&mut self) -> Result<(), Self::TickError> {
        let snap = self.store.snapshot();

        // In emergency the executed demands are forced to zero regardless of
        // what is in the state; the navigation task already zeros its
        // output, this covers the window before its next cycle.
        let (velocity_cmd, angular_cmd) = match snap.status {
            TruckStatus::Emergency => (0.0, 0.0),
            _ => (snap.velocity_cmd, snap.angular_cmd),
        };

        self.dynamics.step(velocity_cmd, angular_cmd, self.dt);

        // Engine temperature rises with speed and demand
        let temperature = AMBIENT_TEMP_C
            + TEMP_SPEED_COEFF * self.dynamics.velocity.abs()
            + TEMP_DEMAND_COEFF * (velocity_cmd.abs() / self.max_velocity_ms).min(1.0);

        let clean = SensorSample {
            x: self.dynamics.x,
            y: self.dynamics.y,
            theta: self.dynamics.theta,
            velocity: self.dynamics.velocity,
            temperature,
            timestamp: unix_timestamp_s(),
        };

        let sample = match self.noise.as_mut() {
            Some(noise) => noise.apply(clean),
            None => clean,
        };

        self.feed.publish(sample);

        Ok(())
    }
}
