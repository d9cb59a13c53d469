//! # Mine simulation
//!
//! The simulated side of the control loop: vehicle dynamics, the sensor
//! noise model, and the latest-sample feed the sensor processing task reads
//! from. The simulator stands in for the physical truck, so everything here
//! is on the far side of the sensor/actuator boundary.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod dynamics;

pub use dynamics::VehicleDynamics;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal, NormalError};
use std::sync::Mutex;

use crate::params::NoiseParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One raw sensor sample produced by the simulator.
#[derive(Debug, Clone, Copy)]
pub struct SensorSample {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
    pub velocity: f64,
    pub temperature: f64,

    /// Unix time of the sample, seconds.
    pub timestamp: f64,
}

/// Latest-sample cell between the simulator and the sensor task.
///
/// The simulator overwrites, the sensor task reads; stale reads are fine
/// because the simulator runs faster than the sensor task.
pub struct SensorFeed {
    latest: Mutex<Option<SensorSample>>,
}

/// Gaussian noise applied to the exposed sensor readings.
pub struct NoiseModel {
    rng: StdRng,
    position: Normal<f64>,
    theta: Normal<f64>,
    velocity: Normal<f64>,
    temperature: Normal<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SensorFeed {
    pub fn new() -> Self {
        Self {
            latest: Mutex::new(None),
        }
    }

    /// Publish a new raw sample, replacing the previous one.
    pub fn publish(&self, sample: SensorSample) {
        *self.latest.lock().expect("SensorFeed mutex poisoned") = Some(sample);
    }

    /// The most recent raw sample, or `None` before the first publish.
    pub fn latest(&self) -> Option<SensorSample> {
        *self.latest.lock().expect("SensorFeed mutex poisoned")
    }
}

impl Default for SensorFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl NoiseModel {
    /// Build the noise model from its parameters.
    ///
    /// The RNG is seeded from `params.seed` when set, making runs
    /// reproducible for tests.
    pub fn new(params: &NoiseParams) -> Result<Self, NormalError> {
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            rng,
            position: Normal::new(0.0, params.sigma_position_m)?,
            theta: Normal::new(0.0, params.sigma_theta_rad)?,
            velocity: Normal::new(0.0, params.sigma_velocity_ms)?,
            temperature: Normal::new(0.0, params.sigma_temperature_c)?,
        })
    }

    /// Add zero-mean Gaussian noise to each channel of a sample.
    pub fn apply(&mut self, clean: SensorSample) -> SensorSample {
        SensorSample {
            x: clean.x + self.position.sample(&mut self.rng),
            y: clean.y + self.position.sample(&mut self.rng),
            theta: clean.theta + self.theta.sample(&mut self.rng),
            velocity: clean.velocity + self.velocity.sample(&mut self.rng),
            temperature: clean.temperature + self.temperature.sample(&mut self.rng),
            timestamp: clean.timestamp,
        }
    }
}
