//! Parameters for the truck executable
//!
//! All tunables live in one `truck.toml` file split into sections, one
//! section per concern. Every field has a default, so a missing file or a
//! partial file is usable.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Aggregate parameters for the truck executable.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TruckParams {
    pub periods: PeriodParams,
    pub filter: FilterParams,
    pub pid_linear: PidParams,
    pub pid_angular: PidParams,
    pub dynamics: DynamicsParams,
    pub noise: NoiseParams,
    pub faults: FaultParams,
    pub route: RouteParams,
    pub queues: QueueParams,
    pub telemetry: TelemetryParams,
}

/// Task periods in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PeriodParams {
    pub sim_ms: u64,
    pub sensor_ms: u64,
    pub logic_ms: u64,
    pub nav_ms: u64,
    pub route_ms: u64,
    pub fault_ms: u64,
    pub log_ms: u64,
    pub bus_ms: u64,
}

/// Moving average filter parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    /// Window length M of the per-channel moving average.
    pub window: usize,
}

/// Gains and output saturation of one PID controller.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PidParams {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,

    /// Symmetric output limit, output is clamped to +/- this value.
    pub saturation: f64,
}

/// Physical parameters of the simulated vehicle.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DynamicsParams {
    /// Maximum linear speed in meters/second.
    pub max_velocity_ms: f64,

    /// Maximum angular rate in radians/second.
    pub max_angular_rads: f64,

    /// First-order time constant of the linear velocity response, seconds.
    pub tau_velocity_s: f64,

    /// First-order time constant of the angular velocity response, seconds.
    pub tau_angular_s: f64,

    /// Initial pose of the truck in the mine frame.
    pub initial_x_m: f64,
    pub initial_y_m: f64,
    pub initial_theta_rad: f64,
}

/// Sensor noise standard deviations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    pub enabled: bool,
    pub sigma_position_m: f64,
    pub sigma_theta_rad: f64,
    pub sigma_velocity_ms: f64,
    pub sigma_temperature_c: f64,

    /// Seed for the per-task RNGs. `None` seeds from entropy; tests set this
    /// for reproducible runs.
    pub seed: Option<u64>,
}

/// Fault monitoring parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FaultParams {
    /// Temperature above which a warning event is recorded, Celsius.
    pub temp_warn_c: f64,

    /// Temperature above which an emergency is raised, Celsius.
    pub temp_crit_c: f64,

    /// Per-tick Bernoulli probability of a stochastic fault.
    pub probability: f64,

    /// Disable to run without stochastic fault injection.
    pub injection_enabled: bool,
}

/// Route planner parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouteParams {
    /// Distance below which a waypoint counts as reached, meters.
    pub accept_radius_m: f64,

    /// Cruise speed requested when aligned with the target, meters/second.
    pub cruise_velocity_ms: f64,

    /// Gain from heading error to the angular rate setpoint.
    pub heading_gain: f64,
}

/// Queue capacities.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueParams {
    /// Bound of the inbound command queue.
    pub commands: usize,

    /// Capacity of the filtered-sample ring buffer.
    pub samples: usize,
}

/// Telemetry sink parameters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TelemetryParams {
    /// Directory for the `truck_{id}.csv` file. Defaults to the session's
    /// data directory when unset.
    pub dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TruckParams {
    fn default() -> Self {
        Self {
            periods: PeriodParams::default(),
            filter: FilterParams::default(),
            pid_linear: PidParams::default(),
            pid_angular: PidParams::angular_default(),
            dynamics: DynamicsParams::default(),
            noise: NoiseParams::default(),
            faults: FaultParams::default(),
            route: RouteParams::default(),
            queues: QueueParams::default(),
            telemetry: TelemetryParams::default(),
        }
    }
}

impl PeriodParams {
    pub fn sim(&self) -> Duration {
        Duration::from_millis(self.sim_ms)
    }

    pub fn sensor(&self) -> Duration {
        Duration::from_millis(self.sensor_ms)
    }

    pub fn logic(&self) -> Duration {
        Duration::from_millis(self.logic_ms)
    }

    pub fn nav(&self) -> Duration {
        Duration::from_millis(self.nav_ms)
    }

    pub fn route(&self) -> Duration {
        Duration::from_millis(self.route_ms)
    }

    pub fn fault(&self) -> Duration {
        Duration::from_millis(self.fault_ms)
    }

    pub fn log(&self) -> Duration {
        Duration::from_millis(self.log_ms)
    }

    pub fn bus(&self) -> Duration {
        Duration::from_millis(self.bus_ms)
    }
}

impl Default for PeriodParams {
    fn default() -> Self {
        Self {
            sim_ms: 50,
            sensor_ms: 100,
            logic_ms: 100,
            nav_ms: 50,
            route_ms: 500,
            fault_ms: 500,
            log_ms: 1000,
            bus_ms: 100,
        }
    }
}

impl Default for FilterParams {
    fn default() -> Self {
        Self { window: 5 }
    }
}

impl Default for PidParams {
    fn default() -> Self {
        // Linear velocity controller defaults
        Self {
            kp: 0.5,
            ki: 0.1,
            kd: 0.05,
            saturation: 10.0,
        }
    }
}

impl PidParams {
    /// Defaults of the angular rate controller.
    pub fn angular_default() -> Self {
        Self {
            kp: 1.0,
            ki: 0.05,
            kd: 0.2,
            saturation: 1.0,
        }
    }
}

impl Default for DynamicsParams {
    fn default() -> Self {
        Self {
            max_velocity_ms: 10.0,
            max_angular_rads: 1.0,
            tau_velocity_s: 0.5,
            tau_angular_s: 0.3,
            initial_x_m: 0.0,
            initial_y_m: 0.0,
            initial_theta_rad: 0.0,
        }
    }
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            enabled: true,
            sigma_position_m: 0.1,
            sigma_theta_rad: 0.01,
            sigma_velocity_ms: 0.05,
            sigma_temperature_c: 0.2,
            seed: None,
        }
    }
}

impl Default for FaultParams {
    fn default() -> Self {
        Self {
            temp_warn_c: 95.0,
            temp_crit_c: 120.0,
            probability: 1e-3,
            injection_enabled: true,
        }
    }
}

impl Default for RouteParams {
    fn default() -> Self {
        Self {
            accept_radius_m: 2.0,
            cruise_velocity_ms: 5.0,
            heading_gain: 1.0,
        }
    }
}

impl Default for QueueParams {
    fn default() -> Self {
        Self {
            commands: 32,
            samples: 100,
        }
    }
}
