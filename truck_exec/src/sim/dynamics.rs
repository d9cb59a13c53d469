//! # Vehicle dynamics
//!
//! Simplified kinematic model of the haul truck with first-order lag on both
//! the linear and angular velocity responses, so acceleration and braking
//! are smooth rather than instantaneous. Heading is kept in (-pi, pi].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use util::maths::wrap_pi;

use crate::params::DynamicsParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Dynamic state of the simulated vehicle.
#[derive(Debug, Clone)]
pub struct VehicleDynamics {
    params: DynamicsParams,

    /// X position, meters.
    pub x: f64,

    /// Y position, meters.
    pub y: f64,

    /// Heading, radians, in (-pi, pi].
    pub theta: f64,

    /// Linear speed, meters/second.
    pub velocity: f64,

    /// Angular rate, radians/second.
    pub angular_velocity: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehicleDynamics {
    pub fn new(params: DynamicsParams) -> Self {
        Self {
            x: params.initial_x_m,
            y: params.initial_y_m,
            theta: wrap_pi(params.initial_theta_rad),
            velocity: 0.0,
            angular_velocity: 0.0,
            params,
        }
    }

    /// Integrate one step of length `dt` under the given demands.
    ///
    /// Demands are clamped to the physical limits before the lag is applied.
    pub fn step(&mut self, velocity_cmd: f64, angular_cmd: f64, dt: f64) {
        let p = &self.params;

        let velocity_cmd = velocity_cmd.clamp(-p.max_velocity_ms, p.max_velocity_ms);
        let angular_cmd = angular_cmd.clamp(-p.max_angular_rads, p.max_angular_rads);

        // First-order lag: v <- v + (v_cmd - v) * dt / tau
        self.velocity += (velocity_cmd - self.velocity) * dt / p.tau_velocity_s;
        self.angular_velocity += (angular_cmd - self.angular_velocity) * dt / p.tau_angular_s;

        self.velocity = self.velocity.clamp(-p.max_velocity_ms, p.max_velocity_ms);
        self.angular_velocity = self
            .angular_velocity
            .clamp(-p.max_angular_rads, p.max_angular_rads);

        // Kinematic position integration
        self.x += self.velocity * self.theta.cos() * dt;
        self.y += self.velocity * self.theta.sin() * dt;
        self.theta = wrap_pi(self.theta + self.angular_velocity * dt);
    }

    /// Place the vehicle at a pose, zeroing its rates.
    pub fn set_pose(&mut self, x: f64, y: f64, theta: f64) {
        self.x = x;
        self.y = y;
        self.theta = wrap_pi(theta);
        self.velocity = 0.0;
        self.angular_velocity = 0.0;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    fn dynamics() -> VehicleDynamics {
        VehicleDynamics::new(DynamicsParams::default())
    }

    #[test]
    fn test_first_order_lag_converges() {
        let mut dyn_ = dynamics();

        // After many time constants the speed reaches the demand
        for _ in 0..400 {
            dyn_.step(5.0, 0.0, 0.05);
        }
        assert!((dyn_.velocity - 5.0).abs() < 0.01);

        // And it approaches smoothly: one step moves a fraction dt/tau
        let mut dyn_ = dynamics();
        dyn_.step(5.0, 0.0, 0.05);
        assert!((dyn_.velocity - 5.0 * 0.05 / 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_limits_enforced() {
        let mut dyn_ = dynamics();

        for _ in 0..1000 {
            dyn_.step(1e6, 1e6, 0.05);
            assert!(dyn_.velocity <= 10.0);
            assert!(dyn_.angular_velocity <= 1.0);
        }
    }

    #[test]
    fn test_straight_line_motion() {
        let mut dyn_ = dynamics();

        // 10 s at converging speed along theta = 0
        for _ in 0..200 {
            dyn_.step(2.0, 0.0, 0.05);
        }

        assert!(dyn_.x > 10.0);
        assert!(dyn_.y.abs() < 1e-9);
        assert!(dyn_.theta.abs() < 1e-9);
    }

    #[test]
    fn test_theta_stays_wrapped() {
        let mut dyn_ = dynamics();

        // Spin for a long time
        for _ in 0..2000 {
            dyn_.step(0.0, 1.0, 0.05);
            assert!(
                dyn_.theta > -PI && dyn_.theta <= PI,
                "theta out of range: {}",
                dyn_.theta
            );
        }
    }

    #[test]
    fn test_reverse_allowed() {
        let mut dyn_ = dynamics();

        for _ in 0..100 {
            dyn_.step(-3.0, 0.0, 0.05);
        }

        assert!(dyn_.velocity < -2.0);
        assert!(dyn_.x < 0.0);
    }
}
