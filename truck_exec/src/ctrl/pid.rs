//! # PID controllers
//!
//! Discrete-time PID with output saturation, conditional-integration
//! anti-windup and bumpless transfer.
//!
//! Anti-windup: the integral update is only committed when the raw output is
//! not saturating further in the direction of the error, so the integral
//! cannot grow while the output is pinned at a limit.
//!
//! Bumpless transfer: [`PidController::reinit`] recomputes the integral term
//! so that the next output equals a given value for the current error,
//! producing no step on a mode switch.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use crate::params::PidParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Derivative gain
    k_d: f64,

    /// Lower output limit
    out_min: f64,

    /// Upper output limit
    out_max: f64,

    /// The integral accumulation
    integral: f64,

    /// Previous error, `None` before the first update
    prev_error: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller from its parameters.
    ///
    /// The output is clamped symmetrically to `+/- params.saturation`.
    pub fn new(params: &PidParams) -> Self {
        Self {
            k_p: params.kp,
            k_i: params.ki,
            k_d: params.kd,
            out_min: -params.saturation,
            out_max: params.saturation,
            integral: 0.0,
            prev_error: None,
        }
    }

    /// Compute the controller output for one tick of length `dt`.
    pub fn update(&mut self, setpoint: f64, measurement: f64, dt: f64) -> f64 {
        self.step(setpoint, measurement, dt, true)
    }

    /// Compute the output for one tick without accumulating the integral.
    ///
    /// Used while the truck is in emergency: the controller state stays
    /// fresh but cannot wind up against the zeroed actuation.
    pub fn update_held(&mut self, setpoint: f64, measurement: f64, dt: f64) -> f64 {
        self.step(setpoint, measurement, dt, false)
    }

    /// Re-initialise for bumpless transfer.
    ///
    /// After this call the next `update` with an unchanged error returns
    /// exactly `output` (clamped to the output limits).
    pub fn reinit(&mut self, output: f64, setpoint: f64, measurement: f64, dt: f64) {
        let error = setpoint - measurement;
        let output = output.clamp(self.out_min, self.out_max);

        self.prev_error = Some(error);
        self.integral = if self.k_i != 0.0 {
            // The next update adds error*dt before using the integral, so
            // subtract it here to land exactly on the requested output.
            (output - self.k_p * error) / self.k_i - error * dt
        } else {
            0.0
        };
    }

    fn step(&mut self, setpoint: f64, measurement: f64, dt: f64, integrate: bool) -> f64 {
        let error = setpoint - measurement;

        let candidate_integral = self.integral + error * dt;

        let derivative = match self.prev_error {
            Some(prev) => (error - prev) / dt,
            None => 0.0,
        };

        let raw = self.k_p * error + self.k_i * candidate_integral + self.k_d * derivative;
        let output = raw.clamp(self.out_min, self.out_max);

        // Conditional integration: don't commit the integral while the raw
        // output saturates further in the error's direction.
        let saturating =
            (raw > self.out_max && error > 0.0) || (raw < self.out_min && error < 0.0);
        if integrate && !saturating {
            self.integral = candidate_integral;
        }

        self.prev_error = Some(error);

        output
    }

    /// The current integral accumulation.
    pub fn integral(&self) -> f64 {
        self.integral
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn linear() -> PidController {
        PidController::new(&PidParams {
            kp: 0.5,
            ki: 0.1,
            kd: 0.05,
            saturation: 10.0,
        })
    }

    #[test]
    fn test_output_is_clamped() {
        let mut pid = linear();

        for _ in 0..100 {
            let out = pid.update(1000.0, 0.0, 0.05);
            assert!((-10.0..=10.0).contains(&out));
        }
        assert_eq!(pid.update(1000.0, 0.0, 0.05), 10.0);
        assert_eq!(pid.update(-1000.0, 0.0, 0.05), -10.0);
    }

    #[test]
    fn test_anti_windup_freezes_integral() {
        let mut pid = linear();

        // Drive deep into saturation
        pid.update(1000.0, 0.0, 0.05);
        let frozen = pid.integral();

        for _ in 0..50 {
            pid.update(1000.0, 0.0, 0.05);
            assert!(pid.integral().abs() <= frozen.abs() + 1e-12);
        }
    }

    #[test]
    fn test_integral_accumulates_when_unsaturated() {
        let mut pid = linear();

        pid.update(1.0, 0.0, 0.05);
        let first = pid.integral();
        pid.update(1.0, 0.0, 0.05);

        assert!(pid.integral() > first);
    }

    #[test]
    fn test_bumpless_reinit() {
        let mut pid = linear();

        // Some arbitrary history
        for _ in 0..20 {
            pid.update(5.0, 2.0, 0.05);
        }

        // Transfer: the controller must pick up at 3.0 m/s
        pid.reinit(3.0, 3.0, 2.9, 0.05);
        let first = pid.update(3.0, 2.9, 0.05);

        assert!((first - 3.0).abs() <= 1e-6, "first output was {}", first);
    }

    #[test]
    fn test_update_held_keeps_integral() {
        let mut pid = linear();

        pid.update(2.0, 0.0, 0.05);
        let integral = pid.integral();

        for _ in 0..10 {
            pid.update_held(0.0, 0.0, 0.05);
        }

        assert_eq!(pid.integral(), integral);
    }

    #[test]
    fn test_derivative_reacts_to_error_change() {
        let mut pid = PidController::new(&PidParams {
            kp: 0.0,
            ki: 0.0,
            kd: 1.0,
            saturation: 100.0,
        });

        // First tick has no previous error, derivative is zero
        assert_eq!(pid.update(1.0, 0.0, 0.1), 0.0);

        // Error stepped from 1.0 to 2.0 over dt=0.1 -> derivative 10
        assert!((pid.update(2.0, 0.0, 0.1) - 10.0).abs() < 1e-9);
    }
}
