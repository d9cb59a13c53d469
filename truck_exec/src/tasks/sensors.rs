//! # Sensor processing task
//!
//! Samples the raw sensor feed at 10 Hz, smooths each channel with a
//! window-M moving average (wrap-aware for the heading), derives the angular
//! rate from consecutive filtered headings, writes the filtered measurements
//! into the shared state and pushes the sample into the ring buffer.
//!
//! Non-finite raw samples are discarded: the filters keep their prior
//! window and a glitch counter in the state is incremented.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use comms_if::tm::Position;
use util::maths::wrap_pi;
use util::module::Task;

use crate::ctrl::{HeadingAverage, MovingAverage};
use crate::params::TruckParams;
use crate::sim::SensorFeed;
use crate::state::StateStore;
use crate::sync::{FilteredSample, SampleBuffer};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The sensor processing task.
pub struct SensorTask {
    feed: Arc<SensorFeed>,
    store: Arc<StateStore>,
    buffer: Arc<SampleBuffer>,

    filter_x: MovingAverage,
    filter_y: MovingAverage,
    filter_theta: HeadingAverage,
    filter_velocity: MovingAverage,
    filter_temperature: MovingAverage,

    prev_theta: Option<f64>,

    period: Duration,
    dt: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SensorTask {
    pub fn new(
        feed: Arc<SensorFeed>,
        store: Arc<StateStore>,
        buffer: Arc<SampleBuffer>,
        params: &TruckParams,
    ) -> Self {
        let window = params.filter.window;
        let period = params.periods.sensor();

        Self {
            feed,
            store,
            buffer,
            filter_x: MovingAverage::new(window),
            filter_y: MovingAverage::new(window),
            filter_theta: HeadingAverage::new(window),
            filter_velocity: MovingAverage::new(window),
            filter_temperature: MovingAverage::new(window),
            prev_theta: None,
            dt: period.as_secs_f64(),
            period,
        }
    }
}

impl Task for SensorTask {
    type TickError = Infallible;

    fn name(&self) -> &'static str {
        "sensors"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn tick(&mut self) -> Result<(), Self::TickError> {
        // Nothing to do until the simulator has produced a sample
        let raw = match self.feed.latest() {
            Some(raw) => raw,
            None => return Ok(()),
        };

        // Transient glitch: discard, keep the prior filter window
        let finite = raw.x.is_finite()
            && raw.y.is_finite()
            && raw.theta.is_finite()
            && raw.velocity.is_finite()
            && raw.temperature.is_finite();
        if !finite {
            debug!("Discarding non-finite sensor sample");
            self.store.update(|s| s.sensor_glitches += 1);
            return Ok(());
        }

        let x = self.filter_x.push(raw.x);
        let y = self.filter_y.push(raw.y);
        let theta = self.filter_theta.push(raw.theta);
        let velocity = self.filter_velocity.push(raw.velocity);
        let temperature = self.filter_temperature.push(raw.temperature);

        let angular_velocity = match self.prev_theta {
            Some(prev) => wrap_pi(theta - prev) / self.dt,
            None => 0.0,
        };
        self.prev_theta = Some(theta);

        self.store.update(|s| {
            s.position = Position { x, y, theta };
            s.velocity = velocity;
            s.angular_velocity = angular_velocity;
            s.temperature = temperature;
        });

        self.buffer.push(FilteredSample {
            x,
            y,
            theta,
            velocity,
            temperature,
            timestamp: raw.timestamp,
        });

        Ok(())
    }
}
