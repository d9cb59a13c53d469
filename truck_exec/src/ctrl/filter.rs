//! # Moving-average sensor filters
//!
//! Window-M smoothing for the raw sensor channels. Before M samples have
//! been seen the mean is taken over the samples available. Headings get
//! their own filter: a plain arithmetic mean is wrong near the +/-pi wrap,
//! so the sine and cosine components are averaged and recombined.
//!
//! The filters are stateful and not thread-safe; each is owned by the
//! sensor processing task.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::VecDeque;

use util::maths::mean_angle;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Moving average over the last M samples of one channel.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: usize,
    samples: VecDeque<f64>,
}

/// Moving average over the last M headings, wrap-aware.
#[derive(Debug, Clone)]
pub struct HeadingAverage {
    window: usize,
    samples: VecDeque<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        assert!(window > 0, "filter window must be at least 1");

        Self {
            window,
            samples: VecDeque::with_capacity(window),
        }
    }

    /// Push a raw value and return the current mean.
    pub fn push(&mut self, value: f64) -> f64 {
        if self.samples.len() >= self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(value);

        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// The current mean, or `None` before the first sample.
    pub fn value(&self) -> Option<f64> {
        if self.samples.is_empty() {
            None
        } else {
            Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
        }
    }
}

impl HeadingAverage {
    pub fn new(window: usize) -> Self {
        assert!(window > 0, "filter window must be at least 1");

        Self {
            window,
            samples: VecDeque::with_capacity(window),
        }
    }

    /// Push a raw heading and return the wrap-aware mean, in (-pi, pi].
    pub fn push(&mut self, theta: f64) -> f64 {
        if self.samples.len() >= self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(theta);

        let (front, back) = self.samples.as_slices();
        let mut all = Vec::with_capacity(self.samples.len());
        all.extend_from_slice(front);
        all.extend_from_slice(back);

        // Non-empty by construction
        mean_angle(&all).unwrap_or(theta)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_partial_window_mean() {
        let mut filter = MovingAverage::new(5);

        assert_eq!(filter.push(2.0), 2.0);
        assert_eq!(filter.push(4.0), 3.0);
        assert_eq!(filter.push(6.0), 4.0);
    }

    #[test]
    fn test_full_window_slides() {
        let mut filter = MovingAverage::new(3);

        filter.push(1.0);
        filter.push(2.0);
        filter.push(3.0);

        // Window is now [2, 3, 4]
        assert!((filter.push(4.0) - 3.0).abs() < 1e-12);
        assert_eq!(filter.value(), Some(3.0));
    }

    #[test]
    fn test_heading_average_near_wrap() {
        let mut filter = HeadingAverage::new(4);

        filter.push(PI - 0.05);
        let mean = filter.push(-PI + 0.05);

        // An arithmetic mean would give ~0; the true mean is at the wrap
        assert!((mean.abs() - PI).abs() < 1e-9, "mean was {}", mean);
    }

    #[test]
    fn test_heading_average_plain_region() {
        let mut filter = HeadingAverage::new(4);

        filter.push(0.1);
        let mean = filter.push(0.3);

        assert!((mean - 0.2).abs() < 1e-9);
    }
}
