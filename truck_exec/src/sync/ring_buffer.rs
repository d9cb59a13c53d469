//! Thread-safe ring buffer of filtered sensor samples
//!
//! Single producer (the sensor task), any number of readers. When full the
//! oldest sample is overwritten.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::VecDeque;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One filtered sample, the output of the sensor processing task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredSample {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
    pub velocity: f64,
    pub temperature: f64,

    /// Unix time of the sample, seconds.
    pub timestamp: f64,
}

/// Fixed-capacity ring of filtered samples.
pub struct SampleBuffer {
    inner: Mutex<VecDeque<FilteredSample>>,
    capacity: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SampleBuffer {
    /// Create a buffer holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Push a sample, overwriting the oldest when full.
    pub fn push(&self, sample: FilteredSample) {
        let mut buf = self.inner.lock().expect("SampleBuffer mutex poisoned");

        if buf.len() >= self.capacity {
            buf.pop_front();
        }
        buf.push_back(sample);
    }

    /// The most recent sample, or `None` if the buffer is empty.
    pub fn latest(&self) -> Option<FilteredSample> {
        self.inner
            .lock()
            .expect("SampleBuffer mutex poisoned")
            .back()
            .copied()
    }

    /// Copies of up to the last `n` samples, oldest first.
    pub fn snapshot_last(&self, n: usize) -> Vec<FilteredSample> {
        let buf = self.inner.lock().expect("SampleBuffer mutex poisoned");
        let skip = buf.len().saturating_sub(n);

        buf.iter().skip(skip).copied().collect()
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("SampleBuffer mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample(v: f64) -> FilteredSample {
        FilteredSample {
            x: v,
            y: 0.0,
            theta: 0.0,
            velocity: 0.0,
            temperature: 0.0,
            timestamp: v,
        }
    }

    #[test]
    fn test_overwrites_oldest_when_full() {
        let buffer = SampleBuffer::new(3);

        for i in 0..5 {
            buffer.push(sample(i as f64));
        }

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.latest().unwrap().x, 4.0);

        let last = buffer.snapshot_last(10);
        assert_eq!(last.iter().map(|s| s.x).collect::<Vec<_>>(), [2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_snapshot_last_bounds() {
        let buffer = SampleBuffer::new(10);
        assert!(buffer.latest().is_none());
        assert!(buffer.snapshot_last(3).is_empty());

        buffer.push(sample(1.0));
        buffer.push(sample(2.0));

        let last = buffer.snapshot_last(1);
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].x, 2.0);
    }
}
