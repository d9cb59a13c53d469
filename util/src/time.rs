//! General time utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A periodic timer over the monotonic clock.
///
/// Wake instants are anchored to the creation instant, not to `now + period`,
/// so an overrun on one tick does not push every following tick later.
pub struct Ticker {
    period: Duration,
    next: Instant,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Ticker {
    /// Create a ticker whose first boundary is one period from now.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + period,
        }
    }

    /// Sleep until the next period boundary.
    ///
    /// If the boundary has already passed the sleep is skipped, missed
    /// boundaries are dropped, and the overrun duration is returned.
    pub fn wait(&mut self) -> Option<Duration> {
        let now = Instant::now();

        if now < self.next {
            std::thread::sleep(self.next - now);
            self.next += self.period;
            None
        } else {
            let overrun = now - self.next;

            // Skip to the first boundary still in the future
            while self.next <= now {
                self.next += self.period;
            }

            Some(overrun)
        }
    }

    /// The configured period.
    pub fn period(&self) -> Duration {
        self.period
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a chrono duration into seconds, or `None` on overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Current wall-clock time as unix seconds.
pub fn unix_timestamp_s() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(f64::NAN)
}
