//! Event notification hub
//!
//! A small fixed set of named events backed by a single condition variable.
//! The fault monitor signals [`SystemEvent::FaultRaised`] to wake command
//! logic, command logic signals [`SystemEvent::ModeChanged`] so the
//! navigation task re-initialises its controllers, and shutdown is a sticky
//! broadcast that wakes every waiter.
//!
//! All waits loop on a predicate, so spurious wakeups are harmless, and all
//! waits are bounded so shutdown is observed within one timeout.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The events tasks notify each other about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEvent {
    /// A new fault was detected by the fault monitor.
    FaultRaised,

    /// The operating mode changed to automatic; the navigation controllers
    /// must perform a bumpless re-initialisation.
    ModeChanged,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

const NUM_EVENTS: usize = 2;

struct Inner {
    /// Pending signal count per event.
    pending: [u32; NUM_EVENTS],

    /// Sticky shutdown broadcast.
    shutdown: bool,
}

/// Condition-variable notification hub keyed by [`SystemEvent`].
pub struct EventManager {
    inner: Mutex<Inner>,
    cond: Condvar,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SystemEvent {
    fn index(self) -> usize {
        match self {
            SystemEvent::FaultRaised => 0,
            SystemEvent::ModeChanged => 1,
        }
    }
}

impl EventManager {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                pending: [0; NUM_EVENTS],
                shutdown: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Signal one occurrence of an event, waking all waiters.
    pub fn signal(&self, event: SystemEvent) {
        let mut inner = self.inner.lock().expect("EventManager mutex poisoned");
        inner.pending[event.index()] += 1;
        self.cond.notify_all();
    }

    /// Consume one pending occurrence of the event, without blocking.
    pub fn check(&self, event: SystemEvent) -> bool {
        let mut inner = self.inner.lock().expect("EventManager mutex poisoned");

        if inner.pending[event.index()] > 0 {
            inner.pending[event.index()] -= 1;
            true
        } else {
            false
        }
    }

    /// Wait for an occurrence of the event, up to `timeout`.
    ///
    /// Returns `true` if the event arrived, `false` on timeout or shutdown.
    pub fn wait(&self, event: SystemEvent, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock().expect("EventManager mutex poisoned");

        loop {
            if inner.pending[event.index()] > 0 {
                inner.pending[event.index()] -= 1;
                return true;
            }
            if inner.shutdown {
                return false;
            }

            let now = Instant::now();
            if now >= deadline {
                return false;
            }

            let (guard, _) = self
                .cond
                .wait_timeout(inner, deadline - now)
                .expect("EventManager mutex poisoned");
            inner = guard;
        }
    }

    /// Broadcast shutdown to every waiter. Sticky.
    pub fn request_shutdown(&self) {
        let mut inner = self.inner.lock().expect("EventManager mutex poisoned");
        inner.shutdown = true;
        self.cond.notify_all();
    }

    pub fn shutdown_requested(&self) -> bool {
        self.inner
            .lock()
            .expect("EventManager mutex poisoned")
            .shutdown
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_signal_then_check() {
        let events = EventManager::new();

        assert!(!events.check(SystemEvent::ModeChanged));

        events.signal(SystemEvent::ModeChanged);
        events.signal(SystemEvent::ModeChanged);

        assert!(events.check(SystemEvent::ModeChanged));
        assert!(events.check(SystemEvent::ModeChanged));
        assert!(!events.check(SystemEvent::ModeChanged));

        // Signals do not bleed between events
        events.signal(SystemEvent::FaultRaised);
        assert!(!events.check(SystemEvent::ModeChanged));
        assert!(events.check(SystemEvent::FaultRaised));
    }

    #[test]
    fn test_wait_times_out() {
        let events = EventManager::new();
        assert!(!events.wait(SystemEvent::FaultRaised, Duration::from_millis(20)));
    }

    #[test]
    fn test_wait_wakes_on_signal() {
        let events = Arc::new(EventManager::new());

        let waiter = {
            let events = events.clone();
            thread::spawn(move || events.wait(SystemEvent::FaultRaised, Duration::from_secs(5)))
        };

        thread::sleep(Duration::from_millis(10));
        events.signal(SystemEvent::FaultRaised);

        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_shutdown_wakes_waiters() {
        let events = Arc::new(EventManager::new());

        let waiter = {
            let events = events.clone();
            thread::spawn(move || events.wait(SystemEvent::ModeChanged, Duration::from_secs(5)))
        };

        thread::sleep(Duration::from_millis(10));
        events.request_shutdown();

        // Woken with no event delivered
        assert!(!waiter.join().unwrap());
        assert!(events.shutdown_requested());
    }
}
