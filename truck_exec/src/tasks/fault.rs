//! # Fault monitor task
//!
//! Watches the engine temperature and draws the stochastic electrical and
//! hydraulic faults at 2 Hz. A critical temperature or a new fault flag is
//! mapped to an EMERGENCY command on the queue, never to a crash, and the
//! command logic is woken through the event hub. Fault flags latch until an
//! explicit RESET clears them.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{error, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use comms_if::tc::TruckCmd;
use comms_if::tm::TruckStatus;
use util::module::Task;

use crate::params::{FaultParams, TruckParams};
use crate::state::StateStore;
use crate::sync::cmd_queue::submit;
use crate::sync::{CommandQueue, EventManager, SystemEvent};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The fault monitor task.
pub struct FaultTask {
    store: Arc<StateStore>,
    events: Arc<EventManager>,
    queue: CommandQueue,

    params: FaultParams,
    rng: StdRng,

    /// Warning already recorded for the current thermal excursion.
    temp_warned: bool,

    period: Duration,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FaultTask {
    pub fn new(
        store: Arc<StateStore>,
        events: Arc<EventManager>,
        queue: CommandQueue,
        params: &TruckParams,
    ) -> Self {
        let rng = match params.noise.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            store,
            events,
            queue,
            params: params.faults.clone(),
            rng,
            temp_warned: false,
            period: params.periods.fault(),
        }
    }

    /// Raise an emergency: inject the command and wake command logic.
    fn raise_emergency(&self) {
        submit(&self.queue, &self.store, TruckCmd::Emergency);
        self.events.signal(SystemEvent::FaultRaised);
    }

    fn check_thermal(&mut self) {
        let snap = self.store.snapshot();

        if snap.temperature >= self.params.temp_crit_c {
            if snap.status != TruckStatus::Emergency {
                error!(
                    "Critical engine temperature: {:.1} C (limit {:.1} C)",
                    snap.temperature, self.params.temp_crit_c
                );
                self.store
                    .record_event(format!("critical temperature ({:.1} C)", snap.temperature));
                self.raise_emergency();
            }
        } else if snap.temperature >= self.params.temp_warn_c {
            if !self.temp_warned {
                warn!("High engine temperature: {:.1} C", snap.temperature);
                self.store
                    .record_event(format!("high temperature ({:.1} C)", snap.temperature));
                self.temp_warned = true;
            }
        } else {
            self.temp_warned = false;
        }
    }

    fn check_stochastic(&mut self) {
        if !self.params.injection_enabled {
            return;
        }

        let snap = self.store.snapshot();

        let new_electrical = !snap.faults.electrical && self.rng.gen_bool(self.params.probability);
        let new_hydraulic = !snap.faults.hydraulic && self.rng.gen_bool(self.params.probability);

        if !(new_electrical || new_hydraulic) {
            return;
        }

        let description = if new_electrical && new_hydraulic {
            "electrical and hydraulic fault"
        } else if new_electrical {
            "electrical fault"
        } else {
            "hydraulic fault"
        };

        error!("Fault detected: {}", description);

        self.store.update(|s| {
            s.faults.electrical |= new_electrical;
            s.faults.hydraulic |= new_hydraulic;
            s.last_event = String::from(description);
        });

        self.raise_emergency();
    }
}

impl Task for FaultTask {
    type TickError = Infallible;

    fn name(&self) -> &'static str {
        "fault"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn tick(&mut self) -> Result<(), Self::TickError> {
        self.check_thermal();
        self.check_stochastic();
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn harness(
        params: TruckParams,
    ) -> (Arc<StateStore>, Arc<EventManager>, CommandQueue, FaultTask) {
        let store = Arc::new(StateStore::new(1));
        let events = Arc::new(EventManager::new());
        let queue = CommandQueue::new(8);
        let task = FaultTask::new(store.clone(), events.clone(), queue.clone(), &params);
        (store, events, queue, task)
    }

    #[test]
    fn test_critical_temperature_raises_emergency() {
        let mut params = TruckParams::default();
        params.faults.injection_enabled = false;
        let (store, events, queue, mut fault) = harness(params);

        store.update(|s| s.temperature = 121.0);
        fault.tick().unwrap();

        assert_eq!(queue.drain(), vec![TruckCmd::Emergency]);
        assert!(events.check(SystemEvent::FaultRaised));
        assert!(store.snapshot().last_event.contains("critical temperature"));
    }

    #[test]
    fn test_warning_temperature_records_event_only() {
        let mut params = TruckParams::default();
        params.faults.injection_enabled = false;
        let (store, events, queue, mut fault) = harness(params);

        store.update(|s| s.temperature = 96.0);
        fault.tick().unwrap();
        fault.tick().unwrap();

        assert!(queue.is_empty());
        assert!(!events.check(SystemEvent::FaultRaised));
        assert!(store.snapshot().last_event.contains("high temperature"));
    }

    #[test]
    fn test_no_repeated_injection_while_in_emergency() {
        let mut params = TruckParams::default();
        params.faults.injection_enabled = false;
        let (store, _, queue, mut fault) = harness(params);

        store.update(|s| {
            s.temperature = 130.0;
            s.status = TruckStatus::Emergency;
        });
        fault.tick().unwrap();

        assert!(queue.is_empty());
    }

    #[test]
    fn test_stochastic_fault_latches() {
        let mut params = TruckParams::default();
        // Certain fault on the first draw
        params.faults.probability = 1.0;
        params.noise.seed = Some(7);
        let (store, _, queue, mut fault) = harness(params);

        fault.tick().unwrap();

        let snap = store.snapshot();
        assert!(snap.faults.electrical && snap.faults.hydraulic);
        assert_eq!(queue.drain(), vec![TruckCmd::Emergency]);

        // Already latched: no further injection
        fault.tick().unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_injection_can_be_disabled() {
        let mut params = TruckParams::default();
        params.faults.probability = 1.0;
        params.faults.injection_enabled = false;
        let (store, _, queue, mut fault) = harness(params);

        fault.tick().unwrap();

        assert!(!store.snapshot().faults.electrical);
        assert!(queue.is_empty());
    }
}
