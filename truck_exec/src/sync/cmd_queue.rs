//! Bounded command queue
//!
//! Producers (the bus adapter, the fault monitor) never block: when the
//! queue is saturated the oldest command is dropped and reported so the
//! caller can log it. The consumer (command logic) drains without blocking
//! once per cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::warn;

use comms_if::tc::TruckCmd;

use crate::state::StateStore;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Result of a non-blocking push.
#[derive(Debug, PartialEq)]
pub enum PushOutcome {
    /// The command was queued.
    Queued,

    /// The queue was saturated; the returned command was dropped to make
    /// room.
    DroppedOldest(TruckCmd),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Bounded multi-producer command queue.
#[derive(Clone)]
pub struct CommandQueue {
    tx: Sender<TruckCmd>,
    rx: Receiver<TruckCmd>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx }
    }

    /// Push a command without blocking.
    ///
    /// On saturation the oldest queued command is discarded to make room for
    /// the new one, and returned in the outcome.
    pub fn push(&self, cmd: TruckCmd) -> PushOutcome {
        match self.tx.try_send(cmd) {
            Ok(()) => PushOutcome::Queued,
            Err(TrySendError::Full(cmd)) => {
                let dropped = self.rx.try_recv().ok();

                // A consumer may have drained concurrently, so this retry can
                // still fail; dropping the new command instead is acceptable
                // under sustained saturation.
                let _ = self.tx.try_send(cmd);

                match dropped {
                    Some(old) => PushOutcome::DroppedOldest(old),
                    None => PushOutcome::Queued,
                }
            }
            // We hold a receiver ourselves, so the channel cannot disconnect
            Err(TrySendError::Disconnected(_)) => unreachable!("command queue disconnected"),
        }
    }

    /// Drain all currently queued commands, oldest first.
    pub fn drain(&self) -> Vec<TruckCmd> {
        let mut cmds = Vec::new();
        while let Ok(cmd) = self.rx.try_recv() {
            cmds.push(cmd);
        }
        cmds
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Push a command, logging a dropped command and recording the overflow in
/// the shared state.
///
/// This is the producer entry point used by the bus adapter and the fault
/// monitor.
pub fn submit(queue: &CommandQueue, store: &StateStore, cmd: TruckCmd) {
    if let PushOutcome::DroppedOldest(old) = queue.push(cmd) {
        warn!("Command queue saturated, dropped oldest command: {:?}", old);
        store.record_event("command queue overflow");
    }
}
