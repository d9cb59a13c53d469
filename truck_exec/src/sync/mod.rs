//! Synchronisation primitives shared between the tasks

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod cmd_queue;
pub mod events;
pub mod ring_buffer;

// ---------------------------------------------------------------------------
// RE-EXPORTS
// ---------------------------------------------------------------------------

pub use cmd_queue::{CommandQueue, PushOutcome};
pub use events::{EventManager, SystemEvent};
pub use ring_buffer::{FilteredSample, SampleBuffer};
