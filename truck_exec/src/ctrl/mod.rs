//! Closed-loop control building blocks

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod filter;
pub mod pid;

// ---------------------------------------------------------------------------
// RE-EXPORTS
// ---------------------------------------------------------------------------

pub use filter::{HeadingAverage, MovingAverage};
pub use pid::PidController;
