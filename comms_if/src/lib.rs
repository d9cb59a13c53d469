//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software: truck
//! command definitions, telemetry packet definitions, broker topic names and
//! the monitored pub/sub socket.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Truck command (TC) definitions and JSON boundary parsing
pub mod tc;

/// Telemetry (TM) packet definitions
pub mod tm;

/// Network module
pub mod net;

// ------------------------------------------------------------------------------------------------
// TOPICS
// ------------------------------------------------------------------------------------------------

/// Broker topic names for a given truck.
pub mod topics {
    /// Topic on which the truck publishes full state packets.
    pub fn state(truck_id: u32) -> String {
        format!("mine/truck/{}/state", truck_id)
    }

    /// Topic on which the truck publishes position packets.
    pub fn position(truck_id: u32) -> String {
        format!("mine/truck/{}/position", truck_id)
    }

    /// Topic on which the truck receives commands.
    pub fn command(truck_id: u32) -> String {
        format!("mine/truck/{}/command", truck_id)
    }

    /// Topic on which the truck receives routes.
    pub fn route(truck_id: u32) -> String {
        format!("mine/truck/{}/route", truck_id)
    }
}
