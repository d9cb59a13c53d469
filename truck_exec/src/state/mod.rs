//! # Shared vehicle state store
//!
//! A single [`VehicleState`] record shared by every task, guarded by one
//! mutex. Critical sections are short and never perform I/O; tasks take a
//! cloned snapshot for anything longer than a field update.
//!
//! Writer discipline (not enforced by the types, but followed by the tasks):
//! command logic writes `status`/`mode`, the sensor task writes the filtered
//! measurements, the navigation task writes the actuator demands, the route
//! planner writes the setpoints in automatic mode and the waypoint index.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Mutex;

use comms_if::tm::{FaultFlags, OpMode, Position, PositionPacket, StatePacket, TruckStatus};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Complete state of one truck.
#[derive(Debug, Clone)]
pub struct VehicleState {
    /// Identification of the truck, assigned at startup.
    pub truck_id: u32,

    /// Filtered position and heading in the mine frame.
    pub position: Position,

    /// Filtered linear speed in meters/second.
    pub velocity: f64,

    /// Angular rate in radians/second, derived from the filtered heading.
    pub angular_velocity: f64,

    /// Filtered engine temperature in degrees Celsius.
    pub temperature: f64,

    pub status: TruckStatus,

    pub mode: OpMode,

    /// Commanded linear speed reference, meters/second.
    pub setpoint_velocity: f64,

    /// Commanded angular rate reference, radians/second.
    pub setpoint_angular: f64,

    /// Linear speed demand to the dynamics, meters/second. Written by the
    /// navigation controller only.
    pub velocity_cmd: f64,

    /// Angular rate demand to the dynamics, radians/second. Written by the
    /// navigation controller only.
    pub angular_cmd: f64,

    /// Latched fault flags, cleared on RESET.
    pub faults: FaultFlags,

    /// Active route as (x, y) waypoints.
    pub route: Vec<[f64; 2]>,

    /// Index of the active target waypoint. Equal to `route.len()` when the
    /// route is complete.
    pub current_waypoint: usize,

    /// Short human-readable description of the last notable event.
    pub last_event: String,

    /// Count of raw sensor samples discarded as glitches.
    pub sensor_glitches: u64,
}

/// The store owning the shared state.
pub struct StateStore {
    state: Mutex<VehicleState>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehicleState {
    pub fn new(truck_id: u32) -> Self {
        Self {
            truck_id,
            position: Position::default(),
            velocity: 0.0,
            angular_velocity: 0.0,
            temperature: 0.0,
            status: TruckStatus::Stopped,
            mode: OpMode::ManualLocal,
            setpoint_velocity: 0.0,
            setpoint_angular: 0.0,
            velocity_cmd: 0.0,
            angular_cmd: 0.0,
            faults: FaultFlags::default(),
            route: Vec::new(),
            current_waypoint: 0,
            last_event: String::new(),
            sensor_glitches: 0,
        }
    }

    /// Build the state packet published on the state topic.
    pub fn state_packet(&self, timestamp: f64) -> StatePacket {
        StatePacket {
            truck_id: self.truck_id,
            timestamp,
            position: self.position,
            velocity: self.velocity,
            temperature: self.temperature,
            status: self.status,
            mode: self.mode,
            faults: self.faults,
        }
    }

    /// Build the packet published on the position topic.
    pub fn position_packet(&self) -> PositionPacket {
        PositionPacket {
            truck_id: self.truck_id,
            x: self.position.x,
            y: self.position.y,
            theta: self.position.theta,
        }
    }

    /// True when a route is loaded and every waypoint has been accepted.
    pub fn route_complete(&self) -> bool {
        !self.route.is_empty() && self.current_waypoint >= self.route.len()
    }
}

impl StateStore {
    pub fn new(truck_id: u32) -> Self {
        Self {
            state: Mutex::new(VehicleState::new(truck_id)),
        }
    }

    /// Get a copy of the current state.
    pub fn snapshot(&self) -> VehicleState {
        self.state
            .lock()
            .expect("StateStore mutex poisoned")
            .clone()
    }

    /// Apply a mutation under the lock.
    ///
    /// The closure must be short and must not perform I/O.
    pub fn update<F>(&self, mutator: F)
    where
        F: FnOnce(&mut VehicleState),
    {
        let mut state = self.state.lock().expect("StateStore mutex poisoned");
        mutator(&mut state);
    }

    /// Record a short event description in the state.
    pub fn record_event(&self, event: impl Into<String>) {
        let event = event.into();
        self.update(|s| s.last_event = event);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_snapshot_is_isolated() {
        let store = StateStore::new(4);

        let mut snap = store.snapshot();
        snap.velocity = 99.0;

        // Mutating the snapshot must not touch the store
        assert_eq!(store.snapshot().velocity, 0.0);

        store.update(|s| s.velocity = 2.5);
        assert_eq!(store.snapshot().velocity, 2.5);
    }

    #[test]
    fn test_state_packet_mirrors_state() {
        let store = StateStore::new(9);
        store.update(|s| {
            s.position.x = 1.5;
            s.velocity = 3.0;
            s.status = TruckStatus::Running;
        });

        let packet = store.snapshot().state_packet(100.0);
        assert_eq!(packet.truck_id, 9);
        assert_eq!(packet.position.x, 1.5);
        assert_eq!(packet.velocity, 3.0);
        assert_eq!(packet.status, TruckStatus::Running);
        assert_eq!(packet.timestamp, 100.0);
    }

    #[test]
    fn test_route_complete() {
        let mut state = VehicleState::new(1);
        assert!(!state.route_complete());

        state.route = vec![[1.0, 0.0], [2.0, 0.0]];
        state.current_waypoint = 1;
        assert!(!state.route_complete());

        state.current_waypoint = 2;
        assert!(state.route_complete());
    }
}
