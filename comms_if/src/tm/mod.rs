//! # Telemetry module
//!
//! This module defines the packets published by each truck, and the state and
//! mode enumerations shared between the wire and the on-truck state record.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Operating status of the truck.
///
/// EMERGENCY is sticky: all actuation is zeroed until an explicit RESET.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TruckStatus {
    Stopped,
    Running,
    Emergency,
}

/// Operating mode of the truck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpMode {
    ManualLocal,
    ManualRemote,
    AutomaticRemote,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Planar position and heading of the truck in the mine frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X position in meters.
    pub x: f64,

    /// Y position in meters.
    pub y: f64,

    /// Heading in radians, in (-pi, pi].
    pub theta: f64,
}

/// Latched fault flags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultFlags {
    pub electrical: bool,
    pub hydraulic: bool,
}

/// Full state packet, published on the state topic at 10 Hz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePacket {
    pub truck_id: u32,

    /// Unix time of the snapshot, in seconds.
    pub timestamp: f64,

    pub position: Position,

    /// Linear speed in meters/second.
    pub velocity: f64,

    /// Engine temperature in degrees Celsius.
    pub temperature: f64,

    pub status: TruckStatus,

    pub mode: OpMode,

    pub faults: FaultFlags,
}

/// Position-only packet, published on the position topic at 10 Hz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionPacket {
    pub truck_id: u32,
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

/// Route packet received on the route topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePacket {
    /// Ordered waypoints as (x, y) pairs in meters.
    pub waypoints: Vec<[f64; 2]>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TruckStatus {
    /// The wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TruckStatus::Stopped => "STOPPED",
            TruckStatus::Running => "RUNNING",
            TruckStatus::Emergency => "EMERGENCY",
        }
    }
}

impl OpMode {
    /// The wire name of this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            OpMode::ManualLocal => "MANUAL_LOCAL",
            OpMode::ManualRemote => "MANUAL_REMOTE",
            OpMode::AutomaticRemote => "AUTOMATIC_REMOTE",
        }
    }
}

impl std::fmt::Display for TruckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for OpMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_state_packet_round_trip() {
        let packet = StatePacket {
            truck_id: 3,
            timestamp: 1234.5678,
            position: Position {
                x: 10.25,
                y: -4.5,
                theta: 1.5,
            },
            velocity: 2.75,
            temperature: 87.5,
            status: TruckStatus::Running,
            mode: OpMode::AutomaticRemote,
            faults: FaultFlags {
                electrical: false,
                hydraulic: true,
            },
        };

        let json = serde_json::to_string(&packet).unwrap();

        // Wire strings must match the supervisor's expectations
        assert!(json.contains("\"RUNNING\""));
        assert!(json.contains("\"AUTOMATIC_REMOTE\""));
        assert!(json.contains("\"position\""));

        let parsed: StatePacket = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, packet);
    }

    #[test]
    fn test_position_packet_round_trip() {
        let packet = PositionPacket {
            truck_id: 7,
            x: 1.0,
            y: 2.0,
            theta: -0.5,
        };

        let json = serde_json::to_string(&packet).unwrap();
        let parsed: PositionPacket = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, packet);
    }

    #[test]
    fn test_route_packet_parse() {
        let json = r#"{"waypoints": [[10.0, 0.0], [10.0, 10.0]]}"#;
        let packet: RoutePacket = serde_json::from_str(json).unwrap();
        assert_eq!(packet.waypoints.len(), 2);
        assert_eq!(packet.waypoints[1], [10.0, 10.0]);
    }
}
