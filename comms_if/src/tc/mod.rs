//! # Truck command module
//!
//! This module defines the commands a truck accepts from the supervisor (or
//! any other command source), and the parsing of the JSON wire form
//! `{"type": <NAME>, "value": <PAYLOAD>}`.
//!
//! Unknown `type` strings are rejected at this boundary with a typed error so
//! the caller can log and drop the message instead of crashing.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde_json::{self, json, Value};
use thiserror::Error;

// Internal
use crate::tm::{OpMode, RoutePacket, TruckStatus};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A command to the truck.
///
/// Commands are idempotent except the setpoint changes, which are
/// last-writer-wins.
#[derive(Debug, Clone, PartialEq)]
pub enum TruckCmd {
    /// Change the operating mode.
    SetMode(OpMode),

    /// Request a status transition (subject to the command logic's
    /// transition table).
    SetStatus(TruckStatus),

    /// Emergency stop: latches EMERGENCY status, zeroing all actuation.
    Emergency,

    /// Clear an emergency, returning to STOPPED.
    Reset,

    /// Set the commanded linear speed reference in meters/second.
    SetSetpointVelocity(f64),

    /// Set the commanded angular rate reference in radians/second.
    SetSetpointAngular(f64),

    /// Replace the active route with a new list of (x, y) waypoints.
    SetRoute(Vec<[f64; 2]>),

    /// Stop the truck (RUNNING -> STOPPED).
    Stop,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum CmdParseError {
    #[error("Command contains invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Command has an invalid type ({0})")]
    InvalidType(String),

    #[error("Command of type {0} has a missing or invalid value")]
    InvalidValue(&'static str),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TruckCmd {
    /// Parse a command from its JSON wire form.
    pub fn from_json(json_str: &str) -> Result<Self, CmdParseError> {
        let val: Value = serde_json::from_str(json_str)?;

        let type_str = match val["type"].as_str() {
            Some(s) => s,
            None => {
                return Err(CmdParseError::InvalidType(String::from(
                    "expected \"type\" to be a string",
                )))
            }
        };

        match type_str {
            "SET_MODE" => {
                let mode: OpMode = serde_json::from_value(val["value"].clone())
                    .map_err(|_| CmdParseError::InvalidValue("SET_MODE"))?;
                Ok(TruckCmd::SetMode(mode))
            }
            "SET_STATUS" => {
                let status: TruckStatus = serde_json::from_value(val["value"].clone())
                    .map_err(|_| CmdParseError::InvalidValue("SET_STATUS"))?;
                Ok(TruckCmd::SetStatus(status))
            }
            "EMERGENCY" => Ok(TruckCmd::Emergency),
            "RESET" => Ok(TruckCmd::Reset),
            "SET_SETPOINT_VELOCITY" => match val["value"].as_f64() {
                Some(v) => Ok(TruckCmd::SetSetpointVelocity(v)),
                None => Err(CmdParseError::InvalidValue("SET_SETPOINT_VELOCITY")),
            },
            "SET_SETPOINT_ANGULAR" => match val["value"].as_f64() {
                Some(v) => Ok(TruckCmd::SetSetpointAngular(v)),
                None => Err(CmdParseError::InvalidValue("SET_SETPOINT_ANGULAR")),
            },
            "SET_ROUTE" => {
                let route: RoutePacket = serde_json::from_value(val["value"].clone())
                    .map_err(|_| CmdParseError::InvalidValue("SET_ROUTE"))?;
                Ok(TruckCmd::SetRoute(route.waypoints))
            }
            "STOP" => Ok(TruckCmd::Stop),
            other => Err(CmdParseError::InvalidType(other.to_string())),
        }
    }

    /// Serialise this command into its JSON wire form.
    pub fn to_json(&self) -> String {
        let val = match self {
            TruckCmd::SetMode(mode) => json!({"type": "SET_MODE", "value": mode}),
            TruckCmd::SetStatus(status) => json!({"type": "SET_STATUS", "value": status}),
            TruckCmd::Emergency => json!({"type": "EMERGENCY"}),
            TruckCmd::Reset => json!({"type": "RESET"}),
            TruckCmd::SetSetpointVelocity(v) => {
                json!({"type": "SET_SETPOINT_VELOCITY", "value": v})
            }
            TruckCmd::SetSetpointAngular(v) => {
                json!({"type": "SET_SETPOINT_ANGULAR", "value": v})
            }
            TruckCmd::SetRoute(waypoints) => {
                json!({"type": "SET_ROUTE", "value": {"waypoints": waypoints}})
            }
            TruckCmd::Stop => json!({"type": "STOP"}),
        };

        val.to_string()
    }
}

impl From<RoutePacket> for TruckCmd {
    fn from(packet: RoutePacket) -> Self {
        TruckCmd::SetRoute(packet.waypoints)
    }
}
