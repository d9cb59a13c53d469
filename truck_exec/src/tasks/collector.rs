//! # Data collector task
//!
//! Appends one [`LogEntry`] per second to the telemetry archive: a snapshot
//! of the vehicle state plus the wall-clock timestamp and the current event
//! description. A missing sink is tolerated, and a failed write is recorded
//! in the state and the task keeps running.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use serde::{Serialize, Serializer};
use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use comms_if::tm::{OpMode, TruckStatus};
use util::archive::{Archived, Archiver};
use util::module::Task;
use util::time::unix_timestamp_s;

use crate::state::{StateStore, VehicleState};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One telemetry record, a timestamped snapshot of the vehicle state.
///
/// Field order is the column order of the CSV sink. Metres and speeds carry
/// three decimals, headings four, temperatures one; fault flags are written
/// as 0/1.
#[derive(Debug, Serialize)]
pub struct LogEntry {
    #[serde(serialize_with = "ser_3dp")]
    timestamp: f64,
    truck_id: u32,
    status: TruckStatus,
    mode: OpMode,
    #[serde(serialize_with = "ser_3dp")]
    position_x: f64,
    #[serde(serialize_with = "ser_3dp")]
    position_y: f64,
    #[serde(serialize_with = "ser_4dp")]
    theta: f64,
    #[serde(serialize_with = "ser_3dp")]
    velocity: f64,
    #[serde(serialize_with = "ser_1dp")]
    temperature: f64,
    #[serde(serialize_with = "ser_flag")]
    electrical_fault: bool,
    #[serde(serialize_with = "ser_flag")]
    hydraulic_fault: bool,
    event_description: String,
}

/// The data collector task.
pub struct CollectorTask {
    store: Arc<StateStore>,

    /// `None` when the sink could not be opened; the truck runs on with
    /// in-memory state only.
    archive: Option<Archiver>,

    period: Duration,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LogEntry {
    /// Build a record from a state snapshot.
    pub fn from_state(state: &VehicleState, timestamp: f64) -> Self {
        Self {
            timestamp,
            truck_id: state.truck_id,
            status: state.status,
            mode: state.mode,
            position_x: state.position.x,
            position_y: state.position.y,
            theta: state.position.theta,
            velocity: state.velocity,
            temperature: state.temperature,
            electrical_fault: state.faults.electrical,
            hydraulic_fault: state.faults.hydraulic,
            event_description: state.last_event.clone(),
        }
    }
}

impl CollectorTask {
    /// Create the collector, archiving to `truck_{id}.csv` in the given
    /// directory.
    pub fn new(store: Arc<StateStore>, dir: &Path, period: Duration) -> Self {
        let path = dir.join(format!("truck_{}.csv", store.snapshot().truck_id));

        let archive = match Self::open_sink(dir, &path) {
            Ok(archive) => {
                info!("Telemetry sink: {:?}", path);
                Some(archive)
            }
            Err(e) => {
                warn!("Telemetry sink unavailable ({}), continuing without", e);
                None
            }
        };

        Self {
            store,
            archive,
            period,
        }
    }

    fn open_sink(dir: &Path, path: &Path) -> Result<Archiver, Box<dyn std::error::Error>> {
        std::fs::create_dir_all(dir)?;
        Archiver::from_path(path)
    }
}

impl Archived for CollectorTask {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let snap = self.store.snapshot();
        let entry = LogEntry::from_state(&snap, unix_timestamp_s());

        match self.archive.as_mut() {
            Some(archive) => archive.serialise(entry),
            None => Ok(()),
        }
    }
}

impl Task for CollectorTask {
    type TickError = Infallible;

    fn name(&self) -> &'static str {
        "collector"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn tick(&mut self) -> Result<(), Self::TickError> {
        if let Err(e) = self.write() {
            warn!("Telemetry write failed: {}", e);
            self.store.record_event("telemetry write failed");
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn ser_1dp<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{:.1}", v))
}

fn ser_3dp<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{:.3}", v))
}

fn ser_4dp<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{:.4}", v))
}

fn ser_flag<S: Serializer>(v: &bool, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u8(*v as u8)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_columns_and_precision() {
        let dir = std::env::temp_dir().join(format!("truck_csv_test_{}", std::process::id()));

        let store = Arc::new(StateStore::new(3));
        store.update(|s| {
            s.position.x = 1.23456;
            s.position.theta = -0.98765;
            s.status = TruckStatus::Running;
            s.faults.hydraulic = true;
            s.last_event = String::from("waypoint, reached");
        });

        let mut collector = CollectorTask::new(store, &dir, Duration::from_secs(1));
        collector.tick().unwrap();
        collector.tick().unwrap();

        let contents = std::fs::read_to_string(dir.join("truck_3.csv")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "timestamp,truck_id,status,mode,position_x,position_y,theta,velocity,\
             temperature,electrical_fault,hydraulic_fault,event_description"
        );
        assert!(lines[1].contains(",3,RUNNING,MANUAL_LOCAL,1.235,0.000,-0.9877,0.000,0.0,0,1,"));
        // Event containing a comma is quoted
        assert!(lines[1].ends_with("\"waypoint, reached\""));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_sink_tolerated() {
        let store = Arc::new(StateStore::new(9));

        // Not a creatable directory: the collector runs without a sink
        let mut collector = CollectorTask::new(
            store.clone(),
            Path::new("/dev/null/telemetry"),
            Duration::from_secs(1),
        );
        collector.tick().unwrap();

        // And nothing was recorded as a write failure
        assert!(!store.snapshot().last_event.contains("telemetry"));
    }
}
