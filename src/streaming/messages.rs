//! Message types for the command and telemetry surfaces.
//!
//! - [`Request`] / [`Response`]: command connection (client → daemon → client)
//! - [`Telemetry`]: latched outputs streamed to subscribers
//! - [`VehicleState`]: inbound samples on the UDP intake

use serde::{Deserialize, Serialize};

use crate::core::types::{RelativePose, TargetCommand, Waypoint};
use crate::error::Error;
use crate::sequencer::SequencerStatus;

pub use crate::core::types::VehicleState;

/// Requests accepted on the command port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    /// Insert a waypoint at `index` (`-1` appends)
    AddWaypoint {
        x: f64,
        y: f64,
        z: f64,
        yaw: f64,
        index: i64,
    },

    /// Remove the waypoint at `index`
    RemoveWaypoint { index: i64 },

    /// Replace the list from a file (always answered with `NotImplemented`)
    SetWaypointsFromFile { path: String },

    /// Snapshot of the waypoint list
    ListWaypoints,

    /// Current index, target, and sequencer settings
    Status,
}

/// Serializable error category for remote callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    IndexOutOfRange,
    CannotRemoveLastWaypoint,
    NotImplemented,
    Internal,
}

impl From<&Error> for ErrorKind {
    fn from(e: &Error) -> Self {
        match e {
            Error::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Error::CannotRemoveLastWaypoint => ErrorKind::CannotRemoveLastWaypoint,
            Error::NotImplemented(_) => ErrorKind::NotImplemented,
            Error::Rejected { kind, .. } => *kind,
            _ => ErrorKind::Internal,
        }
    }
}

/// Status snapshot as sent on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub current_index: u32,
    pub waypoint_count: u32,
    pub current_target: Waypoint,
    pub threshold: f64,
    pub cyclical: bool,
}

impl From<&SequencerStatus> for StatusReport {
    fn from(status: &SequencerStatus) -> Self {
        Self {
            current_index: status.current_index as u32,
            waypoint_count: status.waypoint_count as u32,
            current_target: status.current_target,
            threshold: status.threshold,
            cyclical: status.cyclical,
        }
    }
}

/// Replies on the command port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    /// List length after a successful add/remove
    WaypointCount { count: u32 },

    /// Full waypoint list
    Waypoints { waypoints: Vec<Waypoint> },

    /// Status snapshot
    Status(StatusReport),

    /// Operation rejected
    Error { kind: ErrorKind, message: String },
}

impl Response {
    pub fn from_error(e: &Error) -> Self {
        Response::Error {
            kind: ErrorKind::from(e),
            message: e.to_string(),
        }
    }
}

/// Outputs streamed to telemetry subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Telemetry {
    Target(TargetCommand),
    RelativePose(RelativePose),
}

impl Telemetry {
    /// Topic name used in logs.
    pub fn topic(&self) -> &'static str {
        match self {
            Telemetry::Target(_) => crate::publish::TARGET_TOPIC,
            Telemetry::RelativePose(_) => crate::publish::RELATIVE_POSE_TOPIC,
        }
    }
}
