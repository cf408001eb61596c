//! MargaNav - Waypoint sequencing for autonomous vehicles
//!
//! Holds an ordered list of waypoints, publishes the current one as the
//! vehicle's target, and advances when the vehicle comes within the arrival
//! threshold. The list can be edited at runtime over TCP.
//!
//! ## Layout
//!
//! - [`sequencer`]: waypoint list, index policy, arrival detection
//! - [`publish`]: latched topics for target and relative pose
//! - [`dispatch`]: dispatcher thread that owns the sequencer
//! - [`streaming`]: UDP state intake, TCP commands, TCP telemetry
//! - [`client`]: blocking clients for the daemon

pub mod client;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod publish;
pub mod sequencer;
pub mod signal;
pub mod streaming;

// Re-export commonly used types
pub use config::Config;
pub use core::types::{RelativePose, TargetCommand, VehiclePose, VehicleState, Waypoint};
pub use error::{Error, Result};
pub use publish::{PosePublisher, Topics};
pub use sequencer::{SequencerConfig, WaypointSequencer};
