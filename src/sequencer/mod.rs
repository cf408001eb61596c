//! Waypoint sequencer state machine.
//!
//! The sequencer is always "tracking waypoint i". Each vehicle sample is
//! compared against the current waypoint; once the vehicle is closer than the
//! threshold it moves on to the next one and publishes the new target.
//!
//! ```text
//!            distance >= threshold
//!              ┌──────────┐
//!              ▼          │
//!        ┌──────────────┐ │      distance < threshold
//!  ────▶ │ tracking(i)  │─┴──────────────────────────┐
//!        └──────────────┘                            ▼
//!              ▲                           i = wrap(i + 1)
//!              └─────────────── publish target(i) ◀──┘
//! ```
//!
//! There is no terminal state: cyclic sequences loop forever, non-cyclic ones
//! hold on the last waypoint.
//!
//! The sequencer takes `&mut self` for every operation and is not shared; the
//! dispatcher thread owns it and serializes samples and requests.

pub mod list;

pub use list::{InsertPosition, RemoveOutcome, WaypointList};

use crate::core::math::distance_3d;
use crate::core::types::{RelativePose, TargetCommand, VehiclePose, VehicleState, Waypoint};
use crate::error::{Error, Result};
use crate::publish::PosePublisher;

/// Default arrival threshold (same units as position).
pub const DEFAULT_THRESHOLD: f64 = 5.0;

/// Construction parameters for [`WaypointSequencer`].
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Initial waypoints (must be non-empty)
    pub waypoints: Vec<Waypoint>,
    /// Arrival distance
    pub threshold: f64,
    /// Wrap to the first waypoint after the last one
    pub cyclical: bool,
}

impl SequencerConfig {
    pub fn new(waypoints: Vec<Waypoint>) -> Self {
        Self {
            waypoints,
            threshold: DEFAULT_THRESHOLD,
            cyclical: true,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_cyclical(mut self, cyclical: bool) -> Self {
        self.cyclical = cyclical;
        self
    }
}

/// Point-in-time view of the sequencer.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencerStatus {
    pub current_index: usize,
    pub waypoint_count: usize,
    pub current_target: Waypoint,
    pub threshold: f64,
    pub cyclical: bool,
}

/// Owns the waypoint list and publishes targets as the vehicle progresses.
pub struct WaypointSequencer<P: PosePublisher> {
    list: WaypointList,
    threshold: f64,
    publisher: P,
}

impl<P: PosePublisher> WaypointSequencer<P> {
    /// Create the sequencer and publish the initial observation and target.
    pub fn new(config: SequencerConfig, publisher: P) -> Result<Self> {
        let list = WaypointList::new(config.waypoints, config.cyclical)?;

        let sequencer = Self {
            list,
            threshold: config.threshold,
            publisher,
        };

        sequencer
            .publisher
            .publish_relative_pose(&RelativePose::default());
        sequencer.publish_current_target();

        log::info!(
            "Sequencer started: {} waypoints, threshold {:.2}, {}",
            sequencer.list.len(),
            sequencer.threshold,
            if sequencer.list.is_cyclical() {
                "cyclical"
            } else {
                "hold at last"
            }
        );
        Ok(sequencer)
    }

    pub fn current_index(&self) -> usize {
        self.list.current_index()
    }

    pub fn current_waypoint(&self) -> &Waypoint {
        self.list.current()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Handle a vehicle state sample.
    ///
    /// Always publishes the relative pose; publishes a new target only when
    /// the vehicle has reached the current waypoint. Returns `true` on advance.
    pub fn on_vehicle_state(&mut self, state: &VehicleState) -> bool {
        let pose = VehiclePose::from(state);
        self.publisher
            .publish_relative_pose(&RelativePose::from(&pose));

        let error = distance_3d(pose.position(), self.list.current().position());
        log::trace!(
            "Vehicle ({:.2}, {:.2}, {:.2}) is {:.2} from waypoint {}",
            pose.x,
            pose.y,
            pose.altitude,
            error,
            self.list.current_index()
        );

        if error < self.threshold {
            let reached = self.list.current_index();
            self.list.advance();
            log::info!(
                "Reached waypoint {}, next target {}",
                reached,
                self.list.current_index()
            );
            self.publish_current_target();
            true
        } else {
            false
        }
    }

    /// Insert a waypoint; `index == -1` appends. Returns the new length.
    pub fn add_waypoint(&mut self, waypoint: Waypoint, index: i64) -> Result<usize> {
        let len = self.list.len();
        let result = InsertPosition::from_raw(index, len)
            .and_then(|position| self.list.insert(waypoint, position));
        match &result {
            Ok(new_len) => log::info!(
                "Added waypoint ({:.2}, {:.2}, {:.2}) at {}, {} total",
                waypoint.x,
                waypoint.y,
                waypoint.altitude,
                index,
                new_len
            ),
            Err(e) => log::warn!("Add waypoint rejected: {}", e),
        }
        result
    }

    /// Remove a waypoint. Returns the new length.
    ///
    /// Removing the current target republishes the replacement immediately.
    pub fn remove_waypoint(&mut self, index: i64) -> Result<usize> {
        // Negative indices fall through to the list's own range check
        let position = usize::try_from(index).unwrap_or(usize::MAX);
        let result = self.list.remove(position).map_err(|e| reindex(e, index));

        match result {
            Ok((new_len, RemoveOutcome::CurrentReplaced)) => {
                log::info!(
                    "Removed current waypoint {}, retargeting {}",
                    index,
                    self.list.current_index()
                );
                self.publish_current_target();
                Ok(new_len)
            }
            Ok((new_len, RemoveOutcome::CurrentKept)) => {
                log::info!("Removed waypoint {}, {} remaining", index, new_len);
                Ok(new_len)
            }
            Err(e) => {
                log::warn!("Remove waypoint rejected: {}", e);
                Err(e)
            }
        }
    }

    /// Load waypoints from a file. Not supported.
    pub fn set_waypoints_from_file(&mut self, path: &str) -> Result<()> {
        log::warn!("Set waypoints from file {} (not implemented)", path);
        Err(Error::NotImplemented(format!(
            "waypoint import from file '{}'",
            path
        )))
    }

    /// Snapshot of the full list.
    pub fn list_waypoints(&self) -> Vec<Waypoint> {
        self.list.as_slice().to_vec()
    }

    pub fn status(&self) -> SequencerStatus {
        SequencerStatus {
            current_index: self.list.current_index(),
            waypoint_count: self.list.len(),
            current_target: *self.list.current(),
            threshold: self.threshold,
            cyclical: self.list.is_cyclical(),
        }
    }

    fn publish_current_target(&self) {
        let command = TargetCommand::from_waypoint(self.list.current());
        log::debug!(
            "Publishing target {}: ({:.2}, {:.2}, {:.2}, yaw {:.2})",
            self.list.current_index(),
            command.x,
            command.y,
            command.altitude,
            command.yaw
        );
        self.publisher.publish_target(&command);
    }
}

/// Report the caller's raw index in range errors.
fn reindex(error: Error, raw: i64) -> Error {
    match error {
        Error::IndexOutOfRange { len, .. } => Error::IndexOutOfRange { index: raw, len },
        other => other,
    }
}
