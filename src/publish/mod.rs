//! Outbound publication of target commands and relative poses.
//!
//! The sequencer publishes through the [`PosePublisher`] trait. The daemon
//! uses [`Topics`], a pair of latched topics that the TCP publisher and any
//! in-process consumer subscribe to.

pub mod latched;

pub use latched::{LatchedTopic, Subscription};

use crate::core::types::{RelativePose, TargetCommand};

/// Topic carrying target-pose commands.
pub const TARGET_TOPIC: &str = "high_level_command";

/// Topic carrying relative-pose observations.
pub const RELATIVE_POSE_TOPIC: &str = "relative_pose";

/// Sink for sequencer output
pub trait PosePublisher: Send {
    fn publish_target(&self, command: &TargetCommand);

    fn publish_relative_pose(&self, pose: &RelativePose);
}

/// Latched topics for both sequencer outputs.
pub struct Topics {
    pub target: LatchedTopic<TargetCommand>,
    pub relative_pose: LatchedTopic<RelativePose>,
}

impl Topics {
    pub fn new() -> Self {
        Self {
            target: LatchedTopic::new(TARGET_TOPIC),
            relative_pose: LatchedTopic::new(RELATIVE_POSE_TOPIC),
        }
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self::new()
    }
}

impl PosePublisher for Topics {
    fn publish_target(&self, command: &TargetCommand) {
        self.target.publish(*command);
    }

    fn publish_relative_pose(&self, pose: &RelativePose) {
        self.relative_pose.publish(*pose);
    }
}

impl<P: PosePublisher + Sync + ?Sized> PosePublisher for std::sync::Arc<P> {
    fn publish_target(&self, command: &TargetCommand) {
        (**self).publish_target(command);
    }

    fn publish_relative_pose(&self, pose: &RelativePose) {
        (**self).publish_relative_pose(pose);
    }
}
