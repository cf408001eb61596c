//! Core data types for waypoints, vehicle state, and published commands.
//!
//! Key types:
//! - [`Waypoint`]: A target pose in the sequencer list
//! - [`VehicleState`]: Raw sample from the pose-estimation source (z down-positive)
//! - [`VehiclePose`]: Sample converted to the waypoint frame (altitude up-positive)
//! - [`TargetCommand`]: Outbound command for the motion controller
//! - [`RelativePose`]: Outbound observation published on every sample

use serde::{Deserialize, Serialize};

use crate::core::math::quaternion_to_yaw;
use crate::error::{Error, Result};

/// Current time in microseconds since the UNIX epoch.
#[inline]
pub fn now_us() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Target pose: position with up-positive altitude and heading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f64,
    pub y: f64,
    /// Altitude, up-positive
    pub altitude: f64,
    /// Heading in radians (0 when not supplied)
    #[serde(default)]
    pub yaw: f64,
}

impl Waypoint {
    pub fn new(x: f64, y: f64, altitude: f64, yaw: f64) -> Self {
        Self {
            x,
            y,
            altitude,
            yaw,
        }
    }

    /// Build from `[x, y, altitude]` or `[x, y, altitude, yaw]`.
    pub fn from_components(components: &[f64]) -> Result<Self> {
        match *components {
            [x, y, altitude] => Ok(Self::new(x, y, altitude, 0.0)),
            [x, y, altitude, yaw] => Ok(Self::new(x, y, altitude, yaw)),
            _ => Err(Error::InvalidWaypoint(format!(
                "expected 3 or 4 components, got {}",
                components.len()
            ))),
        }
    }

    /// Position used by the arrival test (yaw excluded).
    #[inline]
    pub fn position(&self) -> [f64; 3] {
        [self.x, self.y, self.altitude]
    }
}

/// Unit quaternion (w, x, y, z).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Vehicle state sample as produced by the estimator.
///
/// Position is in the sensor frame where `z` points down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    /// Timestamp in microseconds since epoch (0 if unknown)
    #[serde(default)]
    pub timestamp_us: u64,
    /// Position [x, y, z], z down-positive
    pub position: [f64; 3],
    /// Orientation
    #[serde(default)]
    pub orientation: Quaternion,
}

impl VehicleState {
    pub fn new(position: [f64; 3], orientation: Quaternion) -> Self {
        Self {
            timestamp_us: now_us(),
            position,
            orientation,
        }
    }
}

/// Vehicle pose in the waypoint frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehiclePose {
    pub x: f64,
    pub y: f64,
    /// Altitude, up-positive
    pub altitude: f64,
    pub yaw: f64,
}

impl VehiclePose {
    #[inline]
    pub fn position(&self) -> [f64; 3] {
        [self.x, self.y, self.altitude]
    }
}

impl From<&VehicleState> for VehiclePose {
    /// The only place the vertical axis is flipped.
    fn from(state: &VehicleState) -> Self {
        Self {
            x: state.position[0],
            y: state.position[1],
            altitude: -state.position[2],
            yaw: quaternion_to_yaw(&state.orientation),
        }
    }
}

/// Control mode tag carried by every target command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ControlMode {
    /// Position in x/y, absolute yaw, altitude hold
    #[default]
    XPosYPosYawAltitude,
}

impl ControlMode {
    /// Numeric mode code understood by the flight controller.
    pub fn code(&self) -> u8 {
        match self {
            ControlMode::XPosYPosYawAltitude => 5,
        }
    }
}

/// Target-pose command for the downstream motion controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetCommand {
    /// Timestamp in microseconds since epoch
    pub timestamp_us: u64,
    pub x: f64,
    pub y: f64,
    pub altitude: f64,
    pub yaw: f64,
    pub mode: ControlMode,
}

impl TargetCommand {
    pub fn from_waypoint(waypoint: &Waypoint) -> Self {
        Self {
            timestamp_us: now_us(),
            x: waypoint.x,
            y: waypoint.y,
            altitude: waypoint.altitude,
            yaw: waypoint.yaw,
            mode: ControlMode::XPosYPosYawAltitude,
        }
    }
}

/// Relative pose observation published on every vehicle sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RelativePose {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
    pub altitude: f64,
}

impl From<&VehiclePose> for RelativePose {
    fn from(pose: &VehiclePose) -> Self {
        Self {
            x: pose.x,
            y: pose.y,
            yaw: pose.yaw,
            altitude: pose.altitude,
        }
    }
}
