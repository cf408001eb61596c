//! Core data types and geometry.
//!
//! - [`types`]: Waypoints, vehicle state, published commands
//! - [`math`]: Quaternion yaw extraction and distances

pub mod math;
pub mod types;
