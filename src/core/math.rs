//! Geometry helpers shared by the sequencer and the intake path.

use crate::core::types::Quaternion;

/// Yaw (rotation about the vertical axis) from a unit quaternion.
///
/// ZYX convention: `atan2(2(wz + xy), 1 - 2(y² + z²))`.
#[inline]
pub fn quaternion_to_yaw(q: &Quaternion) -> f64 {
    (2.0 * (q.w * q.z + q.x * q.y)).atan2(1.0 - 2.0 * (q.y * q.y + q.z * q.z))
}

/// Euclidean distance between two points in (x, y, altitude).
#[inline]
pub fn distance_3d(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}
