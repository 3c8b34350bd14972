//! Quaternion helpers over plain `[f32; 4]` (x, y, z, w) arrays.
//!
//! Euler angles follow the host convention: degrees, applied Z then X then Y
//! (`R = Ry * Rx * Rz`), which is glam's `EulerRot::YXZ`.

use glam::{EulerRot, Quat};

pub const IDENTITY: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

#[inline]
pub fn dot4(a: [f32; 4], b: [f32; 4]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3]
}

#[inline]
pub fn negate4(q: [f32; 4]) -> [f32; 4] {
    [-q[0], -q[1], -q[2], -q[3]]
}

/// Build a quaternion from Euler degrees `[x, y, z]`.
pub fn quat_from_euler_deg(euler: [f32; 3]) -> [f32; 4] {
    let q = Quat::from_euler(
        EulerRot::YXZ,
        euler[1].to_radians(),
        euler[0].to_radians(),
        euler[2].to_radians(),
    );
    q.to_array()
}

/// Decompose a quaternion into Euler degrees `[x, y, z]`.
pub fn euler_deg_from_quat(q: [f32; 4]) -> [f32; 3] {
    let (y, x, z) = Quat::from_array(q).normalize().to_euler(EulerRot::YXZ);
    [x.to_degrees(), y.to_degrees(), z.to_degrees()]
}

/// Rotation about a single axis, in degrees.
pub fn quat_from_axis_deg(axis: [f32; 3], degrees: f32) -> [f32; 4] {
    Quat::from_axis_angle(glam::Vec3::from_array(axis).normalize(), degrees.to_radians()).to_array()
}

/// True when `a` and `b` describe the same rotation (either double-cover sign).
pub fn same_rotation(a: [f32; 4], b: [f32; 4], eps: f32) -> bool {
    (dot4(a, b).abs() - 1.0).abs() <= eps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euler_round_trip_off_gimbal() {
        let euler = [20.0, -35.0, 50.0];
        let q = quat_from_euler_deg(euler);
        let back = euler_deg_from_quat(q);
        for i in 0..3 {
            assert!((back[i] - euler[i]).abs() < 1e-3, "axis {i}: {back:?}");
        }
    }

    #[test]
    fn euler_order_is_z_then_x_then_y() {
        let composed = Quat::from_rotation_y(0.3) * Quat::from_rotation_x(0.2) * Quat::from_rotation_z(0.1);
        let q = quat_from_euler_deg([0.2f32.to_degrees(), 0.3f32.to_degrees(), 0.1f32.to_degrees()]);
        assert!(same_rotation(q, composed.to_array(), 1e-5));
    }

    #[test]
    fn negation_is_same_rotation() {
        let q = quat_from_axis_deg([0.0, 1.0, 0.0], 90.0);
        assert!(same_rotation(q, negate4(q), 1e-6));
        assert!(dot4(q, negate4(q)) < 0.0);
    }
}
