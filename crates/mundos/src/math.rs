//! Math types and glam re-exports.
//!
//! We re-export [glam](https://docs.rs/glam) types so users don't need to
//! depend on it directly. The [`Transform`] type bundles position, Euler
//! rotation and scale; it is the by-value working copy handed to scripts.
//!
//! ## Composition order
//!
//! The engine's transform convention is written in row-vector form:
//!
//! ```text
//! Local = Scale · RotX · RotY · RotZ · Translation
//! World(e) = Local(e) · World(parent(e))
//! ```
//!
//! glam uses column vectors, so the same numbers come out of the transposed
//! product `Translation · RotZ · RotY · RotX · Scale`, and world matrices are
//! built as `parent_world * local`. Swapping either order silently changes the
//! result, so every matrix in the crate goes through [`local_matrix`].

pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

/// Rotation matrix for Euler angles (radians) applied X, then Y, then Z.
pub fn euler_rotation_matrix(euler: Vec3) -> Mat4 {
    Mat4::from_rotation_z(euler.z) * Mat4::from_rotation_y(euler.y) * Mat4::from_rotation_x(euler.x)
}

/// Quaternion equivalent of [`euler_rotation_matrix`].
pub fn euler_to_quat(euler: Vec3) -> Quat {
    Quat::from_rotation_z(euler.z) * Quat::from_rotation_y(euler.y) * Quat::from_rotation_x(euler.x)
}

/// Local model matrix: scale first, then X/Y/Z rotation, then translation.
pub fn local_matrix(translation: Vec3, euler: Vec3, scale: Vec3) -> Mat4 {
    Mat4::from_translation(translation) * euler_rotation_matrix(euler) * Mat4::from_scale(scale)
}

/// A 3D transform: position, Euler rotation (radians) and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform (origin, no rotation, uniform scale of 1).
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    /// Create a transform at the given position.
    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self {
            translation: Vec3::new(x, y, z),
            ..Self::IDENTITY
        }
    }

    /// Return a copy with the given Euler rotation.
    pub fn with_rotation(mut self, euler: Vec3) -> Self {
        self.rotation = euler;
        self
    }

    /// Return a copy with a per-axis scale.
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Compute the 4x4 local model matrix.
    pub fn matrix(&self) -> Mat4 {
        local_matrix(self.translation, self.rotation, self.scale)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn identity_matrix() {
        assert_eq!(Transform::IDENTITY.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn scale_applies_before_translation() {
        let t = Transform::from_xyz(1.0, 2.0, 3.0).with_scale(Vec3::splat(2.0));
        let p = t.matrix().transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 3.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(p.z, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn x_rotation_applies_before_z() {
        // Rotate +Y by 90° about X -> +Z, then 90° about Z leaves +Z alone.
        let m = euler_rotation_matrix(Vec3::new(FRAC_PI_2, 0.0, FRAC_PI_2));
        let p = m.transform_vector3(Vec3::Y);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(p.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn quat_matches_matrix() {
        let euler = Vec3::new(0.3, -1.1, 0.7);
        let from_quat = Mat4::from_quat(euler_to_quat(euler));
        let from_euler = euler_rotation_matrix(euler);
        for (a, b) in from_quat
            .to_cols_array()
            .iter()
            .zip(from_euler.to_cols_array().iter())
        {
            assert_relative_eq!(a, b, epsilon = 1e-5);
        }
    }
}
