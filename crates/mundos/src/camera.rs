//! Perspective camera component.
//!
//! A fly camera in the learnopengl style: yaw and pitch (degrees) define a
//! front vector, right and up follow from the world up axis. Pitch is clamped
//! to ±89° to stay clear of the gimbal flip, and field of view to 1°..=90°.
//!
//! Orientation follows the owning entity's [`Rotation`](crate::components::Rotation):
//! X rotation becomes pitch, Y rotation becomes yaw (offset so that a zero
//! rotation looks down -Z). `locked` marks the cursor as captured for
//! mouse-look; the fly-camera script toggles it.

use serde::{Deserialize, Serialize};

use crate::math::{Mat4, Vec3};

pub const MIN_FOV: f32 = 1.0;
pub const MAX_FOV: f32 = 90.0;
pub const PITCH_LIMIT: f32 = 89.0;
pub const NEAR_PLANE: f32 = 0.01;
pub const FAR_PLANE: f32 = 100.0;
/// Yaw of an entity with zero rotation.
pub const BASE_YAW: f32 = -90.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Vertical field of view in degrees.
    pub fov: f32,
    /// Degrees around the Y axis. -90 looks down -Z.
    pub yaw: f32,
    /// Degrees around the X axis.
    pub pitch: f32,
    pub locked: bool,
    pub aspect: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov: 45.0,
            yaw: BASE_YAW,
            pitch: 0.0,
            locked: false,
            aspect: 16.0 / 9.0,
        }
    }
}

impl Camera {
    pub fn new(aspect: f32) -> Self {
        Self {
            aspect,
            ..Self::default()
        }
    }

    pub fn set_fov(&mut self, degrees: f32) {
        self.fov = degrees.clamp(MIN_FOV, MAX_FOV);
    }

    /// Update pitch and yaw (degrees). Pitch is clamped.
    pub fn set_orientation(&mut self, pitch: f32, yaw: f32) {
        self.pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.yaw = yaw;
    }

    /// A copy oriented by an entity's Euler rotation (radians).
    pub fn oriented_by(&self, euler: Vec3) -> Self {
        let mut cam = *self;
        cam.set_orientation(euler.x.to_degrees(), BASE_YAW + euler.y.to_degrees());
        cam
    }

    /// Unit vector the camera looks along.
    pub fn front(&self) -> Vec3 {
        let pitch = (-self.pitch).to_radians();
        let yaw = self.yaw.to_radians();
        Vec3::new(pitch.cos() * yaw.cos(), pitch.sin(), pitch.cos() * yaw.sin()).normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.front().cross(Vec3::Y).normalize()
    }

    pub fn up(&self) -> Vec3 {
        self.right().cross(self.front()).normalize()
    }

    pub fn view_matrix(&self, position: Vec3) -> Mat4 {
        Mat4::look_at_rh(position, position + self.front(), self.up())
    }

    pub fn projection_perspective(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect, NEAR_PLANE, FAR_PLANE)
    }

    pub fn projection_orthographic(&self) -> Mat4 {
        Mat4::orthographic_rh(-self.aspect, self.aspect, -1.0, 1.0, NEAR_PLANE, FAR_PLANE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_looks_down_negative_z() {
        let cam = Camera::default();
        let front = cam.front();
        assert_relative_eq!(front.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(front.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(front.z, -1.0, epsilon = 1e-5);
        assert_relative_eq!(cam.right().x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(cam.up().y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut cam = Camera::default();
        cam.set_orientation(120.0, 0.0);
        assert_eq!(cam.pitch, PITCH_LIMIT);
        cam.set_orientation(-120.0, 0.0);
        assert_eq!(cam.pitch, -PITCH_LIMIT);
    }

    #[test]
    fn orientation_follows_entity_rotation() {
        let cam = Camera::default().oriented_by(Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0));
        // Zero yaw offset plus a quarter turn looks down +X.
        let front = cam.front();
        assert_relative_eq!(front.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(front.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn fov_is_clamped() {
        let mut cam = Camera::default();
        cam.set_fov(170.0);
        assert_eq!(cam.fov, MAX_FOV);
        cam.set_fov(0.0);
        assert_eq!(cam.fov, MIN_FOV);
    }
}
