//! Built-in component records.
//!
//! Every component is a small `Copy` value. They are copied into and out of
//! archetype storage; none of them holds a reference back to its entity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::math::{Quat, Vec3, euler_rotation_matrix, euler_to_quat};
use crate::math::Mat4;
use crate::script::BehaviorHandle;

/// Local translation relative to the parent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position {
    pub value: Vec3,
}

impl Position {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            value: Vec3::new(x, y, z),
        }
    }
}

impl From<Vec3> for Position {
    fn from(value: Vec3) -> Self {
        Self { value }
    }
}

/// Local rotation as Euler angles in radians, applied X, then Y, then Z.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rotation {
    pub euler: Vec3,
}

impl Rotation {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            euler: Vec3::new(x, y, z),
        }
    }

    /// The same rotation as a quaternion.
    pub fn to_quat(&self) -> Quat {
        euler_to_quat(self.euler)
    }

    pub fn to_matrix(&self) -> Mat4 {
        euler_rotation_matrix(self.euler)
    }
}

impl From<Vec3> for Rotation {
    fn from(euler: Vec3) -> Self {
        Self { euler }
    }
}

/// Local per-axis scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scale {
    pub value: Vec3,
}

impl Scale {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            value: Vec3::new(x, y, z),
        }
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self { value: Vec3::ONE }
    }
}

impl From<Vec3> for Scale {
    fn from(value: Vec3) -> Self {
        Self { value }
    }
}

/// Indices into the render collaborator's mesh and shader tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub mesh_index: u32,
    pub shader_index: u32,
}

impl Mesh {
    pub const fn new(mesh_index: u32, shader_index: u32) -> Self {
        Self {
            mesh_index,
            shader_index,
        }
    }
}

/// Attaches a behaviour instance owned by the
/// [`ScriptHost`](crate::script::ScriptHost).
///
/// `behavior` is `None` until a behaviour is attached. Disabled scripts are
/// skipped by the update pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Script {
    pub behavior: Option<BehaviorHandle>,
    pub enabled: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            behavior: None,
            enabled: true,
        }
    }
}

/// Stable identity that survives save/load. Every entity gets one at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityUuid(pub Uuid);

impl EntityUuid {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}
