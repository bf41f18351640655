//! Convenience re-exports for the common case.

pub use crate::camera::Camera;
pub use crate::components::{EntityUuid, Mesh, Position, Rotation, Scale, Script};
pub use crate::config::EngineConfig;
pub use crate::ecs::{ArchetypeSpec, Component, ComponentKind, ComponentSet, Entity, World};
pub use crate::error::{SceneError, WorldError};
pub use crate::frame::{FrameReport, Runtime};
pub use crate::input::{InputState, Key, MouseButton};
pub use crate::math::{Mat4, Quat, Transform, Vec2, Vec3};
pub use crate::render::{CameraView, DrawCall, RenderSink};
pub use crate::scene::{load_scene, load_scene_from_file, save_scene, save_scene_to_file};
pub use crate::script::{Behavior, BehaviorRegistry, Commands, FlyCamera, ScriptContext, ScriptHost};
pub use crate::time::Time;
