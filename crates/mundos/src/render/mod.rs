//! # Render Hand-off: Draw Calls for an External Renderer
//!
//! Mundos does not own a GPU. After the script pass joins, the frame loop
//! walks every entity that has a [`Mesh`] and a full local transform, resolves
//! its world matrix through the hierarchy and hands a [`DrawCall`] to a
//! [`RenderSink`]. The sink decides what a mesh or shader index means.
//!
//! ## Uniform Layout
//!
//! A renderer typically uploads the model matrix of each draw as a uniform.
//! [`ModelUniform`] is the `#[repr(C)]` layout for that, castable to bytes
//! with `bytemuck`:
//!
//! ```text
//! ModelUniform (64 bytes)
//! ┌──────────────────────────────┐
//! │ model  [[f32; 4]; 4]         │
//! │ column-major, offset 0       │
//! └──────────────────────────────┘
//! ```

use bytemuck::{Pod, Zeroable};

use crate::components::Mesh;
use crate::ecs::{ComponentKind, ComponentSet, Entity, World, propagate_world_matrices};
use crate::error::WorldError;
use crate::math::{Mat4, Vec3};

/// One mesh to draw this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub entity: Entity,
    pub mesh_index: u32,
    pub shader_index: u32,
    /// Local-to-world matrix.
    pub model: Mat4,
}

impl DrawCall {
    pub fn uniform(&self) -> ModelUniform {
        ModelUniform::from(self.model)
    }
}

/// Receives draw calls. Implemented by whatever owns the GPU.
pub trait RenderSink {
    /// Called once per frame before any draw, with the active camera if one
    /// is set.
    fn begin_frame(&mut self, _camera: Option<&CameraView>) {}

    fn submit(&mut self, draw: DrawCall);

    fn end_frame(&mut self) {}
}

/// A sink that keeps every draw call, mostly for tests and tools.
#[derive(Debug, Default)]
pub struct CollectSink {
    pub camera: Option<CameraView>,
    pub draws: Vec<DrawCall>,
}

impl RenderSink for CollectSink {
    fn begin_frame(&mut self, camera: Option<&CameraView>) {
        self.camera = camera.copied();
        self.draws.clear();
    }

    fn submit(&mut self, draw: DrawCall) {
        self.draws.push(draw);
    }
}

/// Model matrix as uploaded to a uniform buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ModelUniform {
    pub model: [[f32; 4]; 4],
}

impl From<Mat4> for ModelUniform {
    fn from(model: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
        }
    }
}

/// View and projection of the active camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub entity: Entity,
    pub view: Mat4,
    pub projection: Mat4,
    /// World-space eye position.
    pub position: Vec3,
}

impl CameraView {
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

const DRAWABLE: ComponentSet = ComponentSet::of(&[
    ComponentKind::Position,
    ComponentKind::Rotation,
    ComponentKind::Scale,
    ComponentKind::Mesh,
]);

/// Every drawable entity with its world matrix, in archetype order.
pub fn collect_draw_calls(world: &World) -> Result<Vec<DrawCall>, WorldError> {
    let matrices = propagate_world_matrices(world)?;
    let mut draws = Vec::new();
    for block in world.query_blocks(DRAWABLE) {
        let Some(meshes) = block.column::<Mesh>() else {
            continue;
        };
        for (&entity, mesh) in block.entities().iter().zip(meshes) {
            let model = match matrices.get(&entity) {
                Some(m) => *m,
                None => world.world_matrix(entity)?,
            };
            draws.push(DrawCall {
                entity,
                mesh_index: mesh.mesh_index,
                shader_index: mesh.shader_index,
                model,
            });
        }
    }
    Ok(draws)
}

/// The active camera's view, or `None` when no camera is active.
///
/// The eye sits at the camera's world translation; the look direction comes
/// from its local rotation.
pub fn camera_view(world: &World) -> Result<Option<CameraView>, WorldError> {
    let Some((entity, camera)) = world.active_camera() else {
        return Ok(None);
    };
    let euler = world
        .try_get::<crate::components::Rotation>(entity)
        .map(|r| r.euler)
        .unwrap_or(Vec3::ZERO);
    let camera = camera.oriented_by(euler);
    let position = world.world_matrix(entity)?.w_axis.truncate();
    Ok(Some(CameraView {
        entity,
        view: camera.view_matrix(position),
        projection: camera.projection_perspective(),
        position,
    }))
}

/// Collect and submit one frame. Returns the number of draw calls.
pub fn submit_frame(world: &World, sink: &mut dyn RenderSink) -> Result<usize, WorldError> {
    let camera = camera_view(world)?;
    let draws = collect_draw_calls(world)?;
    sink.begin_frame(camera.as_ref());
    let count = draws.len();
    for draw in draws {
        sink.submit(draw);
    }
    sink.end_frame();
    Ok(count)
}
