//! # Scene Persistence: Save and Load Worlds as JSON
//!
//! A scene is every non-root entity of a [`World`], written in pre-order so
//! that each parent precedes its children. Entities are keyed by their
//! [`EntityUuid`], which survives the round trip; handles do not.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mundos::prelude::*;
//!
//! let data = save_scene(&world, &host)?;
//! save_scene_to_file(&world, &host, "level.json")?;
//!
//! // Replaces everything but the root.
//! let entities = load_scene(&mut world, &mut host, &data)?;
//! let entities = load_scene_from_file(&mut world, &mut host, "level.json")?;
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::Camera;
use crate::components::{EntityUuid, Mesh, Position, Rotation, Scale, Script};
use crate::ecs::{ArchetypeSpec, ComponentSet, ComponentValue, Entity, World};
use crate::error::SceneError;
use crate::math::Vec3;
use crate::script::ScriptHost;

// ── Scene Data (JSON wire format) ────────────────────────────────────────

/// A serialized scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneData {
    pub entities: Vec<SceneEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_camera: Option<Uuid>,
}

/// One entity. Absent fields mean the entity lacks that component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneEntity {
    pub name: String,
    pub uuid: Uuid,
    /// `None` for children of the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3>,
    /// Euler angles in radians.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<Mesh>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<Camera>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<SceneScript>,
}

/// A script slot. `key` names the behaviour in the host's registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneScript {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

fn enabled_default() -> bool {
    true
}

// ── Save / Load functions ────────────────────────────────────────────────

/// Capture every entity except the root.
pub fn save_scene(world: &World, host: &ScriptHost) -> Result<SceneData, SceneError> {
    let root = world.root();
    let mut entities = Vec::new();

    for entity in world.hierarchy().pre_order()? {
        if entity == root {
            continue;
        }
        let parent = world.parent(entity)?;
        let parent = if parent == root {
            None
        } else {
            Some(world.uuid_of(parent)?)
        };

        let script = world.try_get::<Script>(entity).map(|s| SceneScript {
            key: host.script_name_of(world, entity).map(str::to_string),
            enabled: s.enabled,
        });

        entities.push(SceneEntity {
            name: world.name_of(entity)?.to_string(),
            uuid: world.uuid_of(entity)?,
            parent,
            position: world.try_get::<Position>(entity).map(|p| p.value),
            rotation: world.try_get::<Rotation>(entity).map(|r| r.euler),
            scale: world.try_get::<Scale>(entity).map(|s| s.value),
            mesh: world.try_get::<Mesh>(entity),
            camera: world.try_get::<Camera>(entity),
            script,
        });
    }

    let active_camera = match world.active_camera() {
        Some((camera, _)) => Some(world.uuid_of(camera)?),
        None => None,
    };

    log::debug!("saved scene with {} entities", entities.len());
    Ok(SceneData {
        entities,
        active_camera,
    })
}

/// Replace the world's contents with `data`.
///
/// Behaviours of the previous contents get `on_destroy`; behaviours named in
/// the scene are created again and get `on_create`. A script key the host
/// does not know is logged and leaves a disabled, empty [`Script`].
///
/// Returns the new entities in file order.
/// A scene that fails validation leaves the world untouched.
pub fn load_scene(world: &mut World, host: &mut ScriptHost, data: &SceneData) -> Result<Vec<Entity>, SceneError> {
    validate_scene(data)?;
    world.clear()?;
    host.reap(world);

    let mut created = Vec::with_capacity(data.entities.len());
    let mut attach = Vec::new();

    for record in &data.entities {
        let parent = match record.parent {
            Some(uuid) => Some(world.entity_by_uuid(uuid).ok_or_else(|| SceneError::UnknownParent {
                name: record.name.clone(),
                parent: uuid,
            })?),
            None => None,
        };

        let mut values: Vec<ComponentValue> = vec![EntityUuid(record.uuid).into()];
        if let Some(v) = record.position {
            values.push(Position::from(v).into());
        }
        if let Some(v) = record.rotation {
            values.push(Rotation::from(v).into());
        }
        if let Some(v) = record.scale {
            values.push(Scale::from(v).into());
        }
        if let Some(mesh) = record.mesh {
            values.push(mesh.into());
        }
        if let Some(camera) = record.camera {
            values.push(camera.into());
        }
        if let Some(script) = &record.script {
            let known = script.key.as_deref().filter(|key| {
                let known = host.registry().contains(key);
                if !known {
                    log::warn!("entity \"{}\": unknown behavior \"{key}\", script disabled", record.name);
                }
                known
            });
            values.push(
                Script {
                    behavior: None,
                    enabled: script.enabled && (known.is_some() || script.key.is_none()),
                }
                .into(),
            );
            if let Some(key) = known {
                attach.push((created.len(), key));
            }
        }

        let spec = ArchetypeSpec::Custom(ComponentSet::default());
        created.push(world.create_with(spec, &record.name, parent, &values)?);
    }

    for (index, key) in attach {
        host.attach(world, created[index], key)?;
    }

    if let Some(uuid) = data.active_camera {
        match world.entity_by_uuid(uuid) {
            Some(camera) => world.set_active_camera(Some(camera))?,
            None => log::warn!("active camera {uuid} is not part of the scene"),
        }
    }

    log::info!("loaded scene with {} entities", created.len());
    Ok(created)
}

/// Check that UUIDs are unique and every parent precedes its children.
pub fn validate_scene(data: &SceneData) -> Result<(), SceneError> {
    let mut seen = HashSet::with_capacity(data.entities.len());
    for record in &data.entities {
        if let Some(parent) = record.parent {
            if !seen.contains(&parent) {
                return Err(SceneError::UnknownParent {
                    name: record.name.clone(),
                    parent,
                });
            }
        }
        if !seen.insert(record.uuid) {
            return Err(SceneError::DuplicateUuid(record.uuid));
        }
    }
    Ok(())
}

/// Save the scene as pretty-printed JSON.
pub fn save_scene_to_file(world: &World, host: &ScriptHost, path: impl AsRef<Path>) -> Result<(), SceneError> {
    let path = path.as_ref();
    let data = save_scene(world, host)?;
    let json = serde_json::to_string_pretty(&data)?;
    std::fs::write(path, json).map_err(|source| SceneError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("saved scene to {}", path.display());
    Ok(())
}

pub fn load_scene_from_file(
    world: &mut World,
    host: &mut ScriptHost,
    path: impl AsRef<Path>,
) -> Result<Vec<Entity>, SceneError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let data: SceneData = serde_json::from_str(&json)?;
    load_scene(world, host, &data)
}
