//! Error types for the world, the hierarchy, and scene persistence.
//!
//! Every fallible operation on a [`World`](crate::ecs::World) returns a
//! [`WorldError`]. These are almost always programmer errors (a stale handle,
//! a component that was never added), so nothing in the core retries them. They
//! bubble up to the frame loop, which decides whether to drop the frame or shut
//! down.

use std::path::PathBuf;

use uuid::Uuid;

use crate::ecs::Entity;
use crate::ecs::component::ComponentKind;

/// Failures raised by the entity registry, hierarchy and transform resolver.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// The handle was destroyed, or its slot has been recycled.
    #[error("entity {0} is not alive")]
    DeadEntity(Entity),

    /// The entity's archetype does not contain the requested component.
    #[error("entity {entity} has no `{kind:?}` component")]
    MissingComponent { entity: Entity, kind: ComponentKind },

    /// The entity is alive in the store but has no hierarchy entry.
    #[error("entity {0} has no hierarchy node")]
    NoHierarchyNode(Entity),

    /// A parent chain loops back on itself, or a reparent would create a loop.
    #[error("hierarchy cycle detected at entity {0}")]
    HierarchyCycle(Entity),

    /// A parent chain ends somewhere other than the root.
    #[error("entity {entity} points at parent {parent}, which is not in the hierarchy")]
    Orphan { entity: Entity, parent: Entity },

    /// The root entity can't be destroyed or reparented.
    #[error("the root entity cannot be destroyed or reparented")]
    RootProtected,

    /// The component is part of the entity's identity and can't be removed.
    #[error("`{0:?}` cannot be removed from an entity")]
    Protected(ComponentKind),

    /// Another live entity already carries this UUID.
    #[error("uuid {0} is already in use")]
    DuplicateUuid(Uuid),

    /// The 32-bit entity index space is used up.
    #[error("entity storage exhausted")]
    Exhausted,

    /// The entity has no camera component.
    #[error("entity {0} is not a camera")]
    NotACamera(Entity),

    /// No behaviour factory is registered under this key.
    #[error("no behavior registered as \"{0}\"")]
    UnknownBehavior(String),

    /// A script component points at a behaviour slot that no longer exists.
    #[error("entity {0} references a behavior that was already released")]
    StaleBehavior(Entity),
}

/// Failures raised while saving or loading a scene.
#[derive(thiserror::Error, Debug)]
pub enum SceneError {
    /// Reading or writing the scene file failed.
    #[error("scene I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The scene JSON is malformed.
    #[error("scene JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A record references a parent that appears nowhere earlier in the file.
    #[error("entity \"{name}\" references unknown parent {parent}")]
    UnknownParent { name: String, parent: Uuid },

    /// Two records share the same UUID.
    #[error("duplicate entity uuid {0}")]
    DuplicateUuid(Uuid),

    /// Recreating an entity failed.
    #[error(transparent)]
    World(#[from] WorldError),
}
