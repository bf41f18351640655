//! Deferred world mutations queued by behaviours.
//!
//! Commands are plain data. The [`ScriptHost`](super::ScriptHost) applies
//! them after the parallel join, job by job in the order the jobs were
//! built, and within a job in the order they were pushed. That makes every
//! piece of shared state (the camera lock flag, the active camera, the
//! tree) single-writer.

use crate::ecs::{ArchetypeSpec, ComponentKind, ComponentValue, Entity};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Overwrite a component the entity already has.
    Set { entity: Entity, value: ComponentValue },
    /// Add or replace a component, migrating if needed.
    Add { entity: Entity, value: ComponentValue },
    Remove { entity: Entity, kind: ComponentKind },
    /// Flip the `locked` flag of the entity's camera.
    ToggleCameraLock(Entity),
    SetCameraLocked { entity: Entity, locked: bool },
    SetActiveCamera(Option<Entity>),
    Reparent { entity: Entity, parent: Entity },
    /// Destroy the entity and its subtree, running `on_destroy` first.
    Destroy(Entity),
    Create {
        spec: ArchetypeSpec,
        name: String,
        parent: Option<Entity>,
        values: Vec<ComponentValue>,
    },
}

/// An ordered command buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Commands {
    queue: Vec<Command>,
}

impl Commands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.queue.push(command);
    }

    pub fn set(&mut self, entity: Entity, value: impl Into<ComponentValue>) {
        self.push(Command::Set {
            entity,
            value: value.into(),
        });
    }

    pub fn add(&mut self, entity: Entity, value: impl Into<ComponentValue>) {
        self.push(Command::Add {
            entity,
            value: value.into(),
        });
    }

    pub fn remove(&mut self, entity: Entity, kind: ComponentKind) {
        self.push(Command::Remove { entity, kind });
    }

    pub fn toggle_camera_lock(&mut self, entity: Entity) {
        self.push(Command::ToggleCameraLock(entity));
    }

    pub fn set_camera_locked(&mut self, entity: Entity, locked: bool) {
        self.push(Command::SetCameraLocked { entity, locked });
    }

    pub fn set_active_camera(&mut self, camera: Option<Entity>) {
        self.push(Command::SetActiveCamera(camera));
    }

    pub fn reparent(&mut self, entity: Entity, parent: Entity) {
        self.push(Command::Reparent { entity, parent });
    }

    pub fn destroy(&mut self, entity: Entity) {
        self.push(Command::Destroy(entity));
    }

    pub fn create(&mut self, spec: ArchetypeSpec, name: &str, parent: Option<Entity>) {
        self.push(Command::Create {
            spec,
            name: name.to_string(),
            parent,
            values: Vec::new(),
        });
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn into_vec(self) -> Vec<Command> {
        self.queue
    }
}
