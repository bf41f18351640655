//! # World: Entities, Components and the Scene Tree
//!
//! The [`World`] owns every entity, its components (grouped into archetypes)
//! and its place in the [`Hierarchy`]. There is no global instance: callers
//! create one and pass it to the script host, the render collection and the
//! scene loader. Several worlds can live side by side.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ World                                                │
//! │  allocator:  generational ids                        │
//! │  archetypes: BTreeMap<ComponentSet, Archetype>       │
//! │  locations:  entity index → (set, row)               │
//! │  hierarchy:  parent / children / name per entity     │
//! │  uuids:      Uuid → Entity                           │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Archetypes are keyed by an ordered bitmask, so every walk over them
//! (queries, the script pass, snapshots) visits them in the same order.
//!
//! The root entity is created with the world and lives as long as it does.
//! It carries only an [`EntityUuid`] and is excluded from transform
//! composition.

use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use super::archetype::Archetype;
use super::component::{Component, ComponentKind, ComponentSet, ComponentValue};
use super::entity::{Entity, EntityAllocator};
use super::hierarchy::Hierarchy;
use super::query::{QueryBlock, QueryParam};
use crate::camera::Camera;
use crate::components::EntityUuid;
use crate::error::WorldError;
use crate::math::Mat4;

/// Display name of the root entity.
pub const ROOT_NAME: &str = "Root";

/// The component layout a new entity starts with. [`EntityUuid`] is always
/// added on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchetypeSpec {
    /// Position, Rotation, Scale.
    EmptyNode,
    /// An empty node plus a Mesh.
    Model,
    /// An empty node plus Camera and Script.
    Camera,
    /// A bare Script.
    Script,
    Custom(ComponentSet),
}

impl ArchetypeSpec {
    const TRANSFORM: ComponentSet = ComponentSet::of(&[
        ComponentKind::Position,
        ComponentKind::Rotation,
        ComponentKind::Scale,
    ]);

    pub fn components(self) -> ComponentSet {
        let set = match self {
            ArchetypeSpec::EmptyNode => Self::TRANSFORM,
            ArchetypeSpec::Model => Self::TRANSFORM.with(ComponentKind::Mesh),
            ArchetypeSpec::Camera => Self::TRANSFORM
                .with(ComponentKind::Camera)
                .with(ComponentKind::Script),
            ArchetypeSpec::Script => ComponentSet::of(&[ComponentKind::Script]),
            ArchetypeSpec::Custom(set) => set,
        };
        set.with(ComponentKind::Uuid)
    }
}

/// Where an entity's row lives.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EntityLocation {
    set: ComponentSet,
    row: usize,
}

/// The entity registry.
pub struct World {
    allocator: EntityAllocator,
    archetypes: BTreeMap<ComponentSet, Archetype>,
    locations: HashMap<u32, EntityLocation>,
    hierarchy: Hierarchy,
    uuids: HashMap<Uuid, Entity>,
    active_camera: Option<Entity>,
    #[cfg(feature = "diagnostics")]
    spawned_this_frame: u32,
    #[cfg(feature = "diagnostics")]
    destroyed_this_frame: u32,
}

impl World {
    pub fn new() -> Self {
        Self::with_allocator(EntityAllocator::new())
    }

    /// A world that refuses to hold more than `limit` entity slots (root
    /// included). Creation past the limit fails with
    /// [`WorldError::Exhausted`].
    pub fn with_entity_limit(limit: u32) -> Self {
        Self::with_allocator(EntityAllocator::with_limit(limit.max(1)))
    }

    fn with_allocator(mut allocator: EntityAllocator) -> Self {
        let root = allocator
            .allocate()
            .expect("a fresh allocator always has room for the root");
        let mut world = Self {
            allocator,
            archetypes: BTreeMap::new(),
            locations: HashMap::new(),
            hierarchy: Hierarchy::new(root, ROOT_NAME),
            uuids: HashMap::new(),
            active_camera: None,
            #[cfg(feature = "diagnostics")]
            spawned_this_frame: 0,
            #[cfg(feature = "diagnostics")]
            destroyed_this_frame: 0,
        };
        let uuid = EntityUuid::new_v4();
        world.insert_row(root, ComponentSet::of(&[ComponentKind::Uuid]), &[uuid.into()]);
        world.uuids.insert(uuid.0, root);
        log::debug!("world created, root {root}");
        world
    }

    fn insert_row(&mut self, entity: Entity, set: ComponentSet, values: &[ComponentValue]) {
        let arch = self
            .archetypes
            .entry(set)
            .or_insert_with(|| Archetype::new(set));
        let row = arch.push_row(entity, values);
        self.locations.insert(entity.index, EntityLocation { set, row });
    }

    // ── Lookup ────────────────────────────────────────────────────────

    pub fn root(&self) -> Entity {
        self.hierarchy.root()
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    /// Live entities, root included.
    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    /// Archetypes that currently hold at least one entity.
    pub fn archetype_count(&self) -> usize {
        self.archetypes.values().filter(|a| !a.is_empty()).count()
    }

    /// Every live entity, pre-order from the root.
    pub fn entities(&self) -> Result<Vec<Entity>, WorldError> {
        self.hierarchy.pre_order()
    }

    fn location(&self, entity: Entity) -> Result<EntityLocation, WorldError> {
        if !self.allocator.is_alive(entity) {
            return Err(WorldError::DeadEntity(entity));
        }
        self.locations
            .get(&entity.index)
            .copied()
            .ok_or(WorldError::DeadEntity(entity))
    }

    fn ensure_alive(&self, entity: Entity) -> Result<(), WorldError> {
        self.location(entity).map(|_| ())
    }

    /// The entity's current component set.
    pub fn components_of(&self, entity: Entity) -> Result<ComponentSet, WorldError> {
        Ok(self.location(entity)?.set)
    }

    /// Runtime-typed copies of all of an entity's components, ascending by
    /// kind.
    pub fn values_of(&self, entity: Entity) -> Result<Vec<ComponentValue>, WorldError> {
        let loc = self.location(entity)?;
        let arch = self
            .archetypes
            .get(&loc.set)
            .ok_or(WorldError::DeadEntity(entity))?;
        Ok(arch.row_values(loc.row))
    }

    pub fn entity_by_uuid(&self, uuid: Uuid) -> Option<Entity> {
        self.uuids.get(&uuid).copied()
    }

    /// First entity with this name, in pre-order.
    pub fn entity_by_name(&self, name: &str) -> Option<Entity> {
        self.hierarchy
            .pre_order()
            .ok()?
            .into_iter()
            .find(|&e| self.hierarchy.name(e).is_ok_and(|n| n == name))
    }

    pub fn uuid_of(&self, entity: Entity) -> Result<Uuid, WorldError> {
        Ok(self.get::<EntityUuid>(entity)?.0)
    }

    pub fn name_of(&self, entity: Entity) -> Result<&str, WorldError> {
        self.ensure_alive(entity)?;
        self.hierarchy.name(entity)
    }

    pub fn rename(&mut self, entity: Entity, name: &str) -> Result<(), WorldError> {
        self.ensure_alive(entity)?;
        self.hierarchy.rename(entity, name)
    }

    pub fn parent(&self, entity: Entity) -> Result<Entity, WorldError> {
        self.ensure_alive(entity)?;
        self.hierarchy.parent(entity)
    }

    pub fn children(&self, entity: Entity) -> Result<&[Entity], WorldError> {
        self.ensure_alive(entity)?;
        self.hierarchy.children(entity)
    }

    /// Move `entity` (with its subtree) under `new_parent`, appended after
    /// the existing children.
    pub fn reparent(&mut self, entity: Entity, new_parent: Entity) -> Result<(), WorldError> {
        self.ensure_alive(entity)?;
        self.ensure_alive(new_parent)?;
        self.hierarchy.reparent(entity, new_parent)?;
        log::debug!("reparented {entity} under {new_parent}");
        Ok(())
    }

    /// World-space model matrix of `entity`. See [`crate::ecs::transform`].
    pub fn world_matrix(&self, entity: Entity) -> Result<Mat4, WorldError> {
        super::transform::world_matrix(self, entity)
    }

    // ── Create / Destroy ──────────────────────────────────────────────

    /// Create an entity under `parent` (the root when `None`). Every
    /// component starts at its default and a fresh UUID is assigned.
    pub fn create(
        &mut self,
        spec: ArchetypeSpec,
        name: &str,
        parent: Option<Entity>,
    ) -> Result<Entity, WorldError> {
        self.create_with(spec, name, parent, &[])
    }

    /// Like [`create`](Self::create), with explicit starting values. Values
    /// whose kind is not in `spec` extend the set. A supplied
    /// [`EntityUuid`] is kept instead of generating one.
    pub fn create_with(
        &mut self,
        spec: ArchetypeSpec,
        name: &str,
        parent: Option<Entity>,
        values: &[ComponentValue],
    ) -> Result<Entity, WorldError> {
        let parent = parent.unwrap_or(self.root());
        self.ensure_alive(parent)?;

        let set = values
            .iter()
            .fold(spec.components(), |set, v| set.with(v.kind()));
        let uuid = values
            .iter()
            .rev()
            .find_map(|v| EntityUuid::from_value(*v))
            .unwrap_or_else(EntityUuid::new_v4);
        if self.uuids.contains_key(&uuid.0) {
            return Err(WorldError::DuplicateUuid(uuid.0));
        }

        let entity = self.allocator.allocate()?;
        let mut row_values = values.to_vec();
        row_values.push(uuid.into());
        self.insert_row(entity, set, &row_values);
        self.hierarchy.attach(entity, parent, name)?;
        self.uuids.insert(uuid.0, entity);

        #[cfg(feature = "diagnostics")]
        {
            self.spawned_this_frame += 1;
        }
        log::trace!("created {entity} \"{name}\" {set:?} under {parent}");
        Ok(entity)
    }

    /// Destroy `entity` and everything below it. Parents go before their
    /// children; the destroyed handles are returned in that order.
    pub fn destroy(&mut self, entity: Entity) -> Result<Vec<Entity>, WorldError> {
        self.ensure_alive(entity)?;
        if entity == self.root() {
            return Err(WorldError::RootProtected);
        }
        let removed = self.hierarchy.remove_subtree(entity)?;
        for &e in &removed {
            self.release(e);
        }
        log::debug!("destroyed {entity} ({} entities)", removed.len());
        Ok(removed)
    }

    /// Drop the storage row and id of one entity. The hierarchy node must
    /// already be gone.
    fn release(&mut self, entity: Entity) {
        if let Ok(uuid) = self.uuid_of(entity) {
            self.uuids.remove(&uuid);
        }
        if let Some(loc) = self.locations.remove(&entity.index) {
            if let Some(arch) = self.archetypes.get_mut(&loc.set) {
                if let Some(swapped) = arch.swap_remove(loc.row) {
                    if let Some(swapped_loc) = self.locations.get_mut(&swapped.index) {
                        swapped_loc.row = loc.row;
                    }
                }
            }
        }
        if self.active_camera == Some(entity) {
            self.active_camera = None;
        }
        self.allocator.deallocate(entity);
        #[cfg(feature = "diagnostics")]
        {
            self.destroyed_this_frame += 1;
        }
    }

    /// Destroy every entity except the root.
    pub fn clear(&mut self) -> Result<(), WorldError> {
        let root = self.root();
        for child in self.hierarchy.children(root)?.to_vec() {
            self.destroy(child)?;
        }
        self.active_camera = None;
        log::info!("world cleared");
        Ok(())
    }

    // ── Component access ──────────────────────────────────────────────

    pub fn get_ref<T: Component>(&self, entity: Entity) -> Result<&T, WorldError> {
        let loc = self.location(entity)?;
        let column = self
            .archetypes
            .get(&loc.set)
            .and_then(|a| a.column(T::KIND))
            .ok_or(WorldError::MissingComponent {
                entity,
                kind: T::KIND,
            })?;
        Ok(column.get::<T>(loc.row))
    }

    /// A copy of the component.
    pub fn get<T: Component>(&self, entity: Entity) -> Result<T, WorldError> {
        self.get_ref::<T>(entity).copied()
    }

    /// Mutable access in place. Use [`set`](Self::set) for [`EntityUuid`] so
    /// the UUID index follows the change.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T, WorldError> {
        let loc = self.location(entity)?;
        let column = self
            .archetypes
            .get_mut(&loc.set)
            .and_then(|a| a.column_mut(T::KIND))
            .ok_or(WorldError::MissingComponent {
                entity,
                kind: T::KIND,
            })?;
        Ok(column.get_mut::<T>(loc.row))
    }

    pub fn try_get<T: Component>(&self, entity: Entity) -> Option<T> {
        self.get::<T>(entity).ok()
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.has_kind(entity, T::KIND)
    }

    pub fn has_kind(&self, entity: Entity, kind: ComponentKind) -> bool {
        self.location(entity).is_ok_and(|loc| loc.set.contains(kind))
    }

    /// Overwrite a component the entity already has.
    pub fn set<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), WorldError> {
        self.set_value(entity, value.into_value())
    }

    /// Runtime-typed [`set`](Self::set).
    pub fn set_value(&mut self, entity: Entity, value: ComponentValue) -> Result<(), WorldError> {
        let loc = self.location(entity)?;
        let kind = value.kind();
        if let ComponentValue::Uuid(uuid) = value {
            self.rebind_uuid(entity, uuid.0)?;
        }
        let column = self
            .archetypes
            .get_mut(&loc.set)
            .and_then(|a| a.column_mut(kind))
            .ok_or(WorldError::MissingComponent { entity, kind })?;
        column.set_value(loc.row, value);
        Ok(())
    }

    fn rebind_uuid(&mut self, entity: Entity, uuid: Uuid) -> Result<(), WorldError> {
        match self.uuids.get(&uuid) {
            Some(&owner) if owner == entity => return Ok(()),
            Some(_) => return Err(WorldError::DuplicateUuid(uuid)),
            None => {}
        }
        let old = self.uuid_of(entity)?;
        self.uuids.remove(&old);
        self.uuids.insert(uuid, entity);
        Ok(())
    }

    /// Add a component. If the entity already has one of this kind it is
    /// replaced in place; otherwise the entity migrates to the archetype with
    /// the extra kind and every other value is carried over unchanged.
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), WorldError> {
        self.add_value(entity, value.into_value())
    }

    /// Runtime-typed [`add_component`](Self::add_component).
    pub fn add_value(&mut self, entity: Entity, value: ComponentValue) -> Result<(), WorldError> {
        let loc = self.location(entity)?;
        if loc.set.contains(value.kind()) {
            return self.set_value(entity, value);
        }
        self.migrate(entity, loc, loc.set.with(value.kind()), Some(value))
    }

    /// Remove a component, migrating the entity to the smaller archetype.
    /// Returns the removed value. The UUID can't be removed.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<T, WorldError> {
        let value = self.remove_kind(entity, T::KIND)?;
        T::from_value(value).ok_or(WorldError::MissingComponent {
            entity,
            kind: T::KIND,
        })
    }

    /// Runtime-typed [`remove_component`](Self::remove_component).
    pub fn remove_kind(&mut self, entity: Entity, kind: ComponentKind) -> Result<ComponentValue, WorldError> {
        if kind == ComponentKind::Uuid {
            return Err(WorldError::Protected(kind));
        }
        let loc = self.location(entity)?;
        let value = self
            .archetypes
            .get(&loc.set)
            .and_then(|a| a.column(kind))
            .map(|c| c.value(loc.row))
            .ok_or(WorldError::MissingComponent { entity, kind })?;
        self.migrate(entity, loc, loc.set.without(kind), None)?;
        if kind == ComponentKind::Camera && self.active_camera == Some(entity) {
            self.active_camera = None;
        }
        Ok(value)
    }

    fn migrate(
        &mut self,
        entity: Entity,
        loc: EntityLocation,
        new_set: ComponentSet,
        added: Option<ComponentValue>,
    ) -> Result<(), WorldError> {
        let mut src = self
            .archetypes
            .remove(&loc.set)
            .ok_or(WorldError::DeadEntity(entity))?;
        let dst = self
            .archetypes
            .entry(new_set)
            .or_insert_with(|| Archetype::new(new_set));
        let (new_row, swapped) = src.move_row(loc.row, dst);
        if let Some(value) = added {
            if let Some(column) = dst.column_mut(value.kind()) {
                column.push_value(value);
            }
        }
        self.archetypes.insert(loc.set, src);

        if let Some(swapped) = swapped {
            if let Some(swapped_loc) = self.locations.get_mut(&swapped.index) {
                swapped_loc.row = loc.row;
            }
        }
        self.locations.insert(
            entity.index,
            EntityLocation {
                set: new_set,
                row: new_row,
            },
        );
        Ok(())
    }

    // ── Active camera ─────────────────────────────────────────────────

    /// Pick the camera the renderer looks through. The entity must carry a
    /// [`Camera`]; `None` clears the selection.
    pub fn set_active_camera(&mut self, camera: Option<Entity>) -> Result<(), WorldError> {
        if let Some(entity) = camera {
            self.ensure_alive(entity)?;
            if !self.has::<Camera>(entity) {
                return Err(WorldError::NotACamera(entity));
            }
        }
        self.active_camera = camera;
        Ok(())
    }

    pub fn active_camera(&self) -> Option<(Entity, Camera)> {
        let entity = self.active_camera?;
        self.try_get::<Camera>(entity).map(|cam| (entity, cam))
    }

    // ── Queries ───────────────────────────────────────────────────────

    /// One read-only block per non-empty archetype whose set contains all of
    /// `required`.
    pub fn query_blocks(&self, required: ComponentSet) -> impl Iterator<Item = QueryBlock<'_>> {
        self.archetypes
            .values()
            .filter(move |a| !a.is_empty() && a.set().contains_all(required))
            .map(|a| QueryBlock {
                set: a.set(),
                entities: &a.entities,
                columns: &a.columns,
            })
    }

    /// Entities matching `required`, in archetype then row order.
    pub fn query_entities(&self, required: ComponentSet) -> Vec<Entity> {
        self.query_blocks(required)
            .flat_map(|b| b.entities().iter().copied())
            .collect()
    }

    /// Call `f` once per matching entity with the requested components.
    ///
    /// ```ignore
    /// world.query::<(&mut Position, &Scale)>(|entity, (pos, scale)| {
    ///     pos.value *= scale.value;
    /// });
    /// ```
    pub fn query<Q: QueryParam>(&mut self, mut f: impl FnMut(Entity, Q::Item<'_>)) {
        let required = Q::kinds();
        for arch in self.archetypes.values_mut() {
            if arch.is_empty() || !arch.set().contains_all(required) {
                continue;
            }
            let mut cols = Q::extract(&mut arch.columns);
            for (row, &entity) in arch.entities.iter().enumerate() {
                f(entity, Q::fetch(&mut cols, row));
            }
            Q::restore(cols, &mut arch.columns);
        }
    }

    /// Call `f` once per matching archetype with whole columns, row-aligned
    /// with the entity slice.
    pub fn query_slices<Q: QueryParam>(&mut self, mut f: impl FnMut(&[Entity], Q::Slice<'_>)) {
        let required = Q::kinds();
        for arch in self.archetypes.values_mut() {
            if arch.is_empty() || !arch.set().contains_all(required) {
                continue;
            }
            let mut cols = Q::extract(&mut arch.columns);
            f(&arch.entities, Q::slice(&mut cols));
            Q::restore(cols, &mut arch.columns);
        }
    }

    // ── Diagnostics ───────────────────────────────────────────────────

    /// Archetype and entity snapshot for the diagnostics output.
    #[cfg(feature = "diagnostics")]
    pub(crate) fn diagnostics_archetypes(&self, expanded: &[usize]) -> Vec<crate::diag::ArchetypeInfo> {
        self.archetypes
            .values()
            .filter(|a| !a.is_empty())
            .enumerate()
            .map(|(idx, arch)| {
                let entities = expanded.contains(&idx).then(|| {
                    arch.entities
                        .iter()
                        .enumerate()
                        .map(|(row, &entity)| crate::diag::EntityInfo {
                            id: entity.index(),
                            generation: entity.generation(),
                            name: self.hierarchy.name(entity).unwrap_or("?").to_string(),
                            parent_id: self.hierarchy.parent(entity).ok().map(Entity::index),
                            components: arch
                                .row_values(row)
                                .into_iter()
                                .map(|v| crate::diag::ComponentInfo {
                                    name: format!("{:?}", v.kind()),
                                    debug_value: format!("{v:?}"),
                                })
                                .collect(),
                        })
                        .collect()
                });
                crate::diag::ArchetypeInfo {
                    entity_count: arch.len(),
                    component_names: arch.set().iter().map(|k| format!("{k:?}")).collect(),
                    entities,
                }
            })
            .collect()
    }

    /// Entity pool statistics. Resets the per-frame counters.
    #[cfg(feature = "diagnostics")]
    pub(crate) fn diagnostics_entity_stats(&mut self) -> crate::diag::EntityPoolSnapshot {
        let stats = crate::diag::EntityPoolSnapshot {
            total_slots: self.allocator.total_slots(),
            free_count: self.allocator.free_count(),
            alive_count: self.allocator.alive_count(),
            spawned_this_frame: self.spawned_this_frame,
            destroyed_this_frame: self.destroyed_this_frame,
        };
        self.spawned_this_frame = 0;
        self.destroyed_this_frame = 0;
        stats
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
