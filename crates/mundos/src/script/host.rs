use std::time::Instant;

use rayon::prelude::*;

use super::behavior::{Behavior, BehaviorRegistry, ScriptContext};
use super::commands::Command;
use super::BehaviorHandle;
use crate::camera::Camera;
use crate::components::{Position, Rotation, Scale, Script};
use crate::ecs::transform::local_transform;
use crate::ecs::{ComponentKind, ComponentSet, Entity, World};
use crate::error::WorldError;
use crate::input::InputState;
use crate::math::Transform;
use crate::time::Time;

struct BehaviorSlot {
    entity: Entity,
    key: String,
    behavior: Box<dyn Behavior>,
}

/// One `on_update` call in the parallel phase.
struct Job<'w> {
    handle: BehaviorHandle,
    slot: BehaviorSlot,
    /// Transform kinds the entity actually has; only these are pushed back.
    kinds: ComponentSet,
    ctx: ScriptContext<'w>,
}

/// What one script pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UpdateReport {
    pub scripts_run: usize,
    pub commands_applied: usize,
    /// Behaviours dropped because their entity or script slot went away.
    pub reaped: usize,
    pub elapsed_us: f64,
}

const TRANSFORM_KINDS: ComponentSet = ComponentSet::of(&[
    ComponentKind::Position,
    ComponentKind::Rotation,
    ComponentKind::Scale,
]);

/// Owns behaviour instances and runs them against a [`World`].
pub struct ScriptHost {
    registry: BehaviorRegistry,
    slots: Vec<Option<BehaviorSlot>>,
    free: Vec<u32>,
    parallel: bool,
}

impl ScriptHost {
    pub fn new(registry: BehaviorRegistry) -> Self {
        Self {
            registry,
            slots: Vec::new(),
            free: Vec::new(),
            parallel: true,
        }
    }

    pub fn registry(&self) -> &BehaviorRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut BehaviorRegistry {
        &mut self.registry
    }

    /// Run `on_update` on the rayon pool (the default) or on the calling
    /// thread.
    pub fn set_parallel(&mut self, parallel: bool) {
        self.parallel = parallel;
    }

    /// Live behaviour instances.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registry key the behaviour was created from.
    pub fn script_name(&self, handle: BehaviorHandle) -> Option<&str> {
        self.slots
            .get(handle.0 as usize)?
            .as_ref()
            .map(|s| s.key.as_str())
    }

    /// Registry key of the behaviour attached to `entity`.
    pub fn script_name_of(&self, world: &World, entity: Entity) -> Option<&str> {
        let handle = world.try_get::<Script>(entity)?.behavior?;
        self.slot(handle, entity).map(|s| s.key.as_str())
    }

    fn slot(&self, handle: BehaviorHandle, entity: Entity) -> Option<&BehaviorSlot> {
        self.slots
            .get(handle.0 as usize)?
            .as_ref()
            .filter(|s| s.entity == entity)
    }

    fn take_slot(&mut self, handle: BehaviorHandle, entity: Entity) -> Option<BehaviorSlot> {
        let cell = self.slots.get_mut(handle.0 as usize)?;
        if cell.as_ref().is_some_and(|s| s.entity == entity) {
            cell.take()
        } else {
            None
        }
    }

    fn put_slot(&mut self, handle: BehaviorHandle, slot: BehaviorSlot) {
        self.slots[handle.0 as usize] = Some(slot);
    }

    fn release_handle(&mut self, handle: BehaviorHandle) {
        if let Some(cell) = self.slots.get_mut(handle.0 as usize) {
            *cell = None;
            self.free.push(handle.0);
        }
    }

    fn allocate(&mut self, slot: BehaviorSlot) -> BehaviorHandle {
        match self.free.pop() {
            Some(index) => {
                self.slots[index as usize] = Some(slot);
                BehaviorHandle(index)
            }
            None => {
                self.slots.push(Some(slot));
                BehaviorHandle(self.slots.len() as u32 - 1)
            }
        }
    }

    /// Run one lifecycle callback outside the parallel phase and apply what
    /// it queued.
    fn run_callback(
        &mut self,
        world: &mut World,
        slot: &mut BehaviorSlot,
        f: impl FnOnce(&mut dyn Behavior, &mut ScriptContext<'_>),
    ) -> usize {
        let input = InputState::default();
        let time = Time::default();
        let transform = local_transform(world, slot.entity).unwrap_or_default();
        let mut ctx = ScriptContext::new(slot.entity, world, &input, &time, transform);
        f(slot.behavior.as_mut(), &mut ctx);
        let commands = ctx.commands.into_vec();
        self.apply(world, commands)
    }

    /// Attach a new instance of the behaviour registered as `key`, replacing
    /// any behaviour the entity already has. The entity gets a
    /// [`Script`] component if it lacks one; an existing `enabled` flag is
    /// kept.
    pub fn attach(&mut self, world: &mut World, entity: Entity, key: &str) -> Result<BehaviorHandle, WorldError> {
        if !world.is_alive(entity) {
            return Err(WorldError::DeadEntity(entity));
        }
        let behavior = self.registry.create(key)?;
        if world.try_get::<Script>(entity).is_some_and(|s| s.behavior.is_some()) {
            self.detach(world, entity)?;
        }
        let enabled = world.try_get::<Script>(entity).is_none_or(|s| s.enabled);

        let handle = self.allocate(BehaviorSlot {
            entity,
            key: key.to_string(),
            behavior,
        });
        world.add_component(
            entity,
            Script {
                behavior: Some(handle),
                enabled,
            },
        )?;
        log::debug!("attached \"{key}\" to {entity}");

        if let Some(mut slot) = self.take_slot(handle, entity) {
            self.run_callback(world, &mut slot, |b, ctx| b.on_create(ctx));
            self.put_slot(handle, slot);
        }
        Ok(handle)
    }

    /// Run `on_destroy` and drop the entity's behaviour. The [`Script`]
    /// component stays, with no behaviour.
    pub fn detach(&mut self, world: &mut World, entity: Entity) -> Result<(), WorldError> {
        let mut script = world.get::<Script>(entity)?;
        let Some(handle) = script.behavior else {
            return Ok(());
        };
        let slot = self.take_slot(handle, entity);
        script.behavior = None;
        world.set(entity, script)?;
        match slot {
            Some(mut slot) => {
                self.run_callback(world, &mut slot, |b, ctx| b.on_destroy(ctx));
                self.release_handle(handle);
                log::debug!("detached \"{}\" from {entity}", slot.key);
                Ok(())
            }
            None => Err(WorldError::StaleBehavior(entity)),
        }
    }

    pub fn enable(&mut self, world: &mut World, entity: Entity) -> Result<(), WorldError> {
        self.set_enabled(world, entity, true)
    }

    pub fn disable(&mut self, world: &mut World, entity: Entity) -> Result<(), WorldError> {
        self.set_enabled(world, entity, false)
    }

    fn set_enabled(&mut self, world: &mut World, entity: Entity, enabled: bool) -> Result<(), WorldError> {
        let mut script = world.get::<Script>(entity)?;
        if script.enabled == enabled {
            return Ok(());
        }
        script.enabled = enabled;
        world.set(entity, script)?;
        if let Some(handle) = script.behavior {
            let mut slot = self
                .take_slot(handle, entity)
                .ok_or(WorldError::StaleBehavior(entity))?;
            self.run_callback(world, &mut slot, |b, ctx| {
                if enabled {
                    b.on_enable(ctx)
                } else {
                    b.on_disable(ctx)
                }
            });
            self.put_slot(handle, slot);
        }
        Ok(())
    }

    /// Destroy `entity` and its subtree, running `on_destroy` for every
    /// behaviour in it first (parents before children).
    pub fn destroy_entity(&mut self, world: &mut World, entity: Entity) -> Result<Vec<Entity>, WorldError> {
        if !world.is_alive(entity) {
            return Err(WorldError::DeadEntity(entity));
        }
        if entity == world.root() {
            return Err(WorldError::RootProtected);
        }
        let subtree = world.hierarchy().descendants_pre_order(entity)?;
        let mut pending = Vec::new();
        for &e in &subtree {
            let Some(handle) = world.try_get::<Script>(e).and_then(|s| s.behavior) else {
                continue;
            };
            if let Some(mut slot) = self.take_slot(handle, e) {
                let input = InputState::default();
                let time = Time::default();
                let transform = local_transform(world, e).unwrap_or_default();
                let mut ctx = ScriptContext::new(e, world, &input, &time, transform);
                slot.behavior.on_destroy(&mut ctx);
                pending.extend(ctx.commands.into_vec());
                self.release_handle(handle);
            }
        }
        let removed = world.destroy(entity)?;
        self.apply(world, pending);
        Ok(removed)
    }

    /// Drop behaviours whose entity is gone or no longer points at them.
    pub(crate) fn reap(&mut self, world: &World) -> usize {
        let mut reaped = 0;
        for index in 0..self.slots.len() {
            let stale = self.slots[index].as_ref().is_some_and(|slot| {
                world
                    .try_get::<Script>(slot.entity)
                    .and_then(|s| s.behavior)
                    != Some(BehaviorHandle(index as u32))
            });
            if !stale {
                continue;
            }
            if let Some(mut slot) = self.slots[index].take() {
                let input = InputState::default();
                let time = Time::default();
                let mut ctx = ScriptContext::new(slot.entity, world, &input, &time, Transform::IDENTITY);
                slot.behavior.on_destroy(&mut ctx);
                log::debug!("reaped \"{}\" of {}", slot.key, slot.entity);
                self.free.push(index as u32);
                reaped += 1;
            }
        }
        reaped
    }

    /// One frame of script logic: pull, parallel `on_update`, join, push,
    /// then apply the queued commands in job order.
    ///
    /// Call it inside [`rayon::ThreadPool::install`] to pick the pool.
    pub fn update(&mut self, world: &mut World, input: &InputState, time: &Time) -> Result<UpdateReport, WorldError> {
        let start = Instant::now();
        let reaped = self.reap(world);

        // Pull.
        let mut targets = Vec::new();
        for block in world.query_blocks(ComponentSet::of(&[ComponentKind::Script])) {
            let Some(scripts) = block.column::<Script>() else {
                continue;
            };
            for (script, &entity) in scripts.iter().zip(block.entities()) {
                if let (true, Some(handle)) = (script.enabled, script.behavior) {
                    targets.push((entity, handle, block.set().intersection(TRANSFORM_KINDS)));
                }
            }
        }

        let mut jobs = Vec::with_capacity(targets.len());
        for (entity, handle, kinds) in targets {
            let transform = local_transform(world, entity)?;
            let Some(slot) = self.take_slot(handle, entity) else {
                continue;
            };
            jobs.push(Job {
                handle,
                slot,
                kinds,
                ctx: ScriptContext::new(entity, world, input, time, transform),
            });
        }

        // Invoke, then join.
        let run = |job: &mut Job<'_>| job.slot.behavior.on_update(&mut job.ctx);
        if self.parallel {
            jobs.par_iter_mut().for_each(run);
        } else {
            jobs.iter_mut().for_each(run);
        }
        let scripts_run = jobs.len();
        let finished: Vec<_> = jobs
            .into_iter()
            .map(|job| {
                let entity = job.ctx.entity;
                let transform = job.ctx.transform;
                (job.handle, job.slot, job.kinds, entity, transform, job.ctx.commands.into_vec())
            })
            .collect();

        // Push, then apply.
        let mut pushed = Vec::with_capacity(finished.len());
        for (handle, slot, kinds, entity, transform, commands) in finished {
            self.put_slot(handle, slot);
            pushed.push((entity, kinds, transform, commands));
        }
        let mut queued = Vec::with_capacity(pushed.len());
        for (entity, kinds, transform, commands) in pushed {
            push_transform(world, entity, kinds, transform)?;
            queued.push(commands);
        }
        let commands_applied = queued
            .into_iter()
            .map(|commands| self.apply(world, commands))
            .sum();

        Ok(UpdateReport {
            scripts_run,
            commands_applied,
            reaped,
            elapsed_us: start.elapsed().as_secs_f64() * 1_000_000.0,
        })
    }

    /// Apply commands in order. A command whose target is gone by the time it
    /// runs is skipped with a warning. Returns how many succeeded.
    pub fn apply(&mut self, world: &mut World, commands: Vec<Command>) -> usize {
        let mut applied = 0;
        for command in commands {
            let result = match &command {
                Command::Set { entity, value } => world.set_value(*entity, *value),
                Command::Add { entity, value } => world.add_value(*entity, *value),
                Command::Remove { entity, kind } => world.remove_kind(*entity, *kind).map(|_| ()),
                Command::ToggleCameraLock(entity) => world
                    .get_mut::<Camera>(*entity)
                    .map(|cam| cam.locked = !cam.locked),
                Command::SetCameraLocked { entity, locked } => world
                    .get_mut::<Camera>(*entity)
                    .map(|cam| cam.locked = *locked),
                Command::SetActiveCamera(camera) => world.set_active_camera(*camera),
                Command::Reparent { entity, parent } => world.reparent(*entity, *parent),
                Command::Destroy(entity) => self.destroy_entity(world, *entity).map(|_| ()),
                Command::Create {
                    spec,
                    name,
                    parent,
                    values,
                } => world.create_with(*spec, name, *parent, values).map(|_| ()),
            };
            match result {
                Ok(()) => applied += 1,
                Err(err) => log::warn!("skipping {command:?}: {err}"),
            }
        }
        applied
    }
}

impl Default for ScriptHost {
    fn default() -> Self {
        Self::new(BehaviorRegistry::with_builtins())
    }
}

fn push_transform(world: &mut World, entity: Entity, kinds: ComponentSet, t: Transform) -> Result<(), WorldError> {
    if kinds.contains(ComponentKind::Position) {
        world.set(entity, Position::from(t.translation))?;
    }
    if kinds.contains(ComponentKind::Rotation) {
        world.set(entity, Rotation::from(t.rotation))?;
    }
    if kinds.contains(ComponentKind::Scale) {
        world.set(entity, Scale::from(t.scale))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::ArchetypeSpec;
    use crate::math::Vec3;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Counter {
        hits: Arc<AtomicUsize>,
    }

    impl Behavior for Counter {
        fn on_update(&mut self, _ctx: &mut ScriptContext<'_>) {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Mover;

    impl Behavior for Mover {
        fn on_update(&mut self, ctx: &mut ScriptContext<'_>) {
            ctx.transform.translation += Vec3::X * ctx.delta_secs();
        }
    }

    #[derive(Default)]
    struct Lifecycle {
        log: Arc<std::sync::Mutex<Vec<&'static str>>>,
    }

    impl Behavior for Lifecycle {
        fn on_create(&mut self, _ctx: &mut ScriptContext<'_>) {
            self.log.lock().unwrap().push("create");
        }
        fn on_destroy(&mut self, _ctx: &mut ScriptContext<'_>) {
            self.log.lock().unwrap().push("destroy");
        }
        fn on_enable(&mut self, _ctx: &mut ScriptContext<'_>) {
            self.log.lock().unwrap().push("enable");
        }
        fn on_disable(&mut self, _ctx: &mut ScriptContext<'_>) {
            self.log.lock().unwrap().push("disable");
        }
    }

    fn host_with_counter(hits: &Arc<AtomicUsize>) -> ScriptHost {
        let mut registry = BehaviorRegistry::new();
        let hits = hits.clone();
        registry.register_with("counter", move || Box::new(Counter { hits: hits.clone() }));
        registry.register_with("mover", || Box::new(Mover));
        ScriptHost::new(registry)
    }

    fn frame_time() -> Time {
        let mut time = Time::new();
        time.advance(Duration::from_millis(500));
        time
    }

    #[test]
    fn only_enabled_scripts_update() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut host = host_with_counter(&hits);
        let mut world = World::new();
        let mut entities = Vec::new();
        for name in ["a", "b", "c"] {
            let e = world.create(ArchetypeSpec::Script, name, None).unwrap();
            host.attach(&mut world, e, "counter").unwrap();
            entities.push(e);
        }
        host.disable(&mut world, entities[0]).unwrap();
        host.disable(&mut world, entities[2]).unwrap();

        let report = host.update(&mut world, &InputState::new(), &frame_time()).unwrap();
        assert_eq!(report.scripts_run, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn working_copy_is_pushed_back() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut host = host_with_counter(&hits);
        host.set_parallel(false);
        let mut world = World::new();
        let e = world.create(ArchetypeSpec::EmptyNode, "m", None).unwrap();
        host.attach(&mut world, e, "mover").unwrap();

        host.update(&mut world, &InputState::new(), &frame_time()).unwrap();
        host.update(&mut world, &InputState::new(), &frame_time()).unwrap();
        assert_eq!(world.get::<Position>(e).unwrap().value, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn script_only_entity_gets_no_transform() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut host = host_with_counter(&hits);
        let mut world = World::new();
        let e = world.create(ArchetypeSpec::Script, "logic", None).unwrap();
        host.attach(&mut world, e, "mover").unwrap();
        host.update(&mut world, &InputState::new(), &frame_time()).unwrap();
        assert!(!world.has::<Position>(e));
    }

    #[test]
    fn lifecycle_callbacks_fire_in_order() {
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut registry = BehaviorRegistry::new();
        let shared = log.clone();
        registry.register_with("life", move || Box::new(Lifecycle { log: shared.clone() }));
        let mut host = ScriptHost::new(registry);
        let mut world = World::new();
        let e = world.create(ArchetypeSpec::Script, "s", None).unwrap();

        host.attach(&mut world, e, "life").unwrap();
        host.disable(&mut world, e).unwrap();
        host.disable(&mut world, e).unwrap();
        host.enable(&mut world, e).unwrap();
        host.destroy_entity(&mut world, e).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["create", "disable", "enable", "destroy"]);
        assert!(host.is_empty());
        assert!(!world.is_alive(e));
    }

    #[test]
    fn unknown_key_is_an_error() {
        let mut host = ScriptHost::new(BehaviorRegistry::new());
        let mut world = World::new();
        let e = world.create(ArchetypeSpec::Script, "s", None).unwrap();
        assert_eq!(
            host.attach(&mut world, e, "nope"),
            Err(WorldError::UnknownBehavior("nope".into()))
        );
    }

    #[test]
    fn behaviours_of_destroyed_entities_are_reaped() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut host = host_with_counter(&hits);
        let mut world = World::new();
        let e = world.create(ArchetypeSpec::Script, "s", None).unwrap();
        let handle = host.attach(&mut world, e, "counter").unwrap();
        assert_eq!(host.script_name(handle), Some("counter"));

        world.destroy(e).unwrap();
        let report = host.update(&mut world, &InputState::new(), &frame_time()).unwrap();
        assert_eq!(report.reaped, 1);
        assert_eq!(report.scripts_run, 0);
        assert!(host.script_name(handle).is_none());
    }

    struct Spawner;

    impl Behavior for Spawner {
        fn on_update(&mut self, ctx: &mut ScriptContext<'_>) {
            ctx.commands.create(ArchetypeSpec::EmptyNode, "spawned", Some(ctx.entity));
        }
    }

    #[test]
    fn commands_apply_after_join() {
        let mut registry = BehaviorRegistry::new();
        registry.register_with("spawner", || Box::new(Spawner));
        let mut host = ScriptHost::new(registry);
        let mut world = World::new();
        let e = world.create(ArchetypeSpec::Script, "s", None).unwrap();
        host.attach(&mut world, e, "spawner").unwrap();

        let report = host.update(&mut world, &InputState::new(), &frame_time()).unwrap();
        assert_eq!(report.commands_applied, 1);
        assert_eq!(world.children(e).unwrap().len(), 1);
    }
}
