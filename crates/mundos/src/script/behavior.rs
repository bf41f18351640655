use std::collections::HashMap;
use std::fmt;

use super::commands::Commands;
use super::fly_camera::FlyCamera;
use crate::camera::Camera;
use crate::ecs::{Entity, World};
use crate::error::WorldError;
use crate::input::InputState;
use crate::math::Transform;
use crate::time::Time;

/// Script logic attached to one entity. Every callback has an empty default.
///
/// Callbacks may run on worker threads, hence the `Send` bound.
pub trait Behavior: Send {
    /// Right after the behaviour is attached.
    fn on_create(&mut self, _ctx: &mut ScriptContext<'_>) {}

    /// Once per frame while the script is enabled.
    fn on_update(&mut self, _ctx: &mut ScriptContext<'_>) {}

    /// When the behaviour is detached or its entity is destroyed.
    fn on_destroy(&mut self, _ctx: &mut ScriptContext<'_>) {}

    fn on_enable(&mut self, _ctx: &mut ScriptContext<'_>) {}

    fn on_disable(&mut self, _ctx: &mut ScriptContext<'_>) {}
}

/// What a callback gets to work with.
///
/// `transform` is a copy of the entity's local Position/Rotation/Scale
/// (identity parts for kinds the entity lacks). After `on_update` it is
/// written back for the kinds the entity has.
pub struct ScriptContext<'a> {
    pub entity: Entity,
    pub world: &'a World,
    pub input: &'a InputState,
    pub time: &'a Time,
    pub transform: Transform,
    pub commands: Commands,
}

impl<'a> ScriptContext<'a> {
    pub(crate) fn new(
        entity: Entity,
        world: &'a World,
        input: &'a InputState,
        time: &'a Time,
        transform: Transform,
    ) -> Self {
        Self {
            entity,
            world,
            input,
            time,
            transform,
            commands: Commands::new(),
        }
    }

    pub fn delta_secs(&self) -> f32 {
        self.time.delta_secs()
    }

    /// The entity's own camera, if it has one.
    pub fn camera(&self) -> Option<Camera> {
        self.world.try_get::<Camera>(self.entity)
    }
}

type Factory = Box<dyn Fn() -> Box<dyn Behavior> + Send + Sync>;

/// Named behaviour factories. Scene files refer to behaviours by these keys.
pub struct BehaviorRegistry {
    factories: HashMap<String, Factory>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with the engine's own behaviours: `"fly_camera"`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register::<FlyCamera>(FlyCamera::KEY);
        registry
    }

    /// Register `B` under `key`, built with `Default`. Replaces any existing
    /// factory with the same key.
    pub fn register<B: Behavior + Default + 'static>(&mut self, key: &str) {
        self.register_with(key, || Box::new(B::default()));
    }

    pub fn register_with<F>(&mut self, key: &str, factory: F)
    where
        F: Fn() -> Box<dyn Behavior> + Send + Sync + 'static,
    {
        if self.factories.insert(key.to_string(), Box::new(factory)).is_some() {
            log::warn!("behavior \"{key}\" registered twice, keeping the newer one");
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<_> = self.factories.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn create(&self, key: &str) -> Result<Box<dyn Behavior>, WorldError> {
        self.factories
            .get(key)
            .map(|f| f())
            .ok_or_else(|| WorldError::UnknownBehavior(key.to_string()))
    }
}

impl Default for BehaviorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for BehaviorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}
