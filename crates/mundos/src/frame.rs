//! # Frame Loop
//!
//! [`Runtime`] bundles the world, the script host, the clock and the worker
//! pool, and runs one frame at a time:
//!
//! ```text
//! advance time ─► script pass (fork-join on the pool) ─► draw calls ─► sink
//! ```
//!
//! Everything the script pass writes is visible to the same frame's draw
//! calls. The window, the event source and the GPU stay with the caller.

use std::time::{Duration, Instant};

use crate::config::{ConfigError, EngineConfig};
use crate::ecs::World;
use crate::error::{SceneError, WorldError};
use crate::input::InputState;
use crate::render::{self, RenderSink};
use crate::scene;
use crate::script::{BehaviorRegistry, ScriptHost};
use crate::time::Time;

#[derive(thiserror::Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// What one frame did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    pub scripts_run: usize,
    pub draw_calls: usize,
    pub commands_applied: usize,
    /// Script pass wall time, microseconds.
    pub script_us: f64,
    /// Draw collection and submission wall time, microseconds.
    pub render_us: f64,
}

pub struct Runtime {
    pub world: World,
    pub scripts: ScriptHost,
    pub time: Time,
    config: EngineConfig,
    pool: rayon::ThreadPool,
}

impl Runtime {
    /// Build a runtime with the built-in behaviours. Loads
    /// `config.scene_path` when set.
    pub fn new(config: EngineConfig) -> Result<Self, RuntimeError> {
        Self::with_registry(config, BehaviorRegistry::with_builtins())
    }

    pub fn with_registry(config: EngineConfig, registry: BehaviorRegistry) -> Result<Self, RuntimeError> {
        let pool = config.build_pool()?;
        let mut scripts = ScriptHost::new(registry);
        scripts.set_parallel(config.parallel_scripts);
        let mut runtime = Self {
            world: World::new(),
            scripts,
            time: Time::new(),
            config,
            pool,
        };
        if let Some(path) = runtime.config.scene_path.clone() {
            scene::load_scene_from_file(&mut runtime.world, &mut runtime.scripts, &path)?;
        }
        log::info!(
            "runtime ready: {} worker threads, parallel scripts {}",
            runtime.pool.current_num_threads(),
            runtime.config.parallel_scripts
        );
        Ok(runtime)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one frame. `delta` is the time since the previous frame.
    ///
    /// `input` is read-only for the whole frame; the caller clears its
    /// just-pressed state afterwards.
    pub fn frame(
        &mut self,
        input: &InputState,
        delta: Duration,
        sink: &mut dyn RenderSink,
    ) -> Result<FrameReport, WorldError> {
        self.time.advance(delta);

        let Self {
            world,
            scripts,
            time,
            pool,
            ..
        } = self;
        let update = pool.install(|| scripts.update(world, input, time))?;

        let render_start = Instant::now();
        let draw_calls = render::submit_frame(&self.world, sink)?;
        let render_us = render_start.elapsed().as_secs_f64() * 1_000_000.0;

        log::trace!(
            "frame {}: {} scripts, {} draws",
            self.time.frame_count(),
            update.scripts_run,
            draw_calls
        );

        Ok(FrameReport {
            scripts_run: update.scripts_run,
            draw_calls,
            commands_applied: update.commands_applied,
            script_us: update.elapsed_us,
            render_us,
        })
    }

    pub fn save_scene(&self, path: impl AsRef<std::path::Path>) -> Result<(), SceneError> {
        scene::save_scene_to_file(&self.world, &self.scripts, path)
    }

    pub fn load_scene(&mut self, path: impl AsRef<std::path::Path>) -> Result<(), SceneError> {
        scene::load_scene_from_file(&mut self.world, &mut self.scripts, path)?;
        Ok(())
    }
}
