//! # Mundos: Scene Core for a Small 3D Engine
//!
//! An archetype ECS with a parent/child hierarchy, hierarchical transforms,
//! per-entity script behaviours run in parallel each frame, and JSON scene
//! persistence. Windowing and GPU work stay outside: the frame loop hands
//! draw calls to a [`RenderSink`](render::RenderSink).
//!
//! Start with `use mundos::prelude::*` and build a [`Runtime`](frame::Runtime),
//! or drive a [`World`](ecs::World) and a [`ScriptHost`](script::ScriptHost)
//! by hand.

pub mod camera;
pub mod components;
pub mod config;
pub mod ecs;
pub mod error;
pub mod frame;
pub mod input;
pub mod math;
pub mod prelude;
pub mod render;
pub mod scene;
pub mod script;
pub mod time;

#[cfg(feature = "diagnostics")]
pub mod diag;
