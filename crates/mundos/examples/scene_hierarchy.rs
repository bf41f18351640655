//! Entity Hierarchies: a headless solar system.
//!
//! Planets hang off the sun and moons off their planet. An `Orbit` behaviour
//! spins each body around Y, and the world matrices carry the motion down
//! the tree. Halfway through, one planet is destroyed and its moon goes with
//! it.
//!
//! Run with: `cargo run -p mundos --example scene_hierarchy`

use std::time::Duration;

use mundos::prelude::*;
use mundos::render::CollectSink;

struct Orbit {
    speed: f32,
}

impl Behavior for Orbit {
    fn on_update(&mut self, ctx: &mut ScriptContext<'_>) {
        ctx.transform.rotation.y += self.speed * ctx.delta_secs();
    }
}

fn spawn_body(
    rt: &mut Runtime,
    name: &str,
    parent: Option<Entity>,
    distance: f32,
    orbit: &str,
) -> Result<Entity, WorldError> {
    let body = rt.world.create(ArchetypeSpec::Model, name, parent)?;
    rt.world.set(body, Position::new(distance, 0.0, 0.0))?;
    rt.scripts.attach(&mut rt.world, body, orbit)?;
    Ok(body)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut registry = BehaviorRegistry::with_builtins();
    registry.register_with("orbit_slow", || Box::new(Orbit { speed: 0.4 }));
    registry.register_with("orbit_fast", || Box::new(Orbit { speed: 1.5 }));
    let mut rt = Runtime::with_registry(EngineConfig::default(), registry)?;

    let sun = spawn_body(&mut rt, "Sun", None, 0.0, "orbit_slow")?;
    let mut planets = Vec::new();
    for (i, distance) in [3.0, 5.0, 8.0].into_iter().enumerate() {
        let planet = spawn_body(&mut rt, &format!("Planet {i}"), Some(sun), distance, "orbit_fast")?;
        spawn_body(&mut rt, &format!("Moon {i}"), Some(planet), 1.0, "orbit_fast")?;
        planets.push(planet);
    }

    let camera = rt.world.create(ArchetypeSpec::Camera, "Camera", None)?;
    rt.world.set(camera, Position::new(0.0, 4.0, 15.0))?;
    rt.world.set_active_camera(Some(camera))?;

    println!("{}", rt.world.hierarchy().format_tree()?);

    let input = InputState::new();
    let mut sink = CollectSink::default();
    for frame in 0..60 {
        let report = rt.frame(&input, Duration::from_millis(16), &mut sink)?;
        if frame == 30 {
            let removed = rt.scripts.destroy_entity(&mut rt.world, planets[1])?;
            println!("destroyed {} entities", removed.len());
        }
        if frame % 20 == 0 {
            println!("frame {frame}: {} scripts, {} draws", report.scripts_run, report.draw_calls);
        }
    }

    for draw in &sink.draws {
        let name = rt.world.name_of(draw.entity)?;
        println!("{name:>10}: {:?}", draw.model.w_axis.truncate());
    }
    println!("{}", rt.world.hierarchy().format_tree()?);
    Ok(())
}
