//! Scene Save/Load: write a world to JSON and read it back.
//!
//! Builds the ground/wall/camera scene, saves it, wipes the world, loads the
//! file and prints the restored tree. The fly camera comes back attached by
//! its registry key.
//!
//! Run with: `cargo run -p mundos --example scene_save_load [path]`

use mundos::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| std::env::temp_dir().join("mundos_scene.json").display().to_string());

    let mut world = World::new();
    let mut host = ScriptHost::default();

    let ground = world.create(ArchetypeSpec::Model, "Ground", None)?;
    world.set(ground, Position::new(0.0, -1.0, 0.0))?;
    world.set(ground, Scale::new(10.0, 0.1, 10.0))?;
    world.set(ground, Mesh::new(0, 0))?;

    let wall = world.create(ArchetypeSpec::Model, "Wall", Some(ground))?;
    world.set(wall, Position::new(0.0, 0.5, -2.5))?;
    world.set(wall, Mesh::new(0, 1))?;

    let camera = world.create(ArchetypeSpec::Camera, "Camera", None)?;
    world.set(camera, Position::new(0.0, 1.0, 5.0))?;
    host.attach(&mut world, camera, FlyCamera::KEY)?;
    world.set_active_camera(Some(camera))?;

    save_scene_to_file(&world, &host, &path)?;
    println!("saved {} entities to {path}", world.entity_count() - 1);

    world.clear()?;
    println!("after clear: {} entities", world.entity_count());

    let loaded = load_scene_from_file(&mut world, &mut host, &path)?;
    println!("loaded {} entities", loaded.len());
    println!("{}", world.hierarchy().format_tree()?);

    let wall = world.entity_by_name("Wall").ok_or("wall missing after load")?;
    println!("wall world translation: {:?}", world.world_matrix(wall)?.w_axis.truncate());
    Ok(())
}
