//! Whole-crate properties of the world, the transform resolver, the script
//! pass and scene persistence.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use approx::assert_relative_eq;
use mundos::prelude::*;

fn assert_mat_eq(a: Mat4, b: Mat4) {
    for (x, y) in a.to_cols_array().iter().zip(b.to_cols_array().iter()) {
        assert_relative_eq!(x, y, epsilon = 1e-5);
    }
}

#[test]
fn tree_stays_valid_through_mixed_edits() {
    let mut world = World::new();
    let root = world.root();
    let a = world.create(ArchetypeSpec::EmptyNode, "A", None).unwrap();
    let b = world.create(ArchetypeSpec::Model, "B", Some(a)).unwrap();
    let c = world.create(ArchetypeSpec::Script, "C", Some(b)).unwrap();
    let d = world.create(ArchetypeSpec::EmptyNode, "D", None).unwrap();

    world.reparent(c, d).unwrap();
    assert_eq!(world.reparent(a, b), Err(WorldError::HierarchyCycle(a)));
    world.add_component(d, Mesh::new(1, 1)).unwrap();
    world.destroy(a).unwrap();
    world.remove_component::<Rotation>(d).unwrap();

    assert_eq!(world.parent(root).unwrap(), root);
    assert_eq!(world.parent(c).unwrap(), d);
    world.hierarchy().validate().unwrap();
    assert_eq!(world.entity_count(), 3);
}

#[test]
fn add_then_remove_restores_layout_and_values() {
    let mut world = World::new();
    let e = world.create(ArchetypeSpec::EmptyNode, "E", None).unwrap();
    world.set(e, Position::new(1.0, 2.0, 3.0)).unwrap();
    world.set(e, Rotation::new(0.1, 0.2, 0.3)).unwrap();
    let before_set = world.components_of(e).unwrap();
    let before_values = world.values_of(e).unwrap();

    world.add_component(e, Mesh::new(7, 2)).unwrap();
    assert_eq!(world.get::<Mesh>(e).unwrap(), Mesh::new(7, 2));
    assert_eq!(world.get::<Position>(e).unwrap(), Position::new(1.0, 2.0, 3.0));

    assert_eq!(world.remove_component::<Mesh>(e).unwrap(), Mesh::new(7, 2));
    assert_eq!(world.components_of(e).unwrap(), before_set);
    assert_eq!(world.values_of(e).unwrap(), before_values);
}

#[test]
fn destroy_takes_the_whole_subtree() {
    let mut world = World::new();
    let parent = world.create(ArchetypeSpec::Model, "P", None).unwrap();
    let child = world.create(ArchetypeSpec::Model, "C", Some(parent)).unwrap();
    let grandchild = world.create(ArchetypeSpec::Model, "G", Some(child)).unwrap();
    let other = world.create(ArchetypeSpec::Model, "O", None).unwrap();

    let removed = world.destroy(parent).unwrap();
    assert_eq!(removed, vec![parent, child, grandchild]);
    for e in removed {
        assert!(!world.is_alive(e));
        assert!(world.get::<Position>(e).is_err());
    }
    let meshes = world.query_entities(ComponentSet::of(&[ComponentKind::Mesh]));
    assert_eq!(meshes, vec![other]);
}

#[test]
fn world_matrix_composes_parent_first() {
    let mut world = World::new();
    let p = world.create(ArchetypeSpec::EmptyNode, "P", None).unwrap();
    world.set(p, Position::new(1.0, 0.0, 0.0)).unwrap();
    world.set(p, Rotation::new(0.0, std::f32::consts::FRAC_PI_2, 0.0)).unwrap();
    let c = world.create(ArchetypeSpec::EmptyNode, "C", Some(p)).unwrap();
    world.set(c, Position::new(0.0, 0.0, 2.0)).unwrap();
    world.set(c, Scale::new(2.0, 2.0, 2.0)).unwrap();

    let lp = Transform::from_xyz(1.0, 0.0, 0.0)
        .with_rotation(Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0))
        .matrix();
    let lc = Transform::from_xyz(0.0, 0.0, 2.0)
        .with_scale(Vec3::splat(2.0))
        .matrix();
    let world_c = world.world_matrix(c).unwrap();
    assert_mat_eq(world_c, lp * lc);

    let reversed = lc * lp;
    let differs = world_c
        .to_cols_array()
        .iter()
        .zip(reversed.to_cols_array().iter())
        .any(|(a, b)| (a - b).abs() > 1e-3);
    assert!(differs);
}

#[test]
fn ground_and_wall_translation() {
    let mut world = World::new();
    let ground = world.create(ArchetypeSpec::Model, "Ground", None).unwrap();
    world.set(ground, Position::new(0.0, -1.0, 0.0)).unwrap();
    world.set(ground, Scale::new(5.0, 1.0, 5.0)).unwrap();
    let wall = world.create(ArchetypeSpec::Model, "Wall", Some(ground)).unwrap();
    world.set(wall, Position::new(0.0, 0.5, -0.5)).unwrap();

    // Wall's local offset is stretched by Ground's scale: z -0.5 * 5.
    let m = world.world_matrix(wall).unwrap();
    let t = m.w_axis;
    assert_relative_eq!(t.x, 0.0, epsilon = 1e-5);
    assert_relative_eq!(t.y, -0.5, epsilon = 1e-5);
    assert_relative_eq!(t.z, -2.5, epsilon = 1e-5);
    assert_relative_eq!(m.x_axis.x, 5.0, epsilon = 1e-5);
    assert_relative_eq!(m.y_axis.y, 1.0, epsilon = 1e-5);
    assert_relative_eq!(m.z_axis.z, 5.0, epsilon = 1e-5);
}

#[test]
fn scene_round_trip_through_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("level.json");

    let mut world = World::new();
    let mut host = ScriptHost::default();
    let mut expected = Vec::new();
    let mut parent = None;
    for i in 0..12 {
        let spec = if i % 3 == 0 { ArchetypeSpec::EmptyNode } else { ArchetypeSpec::Model };
        let e = world.create(spec, &format!("node {i}"), parent).unwrap();
        let f = i as f32;
        world.set(e, Position::new(f, 0.5, -f)).unwrap();
        world.set(e, Rotation::new(0.1 * f, -0.2 * f, 0.05 * f)).unwrap();
        world.set(e, Scale::new(1.0 + f, 2.0, 0.5 + 0.25 * f)).unwrap();
        if spec == ArchetypeSpec::Model {
            world.set(e, Mesh::new(i, 100 + i)).unwrap();
        }
        if i % 4 == 3 {
            parent = Some(e);
        }
        expected.push((world.uuid_of(e).unwrap(), world.values_of(e).unwrap()));
    }
    let shape: Vec<_> = world
        .hierarchy()
        .pre_order()
        .unwrap()
        .into_iter()
        .skip(1)
        .map(|e| (world.uuid_of(e).unwrap(), world.uuid_of(world.parent(e).unwrap()).unwrap()))
        .collect();
    let root_uuid = world.uuid_of(world.root()).unwrap();

    save_scene_to_file(&world, &host, &path).unwrap();
    let mut restored = World::new();
    load_scene_from_file(&mut restored, &mut host, &path).unwrap();

    assert_eq!(restored.entity_count(), world.entity_count());
    for (uuid, values) in &expected {
        let e = restored.entity_by_uuid(*uuid).unwrap();
        assert_eq!(&restored.values_of(e).unwrap(), values);
    }
    let new_root = restored.uuid_of(restored.root()).unwrap();
    for (uuid, parent_uuid) in shape {
        let e = restored.entity_by_uuid(uuid).unwrap();
        let parent = restored.uuid_of(restored.parent(e).unwrap()).unwrap();
        if parent_uuid == root_uuid {
            assert_eq!(parent, new_root);
        } else {
            assert_eq!(parent, parent_uuid);
        }
    }
}

struct Tick(Arc<AtomicUsize>);

impl Behavior for Tick {
    fn on_update(&mut self, _ctx: &mut ScriptContext<'_>) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn disabled_scripts_are_skipped_every_frame() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut registry = BehaviorRegistry::new();
    let shared = hits.clone();
    registry.register_with("tick", move || Box::new(Tick(shared.clone())));
    let mut rt = Runtime::with_registry(EngineConfig::default(), registry).unwrap();

    let mut scripts = Vec::new();
    for name in ["one", "two", "three"] {
        let e = rt.world.create(ArchetypeSpec::Script, name, None).unwrap();
        rt.scripts.attach(&mut rt.world, e, "tick").unwrap();
        scripts.push(e);
    }
    rt.scripts.disable(&mut rt.world, scripts[1]).unwrap();
    rt.scripts.disable(&mut rt.world, scripts[2]).unwrap();

    let mut sink = mundos::render::CollectSink::default();
    for frame in 1..=5 {
        let report = rt.frame(&InputState::new(), Duration::from_millis(16), &mut sink).unwrap();
        assert_eq!(report.scripts_run, 1);
        assert_eq!(hits.load(Ordering::SeqCst), frame);
    }
}

fn snapshot(world: &World, set: ComponentSet) -> (Vec<Entity>, Vec<Position>) {
    let mut entities = Vec::new();
    let mut positions = Vec::new();
    for block in world.query_blocks(set).filter(|b| b.set() == set) {
        entities.extend_from_slice(block.entities());
        positions.extend_from_slice(block.column::<Position>().unwrap());
    }
    (entities, positions)
}

#[test]
fn migrations_leave_other_archetypes_alone() {
    let mut world = World::new();
    let movers: Vec<_> = (0..2)
        .map(|i| {
            let e = world.create(ArchetypeSpec::EmptyNode, &format!("mover {i}"), None).unwrap();
            world.set(e, Position::new(i as f32, 0.0, 0.0)).unwrap();
            e
        })
        .collect();
    let bystander = world.create(ArchetypeSpec::Model, "bystander", None).unwrap();
    world.set(bystander, Position::new(9.0, 9.0, 9.0)).unwrap();
    let model_set = world.components_of(bystander).unwrap();

    let before = snapshot(&world, model_set);
    for &e in &movers {
        world.add_component(e, Script::default()).unwrap();
    }
    assert_eq!(snapshot(&world, model_set), before);

    let shared = Arc::new(Mutex::new(world));
    let handles: Vec<_> = movers
        .iter()
        .map(|&e| {
            let shared = shared.clone();
            thread::spawn(move || {
                let mut world = shared.lock().unwrap();
                world.add_component(e, Camera::default()).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let world = shared.lock().unwrap();
    assert_eq!(snapshot(&world, model_set), before);
    for &e in &movers {
        assert!(world.has::<Camera>(e));
        assert!(world.has::<Script>(e));
    }
}
