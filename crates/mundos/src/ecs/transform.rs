//! # Transform resolver
//!
//! An entity's world matrix is its local matrix composed with every
//! ancestor's local matrix up to (not including) the root:
//!
//! ```text
//! World(e) = World(parent(e)) * Local(e)      // glam, column vectors
//! World(child of root) = Local(child)
//! ```
//!
//! [`world_matrix`] recomputes the chain on every call; nothing is cached, so
//! a write to any ancestor is visible immediately. [`propagate_world_matrices`]
//! resolves the whole tree in one breadth-first pass for the render
//! collection and gives the same numbers.
//!
//! Entities without some of Position/Rotation/Scale (a bare script, the root)
//! contribute the identity for the missing parts.

use std::collections::{HashMap, VecDeque};

use super::entity::Entity;
use super::world::World;
use crate::components::{Position, Rotation, Scale};
use crate::error::WorldError;
use crate::math::{Mat4, Transform, local_matrix};

/// Local position/rotation/scale of `entity` as a by-value [`Transform`].
pub fn local_transform(world: &World, entity: Entity) -> Result<Transform, WorldError> {
    if !world.is_alive(entity) {
        return Err(WorldError::DeadEntity(entity));
    }
    Ok(Transform {
        translation: world.try_get::<Position>(entity).unwrap_or_default().value,
        rotation: world.try_get::<Rotation>(entity).unwrap_or_default().euler,
        scale: world.try_get::<Scale>(entity).unwrap_or_default().value,
    })
}

pub fn local_matrix_of(world: &World, entity: Entity) -> Result<Mat4, WorldError> {
    let t = local_transform(world, entity)?;
    Ok(local_matrix(t.translation, t.rotation, t.scale))
}

/// World-space model matrix of `entity`. The root resolves to the identity.
///
/// A broken parent chain fails with `HierarchyCycle` or `Orphan` rather than
/// looping.
pub fn world_matrix(world: &World, entity: Entity) -> Result<Mat4, WorldError> {
    if !world.is_alive(entity) {
        return Err(WorldError::DeadEntity(entity));
    }
    let root = world.root();
    if entity == root {
        return Ok(Mat4::IDENTITY);
    }
    let ancestors = world.hierarchy().ancestors(entity)?;

    // Outermost first; the last entry of `ancestors` is the root itself.
    let mut matrix = Mat4::IDENTITY;
    for &ancestor in ancestors.iter().rev().filter(|&&a| a != root) {
        matrix *= local_matrix_of(world, ancestor)?;
    }
    Ok(matrix * local_matrix_of(world, entity)?)
}

/// World matrices for every non-root entity, parents resolved before
/// children.
pub fn propagate_world_matrices(world: &World) -> Result<HashMap<Entity, Mat4>, WorldError> {
    let root = world.root();
    let mut out = HashMap::with_capacity(world.entity_count());
    let mut queue: VecDeque<(Entity, Mat4)> = world
        .children(root)?
        .iter()
        .map(|&c| (c, Mat4::IDENTITY))
        .collect();

    while let Some((entity, parent_matrix)) = queue.pop_front() {
        if out.contains_key(&entity) {
            return Err(WorldError::HierarchyCycle(entity));
        }
        let global = parent_matrix * local_matrix_of(world, entity)?;
        out.insert(entity, global);
        for &child in world.children(entity)? {
            queue.push_back((child, global));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::world::ArchetypeSpec;
    use crate::math::Vec3;
    use approx::assert_relative_eq;

    fn assert_mat_eq(a: Mat4, b: Mat4) {
        for (x, y) in a.to_cols_array().iter().zip(b.to_cols_array().iter()) {
            assert_relative_eq!(x, y, epsilon = 1e-5);
        }
    }

    #[test]
    fn ground_and_wall() {
        let mut world = World::new();
        let ground = world.create(ArchetypeSpec::Model, "Ground", None).unwrap();
        world.set(ground, Position::new(0.0, -1.0, 0.0)).unwrap();
        world.set(ground, Scale::new(5.0, 1.0, 5.0)).unwrap();
        let wall = world.create(ArchetypeSpec::Model, "Wall", Some(ground)).unwrap();
        world.set(wall, Position::new(0.0, 0.5, -0.5)).unwrap();

        let m = world_matrix(&world, wall).unwrap();
        let t = m.w_axis.truncate();
        assert_relative_eq!(t.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(t.y, -0.5, epsilon = 1e-5);
        assert_relative_eq!(t.z, -2.5, epsilon = 1e-5);
    }

    #[test]
    fn composition_order_matters() {
        let mut world = World::new();
        let p = world.create(ArchetypeSpec::EmptyNode, "P", None).unwrap();
        world.set(p, Position::new(1.0, 2.0, 3.0)).unwrap();
        world.set(p, Rotation::new(0.0, 0.7, 0.0)).unwrap();
        world.set(p, Scale::new(2.0, 1.0, 1.0)).unwrap();
        let c = world.create(ArchetypeSpec::EmptyNode, "C", Some(p)).unwrap();
        world.set(c, Position::new(0.5, 0.0, -1.0)).unwrap();
        world.set(c, Rotation::new(0.3, 0.0, 0.0)).unwrap();

        let lp = local_matrix_of(&world, p).unwrap();
        let lc = local_matrix_of(&world, c).unwrap();
        let w = world_matrix(&world, c).unwrap();
        assert_mat_eq(w, lp * lc);
        assert!(!w.abs_diff_eq(lc * lp, 1e-3));
    }

    #[test]
    fn root_and_transformless_entities() {
        let mut world = World::new();
        assert_eq!(world_matrix(&world, world.root()).unwrap(), Mat4::IDENTITY);

        let logic = world.create(ArchetypeSpec::Script, "Logic", None).unwrap();
        let child = world.create(ArchetypeSpec::EmptyNode, "C", Some(logic)).unwrap();
        world.set(child, Position::new(0.0, 1.0, 0.0)).unwrap();
        assert_mat_eq(
            world_matrix(&world, child).unwrap(),
            Mat4::from_translation(Vec3::Y),
        );
    }

    #[test]
    fn writes_to_ancestors_are_visible() {
        let mut world = World::new();
        let a = world.create(ArchetypeSpec::EmptyNode, "A", None).unwrap();
        let b = world.create(ArchetypeSpec::EmptyNode, "B", Some(a)).unwrap();
        world.set(a, Position::new(1.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(world_matrix(&world, b).unwrap().w_axis.x, 1.0);
        world.set(a, Position::new(3.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(world_matrix(&world, b).unwrap().w_axis.x, 3.0);
    }

    #[test]
    fn propagation_matches_single_lookups() {
        let mut world = World::new();
        let a = world.create(ArchetypeSpec::EmptyNode, "A", None).unwrap();
        world.set(a, Rotation::new(0.0, 0.0, 1.2)).unwrap();
        let b = world.create(ArchetypeSpec::Model, "B", Some(a)).unwrap();
        world.set(b, Position::new(2.0, 0.0, 0.0)).unwrap();
        let c = world.create(ArchetypeSpec::Model, "C", Some(b)).unwrap();
        world.set(c, Scale::new(0.5, 0.5, 0.5)).unwrap();

        let all = propagate_world_matrices(&world).unwrap();
        assert_eq!(all.len(), 3);
        for e in [a, b, c] {
            assert_mat_eq(all[&e], world_matrix(&world, e).unwrap());
        }
    }
}
