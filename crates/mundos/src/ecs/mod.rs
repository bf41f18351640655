//! # Archetype-Based ECS
//!
//! Entities are generational handles, components are small `Copy` records,
//! and entities with the same component set share one archetype table. On top
//! of that sit the scene tree and the transform resolver.
//!
//! ## Module Overview
//!
//! - [`entity`]: Generational entity ids
//! - [`component`]: Component kinds, sets and columnar storage
//! - `archetype`: Tables grouping entities by component set
//! - [`world`]: The entity registry: create, destroy, add/remove, get/set
//! - [`hierarchy`]: Parent/children/name per entity, single root
//! - [`transform`]: World matrices from the parent chain
//! - [`query`]: Block and closure iteration over matching archetypes

pub(crate) mod archetype;
pub mod component;
pub mod entity;
pub mod hierarchy;
pub mod query;
pub mod transform;
pub mod world;

pub use component::{Component, ComponentKind, ComponentSet, ComponentValue};
pub use entity::Entity;
pub use hierarchy::{Hierarchy, NodeState};
pub use query::{QueryBlock, QueryParam};
pub use transform::{propagate_world_matrices, world_matrix};
pub use world::{ArchetypeSpec, ROOT_NAME, World};
