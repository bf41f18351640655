//! # Query: Iterating Over Entities by Component Kind
//!
//! A query names a set of component kinds and visits every archetype whose
//! set is a superset of it. There are three ways in:
//!
//! ```text
//! // 1. Read-only blocks: one per matching archetype.
//! for block in world.query_blocks(DRAWABLE) {
//!     let meshes = block.column::<Mesh>().unwrap();
//!     for (i, entity) in block.entities().iter().enumerate() { /* meshes[i] */ }
//! }
//!
//! // 2. Per-entity closure, read/write.
//! world.query::<(&mut Position, &Scale)>(|entity, (pos, scale)| { .. });
//!
//! // 3. Whole-column closure, for data-parallel passes.
//! world.query_slices::<(&mut Position,)>(|entities, (positions,)| { .. });
//! ```
//!
//! ## Validity of query results
//!
//! A [`QueryBlock`] borrows the [`World`](super::world::World) immutably, and
//! every structural change (create, destroy, add/remove component) takes
//! `&mut World`. Holding a block across a structural change is therefore a
//! compile error, not a stale index. Row indices are only meaningful inside one
//! query pass; after a migration the same entity may sit on a different row.
//!
//! ## Closure queries and the `QueryParam` trait
//!
//! Yielded items borrow from the storage, which `Iterator` can't express
//! without a lending iterator. The closure forms take the needed columns out
//! of the archetype for the duration of the pass, so the borrow checker can
//! see that `&mut` columns don't alias, then put them back.

use std::collections::HashMap;

use super::component::{Component, ComponentColumn, ComponentKind, ComponentSet};
use super::entity::Entity;

/// Something that can be fetched from archetype columns.
///
/// Implemented for `&T`, `&mut T` and tuples of those.
pub trait QueryParam {
    /// The item yielded per entity.
    type Item<'w>;

    /// The item yielded per archetype by [`World::query_slices`](super::World::query_slices).
    type Slice<'w>;

    /// Owned column data taken out of the archetype.
    type Column;

    /// The component kinds this parameter needs.
    fn kinds() -> ComponentSet;

    fn extract(columns: &mut HashMap<ComponentKind, ComponentColumn>) -> Self::Column;

    fn restore(col: Self::Column, columns: &mut HashMap<ComponentKind, ComponentColumn>);

    fn fetch(col: &mut Self::Column, index: usize) -> Self::Item<'_>;

    fn slice(col: &mut Self::Column) -> Self::Slice<'_>;
}

fn take_column<T: Component>(columns: &mut HashMap<ComponentKind, ComponentColumn>) -> ComponentColumn {
    columns.remove(&T::KIND).unwrap_or_else(|| {
        panic!(
            "Query extract: column for `{}` not found in archetype (requested twice?)",
            std::any::type_name::<T>()
        )
    })
}

impl<T: Component> QueryParam for &T {
    type Item<'w> = &'w T;
    type Slice<'w> = &'w [T];
    type Column = ComponentColumn;

    fn kinds() -> ComponentSet {
        ComponentSet::of(&[T::KIND])
    }

    fn extract(columns: &mut HashMap<ComponentKind, ComponentColumn>) -> Self::Column {
        take_column::<T>(columns)
    }

    fn restore(col: Self::Column, columns: &mut HashMap<ComponentKind, ComponentColumn>) {
        columns.insert(col.kind(), col);
    }

    fn fetch(col: &mut Self::Column, index: usize) -> Self::Item<'_> {
        col.get::<T>(index)
    }

    fn slice(col: &mut Self::Column) -> Self::Slice<'_> {
        col.as_slice::<T>()
    }
}

impl<T: Component> QueryParam for &mut T {
    type Item<'w> = &'w mut T;
    type Slice<'w> = &'w mut [T];
    type Column = ComponentColumn;

    fn kinds() -> ComponentSet {
        ComponentSet::of(&[T::KIND])
    }

    fn extract(columns: &mut HashMap<ComponentKind, ComponentColumn>) -> Self::Column {
        take_column::<T>(columns)
    }

    fn restore(col: Self::Column, columns: &mut HashMap<ComponentKind, ComponentColumn>) {
        columns.insert(col.kind(), col);
    }

    fn fetch(col: &mut Self::Column, index: usize) -> Self::Item<'_> {
        col.get_mut::<T>(index)
    }

    fn slice(col: &mut Self::Column) -> Self::Slice<'_> {
        col.as_mut_slice::<T>()
    }
}

macro_rules! impl_query_param_tuple {
    ($($P:ident),+) => {
        impl<$($P: QueryParam),+> QueryParam for ($($P,)+) {
            type Item<'w> = ($($P::Item<'w>,)+);
            type Slice<'w> = ($($P::Slice<'w>,)+);
            type Column = ($($P::Column,)+);

            fn kinds() -> ComponentSet {
                ComponentSet::EMPTY$(.union($P::kinds()))+
            }

            #[allow(non_snake_case)]
            fn extract(columns: &mut HashMap<ComponentKind, ComponentColumn>) -> Self::Column {
                ($($P::extract(columns),)+)
            }

            #[allow(non_snake_case)]
            fn restore(col: Self::Column, columns: &mut HashMap<ComponentKind, ComponentColumn>) {
                let ($($P,)+) = col;
                $($P::restore($P, columns);)+
            }

            #[allow(non_snake_case)]
            fn fetch(col: &mut Self::Column, index: usize) -> Self::Item<'_> {
                let ($($P,)+) = col;
                ($($P::fetch($P, index),)+)
            }

            #[allow(non_snake_case)]
            fn slice(col: &mut Self::Column) -> Self::Slice<'_> {
                let ($($P,)+) = col;
                ($($P::slice($P),)+)
            }
        }
    };
}

impl_query_param_tuple!(A);
impl_query_param_tuple!(A, B);
impl_query_param_tuple!(A, B, C);
impl_query_param_tuple!(A, B, C, D);
impl_query_param_tuple!(A, B, C, D, E);
impl_query_param_tuple!(A, B, C, D, E, F);
impl_query_param_tuple!(A, B, C, D, E, F, G);

/// Read-only view of one matching archetype: its entities and columns, all
/// indexed by the same row.
#[derive(Clone, Copy)]
pub struct QueryBlock<'w> {
    pub(crate) set: ComponentSet,
    pub(crate) entities: &'w [Entity],
    pub(crate) columns: &'w HashMap<ComponentKind, ComponentColumn>,
}

impl<'w> QueryBlock<'w> {
    /// The archetype's full component set, a superset of the query.
    pub fn set(&self) -> ComponentSet {
        self.set
    }

    /// Number of live rows.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &'w [Entity] {
        self.entities
    }

    /// The whole column for `T`, or `None` if the archetype lacks it.
    pub fn column<T: Component>(&self) -> Option<&'w [T]> {
        self.columns.get(&T::KIND).map(|c| c.as_slice::<T>())
    }

    /// `T` for the entity at `row`.
    pub fn get<T: Component>(&self, row: usize) -> Option<&'w T> {
        self.column::<T>().and_then(|c| c.get(row))
    }
}
