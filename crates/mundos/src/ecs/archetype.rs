//! # Archetype: Grouping Entities by Component Signature
//!
//! Every entity with exactly the same [`ComponentSet`] lives in the same
//! archetype. Iteration over a query is then a linear scan over the matching
//! archetypes' columns.
//!
//! ## Memory layout
//!
//! ```text
//! Archetype { set: {Position, Rotation, Scale, Uuid} }
//!
//! columns:
//!   Position: [p0, p1, p2]
//!   Rotation: [r0, r1, r2]
//!   Scale:    [s0, s1, s2]
//!   Uuid:     [u0, u1, u2]
//! entities:   [e0, e1, e2]
//! ```
//!
//! All arrays have the same length; row `i` of every column belongs to
//! `entities[i]`. Removal is swap-remove, so the last row moves into the hole
//! and the caller has to fix up that entity's location.

use std::collections::HashMap;

use super::component::{ComponentColumn, ComponentKind, ComponentSet, ComponentValue};
use super::entity::Entity;

/// A table of entities that all share the same component kinds.
pub(crate) struct Archetype {
    set: ComponentSet,
    /// One column per kind in `set`.
    pub columns: HashMap<ComponentKind, ComponentColumn>,
    /// Parallel to the column rows.
    pub entities: Vec<Entity>,
}

impl Archetype {
    pub fn new(set: ComponentSet) -> Self {
        let columns = set
            .iter()
            .map(|kind| (kind, ComponentColumn::for_kind(kind)))
            .collect();
        Self {
            set,
            columns,
            entities: Vec::new(),
        }
    }

    pub fn set(&self) -> ComponentSet {
        self.set
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn column(&self, kind: ComponentKind) -> Option<&ComponentColumn> {
        self.columns.get(&kind)
    }

    pub fn column_mut(&mut self, kind: ComponentKind) -> Option<&mut ComponentColumn> {
        self.columns.get_mut(&kind)
    }

    /// Append a row. Kinds without a matching entry in `values` start at
    /// their default; values for kinds outside the set are ignored.
    pub fn push_row(&mut self, entity: Entity, values: &[ComponentValue]) -> usize {
        for (kind, column) in self.columns.iter_mut() {
            match values.iter().rev().find(|v| v.kind() == *kind) {
                Some(value) => column.push_value(*value),
                None => column.push_default(),
            }
        }
        self.entities.push(entity);
        self.debug_check();
        self.entities.len() - 1
    }

    /// Swap-remove the row at `row`. Returns the entity moved into the slot,
    /// if any.
    pub fn swap_remove(&mut self, row: usize) -> Option<Entity> {
        for column in self.columns.values_mut() {
            column.swap_remove(row);
        }
        self.entities.swap_remove(row);
        self.entities.get(row).copied()
    }

    /// Move the row at `row` into `dst`. Kinds shared with `dst` are moved
    /// unchanged, kinds `dst` lacks are dropped. Kinds only `dst` has are left
    /// for the caller to push.
    ///
    /// Returns `(new_row, swapped)`, where `swapped` is the entity that filled
    /// the hole in `self`.
    pub fn move_row(&mut self, row: usize, dst: &mut Archetype) -> (usize, Option<Entity>) {
        let entity = self.entities[row];
        for (kind, column) in self.columns.iter_mut() {
            match dst.columns.get_mut(kind) {
                Some(target) => column.move_row_to(row, target),
                None => column.swap_remove(row),
            }
        }
        self.entities.swap_remove(row);
        dst.entities.push(entity);
        (dst.entities.len() - 1, self.entities.get(row).copied())
    }

    /// Runtime-typed copies of every value in `row`, ascending by kind.
    pub fn row_values(&self, row: usize) -> Vec<ComponentValue> {
        self.set
            .iter()
            .filter_map(|kind| self.columns.get(&kind).map(|c| c.value(row)))
            .collect()
    }

    fn debug_check(&self) {
        debug_assert!(
            self.columns.values().all(|c| c.len() == self.entities.len()),
            "archetype {:?} columns out of step with its entity list",
            self.set
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Mesh, Position, Scale};

    fn entity(index: u32) -> Entity {
        Entity {
            index,
            generation: 0,
        }
    }

    #[test]
    fn new_archetype_has_one_column_per_kind() {
        let set = ComponentSet::of(&[ComponentKind::Position, ComponentKind::Mesh]);
        let arch = Archetype::new(set);
        assert_eq!(arch.columns.len(), 2);
        assert!(arch.column(ComponentKind::Position).is_some());
        assert!(arch.column(ComponentKind::Scale).is_none());
        assert!(arch.is_empty());
    }

    #[test]
    fn push_row_fills_defaults() {
        let set = ComponentSet::of(&[ComponentKind::Position, ComponentKind::Scale]);
        let mut arch = Archetype::new(set);
        let row = arch.push_row(entity(0), &[Position::new(1.0, 2.0, 3.0).into()]);
        assert_eq!(row, 0);
        let pos = arch.column(ComponentKind::Position).unwrap().get::<Position>(0);
        let scale = arch.column(ComponentKind::Scale).unwrap().get::<Scale>(0);
        assert_eq!(*pos, Position::new(1.0, 2.0, 3.0));
        assert_eq!(*scale, Scale::default());
    }

    #[test]
    fn swap_remove_reports_moved_entity() {
        let mut arch = Archetype::new(ComponentSet::of(&[ComponentKind::Mesh]));
        for i in 0..3 {
            arch.push_row(entity(i), &[Mesh::new(i * 10, 0).into()]);
        }
        assert_eq!(arch.swap_remove(0), Some(entity(2)));
        assert_eq!(arch.column(ComponentKind::Mesh).unwrap().get::<Mesh>(0).mesh_index, 20);
        assert_eq!(arch.swap_remove(1), None);
        assert_eq!(arch.len(), 1);
    }

    #[test]
    fn move_row_keeps_shared_values() {
        let small = ComponentSet::of(&[ComponentKind::Position]);
        let big = small.with(ComponentKind::Mesh);
        let mut src = Archetype::new(small);
        let mut dst = Archetype::new(big);
        src.push_row(entity(0), &[Position::new(1.0, 0.0, 0.0).into()]);
        src.push_row(entity(1), &[Position::new(2.0, 0.0, 0.0).into()]);

        let (new_row, swapped) = src.move_row(0, &mut dst);
        dst.column_mut(ComponentKind::Mesh).unwrap().push(Mesh::new(7, 1));

        assert_eq!(new_row, 0);
        assert_eq!(swapped, Some(entity(1)));
        assert_eq!(dst.entities, vec![entity(0)]);
        assert_eq!(
            *dst.column(ComponentKind::Position).unwrap().get::<Position>(0),
            Position::new(1.0, 0.0, 0.0)
        );
        assert_eq!(src.len(), 1);
        assert_eq!(
            *src.column(ComponentKind::Position).unwrap().get::<Position>(0),
            Position::new(2.0, 0.0, 0.0)
        );
    }
}
