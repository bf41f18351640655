//! # Component: Kinds, Sets and Columnar Storage
//!
//! Components are plain `Copy` records: a `Position`, a `Mesh` reference, a
//! `Script` slot. The store has to hold a *dynamic* set of them per archetype,
//! so each archetype keeps one [`ComponentColumn`] per component kind.
//!
//! ## Kinds instead of `TypeId`
//!
//! Every component type carries a compile-time [`ComponentKind`], a small
//! integer. An archetype's signature is a [`ComponentSet`]: a bitmask over
//! those integers. Two archetypes are equal when their masks are equal, and a
//! query matches when `archetype & required == required`. No reflection, no
//! hashing of type ids, and iteration order is always ascending by kind.
//!
//! ## Storage
//!
//! A column is a `Vec<T>` behind a small object-safe trait, so the data for
//! one kind is contiguous and can be handed out as `&[T]` / `&mut [T]`. Moving
//! a row between archetypes goes through the trait (`move_row`) so migration
//! never needs to know `T`.

use std::any::Any;
use std::fmt;

use crate::components::{EntityUuid, Mesh, Position, Rotation, Scale, Script};
use crate::camera::Camera;

/// Compile-time id of a component kind. The discriminant is the bit index in
/// a [`ComponentSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ComponentKind {
    Position = 0,
    Rotation = 1,
    Scale = 2,
    Mesh = 3,
    Camera = 4,
    Script = 5,
    Uuid = 6,
}

impl ComponentKind {
    /// Every kind, in ascending id order.
    pub const ALL: [ComponentKind; 7] = [
        ComponentKind::Position,
        ComponentKind::Rotation,
        ComponentKind::Scale,
        ComponentKind::Mesh,
        ComponentKind::Camera,
        ComponentKind::Script,
        ComponentKind::Uuid,
    ];

    /// Numeric id of this kind.
    pub const fn id(self) -> u8 {
        self as u8
    }

    const fn bit(self) -> u16 {
        1 << (self as u8)
    }
}

/// A sorted set of component kinds, stored as a bitmask. This is the
/// archetype signature. Ordered by raw bits so archetype iteration is
/// deterministic.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ComponentSet(u16);

impl ComponentSet {
    pub const EMPTY: Self = Self(0);

    /// Build a set from a list of kinds. Duplicates collapse.
    pub const fn of(kinds: &[ComponentKind]) -> Self {
        let mut bits = 0u16;
        let mut i = 0;
        while i < kinds.len() {
            bits |= kinds[i].bit();
            i += 1;
        }
        Self(bits)
    }

    /// A copy of this set with `kind` added.
    pub const fn with(self, kind: ComponentKind) -> Self {
        Self(self.0 | kind.bit())
    }

    /// A copy of this set with `kind` removed.
    pub const fn without(self, kind: ComponentKind) -> Self {
        Self(self.0 & !kind.bit())
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub const fn contains(self, kind: ComponentKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Superset check used by queries.
    pub const fn contains_all(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Raw bitmask, useful for diagnostics and stable ordering.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Iterate the kinds in ascending id order.
    pub fn iter(self) -> impl Iterator<Item = ComponentKind> {
        ComponentKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl fmt::Debug for ComponentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<ComponentKind> for ComponentSet {
    fn from_iter<I: IntoIterator<Item = ComponentKind>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, |set, k| set.with(k))
    }
}

/// A component value of any kind. Used where the concrete type is only known
/// at runtime: persistence, deferred commands, diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ComponentValue {
    Position(Position),
    Rotation(Rotation),
    Scale(Scale),
    Mesh(Mesh),
    Camera(Camera),
    Script(Script),
    Uuid(EntityUuid),
}

impl ComponentValue {
    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentValue::Position(_) => ComponentKind::Position,
            ComponentValue::Rotation(_) => ComponentKind::Rotation,
            ComponentValue::Scale(_) => ComponentKind::Scale,
            ComponentValue::Mesh(_) => ComponentKind::Mesh,
            ComponentValue::Camera(_) => ComponentKind::Camera,
            ComponentValue::Script(_) => ComponentKind::Script,
            ComponentValue::Uuid(_) => ComponentKind::Uuid,
        }
    }
}

/// A fixed-shape record that can live in archetype storage.
pub trait Component: Copy + Default + fmt::Debug + Send + Sync + 'static {
    const KIND: ComponentKind;

    fn into_value(self) -> ComponentValue;

    fn from_value(value: ComponentValue) -> Option<Self>;
}

macro_rules! impl_component {
    ($($T:ident => $kind:ident),+ $(,)?) => {
        $(
            impl Component for $T {
                const KIND: ComponentKind = ComponentKind::$kind;

                fn into_value(self) -> ComponentValue {
                    ComponentValue::$kind(self)
                }

                fn from_value(value: ComponentValue) -> Option<Self> {
                    match value {
                        ComponentValue::$kind(v) => Some(v),
                        _ => None,
                    }
                }
            }

            impl From<$T> for ComponentValue {
                fn from(value: $T) -> Self {
                    ComponentValue::$kind(value)
                }
            }
        )+
    };
}

impl_component!(
    Position => Position,
    Rotation => Rotation,
    Scale => Scale,
    Mesh => Mesh,
    Camera => Camera,
    Script => Script,
    EntityUuid => Uuid,
);

/// Object-safe view of a `Vec<T>` column.
trait ColumnStorage: Send + Sync {
    fn len(&self) -> usize;
    fn swap_remove(&mut self, row: usize);
    /// Swap-remove `row` from `self` and push it onto `dst`.
    fn move_row(&mut self, row: usize, dst: &mut dyn ColumnStorage);
    fn value_at(&self, row: usize) -> ComponentValue;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ColumnStorage for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn swap_remove(&mut self, row: usize) {
        Vec::swap_remove(self, row);
    }

    fn move_row(&mut self, row: usize, dst: &mut dyn ColumnStorage) {
        let value = Vec::swap_remove(self, row);
        dst.as_any_mut()
            .downcast_mut::<Vec<T>>()
            .unwrap_or_else(|| {
                panic!(
                    "Column kind mismatch while migrating `{}`",
                    std::any::type_name::<T>()
                )
            })
            .push(value);
    }

    fn value_at(&self, row: usize) -> ComponentValue {
        self[row].into_value()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A contiguous column holding every value of one component kind in an
/// archetype.
///
/// Type correctness is checked with a downcast on access; a mismatch means the
/// archetype bookkeeping is broken and panics.
pub struct ComponentColumn {
    kind: ComponentKind,
    data: Box<dyn ColumnStorage>,
}

impl ComponentColumn {
    /// Create an empty column for `T`.
    pub fn new<T: Component>() -> Self {
        Self {
            kind: T::KIND,
            data: Box::new(Vec::<T>::new()),
        }
    }

    /// Create an empty column for a runtime kind.
    pub fn for_kind(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::Position => Self::new::<Position>(),
            ComponentKind::Rotation => Self::new::<Rotation>(),
            ComponentKind::Scale => Self::new::<Scale>(),
            ComponentKind::Mesh => Self::new::<Mesh>(),
            ComponentKind::Camera => Self::new::<Camera>(),
            ComponentKind::Script => Self::new::<Script>(),
            ComponentKind::Uuid => Self::new::<EntityUuid>(),
        }
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    fn vec<T: Component>(&self) -> &Vec<T> {
        self.data.as_any().downcast_ref().unwrap_or_else(|| {
            panic!(
                "Component type mismatch: expected `{}` in {:?} column",
                std::any::type_name::<T>(),
                self.kind
            )
        })
    }

    fn vec_mut<T: Component>(&mut self) -> &mut Vec<T> {
        let kind = self.kind;
        self.data.as_any_mut().downcast_mut().unwrap_or_else(|| {
            panic!(
                "Component type mismatch: expected `{}` in {:?} column",
                std::any::type_name::<T>(),
                kind
            )
        })
    }

    /// Push a typed component onto the end of the column.
    pub fn push<T: Component>(&mut self, value: T) {
        self.vec_mut::<T>().push(value);
    }

    /// Push a runtime-typed value. Panics if the value's kind is not this
    /// column's kind.
    pub fn push_value(&mut self, value: ComponentValue) {
        match value {
            ComponentValue::Position(v) => self.push(v),
            ComponentValue::Rotation(v) => self.push(v),
            ComponentValue::Scale(v) => self.push(v),
            ComponentValue::Mesh(v) => self.push(v),
            ComponentValue::Camera(v) => self.push(v),
            ComponentValue::Script(v) => self.push(v),
            ComponentValue::Uuid(v) => self.push(v),
        }
    }

    /// Overwrite the value at `row`. Panics if the value's kind is not this
    /// column's kind.
    pub fn set_value(&mut self, row: usize, value: ComponentValue) {
        match value {
            ComponentValue::Position(v) => *self.get_mut(row) = v,
            ComponentValue::Rotation(v) => *self.get_mut(row) = v,
            ComponentValue::Scale(v) => *self.get_mut(row) = v,
            ComponentValue::Mesh(v) => *self.get_mut(row) = v,
            ComponentValue::Camera(v) => *self.get_mut(row) = v,
            ComponentValue::Script(v) => *self.get_mut(row) = v,
            ComponentValue::Uuid(v) => *self.get_mut(row) = v,
        }
    }

    /// Push the kind's default value.
    pub fn push_default(&mut self) {
        match self.kind {
            ComponentKind::Position => self.push(Position::default()),
            ComponentKind::Rotation => self.push(Rotation::default()),
            ComponentKind::Scale => self.push(Scale::default()),
            ComponentKind::Mesh => self.push(Mesh::default()),
            ComponentKind::Camera => self.push(Camera::default()),
            ComponentKind::Script => self.push(Script::default()),
            ComponentKind::Uuid => self.push(EntityUuid::default()),
        }
    }

    pub fn get<T: Component>(&self, row: usize) -> &T {
        &self.vec::<T>()[row]
    }

    pub fn get_mut<T: Component>(&mut self, row: usize) -> &mut T {
        &mut self.vec_mut::<T>()[row]
    }

    /// The whole column as a slice.
    pub fn as_slice<T: Component>(&self) -> &[T] {
        self.vec::<T>()
    }

    pub fn as_mut_slice<T: Component>(&mut self) -> &mut [T] {
        self.vec_mut::<T>()
    }

    /// Runtime-typed copy of the value at `row`.
    pub fn value(&self, row: usize) -> ComponentValue {
        self.data.value_at(row)
    }

    /// Swap-remove the value at `row`, dropping it.
    pub fn swap_remove(&mut self, row: usize) {
        self.data.swap_remove(row);
    }

    /// Swap-remove the value at `row` and append it to `dst`, which must be a
    /// column of the same kind.
    pub fn move_row_to(&mut self, row: usize, dst: &mut ComponentColumn) {
        debug_assert_eq!(self.kind, dst.kind);
        self.data.move_row(row, &mut *dst.data);
    }

    /// Number of components stored.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    #[test]
    fn set_is_order_independent() {
        let a = ComponentSet::of(&[ComponentKind::Mesh, ComponentKind::Position]);
        let b = ComponentSet::of(&[ComponentKind::Position, ComponentKind::Mesh, ComponentKind::Mesh]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        let kinds: Vec<_> = a.iter().collect();
        assert_eq!(kinds, vec![ComponentKind::Position, ComponentKind::Mesh]);
    }

    #[test]
    fn superset_check() {
        let model = ComponentSet::of(&[
            ComponentKind::Position,
            ComponentKind::Rotation,
            ComponentKind::Scale,
            ComponentKind::Mesh,
        ]);
        let drawable = ComponentSet::of(&[ComponentKind::Position, ComponentKind::Mesh]);
        assert!(model.contains_all(drawable));
        assert!(!drawable.contains_all(model));
        assert!(model.contains_all(ComponentSet::EMPTY));
    }

    #[test]
    fn push_and_get() {
        let mut col = ComponentColumn::new::<Position>();
        col.push(Position::new(1.0, 2.0, 3.0));
        col.push(Position::new(4.0, 5.0, 6.0));
        assert_eq!(col.len(), 2);
        assert_eq!(col.get::<Position>(1).value, Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(col.as_slice::<Position>().len(), 2);
    }

    #[test]
    fn swap_remove_middle() {
        let mut col = ComponentColumn::new::<Mesh>();
        col.push(Mesh::new(10, 0));
        col.push(Mesh::new(20, 0));
        col.push(Mesh::new(30, 0));
        col.swap_remove(0);
        assert_eq!(col.len(), 2);
        assert_eq!(col.get::<Mesh>(0).mesh_index, 30);
        assert_eq!(col.get::<Mesh>(1).mesh_index, 20);
    }

    #[test]
    fn move_row_between_columns() {
        let mut src = ComponentColumn::for_kind(ComponentKind::Scale);
        let mut dst = ComponentColumn::for_kind(ComponentKind::Scale);
        src.push(Scale::new(1.0, 1.0, 1.0));
        src.push(Scale::new(5.0, 1.0, 5.0));

        src.move_row_to(1, &mut dst);
        assert_eq!(src.len(), 1);
        assert_eq!(dst.len(), 1);
        assert_eq!(*dst.get::<Scale>(0), Scale::new(5.0, 1.0, 5.0));
    }

    #[test]
    fn push_value_round_trips_through_kind() {
        let mut col = ComponentColumn::for_kind(ComponentKind::Rotation);
        col.push_value(ComponentValue::Rotation(Rotation::new(0.1, 0.2, 0.3)));
        assert_eq!(col.value(0), Rotation::new(0.1, 0.2, 0.3).into_value());
        assert_eq!(col.value(0).kind(), ComponentKind::Rotation);
    }

    #[test]
    #[should_panic(expected = "type mismatch")]
    fn wrong_type_panics() {
        let mut col = ComponentColumn::new::<Position>();
        col.push(Position::default());
        let _ = col.get::<Scale>(0);
    }
}
