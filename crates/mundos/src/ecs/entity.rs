//! # Entity: Generational Handles
//!
//! An [`Entity`] is a plain handle. It owns no data; the
//! [`World`](super::world::World) maps it to a row in some archetype and to a
//! node in the hierarchy.
//!
//! ## Generational indices
//!
//! Slots are recycled after destruction. Each slot carries a generation that
//! is bumped on release, so a handle kept across a destroy stops resolving
//! instead of silently pointing at whatever reused the slot:
//!
//! ```text
//! Entity { index: 5, generation: 0 }  ← created
//! Entity { index: 5, generation: 1 }  ← slot reused after destroy
//! ```
//!
//! Looking up the first handle after the reuse yields
//! [`WorldError::DeadEntity`](crate::error::WorldError::DeadEntity).

use std::fmt;

use crate::error::WorldError;

/// A lightweight handle to an entity in a [`World`](super::world::World).
///
/// Only valid for the world that created it, and only while its generation
/// matches the slot's.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl Entity {
    /// Slot index. Useful for diagnostics, not for identity.
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Hands out entity ids and recycles released slots.
///
/// ```text
/// generations: [0, 1, 0, 2, 0]   ← one per slot ever allocated
/// free_list:   [1, 3]            ← released slots, reused LIFO
/// ```
///
/// A slot whose generation reaches `u32::MAX` is retired: it is never handed
/// out again, so no live handle can carry that generation.
pub(crate) struct EntityAllocator {
    generations: Vec<u32>,
    free_list: Vec<u32>,
    retired: usize,
    /// Upper bound on slot count. `u32::MAX` outside of tests.
    limit: u32,
}

const RETIRED: u32 = u32::MAX;

impl EntityAllocator {
    pub fn new() -> Self {
        Self::with_limit(u32::MAX)
    }

    pub fn with_limit(limit: u32) -> Self {
        Self {
            generations: Vec::new(),
            free_list: Vec::new(),
            retired: 0,
            limit,
        }
    }

    /// Allocate a fresh handle, reusing a released slot when one exists.
    pub fn allocate(&mut self) -> Result<Entity, WorldError> {
        if let Some(index) = self.free_list.pop() {
            let generation = self.generations[index as usize];
            return Ok(Entity { index, generation });
        }
        let index = u32::try_from(self.generations.len()).map_err(|_| WorldError::Exhausted)?;
        if index >= self.limit {
            return Err(WorldError::Exhausted);
        }
        self.generations.push(0);
        Ok(Entity {
            index,
            generation: 0,
        })
    }

    /// Release a handle. Returns `false` if it was already stale.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        self.release_slot(entity.index);
        true
    }

    fn release_slot(&mut self, index: u32) {
        let generation = &mut self.generations[index as usize];
        *generation += 1;
        if *generation == RETIRED {
            log::warn!("retiring entity slot {index} after generation overflow");
            self.retired += 1;
        } else {
            self.free_list.push(index);
        }
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        entity.generation != RETIRED
            && self
                .generations
                .get(entity.index as usize)
                .is_some_and(|&g| g == entity.generation)
    }

    pub fn alive_count(&self) -> usize {
        self.generations.len() - self.free_list.len() - self.retired
    }

    #[cfg(any(feature = "diagnostics", test))]
    pub(crate) fn free_count(&self) -> usize {
        self.free_list.len()
    }

    #[cfg(any(feature = "diagnostics", test))]
    pub(crate) fn total_slots(&self) -> usize {
        self.generations.len()
    }
}
