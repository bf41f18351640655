//! # Scripts: Per-Entity Behaviours
//!
//! A [`Behavior`] is user logic attached to an entity through its
//! [`Script`](crate::components::Script) component. The [`ScriptHost`] owns
//! every behaviour instance and drives them once per frame:
//!
//! ```text
//! pull    snapshot Position/Rotation/Scale of each enabled script entity
//! invoke  on_update for every job, fanned out over rayon
//! join    barrier; nothing below runs until every job is done
//! push    write the working transforms back
//! apply   run the queued Commands, one job after the other
//! ```
//!
//! Behaviours never hold live component references. During the parallel
//! phase they see the world through `&World` and their own by-value working
//! transform; anything else they want to change (shared flags, other
//! entities, the tree) is queued on [`Commands`] and applied serially after
//! the join.

mod behavior;
mod commands;
mod fly_camera;
mod host;

pub use behavior::{Behavior, BehaviorRegistry, ScriptContext};
pub use commands::{Command, Commands};
pub use fly_camera::FlyCamera;
pub use host::{ScriptHost, UpdateReport};

/// Slot of a behaviour instance inside a [`ScriptHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BehaviorHandle(pub(crate) u32);

impl BehaviorHandle {
    pub fn index(self) -> u32 {
        self.0
    }
}
