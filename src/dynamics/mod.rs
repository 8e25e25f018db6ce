//! Rigid body state, forces, constraints, the PGS solver, and sleep.

pub mod constraint;
pub mod forces;
pub mod rigid_body;
pub mod sleep;
pub mod solver;

pub use constraint::{Constraint, ConstraintBounds};
pub use forces::Force;
pub use rigid_body::{BodyFlags, BodyProperties, RigidBody};
pub use solver::{pgs_solve, ConstraintInput};

use slotmap::SlotMap;

use crate::handles::{BodyHandle, ForceHandle};

/// Per-body force-emitter subscriptions. A body may have any number of
/// forces bound to it (gravity plus any user emitters); all are applied
/// every step before integration, skipping sleeping bodies.
#[derive(Default)]
pub struct ForceManager {
    bindings: SlotMap<ForceHandle, (BodyHandle, Box<dyn Force>)>,
}

impl ForceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, body: BodyHandle, force: Box<dyn Force>) -> ForceHandle {
        self.bindings.insert((body, force))
    }

    pub fn unbind(&mut self, handle: ForceHandle) -> bool {
        self.bindings.remove(handle).is_some()
    }

    /// Applies every binding whose body exists and is not sleeping. Forces
    /// bound to a removed body are inert, not an error: the binding is
    /// cleaned up lazily by the caller via [`Self::retain_bodies`].
    pub fn apply_all(&self, bodies: &mut SlotMap<BodyHandle, RigidBody>) {
        for (body_handle, force) in self.bindings.values() {
            if let Some(body) = bodies.get_mut(*body_handle) {
                if !body.flags.sleeping {
                    force.apply(body);
                }
            }
        }
    }

    /// Drops bindings whose body no longer exists, called after a body is
    /// removed from the world.
    pub fn retain_bodies(&mut self, bodies: &SlotMap<BodyHandle, RigidBody>) {
        self.bindings.retain(|_, (handle, _)| bodies.contains_key(*handle));
    }
}
