//! rein-physics: a standalone rigid-body physics core.
//!
//! A fixed-step 3D physics simulation: sweep-and-prune broadphase, GJK/EPA
//! narrowphase over convex and concave shapes, persistent contact manifolds
//! with warm-starting, and a projected Gauss-Seidel constraint solver shared
//! by contacts, distance constraints, and any user [`dynamics::Constraint`].
//!
//! # Architecture
//!
//! 1. **math** - AABB and shared affine math
//! 2. **collider** - convex/concave shape representation and the collider
//!    wrapper that tracks a cached world transform and AABB
//! 3. **narrowphase** - GJK distance queries, EPA penetration depth, ray casts
//! 4. **contact** - persistent contact manifolds between collider pairs
//! 5. **broadphase** - sweep-and-prune candidate pair generation
//! 6. **dynamics** - rigid body integration, forces, constraints, the PGS
//!    solver, and sleeping
//! 7. **world** - the owning root that ties the above into a step loop
//!
//! `step` advances the simulation; everything else is reached through
//! [`World`] accessors or the handles returned by its mutators.

pub mod broadphase;
pub mod collider;
pub mod config;
pub mod contact;
pub mod dynamics;
pub mod error;
pub mod handles;
pub mod math;
pub mod narrowphase;
pub mod world;

pub use collider::{Collider, Shape};
pub use config::WorldConfig;
pub use contact::{Contact, Manifold, ManifoldState};
pub use dynamics::{BodyFlags, BodyProperties, Constraint, ConstraintBounds, Force, RigidBody};
pub use error::{PhysicsError, Result};
pub use handles::{BodyHandle, ColliderHandle, ConstraintHandle, ForceHandle};
pub use math::Aabb;
pub use world::{RayHit, World};

// Re-export glam for convenience, since handles, shapes, and constraints all
// speak it at the public API boundary.
pub use glam;
