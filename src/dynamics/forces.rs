//! Force emitters and the per-body subscription table.

use std::fmt;

use glam::Vec3;

use super::rigid_body::RigidBody;

/// A force emitter: writes into a body's accumulators. Implementors are
/// free to read the body's current pose/velocity to compute a
/// velocity-dependent force (drag, springs); they must not otherwise mutate
/// the body.
pub trait Force: fmt::Debug {
    fn apply(&self, body: &mut RigidBody);
}

/// Uniform gravitational acceleration. Adds `g * mass` (i.e. `g /
/// inv_mass`) to `force_accum`; bodies with `inv_mass == 0` are inert so
/// static/kinematic bodies never accumulate a gravity force.
#[derive(Debug, Clone, Copy)]
pub struct Gravity(pub Vec3);

impl Force for Gravity {
    fn apply(&self, body: &mut RigidBody) {
        if body.props.inv_mass == 0.0 {
            return;
        }
        body.force_accum += self.0 / body.props.inv_mass;
    }
}

/// A constant world-space force applied regardless of mass (e.g. thrust).
#[derive(Debug, Clone, Copy)]
pub struct ConstantForce(pub Vec3);

impl Force for ConstantForce {
    fn apply(&self, body: &mut RigidBody) {
        body.force_accum += self.0;
    }
}

/// Linear drag proportional to velocity squared, applied opposite the
/// direction of travel; mainly useful for demos that want air resistance
/// without relying on the integrator's exponential damping term.
#[derive(Debug, Clone, Copy)]
pub struct QuadraticDrag {
    pub coefficient: f32,
}

impl Force for QuadraticDrag {
    fn apply(&self, body: &mut RigidBody) {
        let speed = body.linear_velocity.length();
        if speed < 1e-6 {
            return;
        }
        body.force_accum -= body.linear_velocity * (speed * self.coefficient);
    }
}
