//! Constraint trait and the contact/distance constraint implementors the
//! solver assembles a Jacobian row for each step.

use std::fmt;

use glam::Vec3;

use crate::handles::BodyHandle;

use super::rigid_body::RigidBody;

/// Clamp bounds on a constraint's solved impulse magnitude.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintBounds {
    pub min: f32,
    pub max: f32,
}

impl ConstraintBounds {
    pub const UNBOUNDED: Self = Self {
        min: f32::NEG_INFINITY,
        max: f32::INFINITY,
    };

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

/// One row of the assembled constraint system: a Jacobian, a bias, and
/// bounds on the impulse the solver may apply. `jacobian` is ordered
/// `(linear_a, angular_a, linear_b, angular_b)`, 3 floats each.
pub trait Constraint: fmt::Debug {
    fn bodies(&self) -> (BodyHandle, BodyHandle);
    fn jacobian(&self, body_a: &RigidBody, body_b: &RigidBody) -> [Vec3; 4];
    fn bias(&self, body_a: &RigidBody, body_b: &RigidBody, dt: f32) -> f32;
    fn bounds(&self, normal_impulse_hint: f32) -> ConstraintBounds;

    /// Warm-start impulse carried from the previous solve, if this
    /// constraint participates in cross-frame persistence (contacts do via
    /// their manifold; most user constraints start cold each assembly).
    fn warm_start_impulse(&self) -> f32 {
        0.0
    }

    /// Called once after the solver converges so the constraint can persist
    /// its final impulse (contacts write it back to the manifold).
    fn store_impulse(&mut self, _impulse: f32) {}
}

/// Contact normal constraint: prevents inter-penetration along the contact
/// normal. `min = 0, max = infinity` — a contact only pushes, never pulls.
#[derive(Debug)]
pub struct NormalContactConstraint {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub point_a: Vec3,
    pub point_b: Vec3,
    pub normal: Vec3,
    pub penetration: f32,
    pub restitution: f32,
    pub warm_start: f32,
    pub baumgarte: f32,
    pub restitution_slop: f32,
    pub penetration_slop: f32,
}

impl Constraint for NormalContactConstraint {
    fn bodies(&self) -> (BodyHandle, BodyHandle) {
        (self.body_a, self.body_b)
    }

    fn jacobian(&self, body_a: &RigidBody, body_b: &RigidBody) -> [Vec3; 4] {
        let ra = self.point_a - body_a.position;
        let rb = self.point_b - body_b.position;
        [
            -self.normal,
            -ra.cross(self.normal),
            self.normal,
            rb.cross(self.normal),
        ]
    }

    fn bias(&self, body_a: &RigidBody, body_b: &RigidBody, dt: f32) -> f32 {
        let ra = self.point_a - body_a.position;
        let rb = self.point_b - body_b.position;
        let relative_velocity = (body_b.linear_velocity + body_b.angular_velocity.cross(rb))
            - (body_a.linear_velocity + body_a.angular_velocity.cross(ra));
        let approach_velocity = relative_velocity.dot(self.normal);

        let penetration_bias =
            self.baumgarte * (self.penetration - self.penetration_slop).max(0.0) / dt;
        let restitution_bias =
            self.restitution * (-approach_velocity - self.restitution_slop).max(0.0);

        -(penetration_bias + restitution_bias)
    }

    fn bounds(&self, _normal_impulse_hint: f32) -> ConstraintBounds {
        ConstraintBounds {
            min: 0.0,
            max: f32::INFINITY,
        }
    }

    fn warm_start_impulse(&self) -> f32 {
        self.warm_start
    }
}

/// One of the two friction constraints coupled to a contact's normal
/// impulse. `friction_bound` is the most recently solved normal impulse
/// times the body pair's friction coefficient, re-read every PGS sweep so
/// the cone tightens as the normal impulse converges.
#[derive(Debug)]
pub struct FrictionContactConstraint {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub point_a: Vec3,
    pub point_b: Vec3,
    pub tangent: Vec3,
    pub friction_coefficient: f32,
    pub warm_start: f32,
}

impl Constraint for FrictionContactConstraint {
    fn bodies(&self) -> (BodyHandle, BodyHandle) {
        (self.body_a, self.body_b)
    }

    fn jacobian(&self, body_a: &RigidBody, body_b: &RigidBody) -> [Vec3; 4] {
        let ra = self.point_a - body_a.position;
        let rb = self.point_b - body_b.position;
        [
            -self.tangent,
            -ra.cross(self.tangent),
            self.tangent,
            rb.cross(self.tangent),
        ]
    }

    fn bias(&self, _body_a: &RigidBody, _body_b: &RigidBody, _dt: f32) -> f32 {
        0.0
    }

    fn bounds(&self, normal_impulse_hint: f32) -> ConstraintBounds {
        let limit = self.friction_coefficient * normal_impulse_hint.max(0.0);
        ConstraintBounds {
            min: -limit,
            max: limit,
        }
    }

    fn warm_start_impulse(&self) -> f32 {
        self.warm_start
    }
}

/// A rigid rod between two anchor points (world space at assembly time):
/// keeps the distance between them at `rest_length`.
#[derive(Debug)]
pub struct DistanceConstraint {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub anchor_a: Vec3,
    pub anchor_b: Vec3,
    pub rest_length: f32,
    pub bias_factor: f32,
    warm_start: f32,
}

impl DistanceConstraint {
    pub fn new(
        body_a: BodyHandle,
        body_b: BodyHandle,
        anchor_a: Vec3,
        anchor_b: Vec3,
        rest_length: f32,
    ) -> Self {
        Self {
            body_a,
            body_b,
            anchor_a,
            anchor_b,
            rest_length,
            bias_factor: 0.2,
            warm_start: 0.0,
        }
    }

    fn world_anchors(&self, body_a: &RigidBody, body_b: &RigidBody) -> (Vec3, Vec3) {
        (
            body_a.world_transform.transform_point3(self.anchor_a),
            body_b.world_transform.transform_point3(self.anchor_b),
        )
    }
}

impl Constraint for DistanceConstraint {
    fn bodies(&self) -> (BodyHandle, BodyHandle) {
        (self.body_a, self.body_b)
    }

    fn jacobian(&self, body_a: &RigidBody, body_b: &RigidBody) -> [Vec3; 4] {
        let (world_a, world_b) = self.world_anchors(body_a, body_b);
        let delta = world_b - world_a;
        let direction = delta.normalize_or_zero();
        let ra = world_a - body_a.position;
        let rb = world_b - body_b.position;
        [
            -direction,
            -ra.cross(direction),
            direction,
            rb.cross(direction),
        ]
    }

    fn bias(&self, body_a: &RigidBody, body_b: &RigidBody, dt: f32) -> f32 {
        let (world_a, world_b) = self.world_anchors(body_a, body_b);
        let current_length = (world_b - world_a).length();
        let error = current_length - self.rest_length;
        -self.bias_factor * error / dt
    }

    fn bounds(&self, _normal_impulse_hint: f32) -> ConstraintBounds {
        ConstraintBounds::UNBOUNDED
    }

    fn warm_start_impulse(&self) -> f32 {
        self.warm_start
    }

    fn store_impulse(&mut self, impulse: f32) {
        self.warm_start = impulse;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat3, Quat};

    fn body_at(pos: Vec3) -> RigidBody {
        let props = crate::dynamics::rigid_body::BodyProperties::dynamic(1.0, Mat3::IDENTITY)
            .unwrap();
        crate::dynamics::rigid_body::RigidBody::new(props, pos, Quat::IDENTITY)
    }

    #[test]
    fn distance_constraint_bias_is_zero_at_rest_length() {
        let a = body_at(Vec3::new(-1.0, 0.0, 0.0));
        let b = body_at(Vec3::new(1.0, 0.0, 0.0));
        let c = DistanceConstraint::new(
            BodyHandle::default(),
            BodyHandle::default(),
            Vec3::ZERO,
            Vec3::ZERO,
            2.0,
        );
        assert!(c.bias(&a, &b, 1.0 / 60.0).abs() < 1e-5);
    }

    #[test]
    fn friction_bounds_scale_with_normal_impulse() {
        let c = FrictionContactConstraint {
            body_a: BodyHandle::default(),
            body_b: BodyHandle::default(),
            point_a: Vec3::ZERO,
            point_b: Vec3::ZERO,
            tangent: Vec3::X,
            friction_coefficient: 0.5,
            warm_start: 0.0,
        };
        let bounds = c.bounds(10.0);
        assert_eq!(bounds.min, -5.0);
        assert_eq!(bounds.max, 5.0);
    }
}
