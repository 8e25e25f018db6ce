//! Rigid body state and the semi-implicit Euler integrator.

use glam::{Mat3, Mat4, Quat, Vec3};

use crate::config::WorldConfig;
use crate::error::{PhysicsError, Result};

/// Lifecycle flags refreshed once per step; queried by the world between
/// steps to decide what needs re-synchronizing (e.g. collider transforms).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BodyFlags {
    pub updated: bool,
    pub sleeping: bool,
    pub integrated: bool,
    pub constraints_solved: bool,
}

/// Properties that do not change per-frame (or change rarely, via the host
/// calling a setter): mass, inertia, damping, material.
#[derive(Debug, Clone, Copy)]
pub struct BodyProperties {
    pub inv_mass: f32,
    pub inv_local_inertia: Mat3,
    pub linear_drag: f32,
    pub angular_drag: f32,
    pub friction_coefficient: f32,
    pub restitution: f32,
    /// Per-body override of [`WorldConfig::sleep_motion_threshold`]; `None`
    /// defers to the world default.
    pub sleep_motion_threshold: Option<f32>,
}

impl BodyProperties {
    pub fn dynamic(mass: f32, local_inertia: Mat3) -> Result<Self> {
        if !(mass > 0.0) || !mass.is_finite() {
            return Err(PhysicsError::InvalidArgument(format!(
                "mass must be positive and finite, got {mass}"
            )));
        }
        if !local_inertia.is_finite() {
            return Err(PhysicsError::InvalidArgument(
                "local inertia tensor must be finite".into(),
            ));
        }
        Ok(Self {
            inv_mass: 1.0 / mass,
            inv_local_inertia: local_inertia.inverse(),
            linear_drag: 0.0,
            angular_drag: 0.0,
            friction_coefficient: 0.5,
            restitution: 0.0,
            sleep_motion_threshold: None,
        })
    }

    /// A kinematic/static body: infinite mass and inertia, never integrated,
    /// never accepts impulses.
    pub fn kinematic() -> Self {
        Self {
            inv_mass: 0.0,
            inv_local_inertia: Mat3::ZERO,
            linear_drag: 0.0,
            angular_drag: 0.0,
            friction_coefficient: 0.5,
            restitution: 0.0,
            sleep_motion_threshold: None,
        }
    }

    pub fn is_kinematic(&self) -> bool {
        self.inv_mass == 0.0
    }
}

/// A simulated rigid body: pose, velocity, accumulators, and the data the
/// integrator derives from them.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub props: BodyProperties,

    pub position: Vec3,
    pub orientation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub linear_acceleration: Vec3,
    pub angular_acceleration: Vec3,
    pub force_accum: Vec3,
    pub torque_accum: Vec3,

    pub world_transform: Mat4,
    pub inv_inertia_world: Mat3,
    pub motion: f32,
    pub sleep_timer: f32,
    pub flags: BodyFlags,
}

impl RigidBody {
    pub fn new(props: BodyProperties, position: Vec3, orientation: Quat) -> Self {
        let mut body = Self {
            props,
            position,
            orientation: orientation.normalize(),
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            linear_acceleration: Vec3::ZERO,
            angular_acceleration: Vec3::ZERO,
            force_accum: Vec3::ZERO,
            torque_accum: Vec3::ZERO,
            world_transform: Mat4::IDENTITY,
            inv_inertia_world: Mat3::ZERO,
            motion: 0.0,
            sleep_timer: 0.0,
            flags: BodyFlags {
                updated: true,
                ..Default::default()
            },
        };
        body.recompute_derived();
        body
    }

    pub fn is_kinematic(&self) -> bool {
        self.props.is_kinematic()
    }

    /// Semi-implicit velocity update: `v += (F/m)*dt` with drag applied
    /// multiplicatively, then accumulators' contribution is folded into the
    /// cached accelerations for introspection.
    pub fn integrate_velocities(&mut self, dt: f32) {
        if self.is_kinematic() || self.flags.sleeping {
            return;
        }

        self.linear_acceleration = self.force_accum * self.props.inv_mass;
        self.angular_acceleration = self.inv_inertia_world * self.torque_accum;

        let linear_drag = (1.0 - self.props.linear_drag).clamp(0.0, 1.0).powf(dt);
        let angular_drag = (1.0 - self.props.angular_drag).clamp(0.0, 1.0).powf(dt);

        self.linear_velocity = self.linear_velocity * linear_drag + self.linear_acceleration * dt;
        self.angular_velocity =
            self.angular_velocity * angular_drag + self.angular_acceleration * dt;
    }

    /// Position/orientation update using the solved velocity. Renormalizes
    /// the quaternion every sub-step per the invariant in the data model.
    pub fn integrate_positions(&mut self, dt: f32) {
        if self.is_kinematic() || self.flags.sleeping {
            self.flags.integrated = false;
            return;
        }

        self.position += self.linear_velocity * dt;

        let w = self.angular_velocity;
        let spin = Quat::from_xyzw(w.x, w.y, w.z, 0.0) * self.orientation;
        let delta = Quat::from_xyzw(
            spin.x * 0.5 * dt,
            spin.y * 0.5 * dt,
            spin.z * 0.5 * dt,
            spin.w * 0.5 * dt,
        );
        let updated = Quat::from_xyzw(
            self.orientation.x + delta.x,
            self.orientation.y + delta.y,
            self.orientation.z + delta.z,
            self.orientation.w + delta.w,
        );
        self.orientation = if updated.length_squared() > 1e-12 {
            updated.normalize()
        } else {
            self.orientation
        };

        self.flags.integrated = true;
    }

    /// Refresh `world_transform` and `inv_inertia_world` from the current
    /// pose. Must run after every position integration.
    pub fn recompute_derived(&mut self) {
        self.world_transform =
            Mat4::from_rotation_translation(self.orientation, self.position);
        let r = Mat3::from_quat(self.orientation);
        self.inv_inertia_world = r * self.props.inv_local_inertia * r.transpose();
        self.flags.updated = true;
    }

    /// Validates the invariants that must hold after integration; a
    /// violation is fatal and poisons the owning world.
    pub fn check_invariants(&self) -> Result<()> {
        if !self.orientation.is_finite() || (self.orientation.length_squared() - 1.0).abs() > 1e-3
        {
            return Err(PhysicsError::InvariantViolation(
                "orientation could not be renormalized".into(),
            ));
        }
        if !self.inv_inertia_world.is_finite() {
            return Err(PhysicsError::InvariantViolation(
                "inv_inertia_world became non-finite".into(),
            ));
        }
        Ok(())
    }

    /// Low-pass filtered `|v|^2 + |w|^2`, used by the sleep heuristic. Body
    /// sleeps once `motion` has stayed below threshold for
    /// `cfg.sleep_time_threshold` seconds.
    pub fn update_motion_and_sleep(&mut self, dt: f32, cfg: &WorldConfig) {
        if self.is_kinematic() {
            return;
        }
        if self.flags.sleeping {
            self.linear_velocity = Vec3::ZERO;
            self.angular_velocity = Vec3::ZERO;
            return;
        }

        let instant = self.linear_velocity.length_squared() + self.angular_velocity.length_squared();
        self.motion = cfg.sleep_motion_bias * self.motion + (1.0 - cfg.sleep_motion_bias) * instant;

        let threshold = self
            .props
            .sleep_motion_threshold
            .unwrap_or(cfg.sleep_motion_threshold);

        if self.motion < threshold {
            self.sleep_timer += dt;
            if self.sleep_timer >= cfg.sleep_time_threshold {
                self.flags.sleeping = true;
                self.linear_velocity = Vec3::ZERO;
                self.angular_velocity = Vec3::ZERO;
            }
        } else {
            self.sleep_timer = 0.0;
        }
    }

    /// Wakes the body: clears the sleep flag and resets the dwell timer. Any
    /// non-trivial impulse, external force/torque write, or contact with a
    /// non-sleeping body should call this (directly, or transitively via
    /// [`crate::dynamics::sleep::propagate_wake`]).
    pub fn wake(&mut self) {
        self.flags.sleeping = false;
        self.sleep_timer = 0.0;
        self.motion = f32::MAX;
    }

    pub fn apply_impulse_at_point(&mut self, impulse: Vec3, point: Vec3) {
        if self.is_kinematic() {
            return;
        }
        self.linear_velocity += impulse * self.props.inv_mass;
        let r = point - self.position;
        self.angular_velocity += self.inv_inertia_world * r.cross(impulse);
        if impulse.length_squared() > 1e-10 {
            self.wake();
        }
    }

    pub fn clear_accumulators(&mut self) {
        self.force_accum = Vec3::ZERO;
        self.torque_accum = Vec3::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_body() -> RigidBody {
        let props = BodyProperties::dynamic(1.0, Mat3::IDENTITY).unwrap();
        RigidBody::new(props, Vec3::new(0.0, 10.0, 0.0), Quat::IDENTITY)
    }

    #[test]
    fn free_fall_matches_kinematics() {
        let mut body = free_body();
        body.force_accum = Vec3::new(0.0, -9.8, 0.0);
        let dt = 1.0 / 60.0;
        for _ in 0..60 {
            body.integrate_velocities(dt);
            body.integrate_positions(dt);
            body.recompute_derived();
            body.force_accum = Vec3::new(0.0, -9.8, 0.0);
        }
        assert!((body.position.y - 5.1).abs() < 0.05);
        assert!((body.linear_velocity.y + 9.8).abs() < 0.05);
    }

    #[test]
    fn orientation_stays_unit_norm_under_spin() {
        let mut body = free_body();
        body.angular_velocity = Vec3::new(1.0, 2.0, -0.5);
        for _ in 0..300 {
            body.integrate_positions(1.0 / 60.0);
        }
        assert!((body.orientation.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn sleeping_body_has_zero_velocity() {
        let mut body = free_body();
        body.linear_velocity = Vec3::new(0.0001, 0.0, 0.0);
        body.flags.sleeping = true;
        let cfg = WorldConfig::default();
        body.update_motion_and_sleep(1.0 / 60.0, &cfg);
        assert_eq!(body.linear_velocity, Vec3::ZERO);
        assert_eq!(body.angular_velocity, Vec3::ZERO);
    }

    #[test]
    fn kinematic_body_never_integrates() {
        let props = BodyProperties::kinematic();
        let mut body = RigidBody::new(props, Vec3::ZERO, Quat::IDENTITY);
        body.linear_velocity = Vec3::new(1.0, 0.0, 0.0);
        body.integrate_velocities(1.0 / 60.0);
        body.integrate_positions(1.0 / 60.0);
        assert_eq!(body.position, Vec3::ZERO);
    }
}
