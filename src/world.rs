//! `World`: the owning root of the physics core's arenas and the
//! per-tick simulation pipeline.

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};
use slotmap::{SecondaryMap, SlotMap};
use tracing::{debug, instrument, trace};

use crate::broadphase::Broadphase;
use crate::collider::Collider;
use crate::config::WorldConfig;
use crate::contact::Manifold;
use crate::dynamics::constraint::{Constraint, ConstraintBounds, FrictionContactConstraint, NormalContactConstraint};
use crate::dynamics::forces::Force;
use crate::dynamics::rigid_body::{BodyProperties, RigidBody};
use crate::dynamics::solver::{pgs_solve, ConstraintInput};
use crate::dynamics::sleep::propagate_wake;
use crate::dynamics::ForceManager;
use crate::error::{PhysicsError, Result};
use crate::handles::{BodyHandle, ColliderHandle, ConstraintHandle, ForceHandle};
use crate::math::Aabb;
use crate::narrowphase::{convex_convex, ray_cast_convex, NarrowphaseResult};

/// The result of [`World::ray_cast`]: the first body hit, in world space.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub body: BodyHandle,
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

/// The root simulation object: owns every arena-addressed value and runs
/// the fixed-step pipeline described in the module-level docs of
/// [`crate`].
pub struct World {
    config: WorldConfig,

    bodies: SlotMap<BodyHandle, RigidBody>,
    colliders: SlotMap<ColliderHandle, Collider>,
    constraints: SlotMap<ConstraintHandle, Box<dyn Constraint>>,
    forces: ForceManager,

    collider_owner: SecondaryMap<ColliderHandle, BodyHandle>,
    body_colliders: SecondaryMap<BodyHandle, Vec<ColliderHandle>>,

    manifolds: HashMap<(ColliderHandle, ColliderHandle), Manifold>,
    broadphase: Broadphase,

    accumulator: f32,
    poisoned: bool,
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        Self {
            config,
            bodies: SlotMap::with_key(),
            colliders: SlotMap::with_key(),
            constraints: SlotMap::with_key(),
            forces: ForceManager::new(),
            collider_owner: SecondaryMap::new(),
            body_colliders: SecondaryMap::new(),
            manifolds: HashMap::new(),
            broadphase: Broadphase::new(),
            accumulator: 0.0,
            poisoned: false,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    pub fn collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.colliders.get(handle)
    }

    pub fn add_body(&mut self, props: BodyProperties, position: Vec3, orientation: Quat) -> Result<BodyHandle> {
        if !position.is_finite() {
            return Err(PhysicsError::InvalidArgument(format!(
                "body position must be finite, got {position}"
            )));
        }
        if !orientation.is_finite() || orientation.length_squared() < 1e-12 {
            return Err(PhysicsError::InvalidArgument(
                "body orientation must be a finite, non-degenerate quaternion".into(),
            ));
        }
        let body = RigidBody::new(props, position, orientation);
        let handle = self.bodies.insert(body);
        self.body_colliders.insert(handle, Vec::new());
        Ok(handle)
    }

    pub fn remove_body(&mut self, handle: BodyHandle) {
        if self.bodies.remove(handle).is_none() {
            return;
        }
        if let Some(owned) = self.body_colliders.remove(handle) {
            for collider in owned {
                self.colliders.remove(collider);
                self.collider_owner.remove(collider);
                self.drop_manifolds_for(collider);
            }
        }
        self.forces.retain_bodies(&self.bodies);
    }

    pub fn attach_collider(&mut self, body: BodyHandle, collider: Collider) -> Result<ColliderHandle> {
        if !self.bodies.contains_key(body) {
            return Err(PhysicsError::UnknownHandle);
        }
        let handle = self.colliders.insert(collider);
        self.collider_owner.insert(handle, body);
        self.body_colliders
            .entry(body)
            .expect("body just validated above")
            .or_default()
            .push(handle);
        Ok(handle)
    }

    pub fn detach_collider(&mut self, handle: ColliderHandle) {
        let Some(owner) = self.collider_owner.remove(handle) else {
            return;
        };
        if let Some(list) = self.body_colliders.get_mut(owner) {
            list.retain(|&c| c != handle);
        }
        self.colliders.remove(handle);
        self.drop_manifolds_for(handle);
    }

    fn drop_manifolds_for(&mut self, collider: ColliderHandle) {
        self.manifolds.retain(|&(a, b), _| a != collider && b != collider);
    }

    pub fn add_force_binding(&mut self, body: BodyHandle, force: Box<dyn Force>) -> ForceHandle {
        self.forces.bind(body, force)
    }

    pub fn remove_force_binding(&mut self, handle: ForceHandle) -> bool {
        self.forces.unbind(handle)
    }

    pub fn add_constraint(&mut self, constraint: Box<dyn Constraint>) -> ConstraintHandle {
        self.constraints.insert(constraint)
    }

    pub fn remove_constraint(&mut self, handle: ConstraintHandle) -> bool {
        self.constraints.remove(handle).is_some()
    }

    pub fn manifolds(&self) -> impl Iterator<Item = &Manifold> {
        self.manifolds.values()
    }

    /// Advances the simulation by `dt` seconds, sub-stepping internally at
    /// `config.fixed_dt` up to `config.max_substeps` times per call. Excess
    /// wall-time beyond the substep budget is dropped rather than run in
    /// one oversized step, trading a little accuracy for bounded worst-case
    /// cost (mirrors the teacher's accumulator/`fixed_step` split).
    #[instrument(skip(self), fields(dt))]
    pub fn step(&mut self, dt: f32) -> Result<()> {
        if self.poisoned {
            return Err(PhysicsError::Poisoned);
        }
        if !(dt >= 0.0) || !dt.is_finite() {
            return Err(PhysicsError::InvalidArgument(format!(
                "dt must be finite and non-negative, got {dt}"
            )));
        }

        self.accumulator += dt;
        let fixed_dt = self.config.fixed_dt;
        let mut substeps = 0;

        while self.accumulator >= fixed_dt && substeps < self.config.max_substeps {
            self.fixed_step(fixed_dt)?;
            self.accumulator -= fixed_dt;
            substeps += 1;
        }
        if substeps == self.config.max_substeps {
            self.accumulator = 0.0;
        }

        Ok(())
    }

    fn fixed_step(&mut self, dt: f32) -> Result<()> {
        self.apply_forces();
        self.integrate_velocities(dt);
        self.update_broadphase_and_manifolds();
        self.solve_constraints(dt);
        self.integrate_positions(dt)?;
        self.update_sleep(dt);
        self.clear_accumulators();
        Ok(())
    }

    fn apply_forces(&mut self) {
        let gravity = self.config.gravity;
        for body in self.bodies.values_mut() {
            if body.flags.sleeping || body.is_kinematic() {
                continue;
            }
            body.force_accum += gravity / body.props.inv_mass;
        }
        self.forces.apply_all(&mut self.bodies);
    }

    fn integrate_velocities(&mut self, dt: f32) {
        for body in self.bodies.values_mut() {
            body.integrate_velocities(dt);
        }
    }

    fn update_broadphase_and_manifolds(&mut self) {
        let transforms: HashMap<ColliderHandle, Mat4> = self
            .colliders
            .iter()
            .map(|(h, c)| (h, c.world_transform()))
            .collect();
        let cfg = self.config.clone();
        self.manifolds.retain(|&(a, b), manifold| {
            match (transforms.get(&a), transforms.get(&b)) {
                (Some(&xa), Some(&xb)) => {
                    manifold.refresh(xa, xb, &cfg);
                    true
                }
                _ => false,
            }
        });

        let owner = &self.collider_owner;
        let bodies = &self.bodies;
        let is_static = |h: ColliderHandle| {
            owner
                .get(h)
                .and_then(|&b| bodies.get(b))
                .map(|b| b.is_kinematic())
                .unwrap_or(true)
        };

        let pairs = self.broadphase.find_pairs(&self.colliders, is_static);
        trace!(pair_count = pairs.len(), "broadphase produced candidate pairs");

        let mut active = std::collections::HashSet::with_capacity(pairs.len());
        for pair in pairs {
            active.insert(pair);
            self.process_pair(pair.0, pair.1);
        }
        self.manifolds.retain(|key, m| active.contains(key) || !m.is_empty());

        // Kinematic bodies never sleep (see `update_motion_and_sleep`), so an
        // edge to one would make every island touching static ground always
        // "awake" and nothing could ever stay asleep. Only dynamic-dynamic
        // contacts propagate wakefulness; a static body is an island
        // boundary, not a member.
        let wake_edges: Vec<(BodyHandle, BodyHandle)> = self
            .manifolds
            .iter()
            .filter(|(_, m)| !m.is_empty())
            .filter_map(|((a, b), _)| {
                let body_a = *self.collider_owner.get(*a)?;
                let body_b = *self.collider_owner.get(*b)?;
                let rb_a = self.bodies.get(body_a)?;
                let rb_b = self.bodies.get(body_b)?;
                if rb_a.is_kinematic() || rb_b.is_kinematic() {
                    return None;
                }
                Some((body_a, body_b))
            })
            .collect();
        propagate_wake(&mut self.bodies, &wake_edges);
    }

    fn process_pair(&mut self, ca: ColliderHandle, cb: ColliderHandle) {
        let contacts = match (self.colliders.get(ca), self.colliders.get(cb)) {
            (Some(collider_a), Some(collider_b)) => {
                collect_contacts(collider_a, collider_b, &self.config)
            }
            _ => return,
        };
        if contacts.is_empty() {
            return;
        }

        let xf_a = self.colliders[ca].world_transform();
        let xf_b = self.colliders[cb].world_transform();
        let inv_a = xf_a.inverse();
        let inv_b = xf_b.inverse();

        let manifold = self
            .manifolds
            .entry((ca, cb))
            .or_insert_with(|| Manifold::new(ca, cb));

        for (world_a, world_b, normal, penetration) in contacts {
            let local_a = inv_a.transform_point3(world_a);
            let local_b = inv_b.transform_point3(world_b);
            manifold.insert(local_a, local_b, world_a, world_b, normal, penetration, &self.config);
        }
    }

    fn solve_constraints(&mut self, dt: f32) {
        enum Writeback {
            Normal { pair: (ColliderHandle, ColliderHandle), idx: usize },
            TangentA { pair: (ColliderHandle, ColliderHandle), idx: usize },
            TangentB { pair: (ColliderHandle, ColliderHandle), idx: usize },
        }

        let mut owned: Vec<Box<dyn Constraint>> = Vec::new();
        let mut coupled: Vec<Option<usize>> = Vec::new();
        let mut writeback: Vec<Writeback> = Vec::new();

        for (&pair, manifold) in self.manifolds.iter() {
            if manifold.is_empty() {
                continue;
            }
            let sensor = self.colliders.get(pair.0).map(|c| c.is_sensor).unwrap_or(true)
                || self.colliders.get(pair.1).map(|c| c.is_sensor).unwrap_or(true);
            if sensor {
                continue;
            }
            let (Some(&body_a), Some(&body_b)) = (
                self.collider_owner.get(pair.0),
                self.collider_owner.get(pair.1),
            ) else {
                continue;
            };
            let (Some(rb_a), Some(rb_b)) = (self.bodies.get(body_a), self.bodies.get(body_b)) else {
                continue;
            };
            if rb_a.is_kinematic() && rb_b.is_kinematic() {
                continue;
            }
            if rb_a.flags.sleeping && rb_b.flags.sleeping {
                continue;
            }

            let friction = (rb_a.props.friction_coefficient * rb_b.props.friction_coefficient).sqrt();
            let restitution = rb_a.props.restitution.max(rb_b.props.restitution);

            for (idx, contact) in manifold.contacts.iter().enumerate() {
                let (t1, t2) = tangent_basis(contact.normal);

                owned.push(Box::new(NormalContactConstraint {
                    body_a,
                    body_b,
                    point_a: contact.world_position[0],
                    point_b: contact.world_position[1],
                    normal: contact.normal,
                    penetration: contact.penetration,
                    restitution,
                    warm_start: contact.normal_impulse,
                    baumgarte: self.config.baumgarte,
                    restitution_slop: self.config.restitution_slop,
                    penetration_slop: self.config.penetration_slop,
                }));
                let normal_index = owned.len() - 1;
                coupled.push(None);
                writeback.push(Writeback::Normal { pair, idx });

                owned.push(Box::new(FrictionContactConstraint {
                    body_a,
                    body_b,
                    point_a: contact.world_position[0],
                    point_b: contact.world_position[1],
                    tangent: t1,
                    friction_coefficient: friction,
                    warm_start: contact.tangent_impulse[0],
                }));
                coupled.push(Some(normal_index));
                writeback.push(Writeback::TangentA { pair, idx });

                owned.push(Box::new(FrictionContactConstraint {
                    body_a,
                    body_b,
                    point_a: contact.world_position[0],
                    point_b: contact.world_position[1],
                    tangent: t2,
                    friction_coefficient: friction,
                    warm_start: contact.tangent_impulse[1],
                }));
                coupled.push(Some(normal_index));
                writeback.push(Writeback::TangentB { pair, idx });
            }
        }

        let contact_constraint_count = owned.len();

        let mut inputs: Vec<ConstraintInput> = Vec::with_capacity(owned.len() + self.constraints.len());
        for (i, c) in owned.iter_mut().enumerate() {
            inputs.push(ConstraintInput {
                constraint: c,
                coupled_normal: coupled[i],
            });
        }
        for c in self.constraints.values_mut() {
            inputs.push(ConstraintInput {
                constraint: c,
                coupled_normal: None,
            });
        }

        if inputs.is_empty() {
            return;
        }

        debug!(
            contact_constraints = contact_constraint_count,
            user_constraints = inputs.len() - contact_constraint_count,
            "assembled constraint graph"
        );

        let lambdas = pgs_solve(&mut self.bodies, &mut inputs, dt, self.config.max_solver_iterations);
        drop(inputs);
        drop(owned);

        for (i, target) in writeback.into_iter().enumerate() {
            let lambda = lambdas[i];
            match target {
                Writeback::Normal { pair, idx } => {
                    if let Some(m) = self.manifolds.get_mut(&pair) {
                        if let Some(c) = m.contacts.get_mut(idx) {
                            c.normal_impulse = lambda;
                        }
                    }
                }
                Writeback::TangentA { pair, idx } => {
                    if let Some(m) = self.manifolds.get_mut(&pair) {
                        if let Some(c) = m.contacts.get_mut(idx) {
                            c.tangent_impulse[0] = lambda;
                        }
                    }
                }
                Writeback::TangentB { pair, idx } => {
                    if let Some(m) = self.manifolds.get_mut(&pair) {
                        if let Some(c) = m.contacts.get_mut(idx) {
                            c.tangent_impulse[1] = lambda;
                        }
                    }
                }
            }
        }
    }

    fn integrate_positions(&mut self, dt: f32) -> Result<()> {
        for body in self.bodies.values_mut() {
            body.integrate_positions(dt);
            body.recompute_derived();
            if let Err(err) = body.check_invariants() {
                self.poisoned = true;
                return Err(err);
            }
        }
        for (&collider_handle, &body_handle) in self.collider_owner.iter() {
            if let (Some(collider), Some(body)) =
                (self.colliders.get_mut(collider_handle), self.bodies.get(body_handle))
            {
                if body.flags.integrated || body.flags.updated {
                    collider.set_world_transform(body.world_transform);
                }
            }
        }
        Ok(())
    }

    fn update_sleep(&mut self, dt: f32) {
        let cfg = &self.config;
        for body in self.bodies.values_mut() {
            body.update_motion_and_sleep(dt, cfg);
        }
    }

    fn clear_accumulators(&mut self) {
        for body in self.bodies.values_mut() {
            body.clear_accumulators();
        }
        for collider in self.colliders.values_mut() {
            collider.reset_updated_state();
        }
    }

    /// Casts a ray against every collider whose owning body passes
    /// `filter`, returning the closest hit.
    pub fn ray_cast(&self, origin: Vec3, dir: Vec3, filter: impl Fn(BodyHandle) -> bool) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;

        for (collider_handle, collider) in self.colliders.iter() {
            let Some(&body_handle) = self.collider_owner.get(collider_handle) else {
                continue;
            };
            if !filter(body_handle) {
                continue;
            }
            if !collider.aabb().ray_intersect(origin, dir, self.config.gjk_epsilon) {
                continue;
            }

            let mut local_best: Option<(f32, Vec3, Vec3)> = None;
            collider.process_intersecting_parts(origin, dir, self.config.gjk_epsilon, &mut |shape, xf| {
                if let Some(hit) = ray_cast_convex(
                    shape,
                    xf,
                    origin,
                    dir,
                    self.config.gjk_epsilon,
                    self.config.gjk_max_iterations,
                ) {
                    if local_best.map(|(t, _, _)| hit.t < t).unwrap_or(true) {
                        local_best = Some((hit.t, hit.point, hit.normal));
                    }
                }
            });

            if let Some((t, point, normal)) = local_best {
                if best.map(|b| t < b.distance).unwrap_or(true) {
                    best = Some(RayHit {
                        body: body_handle,
                        point,
                        normal,
                        distance: t,
                    });
                }
            }
        }

        best
    }

    /// Returns every body with at least one collider whose AABB overlaps
    /// `aabb` and whose handle passes `filter`.
    pub fn query_aabb(&self, aabb: Aabb, filter: impl Fn(BodyHandle) -> bool) -> Vec<BodyHandle> {
        let mut hits = Vec::new();
        for (collider_handle, collider) in self.colliders.iter() {
            if !collider.aabb().overlaps(&aabb, 0.0) {
                continue;
            }
            let Some(&body_handle) = self.collider_owner.get(collider_handle) else {
                continue;
            };
            if filter(body_handle) && !hits.contains(&body_handle) {
                hits.push(body_handle);
            }
        }
        hits
    }
}

fn collect_contacts(collider_a: &Collider, collider_b: &Collider, cfg: &WorldConfig) -> Vec<(Vec3, Vec3, Vec3, f32)> {
    let mut out = Vec::new();
    let aabb_b = collider_b.aabb();

    collider_a.process_overlapping_parts(aabb_b, cfg.contact_precision, &mut |shape_a, xf_a: Mat4| {
        let query_aabb = shape_a.local_aabb().transform(xf_a);
        collider_b.process_overlapping_parts(query_aabb, cfg.contact_precision, &mut |shape_b, xf_b: Mat4| {
            if let NarrowphaseResult::Overlapping(epa) = convex_convex(shape_a, xf_a, shape_b, xf_b, cfg) {
                out.push((epa.point_on_a, epa.point_on_b, epa.normal, epa.penetration));
            }
        });
    });

    out
}

/// Builds an orthonormal tangent basis perpendicular to `normal`, used for
/// the two friction constraints at a contact point.
fn tangent_basis(normal: Vec3) -> (Vec3, Vec3) {
    let reference = if normal.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
    let t1 = reference.cross(normal).normalize_or_zero();
    let t2 = normal.cross(t1);
    (t1, t2)
}
