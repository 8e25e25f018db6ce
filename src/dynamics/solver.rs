//! Projected Gauss-Seidel solver over the assembled constraint graph.

use glam::Vec3;
use slotmap::SlotMap;
use tracing::trace;

use crate::handles::BodyHandle;

use super::constraint::{Constraint, ConstraintBounds};
use super::rigid_body::RigidBody;

/// One constraint queued for a solve, plus (for friction rows) the index
/// within the same `inputs` slice of the normal-impulse source its bounds
/// are coupled to. Borrows rather than owns its constraint so the caller
/// can assemble a mix of freshly built contact constraints and constraints
/// living in a long-lived arena (e.g. `World`'s `ConstraintHandle` slotmap)
/// without moving either.
pub struct ConstraintInput<'a> {
    pub constraint: &'a mut Box<dyn Constraint>,
    pub coupled_normal: Option<usize>,
}

struct Row {
    body_a: BodyHandle,
    body_b: BodyHandle,
    jacobian: [Vec3; 4],
    bias: f32,
    bounds: ConstraintBounds,
    lambda: f32,
    /// `1 / (J * M^-1 * J^T)`; zero for a degenerate or unresolved row,
    /// which the solver then skips entirely.
    inv_effective_mass: f32,
}

/// Assembles a Jacobian row per input, warm-starts from each constraint's
/// stored impulse, then runs up to `max_iterations` PGS sweeps mutating
/// body velocities in place. Returns the converged impulse for each input
/// (same order) so the caller can persist it for next frame's warm start.
pub fn pgs_solve(
    bodies: &mut SlotMap<BodyHandle, RigidBody>,
    inputs: &mut [ConstraintInput],
    dt: f32,
    max_iterations: u32,
) -> Vec<f32> {
    let mut rows = Vec::with_capacity(inputs.len());

    for input in inputs {
        let (body_a, body_b) = input.constraint.bodies();
        let row = match (bodies.get(body_a), bodies.get(body_b)) {
            (Some(a), Some(b)) => {
                let jacobian = input.constraint.jacobian(a, b);
                let bias = input.constraint.bias(a, b, dt);
                let warm = input.constraint.warm_start_impulse();
                let bounds = input.constraint.bounds(warm);
                let k = effective_mass_denominator(&jacobian, a, b);
                Row {
                    body_a,
                    body_b,
                    jacobian,
                    bias,
                    bounds,
                    lambda: warm,
                    inv_effective_mass: if k.abs() > 1e-9 { 1.0 / k } else { 0.0 },
                }
            }
            _ => Row {
                body_a,
                body_b,
                jacobian: [Vec3::ZERO; 4],
                bias: 0.0,
                bounds: ConstraintBounds::UNBOUNDED,
                lambda: 0.0,
                inv_effective_mass: 0.0,
            },
        };
        rows.push(row);
    }

    for row in &rows {
        if row.inv_effective_mass != 0.0 {
            apply_impulse(bodies, row, row.lambda);
        }
    }

    for _ in 0..max_iterations {
        for i in 0..rows.len() {
            if rows[i].inv_effective_mass == 0.0 {
                continue;
            }

            let jv = relative_jv(bodies, &rows[i]);
            let unclamped = rows[i].lambda + (-rows[i].bias - jv) * rows[i].inv_effective_mass;

            let bounds = match inputs[i].coupled_normal {
                Some(src) => inputs[i].constraint.bounds(rows[src].lambda),
                None => rows[i].bounds,
            };

            let new_lambda = bounds.clamp(unclamped);
            let delta_lambda = new_lambda - rows[i].lambda;
            rows[i].lambda = new_lambda;

            if delta_lambda != 0.0 {
                apply_impulse(bodies, &rows[i], delta_lambda);
            }
        }
    }

    trace!(
        constraints = rows.len(),
        iterations = max_iterations,
        "pgs solve converged"
    );

    for (input, row) in inputs.iter_mut().zip(&rows) {
        input.constraint.store_impulse(row.lambda);
    }

    rows.into_iter().map(|r| r.lambda).collect()
}

fn effective_mass_denominator(jacobian: &[Vec3; 4], body_a: &RigidBody, body_b: &RigidBody) -> f32 {
    let [lin_a, ang_a, lin_b, ang_b] = *jacobian;
    body_a.props.inv_mass * lin_a.length_squared()
        + ang_a.dot(body_a.inv_inertia_world * ang_a)
        + body_b.props.inv_mass * lin_b.length_squared()
        + ang_b.dot(body_b.inv_inertia_world * ang_b)
}

fn relative_jv(bodies: &SlotMap<BodyHandle, RigidBody>, row: &Row) -> f32 {
    let [lin_a, ang_a, lin_b, ang_b] = row.jacobian;
    let va = bodies
        .get(row.body_a)
        .map(|b| lin_a.dot(b.linear_velocity) + ang_a.dot(b.angular_velocity))
        .unwrap_or(0.0);
    let vb = bodies
        .get(row.body_b)
        .map(|b| lin_b.dot(b.linear_velocity) + ang_b.dot(b.angular_velocity))
        .unwrap_or(0.0);
    va + vb
}

fn apply_impulse(bodies: &mut SlotMap<BodyHandle, RigidBody>, row: &Row, delta_lambda: f32) {
    let [lin_a, ang_a, lin_b, ang_b] = row.jacobian;

    if row.body_a == row.body_b {
        if let Some(body) = bodies.get_mut(row.body_a) {
            body.linear_velocity += lin_a * delta_lambda * body.props.inv_mass;
            body.angular_velocity += body.inv_inertia_world * (ang_a * delta_lambda);
            body.linear_velocity += lin_b * delta_lambda * body.props.inv_mass;
            body.angular_velocity += body.inv_inertia_world * (ang_b * delta_lambda);
        }
        return;
    }

    if let Some([body_a, body_b]) = bodies.get_disjoint_mut([row.body_a, row.body_b]) {
        body_a.linear_velocity += lin_a * delta_lambda * body_a.props.inv_mass;
        body_a.angular_velocity += body_a.inv_inertia_world * (ang_a * delta_lambda);
        body_b.linear_velocity += lin_b * delta_lambda * body_b.props.inv_mass;
        body_b.angular_velocity += body_b.inv_inertia_world * (ang_b * delta_lambda);
    } else {
        if let Some(body_a) = bodies.get_mut(row.body_a) {
            body_a.linear_velocity += lin_a * delta_lambda * body_a.props.inv_mass;
            body_a.angular_velocity += body_a.inv_inertia_world * (ang_a * delta_lambda);
        }
        if let Some(body_b) = bodies.get_mut(row.body_b) {
            body_b.linear_velocity += lin_b * delta_lambda * body_b.props.inv_mass;
            body_b.angular_velocity += body_b.inv_inertia_world * (ang_b * delta_lambda);
        }
    }
}
