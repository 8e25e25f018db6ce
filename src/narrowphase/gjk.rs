//! GJK: iterative closest-point / overlap test over the Minkowski CSO.

use glam::Vec3;

/// A support point carried through the simplex: the CSO point plus the
/// witnesses on each original shape that produced it, so EPA and manifold
/// generation can recover a contact point by interpolating witnesses instead
/// of re-deriving it from the CSO alone.
#[derive(Debug, Clone, Copy)]
pub struct SupportPoint {
    pub cso: Vec3,
    pub on_a: Vec3,
    pub on_b: Vec3,
}

/// Up to four support points spanning a vertex/edge/triangle/tetrahedron in
/// the CSO.
#[derive(Debug, Clone)]
pub struct Simplex {
    pub points: Vec<SupportPoint>,
}

impl Simplex {
    fn new() -> Self {
        Self {
            points: Vec::with_capacity(4),
        }
    }
}

/// Outcome of a GJK run.
pub enum GjkResult {
    /// The origin is inside the CSO: shapes overlap. Carries a tetrahedron
    /// (or smaller, if it terminated early) for EPA to expand from.
    Intersecting(Simplex),
    /// Shapes are disjoint. `closest_cso` is the point of the CSO nearest
    /// the origin, i.e. the separating vector.
    Separated { closest_cso: Vec3 },
}

/// Signature every narrowphase support query implements: given a world-space
/// direction, return the CSO support point and its witnesses on A and B.
pub type SupportFn<'a> = dyn FnMut(Vec3) -> SupportPoint + 'a;

pub fn gjk(support: &mut SupportFn, eps: f32, max_iterations: u32) -> GjkResult {
    let mut direction = Vec3::X;
    let mut simplex = Simplex::new();

    let first = support(direction);
    simplex.points.push(first);
    direction = -first.cso;

    if direction.length_squared() < eps * eps {
        return GjkResult::Intersecting(simplex);
    }

    let second = support(direction);
    if second.cso.dot(direction) < 0.0 {
        return GjkResult::Separated {
            closest_cso: closest_point_on_simplex(&simplex),
        };
    }
    simplex.points.push(second);

    direction = triple_cross(second.cso - first.cso, -first.cso, second.cso - first.cso);
    if direction.length_squared() < eps * eps {
        direction = (second.cso - first.cso).any_orthonormal_vector();
    }

    for _ in 0..max_iterations {
        let new_point = support(direction);
        if new_point.cso.dot(direction) < eps {
            return GjkResult::Separated {
                closest_cso: closest_point_on_simplex(&simplex),
            };
        }
        simplex.points.push(new_point);

        if do_simplex(&mut simplex, &mut direction) {
            return GjkResult::Intersecting(simplex);
        }

        if direction.length_squared() < eps * eps {
            // Degenerate simplex collapsed onto the origin.
            return GjkResult::Intersecting(simplex);
        }
    }

    GjkResult::Separated {
        closest_cso: closest_point_on_simplex(&simplex),
    }
}

fn triple_cross(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    a.cross(b).cross(c)
}

/// Project the origin onto whatever feature (vertex/edge/triangle) of the
/// simplex is closest, for reporting a separation distance when GJK
/// terminates without overlap.
fn closest_point_on_simplex(simplex: &Simplex) -> Vec3 {
    match simplex.points.len() {
        1 => simplex.points[0].cso,
        2 => {
            let a = simplex.points[1].cso;
            let b = simplex.points[0].cso;
            let ab = b - a;
            let t = (-a).dot(ab) / ab.length_squared().max(1e-12);
            a + ab * t.clamp(0.0, 1.0)
        }
        _ => {
            // Triangle or tetrahedron: fall back to the nearest vertex. Good
            // enough for a termination distance estimate; EPA takes over for
            // the true penetration once GJK reports overlap.
            simplex
                .points
                .iter()
                .map(|p| p.cso)
                .min_by(|a, b| {
                    a.length_squared()
                        .partial_cmp(&b.length_squared())
                        .unwrap()
                })
                .unwrap()
        }
    }
}

fn do_simplex(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    match simplex.points.len() {
        2 => do_simplex_line(simplex, direction),
        3 => do_simplex_triangle(simplex, direction),
        4 => do_simplex_tetrahedron(simplex, direction),
        _ => false,
    }
}

fn do_simplex_line(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let a = simplex.points[1];
    let b = simplex.points[0];
    let ab = b.cso - a.cso;
    let ao = -a.cso;

    if ab.dot(ao) > 0.0 {
        *direction = triple_cross(ab, ao, ab);
    } else {
        simplex.points = vec![a];
        *direction = ao;
    }
    false
}

fn do_simplex_triangle(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let a = simplex.points[2];
    let b = simplex.points[1];
    let c = simplex.points[0];
    let ab = b.cso - a.cso;
    let ac = c.cso - a.cso;
    let ao = -a.cso;
    let abc = ab.cross(ac);

    if abc.cross(ac).dot(ao) > 0.0 {
        if ac.dot(ao) > 0.0 {
            simplex.points = vec![c, a];
            *direction = triple_cross(ac, ao, ac);
        } else {
            simplex.points = vec![b, a];
            return do_simplex_line(simplex, direction);
        }
    } else if ab.cross(abc).dot(ao) > 0.0 {
        simplex.points = vec![b, a];
        return do_simplex_line(simplex, direction);
    } else if abc.dot(ao) > 0.0 {
        *direction = abc;
    } else {
        simplex.points = vec![b, c, a];
        *direction = -abc;
    }
    false
}

fn do_simplex_tetrahedron(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let a = simplex.points[3];
    let b = simplex.points[2];
    let c = simplex.points[1];
    let d = simplex.points[0];
    let ab = b.cso - a.cso;
    let ac = c.cso - a.cso;
    let ad = d.cso - a.cso;
    let ao = -a.cso;

    let abc = ab.cross(ac);
    let acd = ac.cross(ad);
    let adb = ad.cross(ab);

    if abc.dot(ao) > 0.0 {
        simplex.points = vec![c, b, a];
        *direction = abc;
        return do_simplex_triangle(simplex, direction);
    }
    if acd.dot(ao) > 0.0 {
        simplex.points = vec![d, c, a];
        *direction = acd;
        return do_simplex_triangle(simplex, direction);
    }
    if adb.dot(ao) > 0.0 {
        simplex.points = vec![b, d, a];
        *direction = adb;
        return do_simplex_triangle(simplex, direction);
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collider::ConvexShape;
    use crate::narrowphase::support_world;
    use glam::Mat4;

    fn cso_support(
        shape_a: &ConvexShape,
        xf_a: Mat4,
        shape_b: &ConvexShape,
        xf_b: Mat4,
        dir: Vec3,
    ) -> SupportPoint {
        let on_a = support_world(shape_a, xf_a, dir);
        let on_b = support_world(shape_b, xf_b, -dir);
        SupportPoint {
            cso: on_a - on_b,
            on_a,
            on_b,
        }
    }

    #[test]
    fn overlapping_spheres_report_intersecting() {
        let a = ConvexShape::Sphere { radius: 1.0 };
        let b = ConvexShape::Sphere { radius: 1.0 };
        let xf_a = Mat4::IDENTITY;
        let xf_b = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));

        let mut support = |d: Vec3| cso_support(&a, xf_a, &b, xf_b, d);
        matches!(gjk(&mut support, 1e-6, 64), GjkResult::Intersecting(_));
    }

    #[test]
    fn disjoint_boxes_report_separated_distance() {
        let a = ConvexShape::BoundingBox {
            half_extents: Vec3::splat(1.0),
        };
        let b = ConvexShape::BoundingBox {
            half_extents: Vec3::splat(1.0),
        };
        let xf_a = Mat4::IDENTITY;
        let xf_b = Mat4::from_translation(Vec3::new(4.0, 0.0, 0.0));

        let mut support = |d: Vec3| cso_support(&a, xf_a, &b, xf_b, d);
        match gjk(&mut support, 1e-6, 64) {
            GjkResult::Separated { closest_cso } => {
                assert!((closest_cso.length() - 2.0).abs() < 0.05);
            }
            GjkResult::Intersecting(_) => panic!("expected separated boxes"),
        }
    }
}
