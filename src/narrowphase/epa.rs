//! EPA: expand the GJK termination polytope to recover penetration depth,
//! normal, and a witness contact point on each shape.

use glam::Vec3;

use super::gjk::{Simplex, SupportFn, SupportPoint};

#[derive(Debug, Clone, Copy)]
pub struct EpaResult {
    pub normal: Vec3,
    pub penetration: f32,
    pub point_on_a: Vec3,
    pub point_on_b: Vec3,
}

/// Expand `simplex` (a GJK tetrahedron known to contain the origin) until the
/// closest face's support point stops improving by more than
/// `min_face_delta`, or `max_iterations` is reached.
pub fn epa(
    simplex: &Simplex,
    support: &mut SupportFn,
    min_face_delta: f32,
    max_iterations: u32,
) -> Option<EpaResult> {
    let mut polytope: Vec<SupportPoint> = simplex.points.clone();
    if polytope.len() < 4 {
        return None;
    }

    let mut faces: Vec<[usize; 3]> = vec![[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]];

    for _ in 0..max_iterations {
        let (face_idx, normal, dist) = match closest_face(&polytope, &faces) {
            Some(f) => f,
            None => return None,
        };

        let new_point = support(normal);
        let new_dist = new_point.cso.dot(normal);

        if new_dist - dist < min_face_delta {
            let face = faces[face_idx];
            let a = polytope[face[0]];
            let b = polytope[face[1]];
            let c = polytope[face[2]];
            let (u, v, w) = barycentric_of_closest_point(a.cso, b.cso, c.cso);

            let point_on_a = a.on_a * u + b.on_a * v + c.on_a * w;
            let point_on_b = a.on_b * u + b.on_b * v + c.on_b * w;

            return Some(EpaResult {
                normal,
                penetration: dist,
                point_on_a,
                point_on_b,
            });
        }

        let new_idx = polytope.len();
        polytope.push(new_point);

        let mut edges: Vec<[usize; 2]> = Vec::new();
        let mut i = 0;
        while i < faces.len() {
            let face = faces[i];
            let a = polytope[face[0]].cso;
            let b = polytope[face[1]].cso;
            let c = polytope[face[2]].cso;
            let n = (b - a).cross(c - a);
            let len = n.length();
            if len < 1e-10 {
                faces.swap_remove(i);
                continue;
            }
            let n = n / len;

            if n.dot(new_point.cso - a) > 0.0 {
                add_edge(&mut edges, face[0], face[1]);
                add_edge(&mut edges, face[1], face[2]);
                add_edge(&mut edges, face[2], face[0]);
                faces.swap_remove(i);
            } else {
                i += 1;
            }
        }

        for edge in &edges {
            faces.push([edge[0], edge[1], new_idx]);
        }

        if faces.is_empty() {
            return None;
        }
    }

    None
}

fn closest_face(polytope: &[SupportPoint], faces: &[[usize; 3]]) -> Option<(usize, Vec3, f32)> {
    let mut min_dist = f32::MAX;
    let mut min_face = 0;
    let mut min_normal = Vec3::ZERO;

    for (i, face) in faces.iter().enumerate() {
        let a = polytope[face[0]].cso;
        let b = polytope[face[1]].cso;
        let c = polytope[face[2]].cso;
        let n = (b - a).cross(c - a);
        let len = n.length();
        if len < 1e-10 {
            continue;
        }
        let n = n / len;
        let dist = n.dot(a);
        let (n, dist) = if dist < 0.0 { (-n, -dist) } else { (n, dist) };

        if dist < min_dist {
            min_dist = dist;
            min_face = i;
            min_normal = n;
        }
    }

    if min_normal == Vec3::ZERO {
        None
    } else {
        Some((min_face, min_normal, min_dist))
    }
}

/// Remove a shared edge if its reverse already exists, else add it. This is
/// the horizon-stitching step: every edge left unpaired after deleting all
/// faces visible from the new point borders the silhouette.
fn add_edge(edges: &mut Vec<[usize; 2]>, a: usize, b: usize) {
    if let Some(pos) = edges.iter().position(|e| e[0] == b && e[1] == a) {
        edges.swap_remove(pos);
    } else {
        edges.push([a, b]);
    }
}

/// Barycentric coordinates (u, v, w) of the point on triangle (a, b, c)
/// closest to the origin. Ericson's "Real-Time Collision Detection" method.
fn barycentric_of_closest_point(a: Vec3, b: Vec3, c: Vec3) -> (f32, f32, f32) {
    let ab = b - a;
    let ac = c - a;
    let ao = -a;

    let d1 = ab.dot(ao);
    let d2 = ac.dot(ao);
    if d1 <= 0.0 && d2 <= 0.0 {
        return (1.0, 0.0, 0.0);
    }

    let bo = -b;
    let d3 = ab.dot(bo);
    let d4 = ac.dot(bo);
    if d3 >= 0.0 && d4 <= d3 {
        return (0.0, 1.0, 0.0);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return (1.0 - v, v, 0.0);
    }

    let co = -c;
    let d5 = ab.dot(co);
    let d6 = ac.dot(co);
    if d6 >= 0.0 && d5 <= d6 {
        return (0.0, 0.0, 1.0);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return (1.0 - w, 0.0, w);
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (0.0, 1.0 - w, w);
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    (1.0 - v - w, v, w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collider::ConvexShape;
    use crate::narrowphase::gjk::{gjk, GjkResult};
    use crate::narrowphase::support_world;
    use glam::Mat4;

    #[test]
    fn overlapping_boxes_report_expected_penetration() {
        let a = ConvexShape::BoundingBox {
            half_extents: Vec3::splat(1.0),
        };
        let b = ConvexShape::BoundingBox {
            half_extents: Vec3::splat(1.0),
        };
        let xf_a = Mat4::IDENTITY;
        let xf_b = Mat4::from_translation(Vec3::new(1.5, 0.0, 0.0));

        let mut support_closure = |d: Vec3| {
            let on_a = support_world(&a, xf_a, d);
            let on_b = support_world(&b, xf_b, -d);
            SupportPoint {
                cso: on_a - on_b,
                on_a,
                on_b,
            }
        };

        let simplex = match gjk(&mut support_closure, 1e-6, 64) {
            GjkResult::Intersecting(s) => s,
            GjkResult::Separated { .. } => panic!("expected overlap"),
        };

        let result = epa(&simplex, &mut support_closure, 1e-4, 64).expect("epa should converge");
        assert!((result.penetration - 0.5).abs() < 1e-2);
        assert!(result.normal.x.abs() > 0.9);
    }
}
