//! Convex shapes: the support-mapping half of the collider hierarchy.

use glam::Vec3;

use crate::math::Aabb;

use super::half_edge::HalfEdgeMesh;

/// A convex shape in its own local frame. `support` and `local_aabb` are the
/// two operations narrowphase and broadphase need; both are pure functions
/// of the shape (transforms are applied by the owning [`super::Collider`]).
#[derive(Debug, Clone)]
pub enum ConvexShape {
    Sphere { radius: f32 },
    Capsule { radius: f32, half_height: f32 },
    BoundingBox { half_extents: Vec3 },
    ConvexPolyhedron(HalfEdgeMesh),
    Triangle { v0: Vec3, v1: Vec3, v2: Vec3 },
}

impl ConvexShape {
    /// The point of this shape (in local space) maximizing `dot(p, dir)`.
    pub fn support(&self, dir: Vec3) -> Vec3 {
        match self {
            ConvexShape::Sphere { radius } => {
                let d = dir.normalize_or_zero();
                d * *radius
            }
            ConvexShape::Capsule {
                radius,
                half_height,
            } => {
                let base = if dir.y >= 0.0 {
                    Vec3::new(0.0, *half_height, 0.0)
                } else {
                    Vec3::new(0.0, -*half_height, 0.0)
                };
                let d = dir.normalize_or_zero();
                base + d * *radius
            }
            ConvexShape::BoundingBox { half_extents } => Vec3::new(
                if dir.x >= 0.0 {
                    half_extents.x
                } else {
                    -half_extents.x
                },
                if dir.y >= 0.0 {
                    half_extents.y
                } else {
                    -half_extents.y
                },
                if dir.z >= 0.0 {
                    half_extents.z
                } else {
                    -half_extents.z
                },
            ),
            ConvexShape::ConvexPolyhedron(mesh) => mesh.support(dir),
            ConvexShape::Triangle { v0, v1, v2 } => {
                let d0 = v0.dot(dir);
                let d1 = v1.dot(dir);
                let d2 = v2.dot(dir);
                if d0 >= d1 && d0 >= d2 {
                    *v0
                } else if d1 >= d2 {
                    *v1
                } else {
                    *v2
                }
            }
        }
    }

    /// Conservative AABB of this shape in its own local frame.
    pub fn local_aabb(&self) -> Aabb {
        match self {
            ConvexShape::Sphere { radius } => {
                Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(*radius))
            }
            ConvexShape::Capsule {
                radius,
                half_height,
            } => Aabb::from_center_half_extents(
                Vec3::ZERO,
                Vec3::new(*radius, *half_height + *radius, *radius),
            ),
            ConvexShape::BoundingBox { half_extents } => {
                Aabb::from_center_half_extents(Vec3::ZERO, *half_extents)
            }
            ConvexShape::ConvexPolyhedron(mesh) => {
                let mut aabb = Aabb::empty();
                for v in &mesh.vertices {
                    aabb.min = aabb.min.min(*v);
                    aabb.max = aabb.max.max(*v);
                }
                aabb
            }
            ConvexShape::Triangle { v0, v1, v2 } => Aabb {
                min: v0.min(*v1).min(*v2),
                max: v0.max(*v1).max(*v2),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn support_is_monotone_in_search_direction() {
        let shapes = [
            ConvexShape::Sphere { radius: 1.0 },
            ConvexShape::BoundingBox {
                half_extents: Vec3::new(1.0, 2.0, 0.5),
            },
            ConvexShape::Capsule {
                radius: 0.3,
                half_height: 1.0,
            },
        ];
        for shape in &shapes {
            let d1 = Vec3::new(1.0, 0.3, -0.2);
            let d2 = Vec3::new(-0.5, 1.0, 0.1);
            let s1 = shape.support(d1);
            assert!(d1.dot(s1) >= d1.dot(shape.support(d2)) - 1e-4);
        }
    }

    #[test]
    fn sphere_support_has_radius_length() {
        let s = ConvexShape::Sphere { radius: 2.0 };
        let p = s.support(Vec3::Y);
        assert!((p - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-5);
    }
}
