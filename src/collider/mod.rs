//! Collider shapes and the cached transform/AABB wrapper that owns one.

pub mod concave;
pub mod convex;
pub mod half_edge;

pub use concave::{CompositePart, ConcaveShape};
pub use convex::ConvexShape;
pub use half_edge::HalfEdgeMesh;

use glam::{Mat4, Vec3};

use crate::math::Aabb;

/// Tag union over the two collider families. Convex shapes carry a support
/// mapping; concave shapes only expose an iteration over convex sub-parts.
#[derive(Debug, Clone)]
pub enum Shape {
    Convex(ConvexShape),
    Concave(ConcaveShape),
}

/// A shape positioned in world space, with a cached AABB kept in sync by
/// [`Collider::set_world_transform`].
#[derive(Debug, Clone)]
pub struct Collider {
    pub shape: Shape,
    /// Generates contact events without applying solver impulses.
    pub is_sensor: bool,
    world_transform: Mat4,
    aabb: Aabb,
    updated: bool,
}

impl Collider {
    pub fn new(shape: Shape) -> Self {
        let mut c = Self {
            shape,
            is_sensor: false,
            world_transform: Mat4::IDENTITY,
            aabb: Aabb::empty(),
            updated: true,
        };
        c.recompute_aabb();
        c
    }

    pub fn sensor(mut self, is_sensor: bool) -> Self {
        self.is_sensor = is_sensor;
        self
    }

    pub fn world_transform(&self) -> Mat4 {
        self.world_transform
    }

    pub fn set_world_transform(&mut self, m: Mat4) {
        self.world_transform = m;
        self.updated = true;
        self.recompute_aabb();
    }

    pub fn aabb(&self) -> Aabb {
        self.aabb
    }

    pub fn updated(&self) -> bool {
        self.updated
    }

    pub fn reset_updated_state(&mut self) {
        self.updated = false;
    }

    fn recompute_aabb(&mut self) {
        self.aabb = match &self.shape {
            Shape::Convex(c) => c.local_aabb().transform(self.world_transform),
            Shape::Concave(ConcaveShape::Terrain { .. }) => {
                // Terrain AABB is computed once from cell bounds; cheap enough
                // to keep exact rather than caching a coarse bound.
                terrain_local_aabb(&self.shape).transform(self.world_transform)
            }
            Shape::Concave(ConcaveShape::Composite(parts)) => {
                let mut aabb = Aabb::empty();
                for part in parts {
                    let part_to_world = self.world_transform * part.local_transform;
                    let part_aabb = match &part.shape {
                        Shape::Convex(c) => c.local_aabb().transform(part_to_world),
                        Shape::Concave(_) => terrain_local_aabb(&part.shape).transform(part_to_world),
                    };
                    aabb = aabb.expand(&part_aabb);
                }
                aabb
            }
        };
    }

    /// Enumerate convex parts whose AABB overlaps `world_query` (expressed
    /// in world space). For a convex collider, yields itself exactly once.
    pub fn process_overlapping_parts(
        &self,
        world_query: Aabb,
        eps: f32,
        callback: &mut dyn FnMut(&ConvexShape, Mat4),
    ) {
        match &self.shape {
            Shape::Convex(c) => callback(c, self.world_transform),
            Shape::Concave(c) => {
                c.process_overlapping_parts(world_query, eps, self.world_transform, callback)
            }
        }
    }

    pub fn process_intersecting_parts(
        &self,
        origin: Vec3,
        dir: Vec3,
        eps: f32,
        callback: &mut dyn FnMut(&ConvexShape, Mat4),
    ) {
        match &self.shape {
            Shape::Convex(c) => callback(c, self.world_transform),
            Shape::Concave(c) => c.process_intersecting_parts(
                origin,
                dir,
                eps,
                self.world_transform,
                callback,
            ),
        }
    }
}

fn terrain_local_aabb(shape: &Shape) -> Aabb {
    if let Shape::Concave(ConcaveShape::Terrain {
        heights,
        x_size,
        z_size,
        cell_size,
    }) = shape
    {
        let mut min_y = f32::MAX;
        let mut max_y = f32::MIN;
        for h in heights {
            min_y = min_y.min(*h);
            max_y = max_y.max(*h);
        }
        Aabb::new(
            Vec3::new(0.0, min_y, 0.0),
            Vec3::new(*x_size as f32 * cell_size, max_y, *z_size as f32 * cell_size),
        )
    } else {
        Aabb::empty()
    }
}
