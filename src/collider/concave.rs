//! Concave shapes: composites of convex parts and implicit heightfields.

use glam::{Mat4, Vec3};

use crate::error::{PhysicsError, Result};
use crate::math::Aabb;

use super::convex::ConvexShape;
use super::Shape;

/// One convex (or nested concave) part of a [`ConcaveShape::Composite`],
/// positioned relative to the composite's own local frame.
#[derive(Debug, Clone)]
pub struct CompositePart {
    pub local_transform: Mat4,
    pub shape: Shape,
}

/// A concave shape: no single support mapping exists, so narrowphase must
/// iterate convex sub-parts instead.
#[derive(Debug, Clone)]
pub enum ConcaveShape {
    Composite(Vec<CompositePart>),
    /// Regular-grid heightfield. `heights` has `(x_size + 1) * (z_size + 1)`
    /// entries in row-major (x, then z) order; each cell spans `cell_size`
    /// local units and is covered by two triangles.
    Terrain {
        heights: Vec<f32>,
        x_size: usize,
        z_size: usize,
        cell_size: f32,
    },
}

impl ConcaveShape {
    /// Validated constructor for [`ConcaveShape::Terrain`]: rejects a
    /// heightmap whose sample count doesn't match `(x_size + 1) * (z_size +
    /// 1)` and a non-positive cell size, the `InvalidArgument` case the data
    /// model calls out for mismatched heightfield dimensions.
    pub fn terrain(heights: Vec<f32>, x_size: usize, z_size: usize, cell_size: f32) -> Result<Self> {
        let expected = (x_size + 1) * (z_size + 1);
        if heights.len() != expected {
            return Err(PhysicsError::InvalidArgument(format!(
                "terrain heightmap has {} samples, expected {} for a {}x{} grid",
                heights.len(),
                expected,
                x_size,
                z_size
            )));
        }
        if !(cell_size > 0.0) || !cell_size.is_finite() {
            return Err(PhysicsError::InvalidArgument(format!(
                "terrain cell_size must be positive and finite, got {cell_size}"
            )));
        }
        Ok(ConcaveShape::Terrain {
            heights,
            x_size,
            z_size,
            cell_size,
        })
    }

    /// Enumerate every convex part whose world-space AABB (under
    /// `transform_so_far`, the transform from this shape's local frame into
    /// the frame `query_aabb` is expressed in) overlaps `query_aabb`.
    ///
    /// `callback` receives the part's shape and its transform into the same
    /// frame as `query_aabb`.
    pub fn process_overlapping_parts(
        &self,
        query_aabb: Aabb,
        eps: f32,
        transform_so_far: Mat4,
        callback: &mut dyn FnMut(&ConvexShape, Mat4),
    ) {
        match self {
            ConcaveShape::Composite(parts) => {
                for part in parts {
                    let part_to_query = transform_so_far * part.local_transform;
                    match &part.shape {
                        Shape::Convex(c) => {
                            let part_aabb = c.local_aabb().transform(part_to_query);
                            if part_aabb.overlaps(&query_aabb, eps) {
                                callback(c, part_to_query);
                            }
                        }
                        Shape::Concave(c) => {
                            c.process_overlapping_parts(query_aabb, eps, part_to_query, callback);
                        }
                    }
                }
            }
            ConcaveShape::Terrain { .. } => {
                self.process_terrain_cells(query_aabb, transform_so_far, |tri, xf| {
                    callback(tri, xf)
                });
            }
        }
    }

    /// Ray variant of [`Self::process_overlapping_parts`]: yields every
    /// convex part whose local AABB the ray (given in the same frame as
    /// `origin`/`dir`) intersects.
    pub fn process_intersecting_parts(
        &self,
        origin: Vec3,
        dir: Vec3,
        eps: f32,
        transform_so_far: Mat4,
        callback: &mut dyn FnMut(&ConvexShape, Mat4),
    ) {
        match self {
            ConcaveShape::Composite(parts) => {
                for part in parts {
                    let part_to_query = transform_so_far * part.local_transform;
                    match &part.shape {
                        Shape::Convex(c) => {
                            let part_aabb = c.local_aabb().transform(part_to_query);
                            if part_aabb.ray_intersect(origin, dir, eps) {
                                callback(c, part_to_query);
                            }
                        }
                        Shape::Concave(c) => {
                            c.process_intersecting_parts(
                                origin,
                                dir,
                                eps,
                                part_to_query,
                                callback,
                            );
                        }
                    }
                }
            }
            ConcaveShape::Terrain { .. } => {
                // A generous ray-aligned box stands in for a proper DDA walk:
                // cheap, correct, just not cell-tight.
                let far = origin + dir * 10_000.0;
                let query_aabb = Aabb {
                    min: origin.min(far),
                    max: origin.max(far),
                };
                self.process_terrain_cells(query_aabb, transform_so_far, |tri, xf| {
                    callback(tri, xf)
                });
            }
        }
    }

    fn process_terrain_cells(
        &self,
        query_aabb: Aabb,
        transform_so_far: Mat4,
        mut callback: impl FnMut(&ConvexShape, Mat4),
    ) {
        let ConcaveShape::Terrain {
            heights,
            x_size,
            z_size,
            cell_size,
        } = self
        else {
            return;
        };

        let inv = transform_so_far.inverse();
        let local_aabb = query_aabb.transform(inv);

        let to_cell = |v: f32| (v / cell_size).floor() as isize;
        let min_cx = to_cell(local_aabb.min.x).max(0) as usize;
        let min_cz = to_cell(local_aabb.min.z).max(0) as usize;
        let max_cx = (to_cell(local_aabb.max.x).max(0) as usize).min(x_size.saturating_sub(1));
        let max_cz = (to_cell(local_aabb.max.z).max(0) as usize).min(z_size.saturating_sub(1));

        if min_cx > max_cx || min_cz > max_cz {
            return;
        }

        let height_at = |ix: usize, iz: usize| heights[iz * (x_size + 1) + ix];

        for cz in min_cz..=max_cz {
            for cx in min_cx..=max_cx {
                let h00 = height_at(cx, cz);
                let h10 = height_at(cx + 1, cz);
                let h01 = height_at(cx, cz + 1);
                let h11 = height_at(cx + 1, cz + 1);
                let cell_min_y = h00.min(h10).min(h01).min(h11);
                let cell_max_y = h00.max(h10).max(h01).max(h11);

                // Required pre-cull: reject cells whose vertical range misses
                // the query box entirely before synthesizing triangles.
                if cell_max_y < local_aabb.min.y || cell_min_y > local_aabb.max.y {
                    continue;
                }

                let x0 = cx as f32 * cell_size;
                let x1 = (cx + 1) as f32 * cell_size;
                let z0 = cz as f32 * cell_size;
                let z1 = (cz + 1) as f32 * cell_size;

                let p00 = Vec3::new(x0, h00, z0);
                let p10 = Vec3::new(x1, h10, z0);
                let p01 = Vec3::new(x0, h01, z1);
                let p11 = Vec3::new(x1, h11, z1);

                let tri_a = ConvexShape::Triangle {
                    v0: p00,
                    v1: p10,
                    v2: p11,
                };
                let tri_b = ConvexShape::Triangle {
                    v0: p00,
                    v1: p11,
                    v2: p01,
                };
                callback(&tri_a, transform_so_far);
                callback(&tri_b, transform_so_far);
            }
        }
    }
}
