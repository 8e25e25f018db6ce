use glam::{Mat4, Vec3};

/// Axis-aligned bounding box. Invariant: `min <= max` componentwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// An AABB containing nothing; `expand`-ing into it yields the other operand.
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Test overlap with inclusive slack on every axis.
    #[inline]
    pub fn overlaps(&self, other: &Aabb, eps: f32) -> bool {
        self.min.x - eps <= other.max.x
            && self.max.x + eps >= other.min.x
            && self.min.y - eps <= other.max.y
            && self.max.y + eps >= other.min.y
            && self.min.z - eps <= other.max.z
            && self.max.z + eps >= other.min.z
    }

    #[inline]
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Smallest AABB enclosing both `self` and `other`.
    pub fn expand(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn surface_area(&self) -> f32 {
        let d = self.max - self.min;
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Enclosing AABB of this box's 8 corners under an arbitrary affine transform.
    pub fn transform(&self, m: Mat4) -> Aabb {
        let center = self.center();
        let half = self.half_extents();
        let new_center = m.transform_point3(center);

        let abs_x = m.x_axis.truncate().abs();
        let abs_y = m.y_axis.truncate().abs();
        let abs_z = m.z_axis.truncate().abs();
        let extent = abs_x * half.x + abs_y * half.y + abs_z * half.z;

        Aabb {
            min: new_center - extent,
            max: new_center + extent,
        }
    }

    /// Slab test for a ray against this AABB. `dir` need not be normalized;
    /// components of `dir` equal to zero are treated as parallel to that
    /// axis's slab.
    pub fn ray_intersect(&self, origin: Vec3, dir: Vec3, eps: f32) -> bool {
        let mut t_min = 0.0f32;
        let mut t_max = f32::MAX;

        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis];
            let lo = self.min[axis];
            let hi = self.max[axis];

            if d.abs() < eps {
                if o < lo || o > hi {
                    return false;
                }
            } else {
                let inv_d = 1.0 / d;
                let mut t1 = (lo - o) * inv_d;
                let mut t2 = (hi - o) * inv_d;
                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }
                t_min = t_min.max(t1);
                t_max = t_max.min(t2);
                if t_min > t_max {
                    return false;
                }
            }
        }

        true
    }
}
