//! Bounding volume and affine math shared by colliders, broadphase, and narrowphase.

mod aabb;

pub use aabb::Aabb;
