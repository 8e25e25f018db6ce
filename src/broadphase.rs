//! Broadphase collision detection via sweep-and-prune.

use slotmap::SlotMap;

use crate::collider::Collider;
use crate::handles::ColliderHandle;
use crate::math::Aabb;

struct Entry {
    handle: ColliderHandle,
    aabb: Aabb,
    is_static: bool,
}

/// Sweep-and-prune broadphase: sorts collider AABBs along the x-axis and
/// sweeps an active window, only testing pairs whose x-intervals overlap.
/// The entry buffer is reused across calls to avoid reallocating every
/// step.
#[derive(Default)]
pub struct Broadphase {
    entries: Vec<Entry>,
}

impl Broadphase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds every unordered pair of overlapping collider AABBs, skipping
    /// static-static pairs. `is_static` classifies a collider by its
    /// owning body (kinematic/no body = static); pairs are always returned
    /// in canonical `(smaller, larger)` handle order so a caller keying a
    /// manifold map by the pair never sees both orderings.
    pub fn find_pairs(
        &mut self,
        colliders: &SlotMap<ColliderHandle, Collider>,
        is_static: impl Fn(ColliderHandle) -> bool,
    ) -> Vec<(ColliderHandle, ColliderHandle)> {
        self.entries.clear();
        self.entries
            .extend(colliders.iter().map(|(handle, collider)| Entry {
                handle,
                aabb: collider.aabb(),
                is_static: is_static(handle),
            }));
        self.entries
            .sort_by(|a, b| a.aabb.min.x.partial_cmp(&b.aabb.min.x).unwrap());

        let mut pairs = Vec::with_capacity(self.entries.len() * 2);
        let mut active: Vec<usize> = Vec::new();

        for i in 0..self.entries.len() {
            let current = &self.entries[i];
            active.retain(|&j| self.entries[j].aabb.max.x >= current.aabb.min.x);

            for &j in &active {
                let other = &self.entries[j];
                if current.is_static && other.is_static {
                    continue;
                }
                if !current.aabb.overlaps(&other.aabb, 0.0) {
                    continue;
                }
                pairs.push(canonical_pair(current.handle, other.handle));
            }

            active.push(i);
        }

        pairs
    }
}

fn canonical_pair(a: ColliderHandle, b: ColliderHandle) -> (ColliderHandle, ColliderHandle) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
