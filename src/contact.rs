//! Contact points and persistent per-pair manifolds.

use glam::{Mat4, Vec3};

use crate::config::WorldConfig;
use crate::handles::ColliderHandle;

/// A single point of touch between two colliders.
///
/// `world_position`/`local_position` are indexed `[0]` for the manifold's
/// `collider_a`, `[1]` for `collider_b`. `normal` points from `collider_a`
/// toward `collider_b`. The impulse fields are the solver's warm-start
/// accumulators, carried across frames by [`Manifold::refresh`].
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    pub world_position: [Vec3; 2],
    pub local_position: [Vec3; 2],
    pub normal: Vec3,
    pub penetration: f32,
    pub normal_impulse: f32,
    pub tangent_impulse: [f32; 2],
}

impl Contact {
    fn new(local_a: Vec3, local_b: Vec3, world_a: Vec3, world_b: Vec3, normal: Vec3, penetration: f32) -> Self {
        Self {
            world_position: [world_a, world_b],
            local_position: [local_a, local_b],
            normal,
            penetration,
            normal_impulse: 0.0,
            tangent_impulse: [0.0, 0.0],
        }
    }
}

/// Whether a manifold's colliders currently overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifoldState {
    Disjoint,
    Intersecting,
}

/// Persistent contact set for one collider pair, carried across ticks so the
/// solver can warm-start from the previous frame's impulses.
#[derive(Debug, Clone)]
pub struct Manifold {
    pub collider_a: ColliderHandle,
    pub collider_b: ColliderHandle,
    pub contacts: Vec<Contact>,
    pub state: ManifoldState,
}

impl Manifold {
    pub fn new(collider_a: ColliderHandle, collider_b: ColliderHandle) -> Self {
        Self {
            collider_a,
            collider_b,
            contacts: Vec::with_capacity(4),
            state: ManifoldState::Disjoint,
        }
    }

    /// Push each retained contact's local position back into world space
    /// under the colliders' current transforms, drop contacts whose
    /// penetration has gone sufficiently negative or whose tangential drift
    /// has grown past `cfg.contact_separation`, and recompute penetration
    /// from the manifold's stored normal.
    pub fn refresh(&mut self, xf_a: Mat4, xf_b: Mat4, cfg: &WorldConfig) {
        let drift_threshold_sq = cfg.contact_separation * cfg.contact_separation * 4.0;
        self.contacts.retain_mut(|c| {
            let world_a = xf_a.transform_point3(c.local_position[0]);
            let world_b = xf_b.transform_point3(c.local_position[1]);
            c.world_position = [world_a, world_b];

            let separation = (world_b - world_a).dot(c.normal);
            c.penetration = -separation;

            let tangential = (world_b - world_a) - separation * c.normal;
            if c.penetration < -cfg.contact_precision {
                return false;
            }
            if tangential.length_squared() > drift_threshold_sq {
                return false;
            }
            true
        });
        self.state = if self.contacts.is_empty() {
            ManifoldState::Disjoint
        } else {
            ManifoldState::Intersecting
        };
    }

    /// Insert a freshly produced contact (local-space witnesses on each
    /// body, plus a world-space point and depth), fusing it with an existing
    /// contact within `contact_separation^2` of either local witness so its
    /// warm-start impulses are preserved. Reduces to at most 4 afterward.
    pub fn insert(
        &mut self,
        local_a: Vec3,
        local_b: Vec3,
        world_a: Vec3,
        world_b: Vec3,
        normal: Vec3,
        penetration: f32,
        cfg: &WorldConfig,
    ) {
        let sep_sq = cfg.contact_separation * cfg.contact_separation;
        let existing = self.contacts.iter_mut().find(|c| {
            c.local_position[0].distance_squared(local_a) < sep_sq
                || c.local_position[1].distance_squared(local_b) < sep_sq
        });

        if let Some(c) = existing {
            c.local_position = [local_a, local_b];
            c.world_position = [world_a, world_b];
            c.normal = normal;
            c.penetration = penetration;
        } else {
            self.contacts.push(Contact::new(
                local_a, local_b, world_a, world_b, normal, penetration,
            ));
            if self.contacts.len() > 4 {
                self.reduce();
            }
        }
        self.state = ManifoldState::Intersecting;
    }

    /// Reduce to the 4 contacts that best span the contact area: the
    /// deepest one, then three more chosen greedily to maximize pairwise
    /// squared distance (the "deepest + spread" rule).
    fn reduce(&mut self) {
        let deepest = self
            .contacts
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.penetration.partial_cmp(&b.penetration).unwrap())
            .map(|(i, _)| i)
            .unwrap();

        let mut kept = vec![deepest];
        while kept.len() < 4 && kept.len() < self.contacts.len() {
            let mut best_idx = None;
            let mut best_score = f32::MIN;
            for (i, c) in self.contacts.iter().enumerate() {
                if kept.contains(&i) {
                    continue;
                }
                let score: f32 = kept
                    .iter()
                    .map(|&k| c.world_position[0].distance_squared(self.contacts[k].world_position[0]))
                    .sum();
                if score > best_score {
                    best_score = score;
                    best_idx = Some(i);
                }
            }
            if let Some(i) = best_idx {
                kept.push(i);
            } else {
                break;
            }
        }

        let mut reduced = Vec::with_capacity(kept.len());
        for i in kept {
            reduced.push(self.contacts[i]);
        }
        self.contacts = reduced;
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn handles() -> (ColliderHandle, ColliderHandle) {
        let mut sm: SlotMap<ColliderHandle, ()> = SlotMap::with_key();
        (sm.insert(()), sm.insert(()))
    }

    #[test]
    fn insert_fuses_nearby_contacts_and_keeps_impulse() {
        let (a, b) = handles();
        let cfg = WorldConfig::default();
        let mut m = Manifold::new(a, b);
        m.insert(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::Y,
            0.1,
            &cfg,
        );
        m.contacts[0].normal_impulse = 5.0;

        m.insert(
            Vec3::new(0.001, 0.0, 0.0),
            Vec3::new(0.001, 0.0, 0.0),
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::Y,
            0.12,
            &cfg,
        );

        assert_eq!(m.contacts.len(), 1);
        assert_eq!(m.contacts[0].normal_impulse, 5.0);
    }

    #[test]
    fn reduce_keeps_deepest_and_at_most_four() {
        let (a, b) = handles();
        let cfg = WorldConfig::default();
        let mut m = Manifold::new(a, b);
        let corners = [
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(-1.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 0.0),
        ];
        for (i, c) in corners.iter().enumerate() {
            let penetration = if i == 4 { 10.0 } else { 0.01 };
            m.insert(*c, *c, *c, *c, Vec3::Y, penetration, &cfg);
        }
        assert!(m.contacts.len() <= 4);
        assert!(m.contacts.iter().any(|c| c.penetration == 10.0));
    }
}
