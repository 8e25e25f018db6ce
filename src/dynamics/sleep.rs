//! Transitive wake propagation over the contact graph.
//!
//! Rebuilt fresh every step from the active manifold set: two bodies in
//! contact belong to the same island, and an island wakes as one the
//! instant any member is awake. This is cheap precisely because it is
//! rebuilt rather than maintained incrementally — no stale island to
//! invalidate when a manifold disappears.

use std::collections::HashMap;

use slotmap::SlotMap;

use crate::handles::BodyHandle;

use super::rigid_body::RigidBody;

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

/// Wake every body in an island that contains at least one already-awake
/// body. `contact_edges` is the set of body-handle pairs with an active
/// (non-empty) manifold this step; bodies absent from every edge are
/// untouched.
pub fn propagate_wake(bodies: &mut SlotMap<BodyHandle, RigidBody>, contact_edges: &[(BodyHandle, BodyHandle)]) {
    if contact_edges.is_empty() {
        return;
    }

    let mut index: HashMap<BodyHandle, usize> = HashMap::new();
    let mut handles: Vec<BodyHandle> = Vec::new();
    for &(a, b) in contact_edges {
        for h in [a, b] {
            index.entry(h).or_insert_with(|| {
                handles.push(h);
                handles.len() - 1
            });
        }
    }

    let mut uf = UnionFind::new(handles.len());
    for &(a, b) in contact_edges {
        uf.union(index[&a], index[&b]);
    }

    let mut root_awake: HashMap<usize, bool> = HashMap::new();
    for &h in &handles {
        let root = uf.find(index[&h]);
        let awake = bodies.get(h).map(|b| !b.flags.sleeping).unwrap_or(false);
        let entry = root_awake.entry(root).or_insert(false);
        *entry = *entry || awake;
    }

    for &h in &handles {
        let root = uf.find(index[&h]);
        if root_awake[&root] {
            if let Some(body) = bodies.get_mut(h) {
                if body.flags.sleeping {
                    body.wake();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::rigid_body::BodyProperties;
    use glam::{Mat3, Quat, Vec3};

    fn sleeping_body(sm: &mut SlotMap<BodyHandle, RigidBody>) -> BodyHandle {
        let props = BodyProperties::dynamic(1.0, Mat3::IDENTITY).unwrap();
        let mut body = RigidBody::new(props, Vec3::ZERO, Quat::IDENTITY);
        body.flags.sleeping = true;
        sm.insert(body)
    }

    #[test]
    fn awake_body_wakes_its_whole_island() {
        let mut bodies = SlotMap::with_key();
        let a = sleeping_body(&mut bodies);
        let b = sleeping_body(&mut bodies);
        let c = sleeping_body(&mut bodies);
        bodies[a].flags.sleeping = false;

        propagate_wake(&mut bodies, &[(a, b), (b, c)]);

        assert!(!bodies[b].flags.sleeping);
        assert!(!bodies[c].flags.sleeping);
    }

    #[test]
    fn fully_sleeping_island_stays_asleep() {
        let mut bodies = SlotMap::with_key();
        let a = sleeping_body(&mut bodies);
        let b = sleeping_body(&mut bodies);

        propagate_wake(&mut bodies, &[(a, b)]);

        assert!(bodies[a].flags.sleeping);
        assert!(bodies[b].flags.sleeping);
    }

    #[test]
    fn disjoint_islands_do_not_cross_wake() {
        let mut bodies = SlotMap::with_key();
        let a = sleeping_body(&mut bodies);
        let b = sleeping_body(&mut bodies);
        let c = sleeping_body(&mut bodies);
        let d = sleeping_body(&mut bodies);
        bodies[a].flags.sleeping = false;

        propagate_wake(&mut bodies, &[(a, b), (c, d)]);

        assert!(!bodies[b].flags.sleeping);
        assert!(bodies[c].flags.sleeping);
        assert!(bodies[d].flags.sleeping);
    }
}
