//! Half-edge mesh representation for convex polyhedra.

use glam::Vec3;

/// A half-edge: one directed traversal of an edge around a face.
#[derive(Debug, Clone, Copy)]
pub struct HalfEdge {
    /// Vertex this half-edge points to.
    pub vertex: usize,
    /// The half-edge walking the same edge in the opposite direction.
    pub opposite: usize,
    /// Next half-edge around the same face.
    pub next: usize,
    /// Face this half-edge borders.
    pub face: usize,
}

/// Indexed convex polyhedron. Every half-edge has an opposite; the mesh is
/// always closed (no boundary) since it only ever represents a convex hull.
#[derive(Debug, Clone)]
pub struct HalfEdgeMesh {
    pub vertices: Vec<Vec3>,
    pub half_edges: Vec<HalfEdge>,
    /// Index of one half-edge bordering each face.
    pub faces: Vec<usize>,
}

impl HalfEdgeMesh {
    /// Build a half-edge mesh from a triangle soup (indices into `vertices`,
    /// three per triangle, consistently wound). Degenerate or non-manifold
    /// input will simply fail to find an opposite for some edge; such meshes
    /// are not produced by [`HalfEdgeMesh::convex_hull`].
    pub fn from_triangles(vertices: Vec<Vec3>, triangles: &[[usize; 3]]) -> Self {
        let mut half_edges = Vec::with_capacity(triangles.len() * 3);
        let mut faces = Vec::with_capacity(triangles.len());

        for (face_idx, tri) in triangles.iter().enumerate() {
            let base = half_edges.len();
            faces.push(base);
            for i in 0..3 {
                half_edges.push(HalfEdge {
                    vertex: tri[(i + 1) % 3],
                    opposite: usize::MAX,
                    next: base + (i + 1) % 3,
                    face: face_idx,
                });
            }
        }

        // Pair up opposites by matching directed edges (from, to) with (to, from).
        let edge_start = |he: &HalfEdge, half_edges: &[HalfEdge]| half_edges[he.next].vertex;
        for i in 0..half_edges.len() {
            if half_edges[i].opposite != usize::MAX {
                continue;
            }
            let from = edge_start(&half_edges[i], &half_edges);
            let to = half_edges[i].vertex;
            for j in 0..half_edges.len() {
                if j == i || half_edges[j].opposite != usize::MAX {
                    continue;
                }
                let jfrom = edge_start(&half_edges[j], &half_edges);
                let jto = half_edges[j].vertex;
                if jfrom == to && jto == from {
                    half_edges[i].opposite = j;
                    half_edges[j].opposite = i;
                    break;
                }
            }
        }

        Self {
            vertices,
            half_edges,
            faces,
        }
    }

    /// Build the half-edge mesh for an axis-aligned box with the given half
    /// extents, centered at the origin. Used as the canonical small convex
    /// polyhedron in tests and demos.
    pub fn unit_box(half_extents: Vec3) -> Self {
        let h = half_extents;
        let vertices = vec![
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        let triangles = [
            [0, 2, 1], [0, 3, 2], // -z
            [4, 5, 6], [4, 6, 7], // +z
            [0, 1, 5], [0, 5, 4], // -y
            [3, 7, 6], [3, 6, 2], // +y
            [0, 4, 7], [0, 7, 3], // -x
            [1, 2, 6], [1, 6, 5], // +x
        ];
        Self::from_triangles(vertices, &triangles)
    }

    /// Support point index: the vertex maximizing `dot(v, dir)`.
    pub fn support_index(&self, dir: Vec3) -> usize {
        let mut best = 0usize;
        let mut best_dot = self.vertices[0].dot(dir);
        for (i, v) in self.vertices.iter().enumerate().skip(1) {
            let d = v.dot(dir);
            if d > best_dot {
                best_dot = d;
                best = i;
            }
        }
        best
    }

    pub fn support(&self, dir: Vec3) -> Vec3 {
        self.vertices[self.support_index(dir)]
    }
}
