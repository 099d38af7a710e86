//! Bounding volume hierarchy of spherical caps over mesh triangles.
//!
//! Leaves are the circumscribed caps of triangles. The tree is built bottom-up by
//! agglomerative clustering: leaves are ordered along a Morton curve, then every round
//! merges mutually nearest neighbors found in a sliding window until one root remains.

pub mod flat;
pub mod morton;

pub use flat::{FlatBvhForest, FlatBvhNode, search_flat};

use crate::geometry::{angular_distance, enclosing_cap};
use crate::mesh::Mesh;
use crate::parallel::{KernelId, ParallelBatch};
use glam::Vec3;
use log::warn;
use morton::{morton_code, radix_sort_by_key};
use std::cmp::Ordering;

/// Slack added to leaf caps so points on a triangle edge stay inside.
const CAP_EPS: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhNode {
    pub center: Vec3,
    /// Angular radius of the cap
    pub radius: f32,
    pub children: Option<[usize; 2]>,
    pub triangle: Option<usize>,
}

impl BvhNode {
    fn leaf(center: Vec3, radius: f32, triangle: usize) -> Self {
        Self {
            center,
            radius,
            children: None,
            triangle: Some(triangle),
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        angular_distance(self.center, point) <= self.radius + CAP_EPS
    }

    /// Angular distance from the point to the cap boundary, negative inside.
    fn gap(&self, point: Vec3) -> f32 {
        angular_distance(self.center, point) - self.radius
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    root: usize,
    /// Indexed triangles, sorted
    triangles: Vec<usize>,
}

impl Bvh {
    /// Builds a hierarchy over `triangles` of `mesh`. Returns `None` for an empty set.
    pub fn build(
        mesh: &Mesh,
        triangles: &[usize],
        search_radius: usize,
        dispatcher: &impl ParallelBatch,
    ) -> Option<Self> {
        if triangles.is_empty() {
            return None;
        }

        let mut nodes: Vec<BvhNode> = triangles
            .iter()
            .map(|&t| {
                let g = &mesh.geometry[t];
                BvhNode::leaf(g.circumcenter, g.circumradius + CAP_EPS, t)
            })
            .collect();

        let mut working: Vec<usize> = (0..nodes.len()).collect();
        radix_sort_by_key(&mut working, |&i| morton_code(nodes[i].center));

        let radius = search_radius.max(1);
        while working.len() > 1 {
            working = cluster_round(&mut nodes, &working, radius, dispatcher);
        }

        let mut sorted = triangles.to_vec();
        sorted.sort_unstable();
        Some(Self {
            root: working[0],
            nodes,
            triangles: sorted,
        })
    }

    pub fn root(&self) -> usize {
        self.root
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &BvhNode {
        &self.nodes[index]
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.children.is_none()).count()
    }

    pub fn indexes_triangle(&self, triangle: usize) -> bool {
        self.triangles.binary_search(&triangle).is_ok()
    }

    /// Triangle containing `point`, or `None` if no indexed triangle does.
    ///
    /// Walks greedily toward the closer cap first; when the reached leaf misses, its
    /// edge neighbors are tried, and as a last resort every cap containing the point.
    pub fn search_for_point(&self, mesh: &Mesh, point: Vec3) -> Option<usize> {
        let mut current = self.root;
        while let Some([left, right]) = self.nodes[current].children {
            let (l, r) = (&self.nodes[left], &self.nodes[right]);
            current = match (l.contains(point), r.contains(point)) {
                (true, false) => left,
                (false, true) => right,
                _ if l.gap(point) <= r.gap(point) => left,
                _ => right,
            };
        }

        if let Some(t) = self.nodes[current].triangle {
            if mesh.spherical_triangle(t).contains(point) {
                return Some(t);
            }
            let neighbor = mesh.triangles[t]
                .neighbors
                .iter()
                .flatten()
                .copied()
                .find(|&n| self.indexes_triangle(n) && mesh.spherical_triangle(n).contains(point));
            if neighbor.is_some() {
                return neighbor;
            }
        }

        self.exhaustive_search(mesh, point)
    }

    fn exhaustive_search(&self, mesh: &Mesh, point: Vec3) -> Option<usize> {
        let mut stack = vec![self.root];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !node.contains(point) {
                continue;
            }
            match (node.children, node.triangle) {
                (Some([left, right]), _) => {
                    stack.push(right);
                    stack.push(left);
                }
                (None, Some(t)) if mesh.spherical_triangle(t).contains(point) => return Some(t),
                _ => {}
            }
        }
        None
    }

    /// Breadth-first array form, child indices relative to the start of the array.
    pub fn flatten(&self) -> Vec<FlatBvhNode> {
        let mut order = vec![self.root];
        let mut i = 0;
        while i < order.len() {
            if let Some([left, right]) = self.nodes[order[i]].children {
                order.push(left);
                order.push(right);
            }
            i += 1;
        }

        let mut flat_index = vec![0u32; self.nodes.len()];
        for (position, &node) in order.iter().enumerate() {
            flat_index[node] = position as u32;
        }

        order
            .iter()
            .map(|&index| {
                let node = &self.nodes[index];
                let (n_children, left, right) = match node.children {
                    Some([l, r]) => (2, flat_index[l], flat_index[r]),
                    None => (0, 0, 0),
                };
                FlatBvhNode {
                    n_children,
                    left,
                    right,
                    triangle: node.triangle.map_or(u32::MAX, |t| t as u32),
                    center: node.center.to_array(),
                    radius: node.radius,
                }
            })
            .collect()
    }
}

fn pair_cost(nodes: &[BvhNode], i: usize, j: usize) -> f32 {
    let (a, b) = (&nodes[i], &nodes[j]);
    enclosing_cap(a.center, a.radius, b.center, b.radius).1
}

/// Orders candidate pairs by merged cap radius, then by the pair's node ids.
fn compare_pairs(a: (f32, usize, usize), b: (f32, usize, usize)) -> Ordering {
    let key = |(cost, x, y): (f32, usize, usize)| (cost, x.min(y), x.max(y));
    let (ca, xa, ya) = key(a);
    let (cb, xb, yb) = key(b);
    ca.total_cmp(&cb).then(xa.cmp(&xb)).then(ya.cmp(&yb))
}

/// One clustering round: nearest neighbors in parallel, then mutual pairs are merged.
fn cluster_round(
    nodes: &mut Vec<BvhNode>,
    working: &[usize],
    search_radius: usize,
    dispatcher: &impl ParallelBatch,
) -> Vec<usize> {
    let n = working.len();
    let snapshot = nodes.as_slice();
    let nearest: Vec<Option<usize>> = dispatcher.run(KernelId::BvhNearestNeighbor, n, |i| {
        let lo = i.saturating_sub(search_radius);
        let hi = (i + search_radius).min(n - 1);
        (lo..=hi)
            .filter(|&j| j != i)
            .map(|j| (pair_cost(snapshot, working[i], working[j]), working[i], working[j], j))
            .min_by(|a, b| compare_pairs((a.0, a.1, a.2), (b.0, b.1, b.2)))
            .map(|(_, _, _, j)| j)
    });

    let nearest: Vec<usize> = nearest
        .iter()
        .enumerate()
        .map(|(i, nn)| match nn {
            Some(j) if *j < n => *j,
            _ => {
                warn!("BVH node {i} has no neighbor candidate, using fallback partner");
                if i == 0 { 1 } else { 0 }
            }
        })
        .collect();

    let mut partner: Vec<Option<usize>> = (0..n)
        .map(|i| {
            let j = nearest[i];
            (nearest[j] == i && j != i).then_some(j)
        })
        .collect();

    if partner.iter().all(Option::is_none) {
        warn!("BVH clustering round found no mutual pair, forcing a merge of the first two nodes");
        partner[0] = Some(1);
        partner[1] = Some(0);
    }

    let mut next = Vec::with_capacity(n / 2 + 1);
    for i in 0..n {
        match partner[i] {
            Some(j) if i < j => {
                let (a, b) = (working[i], working[j]);
                let (center, radius) =
                    enclosing_cap(nodes[a].center, nodes[a].radius, nodes[b].center, nodes[b].radius);
                nodes.push(BvhNode {
                    center,
                    radius,
                    children: Some([a, b]),
                    triangle: None,
                });
                next.push(nodes.len() - 1);
            }
            Some(_) => {}
            None => next.push(working[i]),
        }
    }
    next
}
