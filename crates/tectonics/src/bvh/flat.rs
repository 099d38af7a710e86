//! Flattened BVH records for bulk consumption by batched kernels.

use super::{Bvh, CAP_EPS};
use crate::geometry::angular_distance;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// One tree node in breadth-first order. Child indices are relative to the tree's base.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FlatBvhNode {
    pub n_children: u32,
    pub left: u32,
    pub right: u32,
    /// `u32::MAX` for internal nodes
    pub triangle: u32,
    pub center: [f32; 3],
    pub radius: f32,
}

/// Several flattened trees packed into one array, with a prefix sum of their starts.
///
/// `offsets[i]..offsets[i + 1]` is the range of tree `i`; an empty range means the tree
/// does not exist (a plate without triangles).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatBvhForest {
    pub nodes: Vec<FlatBvhNode>,
    pub offsets: Vec<u32>,
}

impl FlatBvhForest {
    pub fn from_trees<'a>(trees: impl IntoIterator<Item = Option<&'a Bvh>>) -> Self {
        let mut forest = Self {
            nodes: Vec::new(),
            offsets: vec![0],
        };
        for tree in trees {
            if let Some(tree) = tree {
                forest.nodes.extend(tree.flatten());
            }
            forest.offsets.push(forest.nodes.len() as u32);
        }
        forest
    }

    pub fn tree_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn tree(&self, index: usize) -> &[FlatBvhNode] {
        if index >= self.tree_count() {
            return &[];
        }
        let start = self.offsets[index] as usize;
        let end = self.offsets[index + 1] as usize;
        &self.nodes[start..end]
    }

    /// Raw bytes of the node array, as handed to a compute backend.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }
}

/// First leaf triangle whose cap holds `point` and for which `contains` agrees.
///
/// Visits only caps containing the point, closer child first.
pub fn search_flat(nodes: &[FlatBvhNode], point: Vec3, contains: impl Fn(usize) -> bool) -> Option<usize> {
    if nodes.is_empty() {
        return None;
    }
    let inside = |node: &FlatBvhNode| angular_distance(Vec3::from_array(node.center), point) <= node.radius + CAP_EPS;

    let mut stack = vec![0usize];
    while let Some(index) = stack.pop() {
        let node = &nodes[index];
        if !inside(node) {
            continue;
        }
        if node.n_children == 0 {
            let t = node.triangle as usize;
            if contains(t) {
                return Some(t);
            }
            continue;
        }
        let (left, right) = (node.left as usize, node.right as usize);
        let dl = angular_distance(Vec3::from_array(nodes[left].center), point);
        let dr = angular_distance(Vec3::from_array(nodes[right].center), point);
        if dl <= dr {
            stack.push(right);
            stack.push(left);
        } else {
            stack.push(left);
            stack.push(right);
        }
    }
    None
}
