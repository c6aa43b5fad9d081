//! Kd-tree over triangle primitives.
//!
//! Built once from the immutable scene geometry with a surface-area
//! heuristic (the PBRT formulation), then queried read-only from any
//! number of threads. Nodes are packed into a flat 8-byte-record array;
//! leaves reference runs of a shared `leaf_elements` index array.

pub mod build;
pub mod node;
pub mod traverse;

pub use node::KdNode;
pub use traverse::Hit;

use crate::util::math::Aabb;

/// Construction parameters for the SAH build.
#[derive(Clone, Debug)]
pub struct BuildParams {
    pub max_depth: u32,
    pub max_leaf_capacity: usize,
    /// Cost discount when one side of a candidate split is empty, in [0, 1).
    pub empty_bonus: f32,
    pub traversal_cost: f32,
    pub isect_cost: f32,
}

impl BuildParams {
    /// Defaults scaled to the triangle count: depth `8 + 1.3 * log2(n)`,
    /// 16 triangles per leaf, intersection 80x as costly as a traversal
    /// step.
    pub fn for_triangle_count(n: usize) -> Self {
        Self {
            max_depth: (8.0 + 1.3 * (n.max(1) as f32).log2()).round() as u32,
            max_leaf_capacity: 16,
            empty_bonus: 0.0,
            traversal_cost: 1.0,
            isect_cost: 80.0,
        }
    }
}

/// The built tree. Owns its node and leaf-element arrays; geometry is
/// passed back in per query.
pub struct KdTree {
    nodes: Vec<KdNode>,
    leaf_elements: Vec<u32>,
    bounds: Aabb,
    ray_range_bias: f32,
    params: BuildParams,
}

impl KdTree {
    /// Bounds of the whole scene.
    #[inline]
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Origin offset applied to every query ray to dodge self-intersection.
    #[inline]
    pub fn ray_range_bias(&self) -> f32 {
        self.ray_range_bias
    }

    #[inline]
    pub fn nodes(&self) -> &[KdNode] {
        &self.nodes
    }

    #[inline]
    pub fn leaf_elements(&self) -> &[u32] {
        &self.leaf_elements
    }

    #[inline]
    pub fn params(&self) -> &BuildParams {
        &self.params
    }

    /// Walk the node array and summarise its shape.
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        // (node index, depth) pairs; below child is always index + 1
        let mut stack = vec![(0u32, 1u32)];
        while let Some((index, depth)) = stack.pop() {
            let node = self.nodes[index as usize];
            stats.depth = stats.depth.max(depth);
            if node.is_leaf() {
                stats.leaves += 1;
                stats.max_leaf_size = stats.max_leaf_size.max(node.triangle_count() as usize);
            } else {
                stats.interior += 1;
                stack.push((index + 1, depth + 1));
                stack.push((node.above_child(), depth + 1));
            }
        }
        stats
    }
}

/// Shape summary of a built tree, for logging and diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub interior: usize,
    pub leaves: usize,
    pub max_leaf_size: usize,
    pub depth: u32,
}
