//! Surface-area-heuristic construction.
//!
//! The sweep over candidate split planes follows the PBRT kd-tree builder:
//! per axis an ordered list of triangle-bound edges is materialised into a
//! pre-allocated buffer, then a single pass maintains the below/above
//! population counts while scoring every edge strictly inside the node.
//! The three edge buffers are reused across the whole recursion, so the
//! working memory beyond the output arrays stays at `O(n)`.

use std::cmp::Ordering;

use rayon::prelude::*;
use tracing::debug;

use super::node::KdNode;
use super::{BuildParams, KdTree};
use crate::scene::mesh::{Triangle, Vertex};
use crate::util::math::{Aabb, Vec3};

/// Scale of the self-intersection bias relative to the scene diagonal.
const RAY_RANGE_BIAS_SCALE: f32 = 5e-5;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EdgeKind {
    Start,
    End,
}

#[derive(Clone, Copy)]
struct BoundEdge {
    t: f32,
    triangle: u32,
    kind: EdgeKind,
}

impl KdTree {
    #[tracing::instrument(skip_all, fields(tri_count = triangles.len()))]
    pub fn build(triangles: &[Triangle], vertices: &[Vertex], params: BuildParams) -> Self {
        let triangle_bounds: Vec<Aabb> =
            triangles.par_iter().map(|t| t.bounds(vertices)).collect();

        let mut bounds = Aabb::EMPTY;
        for b in &triangle_bounds {
            bounds.expand(b);
        }
        if triangles.is_empty() {
            bounds = Aabb::new(Vec3::ZERO, Vec3::ZERO);
        }

        let mut builder = Builder {
            params: &params,
            triangle_bounds,
            nodes: Vec::new(),
            leaf_elements: Vec::new(),
            edges: std::array::from_fn(|_| {
                vec![
                    BoundEdge { t: 0.0, triangle: 0, kind: EdgeKind::Start };
                    2 * triangles.len()
                ]
            }),
        };

        let all: Vec<u32> = (0..triangles.len() as u32).collect();
        builder.build_node(&all, bounds, params.max_depth, 0);

        let ray_range_bias = RAY_RANGE_BIAS_SCALE * bounds.diagonal();
        debug!(
            nodes = builder.nodes.len(),
            leaf_elements = builder.leaf_elements.len(),
            ray_range_bias,
            "kd-tree built"
        );

        Self {
            nodes: builder.nodes,
            leaf_elements: builder.leaf_elements,
            bounds,
            ray_range_bias,
            params,
        }
    }
}

struct Builder<'a> {
    params: &'a BuildParams,
    triangle_bounds: Vec<Aabb>,
    nodes: Vec<KdNode>,
    leaf_elements: Vec<u32>,
    /// One reusable edge buffer per axis, each `2 * triangle count` long.
    edges: [Vec<BoundEdge>; 3],
}

impl Builder<'_> {
    fn build_node(&mut self, subset: &[u32], node_bounds: Aabb, depth: u32, bad_refines: u32) {
        if subset.len() <= self.params.max_leaf_capacity || depth == 0 {
            self.push_leaf(subset);
            return;
        }

        let mut bad_refines = bad_refines;
        let old_cost = self.params.isect_cost * subset.len() as f32;
        let total_sa = node_bounds.surface_area();

        // Candidate axes from longest to shortest; the strict `<` in the
        // cost comparison then resolves ties toward the longer axis.
        let mut axes = [0usize, 1, 2];
        axes.sort_by(|&a, &b| {
            node_bounds
                .length(b)
                .partial_cmp(&node_bounds.length(a))
                .unwrap_or(Ordering::Equal)
        });

        let mut best: Option<(usize, usize, f32)> = None; // (axis, edge offset, cost)
        for &axis in &axes {
            self.sort_edges(subset, axis);

            let lo = node_bounds.min[axis];
            let hi = node_bounds.max[axis];
            let other0 = (axis + 1) % 3;
            let other1 = (axis + 2) % 3;
            let d0 = node_bounds.length(other0);
            let d1 = node_bounds.length(other1);

            let mut n_below = 0usize;
            let mut n_above = subset.len();
            for j in 0..2 * subset.len() {
                let edge = self.edges[axis][j];
                if edge.kind == EdgeKind::End {
                    n_above -= 1;
                }
                if edge.t > lo && edge.t < hi {
                    let below_sa = 2.0 * (d0 * d1 + (edge.t - lo) * (d0 + d1));
                    let above_sa = 2.0 * (d0 * d1 + (hi - edge.t) * (d0 + d1));
                    let p_below = below_sa / total_sa;
                    let p_above = above_sa / total_sa;
                    let eb = if n_above == 0 || n_below == 0 { self.params.empty_bonus } else { 0.0 };
                    let cost = self.params.traversal_cost
                        + self.params.isect_cost
                            * (1.0 - eb)
                            * (p_below * n_below as f32 + p_above * n_above as f32);
                    if best.map_or(true, |(_, _, c)| cost < c) {
                        best = Some((axis, j, cost));
                    }
                }
                if edge.kind == EdgeKind::Start {
                    n_below += 1;
                }
            }
        }

        let Some((axis, offset, cost)) = best else {
            // no axis admitted any split
            self.push_leaf(subset);
            return;
        };
        if cost > old_cost {
            bad_refines += 1;
        }
        if (cost > 4.0 * old_cost && subset.len() < 16) || bad_refines == 3 {
            self.push_leaf(subset);
            return;
        }

        // Classify the subset by edge polarity around the winning offset.
        let split = self.edges[axis][offset].t;
        let mut below = Vec::with_capacity(subset.len());
        let mut above = Vec::with_capacity(subset.len());
        for edge in &self.edges[axis][..offset] {
            if edge.kind == EdgeKind::Start {
                below.push(edge.triangle);
            }
        }
        for edge in &self.edges[axis][offset + 1..2 * subset.len()] {
            if edge.kind == EdgeKind::End {
                above.push(edge.triangle);
            }
        }

        let node_index = self.nodes.len();
        self.nodes.push(KdNode::interior(axis as u32, split));

        // Below child first, so it lands immediately after its parent.
        let mut below_bounds = node_bounds;
        below_bounds.max[axis] = split;
        self.build_node(&below, below_bounds, depth - 1, bad_refines);

        let above_index = self.nodes.len() as u32;
        self.nodes[node_index].set_above_child(above_index);
        let mut above_bounds = node_bounds;
        above_bounds.min[axis] = split;
        self.build_node(&above, above_bounds, depth - 1, bad_refines);
    }

    /// Fill and order this axis' edge buffer for the given subset.
    /// Ties on `t` sort `Start` before `End`; the sort is stable, so equal
    /// edges keep subset order and rebuilds are reproducible.
    fn sort_edges(&mut self, subset: &[u32], axis: usize) {
        for (j, &tri) in subset.iter().enumerate() {
            let b = self.triangle_bounds[tri as usize];
            self.edges[axis][2 * j] =
                BoundEdge { t: b.min[axis], triangle: tri, kind: EdgeKind::Start };
            self.edges[axis][2 * j + 1] =
                BoundEdge { t: b.max[axis], triangle: tri, kind: EdgeKind::End };
        }
        self.edges[axis][..2 * subset.len()].sort_by(|a, b| {
            a.t.partial_cmp(&b.t)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.kind.cmp(&b.kind))
        });
    }

    fn push_leaf(&mut self, subset: &[u32]) {
        let offset = self.leaf_elements.len() as u32;
        self.leaf_elements.extend_from_slice(subset);
        self.nodes.push(KdNode::leaf(offset, subset.len() as u32));
    }
}
