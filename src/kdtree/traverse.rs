//! Ray queries against the packed node array.
//!
//! Traversal is iterative over an explicit fixed-capacity stack; deferred
//! far children carry their clamped parametric range, so the visit order
//! and acceptance windows match a depth-first near-then-far descent.
//! Queries never allocate beyond that stack and are safe to run from any
//! number of threads at once.

use smallvec::SmallVec;

use super::KdTree;
use crate::scene::mesh::{Triangle, Vertex};
use crate::util::math::{intersect_ray_triangle, Ray, Vec3};

/// Nearest intersection along a ray.
#[derive(Clone, Copy, Debug)]
pub struct Hit {
    /// Ray parameter of the hit point.
    pub t: f32,
    /// Shading normal, interpolated from the vertex normals and normalised.
    pub normal: Vec3,
    /// Index of the hit triangle.
    pub triangle: u32,
}

/// A deferred child with its clamped parametric range.
#[derive(Clone, Copy)]
struct Visit {
    node: u32,
    t_min: f32,
    t_max: f32,
}

impl KdTree {
    /// Nearest hit along `ray`, or `None`.
    ///
    /// The origin is shifted by `ray_range_bias * dir` on entry to dodge
    /// self-intersection; hits are accepted in `(t_min - bias, t_max + bias)`
    /// of the node range so grazing hits at leaf boundaries are not lost.
    pub fn nearest_hit(
        &self,
        mut ray: Ray,
        triangles: &[Triangle],
        vertices: &[Vertex],
    ) -> Option<Hit> {
        ray.origin += ray.dir * self.ray_range_bias;
        if ray.t_max < ray.t_min {
            return None;
        }

        let mut todo: SmallVec<[Visit; 64]> = SmallVec::new();
        todo.push(Visit { node: 0, t_min: ray.t_min, t_max: ray.t_max });

        while let Some(visit) = todo.pop() {
            if visit.t_max < visit.t_min {
                continue;
            }
            let mut index = visit.node;
            let t_min = visit.t_min;
            let mut t_max = visit.t_max;

            loop {
                let node = self.nodes[index as usize];
                if node.is_leaf() {
                    if let Some(hit) = self.leaf_nearest(&node, &ray, t_min, t_max, triangles, vertices)
                    {
                        return Some(hit);
                    }
                    break;
                }

                let axis = node.split_axis();
                let split = node.split_pos();
                let below_first = ray.origin[axis] < split
                    || (ray.origin[axis] == split && ray.dir[axis] <= 0.0);
                let (near, far) = if below_first {
                    (index + 1, node.above_child())
                } else {
                    (node.above_child(), index + 1)
                };

                let t_plane = (split - ray.origin[axis]) / ray.dir[axis];
                if t_plane > t_max || t_plane <= 0.0 {
                    index = near;
                } else if t_plane < t_min {
                    index = far;
                } else {
                    todo.push(Visit { node: far, t_min: t_plane, t_max });
                    index = near;
                    t_max = t_plane;
                }
            }
        }
        None
    }

    /// Whether anything blocks `ray` before `t_light`.
    ///
    /// Accepts blockers in `(ray.t_min + bias, t_light)`, so the surface
    /// the shadow ray starts on cannot occlude itself.
    pub fn occluded(
        &self,
        mut ray: Ray,
        t_light: f32,
        triangles: &[Triangle],
        vertices: &[Vertex],
    ) -> bool {
        ray.origin += ray.dir * self.ray_range_bias;
        if ray.t_max < ray.t_min {
            return false;
        }

        let mut todo: SmallVec<[Visit; 64]> = SmallVec::new();
        todo.push(Visit { node: 0, t_min: ray.t_min, t_max: ray.t_max });

        while let Some(visit) = todo.pop() {
            if visit.t_max < visit.t_min {
                continue;
            }
            let mut index = visit.node;
            let t_min = visit.t_min;
            let mut t_max = visit.t_max;

            loop {
                let node = self.nodes[index as usize];
                if node.is_leaf() {
                    if self.leaf_blocks(&node, &ray, ray.t_min, t_light, triangles, vertices) {
                        return true;
                    }
                    break;
                }

                let axis = node.split_axis();
                let split = node.split_pos();
                let below_first = ray.origin[axis] < split
                    || (ray.origin[axis] == split && ray.dir[axis] <= 0.0);
                let (near, far) = if below_first {
                    (index + 1, node.above_child())
                } else {
                    (node.above_child(), index + 1)
                };

                let t_plane = (split - ray.origin[axis]) / ray.dir[axis];
                if t_plane > t_max || t_plane <= 0.0 {
                    index = near;
                } else if t_plane < t_min {
                    index = far;
                } else {
                    todo.push(Visit { node: far, t_min: t_plane, t_max });
                    index = near;
                    t_max = t_plane;
                }
            }
        }
        false
    }

    fn leaf_nearest(
        &self,
        node: &super::KdNode,
        ray: &Ray,
        t_min: f32,
        t_max: f32,
        triangles: &[Triangle],
        vertices: &[Vertex],
    ) -> Option<Hit> {
        let first = node.first_element_offset() as usize;
        let count = node.triangle_count() as usize;

        let mut t_nearest = t_max + self.ray_range_bias;
        let mut nearest: Option<(f32, f32, u32)> = None; // (u, v, triangle)

        for &tri_index in &self.leaf_elements[first..first + count] {
            let tri = &triangles[tri_index as usize];
            let [a, b, c] = tri.corners(vertices);
            let Some((t, u, v)) =
                intersect_ray_triangle(ray.origin, ray.dir, a.position, b.position, c.position)
            else {
                continue;
            };
            if t_min - self.ray_range_bias < t && t < t_nearest {
                t_nearest = t;
                nearest = Some((u, v, tri_index));
            }
        }

        let (u, v, tri_index) = nearest?;
        let tri = &triangles[tri_index as usize];
        let [a, b, c] = tri.corners(vertices);
        let normal =
            (a.normal + u * (b.normal - a.normal) + v * (c.normal - a.normal)).normalize();
        Some(Hit { t: t_nearest, normal, triangle: tri_index })
    }

    fn leaf_blocks(
        &self,
        node: &super::KdNode,
        ray: &Ray,
        t_min: f32,
        t_light: f32,
        triangles: &[Triangle],
        vertices: &[Vertex],
    ) -> bool {
        let first = node.first_element_offset() as usize;
        let count = node.triangle_count() as usize;

        for &tri_index in &self.leaf_elements[first..first + count] {
            let tri = &triangles[tri_index as usize];
            let [a, b, c] = tri.corners(vertices);
            if let Some((t, _, _)) =
                intersect_ray_triangle(ray.origin, ray.dir, a.position, b.position, c.position)
            {
                if t_min + self.ray_range_bias < t && t < t_light {
                    return true;
                }
            }
        }
        false
    }
}
