//! Mesh building blocks: vertices and indexed triangles.

use crate::util::math::{Aabb, Vec3};

/// Position and unit normal. Immutable after load.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
}

/// Three indices into the scene's vertex array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Triangle {
    pub indices: [u32; 3],
}

impl Triangle {
    #[inline]
    pub fn new(a: u32, b: u32, c: u32) -> Self {
        Self { indices: [a, b, c] }
    }

    /// The three corner vertices.
    #[inline]
    pub fn corners<'a>(&self, vertices: &'a [Vertex]) -> [&'a Vertex; 3] {
        [
            &vertices[self.indices[0] as usize],
            &vertices[self.indices[1] as usize],
            &vertices[self.indices[2] as usize],
        ]
    }

    pub fn area(&self, vertices: &[Vertex]) -> f32 {
        let [a, b, c] = self.corners(vertices);
        (b.position - a.position).cross(c.position - a.position).length() * 0.5
    }

    pub fn centroid(&self, vertices: &[Vertex]) -> Vec3 {
        let [a, b, c] = self.corners(vertices);
        (a.position + b.position + c.position) / 3.0
    }

    pub fn bounds(&self, vertices: &[Vertex]) -> Aabb {
        let [a, b, c] = self.corners(vertices);
        Aabb::from_points(a.position, b.position, c.position)
    }
}
