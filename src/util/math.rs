//! Math type re-exports and geometry primitives.
//!
//! This module re-exports the `glam` types used throughout the tracer and
//! provides the value types shared by the scene, the kd-tree and the
//! renderer: axis-aligned boxes, parametric rays and the ray/triangle
//! intersection routine.

// Re-export glam types
pub use glam::{Quat, Vec2, Vec3};

use std::fmt;

/// Determinant threshold below which a ray counts as parallel to a triangle.
const DET_EPSILON: f32 = 1e-6;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Empty box (inverted, will expand on first point).
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box around three points.
    #[inline]
    pub fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { min: a.min(b).min(c), max: a.max(b).max(c) }
    }

    /// Expand to include a point.
    #[inline]
    pub fn expand_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Expand to include another box.
    #[inline]
    pub fn expand(&mut self, other: &Self) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Componentwise union of two boxes.
    #[inline]
    pub fn union(mut self, other: &Self) -> Self {
        self.expand(other);
        self
    }

    /// Extent along one axis, clamped to zero for inverted boxes.
    #[inline]
    pub fn length(&self, axis: usize) -> f32 {
        (self.max[axis] - self.min[axis]).max(0.0)
    }

    /// Surface area: `2 * (xy + yz + zx)`.
    #[inline]
    pub fn surface_area(&self) -> f32 {
        let (x, y, z) = (self.length(0), self.length(1), self.length(2));
        2.0 * (x * y + y * z + z * x)
    }

    /// Length of the main diagonal.
    #[inline]
    pub fn diagonal(&self) -> f32 {
        (self.max - self.min).max(Vec3::ZERO).length()
    }

    #[inline]
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Whether this box and `other` share any point (boundaries included).
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Whether `other` lies entirely inside this box.
    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.min.z <= other.min.z
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
            && self.max.z >= other.max.z
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aabb({:?} - {:?})", self.min, self.max)
    }
}

/// Ray with a parametric range. Cheap to copy and to clamp.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
    pub t_min: f32,
    pub t_max: f32,
}

impl Ray {
    /// Ray over the default range `[0, inf)`. `dir` must be unit length.
    #[inline]
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir, t_min: 0.0, t_max: f32::MAX }
    }

    #[inline]
    pub fn with_range(origin: Vec3, dir: Vec3, t_min: f32, t_max: f32) -> Self {
        Self { origin, dir, t_min, t_max }
    }

    /// Point at parameter `t`.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }
}

/// Möller-Trumbore ray/triangle intersection, non-culling.
///
/// Returns the ray parameter and the barycentric coordinates `(t, u, v)`
/// of the hit, or `None` when the ray is parallel to the triangle plane
/// (`|det| < 1e-6`) or the hit lies outside the triangle.
pub fn intersect_ray_triangle(
    origin: Vec3,
    dir: Vec3,
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
) -> Option<(f32, f32, f32)> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let p = dir.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < DET_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - v0;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = dir.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    Some((edge2.dot(q) * inv_det, u, v))
}

/// Mirror `v` about the plane with normal `n` (`n` unit length).
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(min: [f32; 3], max: [f32; 3]) -> Aabb {
        Aabb::new(Vec3::from(min), Vec3::from(max))
    }

    #[test]
    fn test_union_contains_operands() {
        let a = boxed([-1.0, 0.0, 0.0], [1.0, 2.0, 3.0]);
        let b = boxed([0.5, -4.0, 1.0], [0.6, 0.0, 9.0]);
        let u = a.union(&b);
        assert!(u.contains(&a));
        assert!(u.contains(&b));
    }

    #[test]
    fn test_union_associative() {
        let a = boxed([-1.0, 0.0, 0.0], [1.0, 2.0, 3.0]);
        let b = boxed([0.5, -4.0, 1.0], [0.6, 0.0, 9.0]);
        let c = boxed([-7.0, 2.0, -3.0], [8.0, 2.5, -2.0]);
        assert_eq!(a.union(&b).union(&c), a.union(&b.union(&c)));
    }

    #[test]
    fn test_surface_area() {
        let b = boxed([0.0, 0.0, 0.0], [2.0, 3.0, 4.0]);
        assert_eq!(b.surface_area(), 2.0 * (6.0 + 12.0 + 8.0));
        // degenerate axes clamp to zero
        assert_eq!(Aabb::EMPTY.surface_area(), 0.0);
    }

    #[test]
    fn test_intersect_known_values() {
        let (t, u, v) = intersect_ray_triangle(
            Vec3::new(0.25, 0.25, 1.0),
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
        )
        .expect("ray hits the triangle");
        assert!((t - 1.0).abs() < 1e-6);
        assert!((u - 0.25).abs() < 1e-6);
        assert!((v - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_intersect_parallel_ray_misses() {
        // ray in the triangle plane
        let hit = intersect_ray_triangle(
            Vec3::new(-1.0, 0.25, 0.0),
            Vec3::X,
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_intersect_outside_barycentric_range() {
        let hit = intersect_ray_triangle(
            Vec3::new(0.8, 0.8, 1.0), // u + v > 1
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_reflect() {
        let r = reflect(Vec3::new(1.0, -1.0, 0.0).normalize(), Vec3::Y);
        let expected = Vec3::new(1.0, 1.0, 0.0).normalize();
        assert!((r - expected).length() < 1e-6);
    }
}
