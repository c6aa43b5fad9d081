//! Pinhole camera.

use crate::scene::config::RenderConfig;
use crate::util::math::{Ray, Vec3};

/// Primary-ray generator. The basis is derived once: `right` is forced
/// perpendicular to `front` via the up hint, `up` is re-orthogonalised from
/// the two, and both carry the view extents (`y_view` vertically, scaled by
/// the aspect ratio horizontally).
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    view_point: Vec3,
    front: Vec3,
    right: Vec3,
    up: Vec3,
    width: u32,
    height: u32,
}

impl Camera {
    pub fn new(config: &RenderConfig) -> Self {
        Self::from_parameters(
            config.view_point,
            config.look_at,
            config.up,
            config.y_view,
            config.width,
            config.height,
        )
    }

    pub fn from_parameters(
        view_point: Vec3,
        look_at: Vec3,
        up_hint: Vec3,
        y_view: f32,
        width: u32,
        height: u32,
    ) -> Self {
        let front = (look_at - view_point).normalize();
        let right_dir = front.cross(up_hint.normalize()).normalize();
        let up = right_dir.cross(front).normalize() * (y_view / 2.0);
        let right = right_dir * (width as f32 / height as f32 * y_view / 2.0);
        Self { view_point, front, right, up, width, height }
    }

    /// Primary ray through pixel `(px, py)`, `py` growing downward.
    pub fn primary_ray(&self, px: u32, py: u32) -> Ray {
        let sx = px as f32 * 2.0 / (self.width - 1) as f32 - 1.0;
        let sy = py as f32 * 2.0 / (self.height - 1) as f32 - 1.0;
        let dir = (self.front - self.up * sy + self.right * sx).normalize();
        Ray::new(self.view_point, dir)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }
}
