//! Linear framebuffer and OpenEXR output.

use std::path::Path;

use half::f16;

use crate::util::math::Vec3;
use crate::util::Result;

/// 2-D grid of linear RGB accumulators. Not tone-mapped.
#[derive(Clone, Debug)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<Vec3>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, pixels: vec![Vec3::ZERO; (width * height) as usize] }
    }

    pub(crate) fn from_pixels(width: u32, height: u32, pixels: Vec<Vec3>) -> Self {
        assert_eq!(pixels.len(), (width * height) as usize);
        Self { width, height, pixels }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Vec3 {
        self.pixels[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn pixels(&self) -> &[Vec3] {
        &self.pixels
    }

    /// Write the grid as scanline OpenEXR with half-float `R`, `G`, `B`
    /// channels.
    pub fn write_exr(&self, path: &Path) -> Result<()> {
        use exr::prelude::{Image, SpecificChannels, WritableImage};

        let width = self.width as usize;
        let channels = SpecificChannels::rgb(|pos: exr::math::Vec2<usize>| {
            let p = self.pixels[pos.y() * width + pos.x()];
            (f16::from_f32(p.x), f16::from_f32(p.y), f16::from_f32(p.z))
        });
        Image::from_channels((width, self.height as usize), channels)
            .write()
            .to_file(path)?;
        Ok(())
    }
}
