//! Scene data: geometry, materials and the emissive-power distribution.
//!
//! Everything here is built once before rendering and then shared read-only
//! across the worker threads.

pub mod config;
pub mod material;
pub mod mesh;
pub mod obj;

pub use material::Material;
pub use mesh::{Triangle, Vertex};

/// One light pick from the inverse-CDF distribution.
#[derive(Clone, Copy, Debug)]
pub struct LightPick {
    /// Index into the scene's triangle array.
    pub triangle: u32,
    /// Discrete probability of this pick (`power / total power`).
    pub probability: f32,
}

/// Distribution over the emissive triangles, sampled by inverse CDF on
/// per-triangle radiant power `avg(ke) * area`.
#[derive(Clone, Debug, Default)]
pub struct LightDistribution {
    indices: Vec<u32>,
    powers_cdf: Vec<f32>,
    powers_combined: f32,
}

impl LightDistribution {
    pub fn build(
        triangles: &[Triangle],
        vertices: &[Vertex],
        materials: &[Material],
        triangle_materials: &[u32],
    ) -> Self {
        let mut indices = Vec::new();
        let mut powers_cdf = Vec::new();
        let mut running = 0.0f32;
        for (i, tri) in triangles.iter().enumerate() {
            let mat = &materials[triangle_materials[i] as usize];
            if !mat.is_emissive() {
                continue;
            }
            running += mat.mean_emission() * tri.area(vertices);
            indices.push(i as u32);
            powers_cdf.push(running);
        }
        Self { indices, powers_cdf, powers_combined: running }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn total_power(&self) -> f32 {
        self.powers_combined
    }

    /// Probability of the light at `ordinal` position in the set.
    pub fn pdf(&self, ordinal: usize) -> f32 {
        let prev = if ordinal == 0 { 0.0 } else { self.powers_cdf[ordinal - 1] };
        (self.powers_cdf[ordinal] - prev) / self.powers_combined
    }

    /// Pick a light by inverse CDF from a uniform `u` in `[0, 1)`.
    pub fn sample(&self, u: f32) -> Option<LightPick> {
        if self.indices.is_empty() || self.powers_combined <= 0.0 {
            return None;
        }
        let target = u * self.powers_combined;
        let ordinal = self
            .powers_cdf
            .partition_point(|&c| c <= target)
            .min(self.indices.len() - 1);
        Some(LightPick { triangle: self.indices[ordinal], probability: self.pdf(ordinal) })
    }
}

/// Immutable scene: vertex/triangle/material arrays plus the light set.
#[derive(Clone, Debug)]
pub struct Scene {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
    pub materials: Vec<Material>,
    /// `triangle_materials[i]` is the material of `triangles[i]`.
    pub triangle_materials: Vec<u32>,
    lights: LightDistribution,
}

impl Scene {
    pub fn new(
        vertices: Vec<Vertex>,
        triangles: Vec<Triangle>,
        materials: Vec<Material>,
        triangle_materials: Vec<u32>,
    ) -> Self {
        assert_eq!(triangles.len(), triangle_materials.len());
        let lights = LightDistribution::build(&triangles, &vertices, &materials, &triangle_materials);
        Self { vertices, triangles, materials, triangle_materials, lights }
    }

    #[inline]
    pub fn material_of(&self, triangle: u32) -> &Material {
        &self.materials[self.triangle_materials[triangle as usize] as usize]
    }

    #[inline]
    pub fn lights(&self) -> &LightDistribution {
        &self.lights
    }
}
