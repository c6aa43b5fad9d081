//! Hemisphere samplers.
//!
//! A sampler draws a unit direction in the upper hemisphere of the
//! canonical frame (`+y` up) together with the probability density of that
//! draw. [`align_to_normal`] rotates such a sample into the frame of an
//! actual surface normal via the shortest arc. The Beckmann variant shapes
//! its lobe from the material's roughness; the others ignore the material.

use std::f32::consts::{FRAC_1_PI, PI, TAU};

use rand::rngs::StdRng;
use rand::Rng;

use crate::scene::Material;
use crate::util::math::{Quat, Vec3};

/// Draws `(direction, pdf)` pairs over the canonical upper hemisphere.
pub trait HemisphereSampler {
    fn sample(&self, mat: &Material, rng: &mut StdRng) -> (Vec3, f32);
    fn pdf(&self, mat: &Material, v: Vec3) -> f32;
}

/// Rotate a canonical-frame sample so that `+y` maps onto `n`.
#[inline]
pub fn align_to_normal(v: Vec3, n: Vec3) -> Vec3 {
    Quat::from_rotation_arc(Vec3::Y, n) * v
}

/// Cosine-weighted: `pdf = cos(theta) / pi`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CosineSampler;

impl HemisphereSampler for CosineSampler {
    fn sample(&self, mat: &Material, rng: &mut StdRng) -> (Vec3, f32) {
        let u1: f32 = rng.gen();
        let u2: f32 = rng.gen();
        let phi = TAU * u1;
        let r = (1.0 - u2).sqrt();
        let v = Vec3::new(phi.cos() * r, u2.sqrt(), phi.sin() * r);
        (v, self.pdf(mat, v))
    }

    fn pdf(&self, _mat: &Material, v: Vec3) -> f32 {
        v.y * FRAC_1_PI
    }
}

/// Beckmann-lobe sampler shaped by the material roughness.
#[derive(Clone, Copy, Debug, Default)]
pub struct BeckmannSampler;

impl HemisphereSampler for BeckmannSampler {
    fn sample(&self, mat: &Material, rng: &mut StdRng) -> (Vec3, f32) {
        let sq_roughness = mat.roughness * mat.roughness;
        let u1: f32 = rng.gen();
        let u2: f32 = rng.gen();
        let theta = (-sq_roughness * (1.0 - u1).ln()).sqrt().atan();
        let phi = TAU * u2;
        let (sin_t, cos_t) = theta.sin_cos();
        let v = Vec3::new(sin_t * phi.cos(), cos_t, sin_t * phi.sin());
        (v, self.pdf(mat, v))
    }

    fn pdf(&self, mat: &Material, v: Vec3) -> f32 {
        let sq_roughness = mat.roughness * mat.roughness;
        let theta = v.y.clamp(-1.0, 1.0).acos();
        theta.sin() * (-(theta.tan().powi(2)) / sq_roughness).exp()
            / (PI * sq_roughness * theta.cos().powi(3))
    }
}

/// Uniform over the hemisphere: `pdf = 1 / 2pi`.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformSampler;

impl HemisphereSampler for UniformSampler {
    fn sample(&self, mat: &Material, rng: &mut StdRng) -> (Vec3, f32) {
        let u1: f32 = rng.gen();
        let u2: f32 = rng.gen();
        let phi = TAU * u1;
        let r = (1.0 - u2 * u2).sqrt();
        let v = Vec3::new(phi.cos() * r, u2, phi.sin() * r);
        (v, self.pdf(mat, v))
    }

    fn pdf(&self, _mat: &Material, _v: Vec3) -> f32 {
        1.0 / TAU
    }
}

/// Runtime-selected sampler, for callers that pick the variant from
/// configuration. Hot paths monomorphise over the concrete types instead.
#[derive(Clone, Copy, Debug)]
pub enum AnySampler {
    Cosine(CosineSampler),
    Beckmann(BeckmannSampler),
    Uniform(UniformSampler),
}

impl HemisphereSampler for AnySampler {
    fn sample(&self, mat: &Material, rng: &mut StdRng) -> (Vec3, f32) {
        match self {
            Self::Cosine(s) => s.sample(mat, rng),
            Self::Beckmann(s) => s.sample(mat, rng),
            Self::Uniform(s) => s.sample(mat, rng),
        }
    }

    fn pdf(&self, mat: &Material, v: Vec3) -> f32 {
        match self {
            Self::Cosine(s) => s.pdf(mat, v),
            Self::Beckmann(s) => s.pdf(mat, v),
            Self::Uniform(s) => s.pdf(mat, v),
        }
    }
}

impl std::str::FromStr for AnySampler {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cosine" => Ok(Self::Cosine(CosineSampler)),
            "beckmann" => Ok(Self::Beckmann(BeckmannSampler)),
            "uniform" => Ok(Self::Uniform(UniformSampler)),
            other => Err(format!("unknown sampler `{other}`")),
        }
    }
}
