//! Surface materials in the classic OBJ/MTL parameterisation.

use crate::util::math::Vec3;

/// Immutable material record.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    /// Specular (Phong) exponent
    pub ns: f32,
    /// Index of refraction
    pub ni: f32,
    /// Ambient color
    pub ka: Vec3,
    /// Diffuse color
    pub kd: Vec3,
    /// Specular color
    pub ks: Vec3,
    /// Emissive color
    pub ke: Vec3,
    /// Beckmann roughness, inferred from `ns` unless set explicitly
    pub roughness: f32,
}

impl Material {
    pub fn new(name: impl Into<String>, ns: f32, ni: f32, ka: Vec3, kd: Vec3, ks: Vec3, ke: Vec3) -> Self {
        Self {
            name: name.into(),
            ns,
            ni,
            ka,
            kd,
            ks,
            ke,
            roughness: Self::roughness_from_exponent(ns),
        }
    }

    /// Beckmann width corresponding to a Phong exponent.
    #[inline]
    pub fn roughness_from_exponent(ns: f32) -> f32 {
        (2.0 / (ns.max(0.0) + 2.0)).sqrt()
    }

    #[inline]
    pub fn is_emissive(&self) -> bool {
        self.ke.max_element() > 0.0
    }

    /// Channel mean of `ke`, the per-area emissive power scale.
    #[inline]
    pub fn mean_emission(&self) -> f32 {
        (self.ke.x + self.ke.y + self.ke.z) / 3.0
    }

    /// Channel mean of `kd + ks`, the Russian-roulette survival weight.
    #[inline]
    pub fn mean_reflectance(&self) -> f32 {
        let r = self.kd + self.ks;
        (r.x + r.y + r.z) / 3.0
    }
}

impl Default for Material {
    /// Neutral grey used for faces without a material statement.
    fn default() -> Self {
        Self::new("default", 10.0, 1.5, Vec3::ZERO, Vec3::splat(0.8), Vec3::ZERO, Vec3::ZERO)
    }
}
