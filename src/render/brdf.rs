//! Bidirectional reflectance models.
//!
//! All directions are unit length and expressed in world space relative to
//! the shading normal `n`; `incoming` points toward the sampled/light
//! direction, `outgoing` toward the viewer. Nothing here normalises its
//! inputs. The returned values are densities and may exceed one.

use std::f32::consts::{FRAC_1_PI, PI};

use crate::scene::Material;
use crate::util::math::{reflect, Vec3};

/// Cook-Torrance microfacet model over a diffuse base:
/// `kd/pi + ks * F * D * G / (pi * cos(theta_i) * cos(theta_o))`.
pub fn cook_torrance(incoming: Vec3, outgoing: Vec3, n: Vec3, mat: &Material) -> Vec3 {
    let half = (incoming + outgoing).normalize();
    let cos_i = n.dot(incoming);
    let cos_o = n.dot(outgoing);
    let cos_beta = half.dot(outgoing);
    let theta_h = n.dot(half).clamp(-1.0, 1.0).acos();

    mat.kd * FRAC_1_PI
        + mat.ks
            * (fresnel(cos_beta, mat.ni)
                * beckmann_distribution(theta_h, mat.roughness)
                * geometry_term(theta_h, cos_i, cos_o, cos_beta)
                / (PI * cos_i * cos_o))
}

/// Modified Phong: `kd/pi + ks * (ns + 2) * max(0, out . reflect(-in, n))^ns / 2pi`.
pub fn phong_modified(incoming: Vec3, outgoing: Vec3, n: Vec3, mat: &Material) -> Vec3 {
    let lobe = reflect(-incoming, n).dot(outgoing).max(0.0);
    mat.kd * FRAC_1_PI + mat.ks * ((mat.ns + 2.0) * lobe.powf(mat.ns) / (2.0 * PI))
}

/// Beckmann microfacet distribution.
pub fn beckmann_distribution(theta_h: f32, roughness: f32) -> f32 {
    let sq_roughness = roughness * roughness;
    (-(theta_h.tan() / roughness).powi(2)).exp()
        / (sq_roughness * theta_h.cos().powi(4))
}

/// Geometric masking and shadowing:
/// `min(1, 2 cos(theta_h) cos(theta_i) / cos(beta), 2 cos(theta_h) cos(theta_o) / cos(beta))`.
pub fn geometry_term(theta_h: f32, cos_i: f32, cos_o: f32, cos_beta: f32) -> f32 {
    let k = 2.0 * theta_h.cos() / cos_beta;
    (k * cos_i).min(k * cos_o).min(1.0)
}

/// Schlick Fresnel with `F0` from the refraction index.
pub fn fresnel(cos_beta: f32, refr_index: f32) -> f32 {
    let f0 = ((1.0 - refr_index) / (1.0 + refr_index)).powi(2);
    f0 + (1.0 - f0) * (1.0 - cos_beta).powi(5)
}
