//! The per-ray radiance estimator.
//!
//! One estimate per primary ray: explicit next-event connection to a
//! CDF-sampled emissive triangle, plus a single Russian-roulette indirect
//! bounce drawn from the hemisphere sampler. Emitted radiance is returned
//! only on the primary bounce; deeper hits of a light contribute through
//! next-event sampling alone, so nothing is counted twice.

use std::f32::consts::FRAC_1_PI;

use rand::rngs::StdRng;
use rand::Rng;

use crate::kdtree::KdTree;
use crate::render::sampler::{align_to_normal, HemisphereSampler};
use crate::scene::{Material, Scene};
use crate::util::math::{Ray, Vec3};

/// Probabilities below this are treated as zero: the term is skipped and
/// never divided by.
pub const MIN_PROBABILITY: f32 = 0.01;

/// Squared-distance floor for light connections.
const MIN_LIGHT_DIST_SQ: f32 = 1e-6;

pub struct PathIntegrator<'a, B, S> {
    scene: &'a Scene,
    tree: &'a KdTree,
    brdf: B,
    sampler: S,
    rec_lvl: u32,
}

impl<'a, B, S> PathIntegrator<'a, B, S>
where
    B: Fn(Vec3, Vec3, Vec3, &Material) -> Vec3,
    S: HemisphereSampler,
{
    pub fn new(scene: &'a Scene, tree: &'a KdTree, brdf: B, sampler: S, rec_lvl: u32) -> Self {
        Self { scene, tree, brdf, sampler, rec_lvl }
    }

    /// Radiance estimate for one primary ray.
    pub fn radiance(&self, ray: Ray, rng: &mut StdRng) -> Vec3 {
        self.estimate(ray, self.rec_lvl, rng)
    }

    fn estimate(&self, ray: Ray, depth: u32, rng: &mut StdRng) -> Vec3 {
        if depth == 0 {
            return Vec3::ZERO;
        }
        let Some(hit) = self.tree.nearest_hit(ray, &self.scene.triangles, &self.scene.vertices)
        else {
            return Vec3::ZERO;
        };
        let mat = self.scene.material_of(hit.triangle);

        // Without any emitter the scene renders as flat diffuse color.
        if self.scene.lights().is_empty() {
            return mat.kd;
        }

        if mat.is_emissive() {
            // Only the primary bounce reports emission; indirect paths pick
            // it up via the next-event term below.
            return if depth == self.rec_lvl { mat.ke * FRAC_1_PI } else { Vec3::ZERO };
        }

        let point = ray.at(hit.t);
        let normal = hit.normal;
        let w_out = -ray.dir;

        let mut color = self.next_event(point, normal, w_out, mat, rng);

        let alpha = (mat.mean_reflectance()).clamp(0.0, 1.0);
        if alpha > 0.0 && rng.gen::<f32>() <= alpha {
            let (sample, prob) = self.sampler.sample(mat, rng);
            if prob >= MIN_PROBABILITY {
                let dir = align_to_normal(sample, normal);
                let bounce = self.estimate(Ray::new(point, dir), depth - 1, rng);
                color += (self.brdf)(dir, w_out, normal, mat)
                    * bounce
                    * normal.dot(dir).abs()
                    / (prob * alpha);
            }
        }
        color
    }

    /// Next-event estimation: connect the shading point to one light
    /// sampled from the emissive-power CDF.
    fn next_event(
        &self,
        point: Vec3,
        normal: Vec3,
        w_out: Vec3,
        mat: &Material,
        rng: &mut StdRng,
    ) -> Vec3 {
        let Some(pick) = self.scene.lights().sample(rng.gen()) else {
            return Vec3::ZERO;
        };
        if pick.probability < MIN_PROBABILITY {
            return Vec3::ZERO;
        }

        let tri = &self.scene.triangles[pick.triangle as usize];
        let [a, b, c] = tri.corners(&self.scene.vertices);

        // Known limitation: barycentric (alpha, 1 - alpha) from a single
        // uniform draw is not area-uniform. Both coordinates move together,
        // so sampled points lie on a segment of the triangle rather than
        // covering it. See DESIGN.md.
        let alpha: f32 = rng.gen();
        let (u, v) = (alpha, 1.0 - alpha);
        let light_point =
            a.position + u * (b.position - a.position) + v * (c.position - a.position);
        let light_normal =
            (a.normal + u * (b.normal - a.normal) + v * (c.normal - a.normal)).normalize();

        let to_light = light_point - point;
        let dist_sq = to_light.length_squared();
        if dist_sq < MIN_LIGHT_DIST_SQ {
            return Vec3::ZERO;
        }
        let dist = dist_sq.sqrt();
        let w_light = to_light / dist;

        // The occlusion query shifts its origin toward the light by the
        // range bias, which would land the endpoint on the light triangle
        // itself; stopping two biases short keeps the light from counting
        // as its own blocker.
        let t_light = dist - 2.0 * self.tree.ray_range_bias();
        if t_light <= 0.0 {
            return Vec3::ZERO;
        }
        if self.tree.occluded(
            Ray::new(point, w_light),
            t_light,
            &self.scene.triangles,
            &self.scene.vertices,
        ) {
            return Vec3::ZERO;
        }

        let light_mat = self.scene.material_of(pick.triangle);
        let area = tri.area(&self.scene.vertices);
        light_mat.ke
            * area
            * (self.brdf)(w_light, w_out, normal, mat)
            * normal.dot(w_light).abs()
            * light_normal.dot(-w_light).abs()
            / pick.probability
            / dist_sq
    }
}
