//! # pathtrace
//!
//! Offline Monte Carlo path tracer for triangle meshes.
//!
//! The tracer builds a surface-area-heuristic kd-tree over the scene's
//! triangles and estimates radiance with a recursive path integrator using
//! next-event estimation over emissive triangles and Russian-roulette
//! termination. Rendering runs on a pool of worker threads that pull
//! shuffled pixel queues and write into a shared linear framebuffer, which
//! is finally stored as a half-float OpenEXR image.
//!
//! ## Modules
//!
//! - [`util`] - Errors, math re-exports, geometry primitives
//! - [`scene`] - Mesh/material import, task configuration, light sampling
//! - [`kdtree`] - Packed kd-tree: SAH build and ray queries
//! - [`render`] - BSDFs, samplers, camera, integrator, pixel pipeline
//!
//! ## Example
//!
//! ```ignore
//! use pathtrace::prelude::*;
//!
//! let config = RenderConfig::load("scene.rtc".as_ref())?;
//! let scene = load_scene(&config.resolve_mesh_path("scene.rtc".as_ref()))?;
//! let tree = KdTree::build(&scene.triangles, &scene.vertices,
//!                          BuildParams::for_triangle_count(scene.triangles.len()));
//! let camera = Camera::new(&config);
//! let frame = render(&scene, &tree, &camera, cook_torrance, CosineSampler,
//!                    config.recursion_level, &RenderOptions::default());
//! frame.write_exr(config.output_path.as_ref())?;
//! ```

pub mod util;
pub mod scene;
pub mod kdtree;
pub mod render;

// Re-export commonly used types
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::math::{Aabb, Ray, Vec3};
    pub use crate::util::{Error, Result};
    pub use crate::scene::config::RenderConfig;
    pub use crate::scene::obj::load_scene;
    pub use crate::scene::{Material, Scene, Triangle, Vertex};
    pub use crate::kdtree::{BuildParams, KdTree};
    pub use crate::render::brdf::{cook_torrance, phong_modified};
    pub use crate::render::camera::Camera;
    pub use crate::render::renderer::{render, RenderOptions};
    pub use crate::render::sampler::{AnySampler, BeckmannSampler, CosineSampler, UniformSampler};
}
