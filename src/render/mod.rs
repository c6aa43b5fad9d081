//! Rendering: reflectance models, samplers, camera, the path estimator and
//! the multithreaded pixel pipeline.

pub mod brdf;
pub mod camera;
pub mod image;
pub mod integrator;
pub mod renderer;
pub mod sampler;

pub use camera::Camera;
pub use image::Framebuffer;
pub use integrator::PathIntegrator;
pub use renderer::{render, RenderOptions, DEBUG_SEED};
pub use sampler::HemisphereSampler;
