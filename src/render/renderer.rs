//! Multithreaded pixel pipeline.
//!
//! Flat pixel indices are shuffled once and dealt round-robin into one
//! queue per worker, which spreads expensive image regions evenly. Each
//! worker owns its queue, its RNG and a cache-line-padded progress counter;
//! the coordinator thread polls the counter sum about once a second for the
//! progress display. The pixel grid is written through a shared cell with
//! disjoint indices, one writer per pixel.

use std::cell::UnsafeCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{error, info};

use crate::kdtree::KdTree;
use crate::render::camera::Camera;
use crate::render::image::Framebuffer;
use crate::render::integrator::PathIntegrator;
use crate::render::sampler::HemisphereSampler;
use crate::scene::{Material, Scene};
use crate::util::math::Vec3;

/// Seed used for reproducible debug renders.
pub const DEBUG_SEED: u64 = 42;

#[derive(Clone, Copy, Debug)]
pub struct RenderOptions {
    pub samples_per_pixel: u32,
    /// Worker count; `0` means one per logical core.
    pub threads: usize,
    /// Base seed for the pixel shuffle and the per-pixel RNG streams.
    /// `None` draws one from system entropy.
    pub seed: Option<u64>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { samples_per_pixel: 64, threads: 0, seed: None }
    }
}

/// Single-writer progress counter, padded so neighbouring workers' counters
/// never share a cache line.
#[repr(align(64))]
struct CacheAlignedCounter(AtomicU32);

/// Shared pixel storage with externally guaranteed disjoint writes.
struct PixelGrid {
    cells: UnsafeCell<Vec<Vec3>>,
}

// SAFETY: every flat pixel index is dealt to exactly one worker queue, so
// no two threads ever write the same element, and the grid is only read
// after all workers have been joined.
unsafe impl Sync for PixelGrid {}

impl PixelGrid {
    fn new(len: usize) -> Self {
        Self { cells: UnsafeCell::new(vec![Vec3::ZERO; len]) }
    }

    /// SAFETY: the caller must be the only writer of `index`.
    unsafe fn write(&self, index: usize, value: Vec3) {
        (&mut (*self.cells.get()))[index] = value;
    }

    fn into_pixels(self) -> Vec<Vec3> {
        self.cells.into_inner()
    }
}

/// Render the full frame and return the linear pixel grid.
pub fn render<B, S>(
    scene: &Scene,
    tree: &KdTree,
    camera: &Camera,
    brdf: B,
    sampler: S,
    rec_lvl: u32,
    opts: &RenderOptions,
) -> Framebuffer
where
    B: Fn(Vec3, Vec3, Vec3, &Material) -> Vec3 + Sync,
    S: HemisphereSampler + Sync,
{
    let width = camera.width();
    let height = camera.height();
    let total = (width as usize) * (height as usize);
    let threads = resolve_threads(opts.threads);
    let seed = opts.seed.unwrap_or_else(|| rand::thread_rng().gen());

    // Shuffle the flat pixel indices, then deal them round-robin.
    let mut coords: Vec<u32> = (0..total as u32).collect();
    coords.shuffle(&mut StdRng::seed_from_u64(seed));
    let mut queues: Vec<Vec<u32>> =
        (0..threads).map(|_| Vec::with_capacity(total / threads + 1)).collect();
    for (i, &p) in coords.iter().enumerate() {
        queues[i % threads].push(p);
    }

    let grid = PixelGrid::new(total);
    let counters: Vec<CacheAlignedCounter> =
        (0..threads).map(|_| CacheAlignedCounter(AtomicU32::new(0))).collect();
    let latest_end: Mutex<Option<Instant>> = Mutex::new(None);
    let begin = Instant::now();

    let integrator = PathIntegrator::new(scene, tree, brdf, sampler, rec_lvl);
    info!(threads, samples = opts.samples_per_pixel, width, height, "rendering");

    std::thread::scope(|scope| {
        for (worker, queue) in queues.iter().enumerate() {
            let grid = &grid;
            let counter = &counters[worker];
            let integrator = &integrator;
            let latest_end = &latest_end;
            scope.spawn(move || {
                for &p in queue {
                    let (px, py) = (p % width, p / width);
                    // Pixel-indexed streams keep the image independent of
                    // the worker count and the deal order.
                    let mut rng = StdRng::seed_from_u64(pixel_seed(seed, p));
                    let pixel = catch_unwind(AssertUnwindSafe(|| {
                        let mut acc = Vec3::ZERO;
                        for _ in 0..opts.samples_per_pixel {
                            acc += integrator.radiance(camera.primary_ray(px, py), &mut rng);
                        }
                        acc / opts.samples_per_pixel.max(1) as f32
                    }));
                    match pixel {
                        // SAFETY: `p` was dealt only to this worker's queue.
                        Ok(value) => unsafe { grid.write(p as usize, value) },
                        Err(_) => error!(pixel = p, "estimator panicked, pixel left black"),
                    }
                    counter.0.fetch_add(1, Ordering::Relaxed);
                }
                let end = Instant::now();
                let mut stamp = latest_end.lock();
                if stamp.map_or(true, |t| end > t) {
                    *stamp = Some(end);
                }
            });
        }

        // Coordinator: poll the counters at ~1 Hz for the display.
        loop {
            let done: u32 = counters.iter().map(|c| c.0.load(Ordering::Relaxed)).sum();
            eprint!("\r{:3}%", done as u64 * 100 / total.max(1) as u64);
            if done as usize >= total {
                break;
            }
            std::thread::sleep(Duration::from_secs(1));
        }
        eprintln!();
    });

    let end = latest_end.lock().unwrap_or(begin);
    info!(elapsed_s = (end - begin).as_secs_f32(), "render finished");

    Framebuffer::from_pixels(width, height, grid.into_pixels())
}

/// Clamp the requested worker count to `[1, hardware_concurrency]`;
/// zero requests every logical core.
fn resolve_threads(requested: usize) -> usize {
    let hardware = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    if requested == 0 {
        hardware
    } else {
        requested.clamp(1, hardware)
    }
}

/// Mix a pixel index into the render seed (splitmix-style multiply).
fn pixel_seed(seed: u64, pixel: u32) -> u64 {
    seed ^ (pixel as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_threads() {
        let hardware = std::thread::available_parallelism().unwrap().get();
        assert_eq!(resolve_threads(0), hardware);
        assert_eq!(resolve_threads(1), 1);
        assert!(resolve_threads(usize::MAX) <= hardware);
    }

    #[test]
    fn test_pixel_seeds_are_distinct() {
        let a = pixel_seed(7, 0);
        let b = pixel_seed(7, 1);
        let c = pixel_seed(8, 0);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_counter_alignment() {
        assert!(std::mem::align_of::<CacheAlignedCounter>() >= 64);
    }
}
