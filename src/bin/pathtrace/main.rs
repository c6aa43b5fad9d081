//! pathtrace CLI - renders a scene described by a task (.rtc) file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pathtrace::kdtree::{BuildParams, KdTree};
use pathtrace::render::brdf::{cook_torrance, phong_modified};
use pathtrace::render::renderer::{render, RenderOptions, DEBUG_SEED};
use pathtrace::render::sampler::{AnySampler, CosineSampler};
use pathtrace::render::Camera;
use pathtrace::scene::Material;
use pathtrace::util::math::Vec3;
use pathtrace::scene::config::RenderConfig;
use pathtrace::scene::obj::load_scene;

const USAGE: &str = "\
Usage: pathtrace <scene.rtc> [options]

Options:
  -n, --threads <N>   worker threads; 0 or -1 uses every logical core
      --samples <N>   samples per pixel (default 64)
      --brdf <NAME>   cook-torrance (default) or phong
      --sampler <NAME>
                      cosine (default), beckmann or uniform
  -v, --verbose       debug logging
  -h, --help          this text
      --version       version and build date";

struct Args {
    rtc_path: PathBuf,
    threads: i64,
    samples: u32,
    brdf: fn(Vec3, Vec3, Vec3, &Material) -> Vec3,
    sampler: AnySampler,
    verbose: bool,
}

fn main() -> std::process::ExitCode {
    match run() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let Some(args) = parse_args()? else {
        return Ok(());
    };

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = RenderConfig::load(&args.rtc_path)
        .with_context(|| format!("reading task file {}", args.rtc_path.display()))?;

    let mesh_path = config.resolve_mesh_path(&args.rtc_path);
    let scene = load_scene(&mesh_path)
        .with_context(|| format!("importing mesh {}", mesh_path.display()))?;

    info!("building acceleration structure");
    let tree = KdTree::build(
        &scene.triangles,
        &scene.vertices,
        BuildParams::for_triangle_count(scene.triangles.len()),
    );
    let stats = tree.stats();
    info!(
        interior = stats.interior,
        leaves = stats.leaves,
        depth = stats.depth,
        "acceleration structure ready"
    );

    let camera = Camera::new(&config);
    let opts = RenderOptions {
        samples_per_pixel: args.samples,
        threads: if args.threads <= 0 { 0 } else { args.threads as usize },
        // fixed seed in debug builds, entropy otherwise
        seed: if cfg!(debug_assertions) { Some(DEBUG_SEED) } else { None },
    };

    let frame = render(
        &scene,
        &tree,
        &camera,
        args.brdf,
        args.sampler,
        config.recursion_level,
        &opts,
    );

    frame
        .write_exr(Path::new(&config.output_path))
        .with_context(|| format!("writing image {}", config.output_path))?;
    info!(output = %config.output_path, "done");
    Ok(())
}

/// Hand-rolled argument loop; `Ok(None)` means help/version was printed.
fn parse_args() -> Result<Option<Args>> {
    let mut rtc_path: Option<PathBuf> = None;
    let mut threads: i64 = 0;
    let mut samples: u32 = 64;
    let mut brdf: fn(Vec3, Vec3, Vec3, &Material) -> Vec3 = cook_torrance;
    let mut sampler = AnySampler::Cosine(CosineSampler);
    let mut verbose = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                println!("{USAGE}");
                return Ok(None);
            }
            "--version" => {
                println!(
                    "pathtrace {} (built {})",
                    env!("CARGO_PKG_VERSION"),
                    env!("PATHTRACE_BUILD_DATE"),
                );
                return Ok(None);
            }
            "-v" | "--verbose" => verbose = true,
            "-n" | "--threads" => {
                let value = args.next().context("missing value for --threads")?;
                threads = value.parse().context("invalid thread count")?;
            }
            "--samples" => {
                let value = args.next().context("missing value for --samples")?;
                samples = value.parse().context("invalid sample count")?;
                if samples == 0 {
                    bail!("sample count must be positive");
                }
            }
            "--brdf" => {
                let value = args.next().context("missing value for --brdf")?;
                brdf = match value.as_str() {
                    "cook-torrance" => cook_torrance,
                    "phong" => phong_modified,
                    other => bail!("unknown brdf `{other}`"),
                };
            }
            "--sampler" => {
                let value = args.next().context("missing value for --sampler")?;
                sampler = value.parse().map_err(anyhow::Error::msg)?;
            }
            other if other.starts_with('-') => bail!("unknown option `{other}`\n{USAGE}"),
            other => {
                if rtc_path.replace(PathBuf::from(other)).is_some() {
                    bail!("more than one scene file given\n{USAGE}");
                }
            }
        }
    }

    let Some(rtc_path) = rtc_path else {
        bail!("missing scene file\n{USAGE}");
    };
    Ok(Some(Args { rtc_path, threads, samples, brdf, sampler, verbose }))
}
