//! Property tests pitting the kd-tree against a brute-force scan.

use pathtrace::kdtree::{BuildParams, KdTree};
use pathtrace::scene::{Triangle, Vertex};
use pathtrace::util::math::{intersect_ray_triangle, Aabb, Ray, Vec3};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Jittered-grid triangle soup: triangles stay well inside their cells, so
/// nearest hits are unambiguous.
fn triangle_soup(rng: &mut StdRng, per_axis: usize) -> (Vec<Vertex>, Vec<Triangle>) {
    let spacing = 2.5f32;
    let mut vertices = Vec::new();
    let mut triangles = Vec::new();
    for i in 0..per_axis {
        for j in 0..per_axis {
            for k in 0..per_axis {
                let center = Vec3::new(i as f32, j as f32, k as f32) * spacing
                    + Vec3::new(
                        rng.gen_range(-0.3..0.3),
                        rng.gen_range(-0.3..0.3),
                        rng.gen_range(-0.3..0.3),
                    );
                let base = vertices.len() as u32;
                for _ in 0..3 {
                    let offset = Vec3::new(
                        rng.gen_range(-0.6..0.6),
                        rng.gen_range(-0.6..0.6),
                        rng.gen_range(-0.6..0.6),
                    );
                    vertices.push(Vertex {
                        position: center + offset,
                        normal: Vec3::Y,
                    });
                }
                triangles.push(Triangle::new(base, base + 1, base + 2));
            }
        }
    }
    (vertices, triangles)
}

fn random_ray(rng: &mut StdRng, per_axis: usize) -> Ray {
    let spacing = 2.5f32;
    let extent = per_axis as f32 * spacing;
    // origin outside the soup, aimed at a random point inside it
    let origin = Vec3::new(
        rng.gen_range(-1.5 * extent..2.5 * extent),
        rng.gen_range(-1.5 * extent..2.5 * extent),
        -2.0 * extent,
    );
    let target = Vec3::new(
        rng.gen_range(0.0..extent),
        rng.gen_range(0.0..extent),
        rng.gen_range(0.0..extent),
    );
    Ray::new(origin, (target - origin).normalize())
}

/// Reference scan with the tree's own acceptance rule.
fn brute_nearest(
    bias: f32,
    ray: Ray,
    triangles: &[Triangle],
    vertices: &[Vertex],
) -> Option<f32> {
    let origin = ray.origin + ray.dir * bias;
    let mut best = f32::MAX;
    for tri in triangles {
        let [a, b, c] = tri.corners(vertices);
        if let Some((t, _, _)) =
            intersect_ray_triangle(origin, ray.dir, a.position, b.position, c.position)
        {
            if t > ray.t_min - bias && t < best {
                best = t;
            }
        }
    }
    (best < f32::MAX).then_some(best)
}

fn brute_occluded(
    bias: f32,
    ray: Ray,
    t_light: f32,
    triangles: &[Triangle],
    vertices: &[Vertex],
) -> bool {
    let origin = ray.origin + ray.dir * bias;
    triangles.iter().any(|tri| {
        let [a, b, c] = tri.corners(vertices);
        intersect_ray_triangle(origin, ray.dir, a.position, b.position, c.position)
            .is_some_and(|(t, _, _)| ray.t_min + bias < t && t < t_light)
    })
}

#[test]
fn nearest_hit_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(1234);
    let (vertices, triangles) = triangle_soup(&mut rng, 5);
    let tree =
        KdTree::build(&triangles, &vertices, BuildParams::for_triangle_count(triangles.len()));

    let mut hits = 0;
    for _ in 0..1000 {
        let ray = random_ray(&mut rng, 5);
        let kd = tree.nearest_hit(ray, &triangles, &vertices).map(|h| h.t);
        let brute = brute_nearest(tree.ray_range_bias(), ray, &triangles, &vertices);
        match (kd, brute) {
            (None, None) => {}
            (Some(a), Some(b)) => {
                // leaf-boundary acceptance is relaxed by the range bias
                let tolerance = tree.ray_range_bias() * 2.0 + 1e-5;
                assert!((a - b).abs() <= tolerance, "kd t = {a}, brute t = {b}");
                hits += 1;
            }
            other => panic!("hit disagreement: {other:?}"),
        }
    }
    assert!(hits > 100, "soup too sparse to be a meaningful test ({hits} hits)");
}

#[test]
fn occlusion_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(99);
    let (vertices, triangles) = triangle_soup(&mut rng, 4);
    let tree =
        KdTree::build(&triangles, &vertices, BuildParams::for_triangle_count(triangles.len()));

    let mut blocked = 0;
    for _ in 0..1000 {
        let ray = random_ray(&mut rng, 4);
        let t_light = rng.gen_range(1.0..60.0);
        let kd = tree.occluded(ray, t_light, &triangles, &vertices);
        let brute = brute_occluded(tree.ray_range_bias(), ray, t_light, &triangles, &vertices);
        assert_eq!(kd, brute, "occlusion disagreement at t_light = {t_light}");
        if kd {
            blocked += 1;
        }
    }
    assert!(blocked > 50, "too few blocked rays to be meaningful ({blocked})");
}

#[test]
fn every_leaf_region_intersects_its_triangles() {
    let mut rng = StdRng::seed_from_u64(7);
    let (vertices, triangles) = triangle_soup(&mut rng, 4);
    let tree =
        KdTree::build(&triangles, &vertices, BuildParams::for_triangle_count(triangles.len()));

    // walk the packed array, tracking each node's region
    let mut stack = vec![(0u32, tree.bounds())];
    let mut leaves = 0;
    while let Some((index, region)) = stack.pop() {
        let node = tree.nodes()[index as usize];
        if node.is_leaf() {
            leaves += 1;
            let first = node.first_element_offset() as usize;
            let count = node.triangle_count() as usize;
            for &t in &tree.leaf_elements()[first..first + count] {
                let tri_bounds = triangles[t as usize].bounds(&vertices);
                let grown = Aabb::new(
                    region.min - Vec3::splat(1e-4),
                    region.max + Vec3::splat(1e-4),
                );
                assert!(
                    grown.overlaps(&tri_bounds),
                    "triangle {t} does not touch its leaf region {region:?}"
                );
            }
        } else {
            let axis = node.split_axis();
            let split = node.split_pos();
            let mut below = region;
            below.max[axis] = split;
            let mut above = region;
            above.min[axis] = split;
            stack.push((index + 1, below));
            stack.push((node.above_child(), above));
        }
    }
    assert!(leaves > 1, "tree unexpectedly degenerate");
}

#[test]
fn rebuild_is_bit_identical() {
    let mut rng = StdRng::seed_from_u64(5);
    let (vertices, triangles) = triangle_soup(&mut rng, 4);
    let params = BuildParams::for_triangle_count(triangles.len());
    let first = KdTree::build(&triangles, &vertices, params.clone());
    let second = KdTree::build(&triangles, &vertices, params);

    assert_eq!(first.nodes(), second.nodes());
    assert_eq!(first.leaf_elements(), second.leaf_elements());

    for _ in 0..50 {
        let ray = random_ray(&mut rng, 4);
        let a = first.nearest_hit(ray, &triangles, &vertices).map(|h| h.t);
        let b = second.nearest_hit(ray, &triangles, &vertices).map(|h| h.t);
        assert_eq!(a, b);
    }
}
