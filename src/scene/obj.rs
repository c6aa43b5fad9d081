//! Wavefront OBJ/MTL import.
//!
//! Produces the immutable vertex/triangle/material arrays the tracer
//! consumes. Faces are fan-triangulated, duplicate vertices are merged,
//! missing normals are generated from area-weighted face normals, and a
//! mesh whose normals predominantly face its own centroid gets them
//! flipped.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::scene::material::Material;
use crate::scene::mesh::{Triangle, Vertex};
use crate::scene::Scene;
use crate::util::math::Vec3;
use crate::util::{Error, Result};

/// Load a scene from a Wavefront OBJ file (with optional MTL libraries).
pub fn load_scene(path: &Path) -> Result<Scene> {
    let text = fs::read_to_string(path).map_err(|e| Error::MeshLoad {
        path: path.to_path_buf(),
        msg: e.to_string(),
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    parse_obj(&text, base)
}

/// One face corner before assembly: position index and optional normal index.
#[derive(Clone, Copy)]
struct Corner {
    position: usize,
    normal: Option<usize>,
}

/// A parsed triangle: three corners, material, and the mesh it belongs to
/// (for the per-mesh inward-normal vote).
struct RawTriangle {
    corners: [Corner; 3],
    material: u32,
    mesh: u32,
}

fn parse_obj(text: &str, base: &Path) -> Result<Scene> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut raw: Vec<RawTriangle> = Vec::new();

    let mut materials: Vec<Material> = Vec::new();
    let mut material_ids: HashMap<String, u32> = HashMap::new();
    let mut current_material: Option<u32> = None;
    let mut current_mesh = 0u32;
    let mut mesh_open = false;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut words = line.split_whitespace();
        let keyword = words.next().unwrap();
        match keyword {
            "v" => positions.push(parse_vec3(&mut words, line_no, "vertex position")?),
            "vn" => normals.push(parse_vec3(&mut words, line_no, "vertex normal")?),
            "f" => {
                let corners: Vec<Corner> = words
                    .map(|w| parse_corner(w, positions.len(), normals.len(), line_no))
                    .collect::<Result<_>>()?;
                if corners.len() < 3 {
                    return Err(Error::mesh_parse(line_no, "face with fewer than 3 vertices"));
                }
                let material = current_material.unwrap_or_else(|| {
                    materials.push(Material::default());
                    let id = (materials.len() - 1) as u32;
                    current_material = Some(id);
                    id
                });
                // fan triangulation
                for i in 1..corners.len() - 1 {
                    raw.push(RawTriangle {
                        corners: [corners[0], corners[i], corners[i + 1]],
                        material,
                        mesh: current_mesh,
                    });
                }
                mesh_open = true;
            }
            "usemtl" => {
                let name = words.next().unwrap_or("");
                current_material = Some(match material_ids.get(name) {
                    Some(&id) => id,
                    None => {
                        warn!(material = name, "face references unknown material");
                        materials.push(Material { name: name.to_string(), ..Material::default() });
                        let id = (materials.len() - 1) as u32;
                        material_ids.insert(name.to_string(), id);
                        id
                    }
                });
            }
            "mtllib" => {
                for lib in words {
                    load_mtl(&base.join(lib), &mut materials, &mut material_ids);
                }
            }
            "o" | "g" => {
                if mesh_open {
                    current_mesh += 1;
                    mesh_open = false;
                }
            }
            // smoothing groups, texcoords, parameter-space data
            "s" | "vt" | "vp" | "l" => {}
            other => debug!(keyword = other, line = line_no, "ignoring OBJ statement"),
        }
    }

    if raw.is_empty() {
        return Err(Error::other("mesh contains no faces"));
    }

    let generated = generate_normals(&positions, &raw);
    let flipped = inward_meshes(&positions, &normals, &generated, &raw, current_mesh + 1);

    // Assemble deduplicated vertices and the final triangle list.
    let mut vertex_ids: HashMap<(u64, u64), u32> = HashMap::new();
    let mut vertices: Vec<Vertex> = Vec::new();
    let mut triangles: Vec<Triangle> = Vec::new();
    let mut triangle_materials: Vec<u32> = Vec::new();

    for tri in &raw {
        let mut indices = [0u32; 3];
        for (slot, corner) in tri.corners.iter().enumerate() {
            let mut normal = match corner.normal {
                Some(ni) => normals[ni].normalize_or_zero(),
                None => generated[corner.position],
            };
            if flipped[tri.mesh as usize] {
                normal = -normal;
            }
            let position = positions[corner.position];
            let key = (quantize(position), quantize(normal));
            let id = *vertex_ids.entry(key).or_insert_with(|| {
                vertices.push(Vertex { position, normal });
                (vertices.len() - 1) as u32
            });
            indices[slot] = id;
        }
        triangles.push(Triangle { indices });
        triangle_materials.push(tri.material);
    }

    if materials.is_empty() {
        materials.push(Material::default());
    }

    let scene = Scene::new(vertices, triangles, materials, triangle_materials);
    info!(
        vertices = scene.vertices.len(),
        triangles = scene.triangles.len(),
        materials = scene.materials.len(),
        lights = scene.lights().len(),
        "mesh imported"
    );
    Ok(scene)
}

/// Area-weighted vertex normals for corners that have none.
fn generate_normals(positions: &[Vec3], raw: &[RawTriangle]) -> Vec<Vec3> {
    let mut acc = vec![Vec3::ZERO; positions.len()];
    for tri in raw {
        if tri.corners.iter().all(|c| c.normal.is_some()) {
            continue;
        }
        let [a, b, c] = tri.corners.map(|c| positions[c.position]);
        // cross product length carries the area weight
        let face = (b - a).cross(c - a);
        for corner in &tri.corners {
            acc[corner.position] += face;
        }
    }
    acc.into_iter()
        .map(|n| {
            let n = n.normalize_or_zero();
            if n == Vec3::ZERO { Vec3::Y } else { n }
        })
        .collect()
}

/// Per-mesh vote: does the majority of its normals face the mesh centroid?
fn inward_meshes(
    positions: &[Vec3],
    normals: &[Vec3],
    generated: &[Vec3],
    raw: &[RawTriangle],
    mesh_count: u32,
) -> Vec<bool> {
    let mut centroids = vec![Vec3::ZERO; mesh_count as usize];
    let mut counts = vec![0u32; mesh_count as usize];
    for tri in raw {
        for corner in &tri.corners {
            centroids[tri.mesh as usize] += positions[corner.position];
            counts[tri.mesh as usize] += 1;
        }
    }
    for (c, n) in centroids.iter_mut().zip(&counts) {
        if *n > 0 {
            *c /= *n as f32;
        }
    }

    (0..mesh_count)
        .into_par_iter()
        .map(|mesh| {
            let mut inward = 0i64;
            for tri in raw.iter().filter(|t| t.mesh == mesh) {
                for corner in &tri.corners {
                    let normal = match corner.normal {
                        Some(ni) => normals[ni],
                        None => generated[corner.position],
                    };
                    let outward_dir = positions[corner.position] - centroids[mesh as usize];
                    inward += if normal.dot(outward_dir) < 0.0 { 1 } else { -1 };
                }
            }
            if inward > 0 {
                debug!(mesh, "flipping inward-facing normals");
            }
            inward > 0
        })
        .collect()
}

fn load_mtl(path: &Path, materials: &mut Vec<Material>, ids: &mut HashMap<String, u32>) {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read material library");
            return;
        }
    };
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut words = line.split_whitespace();
        let keyword = words.next().unwrap();
        if keyword == "newmtl" {
            let name = words.next().unwrap_or("").to_string();
            materials.push(Material { name: name.clone(), ..Material::default() });
            ids.insert(name, (materials.len() - 1) as u32);
            continue;
        }
        let Some(mat) = materials.last_mut() else { continue };
        let mut num = |def: f32| {
            words.next().and_then(|w| w.parse::<f32>().ok()).unwrap_or(def)
        };
        match keyword {
            "Ns" => {
                mat.ns = num(mat.ns);
                mat.roughness = Material::roughness_from_exponent(mat.ns);
            }
            "Ni" => mat.ni = num(mat.ni),
            "Ka" => mat.ka = mtl_color(line),
            "Kd" => mat.kd = mtl_color(line),
            "Ks" => mat.ks = mtl_color(line),
            "Ke" => mat.ke = mtl_color(line),
            _ => {}
        }
    }
}

fn mtl_color(line: &str) -> Vec3 {
    let mut words = line.split_whitespace().skip(1).map(|w| w.parse::<f32>());
    match (words.next(), words.next(), words.next()) {
        (Some(Ok(r)), Some(Ok(g)), Some(Ok(b))) => Vec3::new(r, g, b),
        _ => Vec3::ZERO,
    }
}

fn parse_vec3<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    line: usize,
    what: &str,
) -> Result<Vec3> {
    let mut it = words.map(|w| w.parse::<f32>());
    match (it.next(), it.next(), it.next()) {
        (Some(Ok(x)), Some(Ok(y)), Some(Ok(z))) => Ok(Vec3::new(x, y, z)),
        _ => Err(Error::mesh_parse(line, format!("malformed {what}"))),
    }
}

/// Resolve one face corner (`v`, `v/t`, `v//n`, `v/t/n`; 1-based, negative
/// counts from the end).
fn parse_corner(word: &str, n_positions: usize, n_normals: usize, line: usize) -> Result<Corner> {
    let mut parts = word.split('/');
    let position = resolve_index(parts.next().unwrap_or(""), n_positions, line)?;
    let _texcoord = parts.next(); // unused
    let normal = match parts.next() {
        Some(s) if !s.is_empty() => Some(resolve_index(s, n_normals, line)?),
        _ => None,
    };
    Ok(Corner { position, normal })
}

fn resolve_index(s: &str, len: usize, line: usize) -> Result<usize> {
    let raw: i64 = s
        .parse()
        .map_err(|_| Error::mesh_parse(line, format!("bad index `{s}`")))?;
    let idx = if raw < 0 { len as i64 + raw } else { raw - 1 };
    if idx < 0 || idx as usize >= len {
        return Err(Error::mesh_parse(line, format!("index {raw} out of range")));
    }
    Ok(idx as usize)
}

/// Quantise a vector for duplicate-vertex hashing (~1e-4 resolution).
fn quantize(v: Vec3) -> u64 {
    use std::hash::{Hash, Hasher};
    let scale = 10000.0;
    let x = (v.x * scale).round() as i64;
    let y = (v.y * scale).round() as i64;
    let z = (v.z * scale).round() as i64;
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    (x, y, z).hash(&mut hasher);
    hasher.finish()
}
