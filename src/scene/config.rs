//! Render-task configuration files.
//!
//! The task file is plain text, one field per line:
//!
//! ```text
//! # comment
//! mesh path (relative to this file)
//! output image path
//! recursion level
//! WIDTH HEIGHT
//! view-point x y z
//! look-at x y z
//! up x y z
//! yview
//! ```
//!
//! The first six fields are mandatory; `up` and `yview` fall back to
//! `(0, 1, 0)` and `1.0` with a warning. Trailing lines are warned about
//! and skipped. [`RenderConfig::save`] re-emits the same layout, so a file
//! survives a load/save round trip (the preview tool rewrites it when the
//! camera is moved).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::util::math::Vec3;
use crate::util::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    /// Mesh path exactly as written in the file.
    pub mesh_path: String,
    pub output_path: String,
    pub recursion_level: u32,
    pub width: u32,
    pub height: u32,
    pub view_point: Vec3,
    pub look_at: Vec3,
    pub up: Vec3,
    pub y_view: f32,
}

impl RenderConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|_| Error::FileNotFound(path.to_path_buf()))?;
        Self::parse(&text)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_string())?;
        Ok(())
    }

    /// The mesh path, resolved against the directory of the task file.
    pub fn resolve_mesh_path(&self, config_path: &Path) -> PathBuf {
        config_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(&self.mesh_path)
    }

    pub(crate) fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        let mut line_no = 0usize;
        let mut next = |field: &'static str| {
            line_no += 1;
            lines.next().ok_or(Error::Config { field, line: line_no }).map(|l| (l, line_no))
        };

        next("comment")?; // ignored
        let (mesh_path, _) = next("mesh path")?;
        let (output_path, _) = next("output path")?;

        let (line, n) = next("recursion level")?;
        let recursion_level = line
            .trim()
            .parse::<u32>()
            .map_err(|_| Error::Config { field: "recursion level", line: n })?;

        let (line, n) = next("resolution")?;
        let mut it = line.split_whitespace().map(|w| w.parse::<u32>());
        let (width, height) = match (it.next(), it.next()) {
            (Some(Ok(w)), Some(Ok(h))) => (w, h),
            _ => return Err(Error::Config { field: "resolution", line: n }),
        };

        let (line, n) = next("view point")?;
        let view_point =
            parse_vec3(line).ok_or(Error::Config { field: "view point", line: n })?;

        let (line, n) = next("look at")?;
        let look_at = parse_vec3(line).ok_or(Error::Config { field: "look at", line: n })?;

        let up = match lines.next() {
            Some(line) => {
                line_no += 1;
                parse_vec3(line).unwrap_or_else(|| {
                    warn!("could not parse up vector, using default (0, 1, 0)");
                    Vec3::Y
                })
            }
            None => Vec3::Y,
        };

        let y_view = match lines.next() {
            Some(line) => {
                line_no += 1;
                line.trim().parse::<f32>().unwrap_or_else(|_| {
                    warn!("could not parse yview, using default 1.0");
                    1.0
                })
            }
            None => 1.0,
        };

        for extra in lines {
            line_no += 1;
            if !extra.trim().is_empty() {
                warn!(line = line_no, "skipping unrecognised trailing line in task file");
            }
        }

        Ok(Self {
            mesh_path: mesh_path.to_string(),
            output_path: output_path.to_string(),
            recursion_level,
            width,
            height,
            view_point,
            look_at,
            up,
            y_view,
        })
    }
}

impl std::fmt::Display for RenderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "#")?;
        writeln!(f, "{}", self.mesh_path)?;
        writeln!(f, "{}", self.output_path)?;
        writeln!(f, "{}", self.recursion_level)?;
        writeln!(f, "{} {}", self.width, self.height)?;
        writeln!(f, "{} {} {}", self.view_point.x, self.view_point.y, self.view_point.z)?;
        writeln!(f, "{} {} {}", self.look_at.x, self.look_at.y, self.look_at.z)?;
        writeln!(f, "{} {} {}", self.up.x, self.up.y, self.up.z)?;
        write!(f, "{}", self.y_view)
    }
}

fn parse_vec3(line: &str) -> Option<Vec3> {
    let mut it = line.split_whitespace().map(|w| w.parse::<f32>());
    match (it.next(), it.next(), it.next()) {
        (Some(Ok(x)), Some(Ok(y)), Some(Ok(z))) => Some(Vec3::new(x, y, z)),
        _ => None,
    }
}
