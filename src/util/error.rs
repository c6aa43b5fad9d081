//! Error types for the path tracer.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for tracer operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A required field of the task configuration failed to parse
    #[error("Could not parse {field} (line {line}) of the task file")]
    Config { field: &'static str, line: usize },

    /// Mesh import failed
    #[error("Mesh import failed for {path}: {msg}")]
    MeshLoad { path: PathBuf, msg: String },

    /// Malformed OBJ/MTL data
    #[error("Malformed mesh data at line {line}: {msg}")]
    MeshParse { line: usize, msg: String },

    /// Image output failed
    #[error("Image write failed: {0}")]
    ImageWrite(#[from] exr::error::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create a mesh parse error.
    pub fn mesh_parse(line: usize, msg: impl Into<String>) -> Self {
        Self::MeshParse { line, msg: msg.into() }
    }
}

/// Result type alias for tracer operations.
pub type Result<T> = std::result::Result<T, Error>;
