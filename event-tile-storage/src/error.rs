/// Error types for tile storage, export and packing operations.
use crate::volume::Axis;
use std::path::PathBuf;

/// Errors raised by the tile store and the pipelines built on it.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A supplied coordinate lies outside `[0, frame_dim[axis])`.
    #[error("{axis} coordinate {value} out of range [0, {limit})")]
    OutOfRange { axis: Axis, value: i64, limit: usize },

    /// `get` was called without binding any axis.
    #[error("at least one of x, y or z must be specified")]
    InvalidQuery,

    /// Unrecognised data format name.
    #[error("data format must be either 'rgba' or 'int8', got '{0}'")]
    InvalidFormat(String),

    /// Block file length does not match the configured tile shape.
    #[error("corrupt block {path}: expected {expected} bytes, found {actual}")]
    CorruptBlock {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    /// Plane shape differs from what the operation expects.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },

    /// Rejected construction parameter.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Event record that could not be parsed.
    #[error("malformed event on line {line}: {reason}")]
    MalformedEvent { line: usize, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("EXR error: {0}")]
    Exr(#[from] exr::error::Error),
}

impl StorageError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
