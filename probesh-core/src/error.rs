//! Error types for probesh-core.

use thiserror::Error;

/// Result type alias for probesh operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for probesh operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Texel outside of the cube map.
    #[error("invalid texel: face {face}, ({x}, {y}) for face size {size}")]
    InvalidTexel { face: u8, x: u32, y: u32, size: u32 },

    /// A set without any sample was asked to be encoded.
    #[error("cannot encode empty set {0}")]
    EmptySet(usize),

    /// Clustering error.
    #[error("clustering error: {0}")]
    ClusteringError(#[from] ClusteringError),
}

/// Errors raised by the clustering algorithms.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusteringError {
    /// The capture only sees sky.
    #[error("capture has no geometry samples to cluster")]
    NoGeometry,

    /// Requested set count is unusable.
    #[error("invalid set count k = {0}")]
    InvalidK(usize),

    /// The iteration cap leaves no room for a single assignment step.
    #[error("invalid iteration cap {0}")]
    InvalidIterations(usize),

    /// Label column does not match the batch.
    #[error("label count {labels} does not match sample count {samples}")]
    LabelMismatch { samples: usize, labels: usize },
}
