use thiserror::Error;

/// Expected, caller-recoverable failure conditions of the calibration core.
///
/// None of these represent a crash: detection failures are routine during data
/// collection, degeneracy errors ask the caller to diversify the input, and the
/// kinematic variants flag precondition violations on the caller side.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibError {
    /// The calibration target was not found in an image.
    #[error("calibration target not found in image {image_index}")]
    DetectionFailed { image_index: usize },
    /// Fewer usable observations than the solver minimum.
    #[error("insufficient samples: need at least {needed}, got {got}")]
    InsufficientSamples { needed: usize, got: usize },
    /// Views are too similar (e.g. all fronto-parallel) to constrain the camera.
    #[error("degenerate view geometry: {0}")]
    DegenerateGeometry(String),
    /// Robot motions lack rotational diversity (e.g. a single rotation axis).
    #[error("degenerate robot motion: {0}")]
    DegenerateMotion(String),
    /// Too few, or collinear, point correspondences for pose estimation.
    #[error("insufficient geometry for pose estimation: {0}")]
    InsufficientGeometry(String),
    /// Input vector length does not match the expected dimension.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    /// Malformed kinematic chain descriptor.
    #[error("invalid kinematic chain: {0}")]
    InvalidChain(String),
    /// Calibration target parameters out of range.
    #[error("invalid calibration target: {0}")]
    InvalidTarget(String),
    /// A numerical routine (SVD, inversion) failed.
    #[error("numerical failure: {0}")]
    Numerical(String),
}

/// Result alias used throughout the workspace.
pub type CalibResult<T> = std::result::Result<T, CalibError>;
