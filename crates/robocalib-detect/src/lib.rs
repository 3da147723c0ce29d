//! Checkerboard inner-corner detection.
//!
//! Pipeline per image:
//! 1. optional contrast normalization of the grayscale image,
//! 2. ChESS corners from `chess-corners` and grid labelling from the
//!    `calib-targets` chessboard detector,
//! 3. acceptance of the complete board only, with labels reoriented so that
//!    `i` runs toward image +x and `j` toward image +y,
//! 4. gradient-orthogonality sub-pixel refinement of every corner.
//!
//! A failure is reported as [`robocalib_core::DetectedCorners::not_found`],
//! never as an error. Only the corner coordinates outlive the call.
//!
//! [`render`] draws synthetic boards through a calibrated camera for
//! end-to-end tests.

mod detector;
mod gray;
mod labels;
mod params;
pub mod render;
mod subpix;

pub use detector::{detect, detect_dynamic, detect_with, find_chessboard, DetectFailure};
pub use gray::GrayF32;
pub use labels::{labelled_positions, CornerGrid};
pub use params::{DetectorConfig, SubPixParams};
pub use subpix::{refine_corner, refine_corners};
