//! Core math and value types for `robocalib`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec2`, `Pt3`, `Iso3`, ...),
//! - rigid-pose helpers (Rodrigues vectors, 4×4 matrices, SO(3) projection),
//! - the pinhole + Brown–Conrady camera model ([`CameraIntrinsics`]),
//! - calibration value objects ([`CalibrationTarget`], [`DetectedCorners`],
//!   [`CalibrationSample`], [`HandEyeResult`]),
//! - the shared error taxonomy ([`CalibError`]),
//! - deterministic synthetic data helpers used by tests across the workspace.
//!
//! Camera pipeline:
//! `pixel = K ∘ distortion ∘ (x/z, y/z)(T_cam_board · p_board)`
//!
//! Pose convention: `T_a_b` maps points expressed in frame `b` into frame `a`.

/// Error taxonomy shared by every solver.
pub mod error;
/// Hand-eye value types.
pub mod handeye;
/// Linear algebra type aliases and helpers.
pub mod math;
/// Camera models and distortion utilities.
pub mod models;
/// Rigid pose helpers.
pub mod pose;
/// Deterministic synthetic data generators.
pub mod synthetic;
/// Calibration target geometry and per-image detections.
pub mod target;

pub use error::*;
pub use handeye::*;
pub use math::*;
pub use models::*;
pub use pose::*;
pub use target::*;
