//! Deterministic synthetic data generation helpers.
//!
//! Small building blocks for constructing synthetic calibration problems used
//! in tests across the workspace:
//! - board poses that keep a planar target in front of the camera,
//! - projection of target points into [`crate::DetectedCorners`],
//! - robot motion generators for hand-eye problems,
//! - deterministic pseudo-random noise.
//!
//! # Example
//!
//! ```
//! use robocalib_core::{synthetic::planar, BrownConrady5, CameraIntrinsics, CalibrationTarget, ImageSize, PinholeParams};
//!
//! let cam = CameraIntrinsics::new(
//!     PinholeParams { fx: 800.0, fy: 800.0, cx: 320.0, cy: 240.0 },
//!     BrownConrady5::default(),
//!     ImageSize::new(640, 480),
//! );
//! let target = CalibrationTarget::new(7, 5, 30.0).unwrap();
//! let poses = planar::tilted_board_poses(&target, 6, 600.0);
//! let views = planar::project_views(&cam, &target, &poses);
//! assert!(views.iter().all(|v| v.success()));
//! ```

pub mod motion;
pub mod noise;
pub mod planar;
