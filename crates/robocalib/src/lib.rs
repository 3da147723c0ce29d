//! Camera calibration core for robot cells.
//!
//! Data flow:
//!
//! ```text
//! images ──detect──▶ DetectedCorners ──calibrate_intrinsics──▶ CameraIntrinsics
//!                          │                                        │
//!                          └────────────────solve_pose◀─────────────┘
//!                                               │ T_cam_board
//! joint angles ──compute_pose──▶ T_base_gripper │
//!                                       └──────▶ solve_hand_eye ──▶ HandEyeResult
//! ```
//!
//! Every entry point is a synchronous, pure function of its inputs. Solvers
//! fail fast with a [`CalibError`]; detection failures are routine and come
//! back as [`DetectedCorners::not_found`].
//!
//! # Example
//!
//! ```
//! use robocalib::{calibrate_intrinsics, solve_pose};
//! use robocalib::core::{synthetic::planar, BrownConrady5, CalibrationTarget, CameraIntrinsics, ImageSize, PinholeParams};
//!
//! let truth = CameraIntrinsics::new(
//!     PinholeParams { fx: 800.0, fy: 800.0, cx: 320.0, cy: 240.0 },
//!     BrownConrady5::default(),
//!     ImageSize::new(640, 480),
//! );
//! let target = CalibrationTarget::standard_9x6();
//! let poses = planar::tilted_board_poses(&target, 6, 600.0);
//! let views = planar::project_views(&truth, &target, &poses);
//!
//! let camera = calibrate_intrinsics(&views, &target, ImageSize::new(640, 480)).unwrap();
//! assert!((camera.fx() - 800.0).abs() < 1.0);
//!
//! let pose = solve_pose(&views[0], &target, &camera).unwrap();
//! assert!(pose.rms_error < 1e-3);
//! ```
//!
//! ## Module organization
//!
//! - [`core`]: value types, camera model, pose helpers, synthetic data
//! - [`detect`]: checkerboard detector and test-image renderer
//! - [`linear`]: closed-form initializers (homography, Zhang, PnP, Tsai–Lenz)
//! - [`optim`]: Levenberg–Marquardt refinement problems
//! - [`kinematics`]: chain descriptors and forward kinematics

mod config;
mod detection;
mod extrinsics;
mod handeye;
mod intrinsics;

pub use config::{CalibrationConfig, HandEyeOptions, IntrinsicsOptions, PnpOptions};
pub use detection::{detect_batch, detect_files, summarize, DetectionSummary};
pub use extrinsics::{solve_pnp, solve_pnp_with, solve_pose, solve_pose_with, PoseSolution};
pub use handeye::{solve_hand_eye, solve_hand_eye_with};
pub use intrinsics::{
    calibrate_intrinsics, calibrate_intrinsics_with, IntrinsicsReport, ViewResidual,
    MIN_INTRINSICS_VIEWS,
};

pub use robocalib_core::{
    pose_difference, CalibError, CalibResult, CalibrationSample, CalibrationTarget,
    CameraIntrinsics, DetectedCorners, HandEyeMode, HandEyeRecord, HandEyeResult, ImageSize, Iso3,
    PairingStrategy, PoseDelta,
};
pub use robocalib_detect::{detect, detect_dynamic, detect_with, DetectorConfig};
pub use robocalib_kinematics::{compute_pose, ChainDescriptor, KinematicChain};
pub use robocalib_optim::SolveOptions;

/// Value types, camera model, pose helpers and synthetic data generators.
pub mod core {
    pub use robocalib_core::*;
}

/// Checkerboard detection.
pub mod detect {
    pub use robocalib_detect::*;
}

/// Closed-form initializers.
pub mod linear {
    pub use robocalib_linear::*;
}

/// Non-linear least-squares refinement.
pub mod optim {
    pub use robocalib_optim::*;
}

/// Forward kinematics.
pub mod kinematics {
    pub use robocalib_kinematics::*;
}
