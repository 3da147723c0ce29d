use serde::{Deserialize, Serialize};

use crate::{euler_xyz_deg, pose_to_matrix4, rotation_matrix, Iso3, Matrix4Rows, Real};

/// Where the camera is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandEyeMode {
    /// Camera rides on the end-effector; the target is fixed in the world.
    /// The solved transform is `T_gripper_cam` (camera → gripper).
    EyeInHand,
    /// Camera is fixed in the world; the target rides on the end-effector.
    /// The solved transform is `T_base_cam` (camera → robot base).
    EyeToHand,
}

/// How samples are combined into relative motions `(A, B)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PairingStrategy {
    /// Sample `i` with sample `i + 1`.
    #[default]
    Consecutive,
    /// Every unordered pair `(i, j)`, `i < j`.
    AllPairs,
}

/// One observation contributed to a hand-eye run.
///
/// Samples are paired strictly by their position in the input slice; the
/// caller guarantees that both poses were captured at the same robot stop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSample {
    /// Target pose in the camera frame, `T_cam_target` (as returned by PnP).
    pub camera_pose: Iso3,
    /// End-effector pose in the robot base frame, `T_base_gripper` (as
    /// returned by forward kinematics).
    pub robot_pose: Iso3,
}

impl CalibrationSample {
    pub fn new(camera_pose: Iso3, robot_pose: Iso3) -> Self {
        Self {
            camera_pose,
            robot_pose,
        }
    }
}

/// Output of a hand-eye solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandEyeResult {
    /// Camera → gripper (eye-in-hand) or camera → base (eye-to-hand).
    pub transform: Iso3,
    /// RMS translation residual of `AX = XB` over all motion pairs, in the
    /// units of the input translations.
    pub consistency_error: Real,
    /// RMS rotation residual of `AX = XB` over all motion pairs (radians).
    pub rotation_error_rad: Real,
    pub sample_count: usize,
    pub mode: HandEyeMode,
}

impl HandEyeResult {
    /// The fields stored by the record manager for a hand-eye run.
    pub fn to_record(&self) -> HandEyeRecord {
        let t = self.transform.translation.vector;
        let r = rotation_matrix(&self.transform);
        HandEyeRecord {
            transformation_matrix: pose_to_matrix4(&self.transform),
            rotation_matrix: [
                [r[(0, 0)], r[(0, 1)], r[(0, 2)]],
                [r[(1, 0)], r[(1, 1)], r[(1, 2)]],
                [r[(2, 0)], r[(2, 1)], r[(2, 2)]],
            ],
            translation: [t.x, t.y, t.z],
            rotation_euler: euler_xyz_deg(&self.transform),
            reprojection_error: self.consistency_error,
            poses_count: self.sample_count,
            mode: self.mode,
        }
    }
}

/// Flat, storage-friendly view of a [`HandEyeResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandEyeRecord {
    pub transformation_matrix: Matrix4Rows,
    pub rotation_matrix: [[Real; 3]; 3],
    pub translation: [Real; 3],
    /// XYZ Euler angles in degrees.
    pub rotation_euler: [Real; 3],
    pub reprojection_error: Real,
    pub poses_count: usize,
    #[serde(rename = "type")]
    pub mode: HandEyeMode,
}
