use log::debug;
use robocalib_core::{
    CalibError, CalibResult, CalibrationTarget, CameraIntrinsics, DetectedCorners, Iso3, Pt2, Pt3,
    Real,
};
use robocalib_linear::solve_pnp_linear;
use robocalib_optim::{
    pose::{refine_pose, PoseProblem},
    LmBackend, SolveOptions,
};
use serde::{Deserialize, Serialize};

use crate::config::PnpOptions;

/// Board pose in the camera frame and its reprojection quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseSolution {
    /// `T_cam_board`.
    pub pose: Iso3,
    /// RMS pixel reprojection error.
    pub rms_error: Real,
}

fn reprojection_rms(object: &[Pt3], image: &[Pt2], camera: &CameraIntrinsics, pose: &Iso3) -> Real {
    let mut sum = 0.0;
    for (p, px) in object.iter().zip(image) {
        let err = match camera.project_through(pose, p) {
            Some(proj) => (proj - px).norm_squared(),
            None => Real::INFINITY,
        };
        sum += err;
    }
    (sum / object.len().max(1) as Real).sqrt()
}

/// Pose of an arbitrary point set from pixel observations and known
/// intrinsics.
pub fn solve_pnp(object: &[Pt3], image: &[Pt2], camera: &CameraIntrinsics) -> CalibResult<PoseSolution> {
    solve_pnp_with(object, image, camera, &PnpOptions::default(), &SolveOptions::default())
}

/// [`solve_pnp`] with explicit settings.
pub fn solve_pnp_with(
    object: &[Pt3],
    image: &[Pt2],
    camera: &CameraIntrinsics,
    opts: &PnpOptions,
    solve: &SolveOptions,
) -> CalibResult<PoseSolution> {
    let init = solve_pnp_linear(object, image, camera)?;
    let pose = if opts.refine {
        let problem = PoseProblem {
            object,
            image,
            pinhole: *camera.pinhole(),
            distortion: *camera.distortion(),
        };
        let est = refine_pose(&LmBackend, &problem, &init, solve);
        debug!(
            "pnp: refined in {} evaluations, cost {:.3e}",
            est.report.evaluations, est.report.final_cost
        );
        est.pose
    } else {
        init
    };

    let t = pose.translation.vector;
    if !(t.iter().all(|v| v.is_finite()) && pose.rotation.coords.iter().all(|v| v.is_finite())) {
        return Err(CalibError::Numerical("pose refinement diverged".to_string()));
    }
    Ok(PoseSolution {
        pose,
        rms_error: reprojection_rms(object, image, camera, &pose),
    })
}

/// Camera pose relative to the board for one detected view.
///
/// Fails with [`CalibError::DetectionFailed`] if the view was not detected.
pub fn solve_pose(
    corners: &DetectedCorners,
    target: &CalibrationTarget,
    intrinsics: &CameraIntrinsics,
) -> CalibResult<PoseSolution> {
    solve_pose_with(
        corners,
        target,
        intrinsics,
        &PnpOptions::default(),
        &SolveOptions::default(),
    )
}

/// [`solve_pose`] with explicit settings.
pub fn solve_pose_with(
    corners: &DetectedCorners,
    target: &CalibrationTarget,
    intrinsics: &CameraIntrinsics,
    opts: &PnpOptions,
    solve: &SolveOptions,
) -> CalibResult<PoseSolution> {
    if !corners.success() {
        return Err(CalibError::DetectionFailed {
            image_index: corners.image_index(),
        });
    }
    let solution = solve_pnp_with(&target.object_points(), corners.points(), intrinsics, opts, solve)?;
    debug!(
        "image {}: pose rms {:.4} px",
        corners.image_index(),
        solution.rms_error
    );
    Ok(solution)
}
