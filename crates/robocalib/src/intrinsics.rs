use log::{debug, info};
use robocalib_core::{
    BrownConrady5, CalibError, CalibResult, CalibrationTarget, CameraIntrinsics, DetectedCorners,
    ImageSize, Iso3, Real,
};
use robocalib_linear::{
    estimate_intrinsics_from_homographies, estimate_planar_pose_from_h, view_homographies,
};
use robocalib_optim::{
    intrinsics::{refine_planar_intrinsics, PlanarIntrinsicsProblem, PlanarView},
    LmBackend, SolveOptions, SolveReport,
};
use serde::{Deserialize, Serialize};

use crate::config::IntrinsicsOptions;

/// Fewest successful views the intrinsic solver accepts.
pub const MIN_INTRINSICS_VIEWS: usize = 3;

/// Board pose and fit quality of one calibration image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewResidual {
    pub image_index: usize,
    /// `T_cam_board` estimated jointly with the intrinsics.
    pub pose: Iso3,
    pub rms_error: Real,
}

/// Full outcome of an intrinsic calibration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntrinsicsReport {
    pub intrinsics: CameraIntrinsics,
    /// One entry per successful input view, in input order.
    pub views: Vec<ViewResidual>,
    /// Mean per-point pixel distance over all views.
    pub mean_error: Real,
    pub solve: SolveReport,
}

fn rms(errors: &[Real]) -> Real {
    if errors.is_empty() {
        return 0.0;
    }
    (errors.iter().map(|e| e * e).sum::<Real>() / errors.len() as Real).sqrt()
}

/// Camera matrix and distortion from detected corner sets.
///
/// Needs at least [`MIN_INTRINSICS_VIEWS`] successful detections; failed
/// detections in `samples` are ignored.
pub fn calibrate_intrinsics(
    samples: &[DetectedCorners],
    target: &CalibrationTarget,
    image_size: ImageSize,
) -> CalibResult<CameraIntrinsics> {
    calibrate_intrinsics_with(
        samples,
        target,
        image_size,
        &IntrinsicsOptions::default(),
        &SolveOptions::default(),
    )
    .map(|r| r.intrinsics)
}

/// [`calibrate_intrinsics`] with explicit settings, returning per-view detail.
pub fn calibrate_intrinsics_with(
    samples: &[DetectedCorners],
    target: &CalibrationTarget,
    image_size: ImageSize,
    opts: &IntrinsicsOptions,
    solve: &SolveOptions,
) -> CalibResult<IntrinsicsReport> {
    let used: Vec<&DetectedCorners> = samples.iter().filter(|s| s.success()).collect();
    if used.len() < MIN_INTRINSICS_VIEWS {
        return Err(CalibError::InsufficientSamples {
            needed: MIN_INTRINSICS_VIEWS,
            got: used.len(),
        });
    }

    let homographies = view_homographies(target, samples)?;
    let init = estimate_intrinsics_from_homographies(&homographies, image_size, &opts.zhang())?;
    debug!(
        "intrinsics init: fx={:.2} fy={:.2} cx={:.2} cy={:.2}",
        init.fx, init.fy, init.cx, init.cy
    );
    let kmtx = init.k_matrix();
    let init_poses = homographies
        .iter()
        .map(|h| estimate_planar_pose_from_h(&kmtx, h))
        .collect::<CalibResult<Vec<Iso3>>>()?;

    let object = target.object_points();
    let views: Vec<PlanarView> = used
        .iter()
        .map(|s| PlanarView {
            object: object.clone(),
            image: s.points().to_vec(),
        })
        .collect();
    let problem = PlanarIntrinsicsProblem::new(
        views,
        &init,
        &BrownConrady5::default(),
        opts.distortion_mask,
    );
    let est = refine_planar_intrinsics(&LmBackend, &problem, &init_poses, solve);

    let p = est.pinhole;
    let params_ok = [p.fx, p.fy, p.cx, p.cy]
        .iter()
        .chain(est.distortion.coeffs().iter())
        .all(|v| v.is_finite())
        && p.fx > 0.0
        && p.fy > 0.0;
    if !params_ok {
        return Err(CalibError::Numerical(
            "intrinsic refinement diverged".to_string(),
        ));
    }

    let all_errors: Vec<Real> = est.point_errors.iter().flatten().copied().collect();
    let total_rms = rms(&all_errors);
    let mean_error = all_errors.iter().sum::<Real>() / all_errors.len().max(1) as Real;
    let views = used
        .iter()
        .zip(&est.poses)
        .zip(&est.point_errors)
        .map(|((s, pose), errs)| ViewResidual {
            image_index: s.image_index(),
            pose: *pose,
            rms_error: rms(errs),
        })
        .collect();

    info!(
        "intrinsics: {} views, rms {:.4} px, fx={:.2} fy={:.2}",
        used.len(),
        total_rms,
        p.fx,
        p.fy
    );
    Ok(IntrinsicsReport {
        intrinsics: CameraIntrinsics::from_calibration(p, est.distortion, image_size, total_rms),
        views,
        mean_error,
        solve: est.report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use robocalib_core::{synthetic::planar, PinholeParams};

    fn camera() -> CameraIntrinsics {
        CameraIntrinsics::new(
            PinholeParams {
                fx: 820.0,
                fy: 815.0,
                cx: 318.0,
                cy: 244.0,
            },
            BrownConrady5 {
                k1: -0.08,
                k2: 0.02,
                p1: 0.0,
                p2: 0.0,
                k3: 0.0,
            },
            ImageSize::new(640, 480),
        )
    }

    #[test]
    fn failed_views_do_not_count() {
        let cam = camera();
        let target = CalibrationTarget::standard_9x6();
        let poses = planar::tilted_board_poses(&target, 2, 600.0);
        let mut views = planar::project_views(&cam, &target, &poses);
        views.push(DetectedCorners::not_found(2));
        views.push(DetectedCorners::not_found(3));
        let err = calibrate_intrinsics(&views, &target, cam.image_size()).unwrap_err();
        assert_eq!(err, CalibError::InsufficientSamples { needed: 3, got: 2 });
    }

    #[test]
    fn report_lists_used_views_in_order() {
        let cam = camera();
        let target = CalibrationTarget::standard_9x6();
        let poses = planar::tilted_board_poses(&target, 5, 600.0);
        let mut views = planar::project_views(&cam, &target, &poses);
        views.insert(1, DetectedCorners::not_found(99));
        let report = calibrate_intrinsics_with(
            &views,
            &target,
            cam.image_size(),
            &IntrinsicsOptions::default(),
            &SolveOptions::default(),
        )
        .unwrap();
        let indices: Vec<usize> = report.views.iter().map(|v| v.image_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert!(report.intrinsics.rms_reprojection_error() < 1e-3);
        assert!(report.mean_error <= report.intrinsics.rms_reprojection_error() + 1e-12);
    }
}
