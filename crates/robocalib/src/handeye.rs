use log::{debug, info};
use nalgebra::Translation3;
use robocalib_core::{
    orthonormalize, rotation_from_matrix, CalibError, CalibResult, CalibrationSample, HandEyeMode,
    HandEyeResult, Iso3,
};
use robocalib_linear::{estimate_hand_eye, motion_residuals, MotionPair};
use robocalib_optim::{
    handeye::{refine_hand_eye, HandEyeProblem, RelativeMotion},
    LmBackend, SolveOptions,
};

use crate::config::HandEyeOptions;

fn to_relative_motion(pair: &MotionPair) -> CalibResult<RelativeMotion> {
    Ok(RelativeMotion {
        a: Iso3::from_parts(Translation3::from(pair.tra_a), rotation_from_matrix(&pair.rot_a)?),
        b: Iso3::from_parts(Translation3::from(pair.tra_b), rotation_from_matrix(&pair.rot_b)?),
    })
}

/// Fixed camera↔robot transform from paired camera and robot poses.
///
/// Eye-in-hand returns `T_gripper_cam`; eye-to-hand returns `T_base_cam`.
pub fn solve_hand_eye(samples: &[CalibrationSample], mode: HandEyeMode) -> CalibResult<HandEyeResult> {
    solve_hand_eye_with(samples, mode, &HandEyeOptions::default(), &SolveOptions::default())
}

/// [`solve_hand_eye`] with explicit settings.
pub fn solve_hand_eye_with(
    samples: &[CalibrationSample],
    mode: HandEyeMode,
    opts: &HandEyeOptions,
    solve: &SolveOptions,
) -> CalibResult<HandEyeResult> {
    let (init, pairs) = estimate_hand_eye(samples, mode, &opts.linear())?;
    let (init_t, init_r) = motion_residuals(&pairs, &init);
    debug!(
        "hand-eye init: {} pairs, rms t {:.4}, rms r {:.5} rad",
        pairs.len(),
        init_t,
        init_r
    );

    let mut transform = init;
    if opts.refine {
        let problem = HandEyeProblem {
            motions: pairs
                .iter()
                .map(to_relative_motion)
                .collect::<CalibResult<Vec<_>>>()?,
            rotation_weight: opts.rotation_weight,
        };
        let est = refine_hand_eye(&LmBackend, &problem, &init, solve);
        let finite = est.transform.translation.vector.iter().all(|v| v.is_finite())
            && est.transform.rotation.coords.iter().all(|v| v.is_finite());
        if !finite {
            return Err(CalibError::Numerical(
                "hand-eye refinement diverged".to_string(),
            ));
        }
        debug!(
            "hand-eye refine: {} evaluations, cost {:.3e}",
            est.report.evaluations, est.report.final_cost
        );
        transform = est.transform;
    }

    let transform = orthonormalize(&transform);
    let (consistency_error, rotation_error_rad) = motion_residuals(&pairs, &transform);
    info!(
        "hand-eye ({mode:?}): {} samples, rms t {:.4}, rms r {:.5} rad",
        samples.len(),
        consistency_error,
        rotation_error_rad
    );
    Ok(HandEyeResult {
        transform,
        consistency_error,
        rotation_error_rad,
        sample_count: samples.len(),
        mode,
    })
}
