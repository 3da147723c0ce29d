//! Joint refinement of pinhole, distortion and per-view board poses.

use nalgebra::DVector;
use robocalib_core::{project_camera_point, BrownConrady5, Iso3, PinholeParams, Pt2, Pt3, Real};
use serde::{Deserialize, Serialize};

use crate::{
    params::{intrinsics_from_array, intrinsics_to_array, read_pose, write_pose, INTRINSICS_DIM, POSE_DIM},
    NllsProblem, NllsSolverBackend, SolveOptions, SolveReport,
};

/// Residual assigned to a point that projects behind the camera.
const BEHIND_CAMERA_PX: Real = 1e3;

/// Corner observations of the planar target in one image.
#[derive(Debug, Clone)]
pub struct PlanarView {
    /// Board-frame points (`z = 0`).
    pub object: Vec<Pt3>,
    /// Detected pixels, same order as `object`.
    pub image: Vec<Pt2>,
}

/// Distortion terms held at their initial value during refinement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistortionMask {
    /// Keep `p1 = p2` fixed.
    pub fix_tangential: bool,
    /// Keep `k3` fixed.
    pub fix_k3: bool,
}

/// Reprojection problem over `[free intrinsics | rvec_0 t_0 | rvec_1 t_1 | ...]`.
#[derive(Debug, Clone)]
pub struct PlanarIntrinsicsProblem {
    views: Vec<PlanarView>,
    base: [Real; INTRINSICS_DIM],
    free: Vec<usize>,
}

impl PlanarIntrinsicsProblem {
    pub fn new(
        views: Vec<PlanarView>,
        pinhole: &PinholeParams,
        distortion: &BrownConrady5,
        mask: DistortionMask,
    ) -> Self {
        let free = (0..INTRINSICS_DIM)
            .filter(|&i| !(mask.fix_tangential && (i == 6 || i == 7)))
            .filter(|&i| !(mask.fix_k3 && i == 8))
            .collect();
        Self {
            views,
            base: intrinsics_to_array(pinhole, distortion),
            free,
        }
    }

    pub fn num_views(&self) -> usize {
        self.views.len()
    }

    fn pose_offset(&self, view: usize) -> usize {
        self.free.len() + POSE_DIM * view
    }

    /// Parameter vector for the stored intrinsics and the given poses.
    pub fn initial_params(&self, poses: &[Iso3]) -> DVector<Real> {
        debug_assert_eq!(poses.len(), self.views.len());
        let mut x = DVector::zeros(self.num_params());
        for (slot, &i) in self.free.iter().enumerate() {
            x[slot] = self.base[i];
        }
        for (v, pose) in poses.iter().enumerate() {
            write_pose(&mut x, self.pose_offset(v), pose);
        }
        x
    }

    /// Split a parameter vector back into intrinsics, distortion and poses.
    pub fn decode(&self, x: &DVector<Real>) -> (PinholeParams, BrownConrady5, Vec<Iso3>) {
        let mut a = self.base;
        for (slot, &i) in self.free.iter().enumerate() {
            a[i] = x[slot];
        }
        let (k, d) = intrinsics_from_array(&a);
        let poses = (0..self.views.len())
            .map(|v| read_pose(x, self.pose_offset(v)))
            .collect();
        (k, d, poses)
    }

    /// Pixel error of every corner, grouped by view.
    pub fn point_errors(&self, x: &DVector<Real>) -> Vec<Vec<Real>> {
        let r = self.residuals(x);
        let mut offset = 0;
        self.views
            .iter()
            .map(|view| {
                let errs = (0..view.object.len())
                    .map(|k| {
                        let i = offset + 2 * k;
                        (r[i] * r[i] + r[i + 1] * r[i + 1]).sqrt()
                    })
                    .collect();
                offset += 2 * view.object.len();
                errs
            })
            .collect()
    }
}

impl NllsProblem for PlanarIntrinsicsProblem {
    fn num_params(&self) -> usize {
        self.free.len() + POSE_DIM * self.views.len()
    }

    fn num_residuals(&self) -> usize {
        self.views.iter().map(|v| 2 * v.object.len()).sum()
    }

    fn residuals(&self, x: &DVector<Real>) -> DVector<Real> {
        let (k, d, poses) = self.decode(x);
        let mut r = DVector::zeros(self.num_residuals());
        let mut offset = 0;
        for (view, pose) in self.views.iter().zip(&poses) {
            for (p, meas) in view.object.iter().zip(&view.image) {
                match project_camera_point(&k, &d, &pose.transform_point(p)) {
                    Some(proj) => {
                        r[offset] = proj.x - meas.x;
                        r[offset + 1] = proj.y - meas.y;
                    }
                    None => {
                        r[offset] = BEHIND_CAMERA_PX;
                        r[offset + 1] = BEHIND_CAMERA_PX;
                    }
                }
                offset += 2;
            }
        }
        r
    }
}

/// Refined camera and per-view poses.
#[derive(Debug, Clone)]
pub struct PlanarIntrinsicsEstimate {
    pub pinhole: PinholeParams,
    pub distortion: BrownConrady5,
    pub poses: Vec<Iso3>,
    /// Pixel error of every corner, grouped by view.
    pub point_errors: Vec<Vec<Real>>,
    pub report: SolveReport,
}

/// Refine intrinsics, distortion and poses starting from `initial_poses`.
pub fn refine_planar_intrinsics<B: NllsSolverBackend>(
    backend: &B,
    problem: &PlanarIntrinsicsProblem,
    initial_poses: &[Iso3],
    opts: &SolveOptions,
) -> PlanarIntrinsicsEstimate {
    let x0 = problem.initial_params(initial_poses);
    let (x, report) = backend.solve(problem, x0, opts);
    let (pinhole, distortion, poses) = problem.decode(&x);
    PlanarIntrinsicsEstimate {
        pinhole,
        distortion,
        poses,
        point_errors: problem.point_errors(&x),
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmBackend;
    use nalgebra::{Translation3, UnitQuaternion};
    use robocalib_core::{synthetic::planar, CalibrationTarget, CameraIntrinsics, ImageSize};

    #[test]
    fn refinement_recovers_distortion_from_perturbed_start() {
        let gt_k = PinholeParams {
            fx: 800.0,
            fy: 790.0,
            cx: 322.0,
            cy: 238.0,
        };
        let gt_d = BrownConrady5 {
            k1: -0.12,
            k2: 0.03,
            p1: 0.001,
            p2: -0.0005,
            k3: 0.0,
        };
        let cam = CameraIntrinsics::new(gt_k, gt_d, ImageSize::new(640, 480));
        let target = CalibrationTarget::new(8, 6, 25.0).unwrap();
        let gt_poses = planar::tilted_board_poses(&target, 6, 650.0);
        let views: Vec<PlanarView> = planar::project_views(&cam, &target, &gt_poses)
            .into_iter()
            .map(|v| PlanarView {
                object: target.object_points(),
                image: v.points().to_vec(),
            })
            .collect();

        let init_k = PinholeParams {
            fx: 780.0,
            fy: 780.0,
            cx: 320.0,
            cy: 240.0,
        };
        let init_poses: Vec<Iso3> = gt_poses
            .iter()
            .map(|p| {
                Iso3::from_parts(
                    Translation3::new(2.0, -1.0, 5.0),
                    UnitQuaternion::from_euler_angles(0.01, -0.01, 0.005),
                ) * p
            })
            .collect();

        let problem = PlanarIntrinsicsProblem::new(
            views,
            &init_k,
            &BrownConrady5::default(),
            DistortionMask::default(),
        );
        let est = refine_planar_intrinsics(&LmBackend, &problem, &init_poses, &SolveOptions::default());

        assert!((est.pinhole.fx - gt_k.fx).abs() < 1e-3, "{:?}", est.pinhole);
        assert!((est.pinhole.cy - gt_k.cy).abs() < 1e-3);
        assert!((est.distortion.k1 - gt_d.k1).abs() < 1e-5);
        assert!(est.point_errors.iter().flatten().all(|e| *e < 1e-6));
    }

    #[test]
    fn masked_terms_stay_fixed() {
        let problem = PlanarIntrinsicsProblem::new(
            vec![],
            &PinholeParams {
                fx: 1.0,
                fy: 1.0,
                cx: 0.0,
                cy: 0.0,
            },
            &BrownConrady5 {
                k3: 0.5,
                ..Default::default()
            },
            DistortionMask {
                fix_tangential: true,
                fix_k3: true,
            },
        );
        assert_eq!(problem.num_params(), 6);
        let (_, d, _) = problem.decode(&problem.initial_params(&[]));
        assert_eq!(d.k3, 0.5);
    }
}
