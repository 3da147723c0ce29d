//! Single-view 6-DoF pose refinement with fixed intrinsics.

use nalgebra::DVector;
use robocalib_core::{project_camera_point, BrownConrady5, Iso3, PinholeParams, Pt2, Pt3, Real};

use crate::{
    params::{read_pose, write_pose, POSE_DIM},
    NllsProblem, NllsSolverBackend, SolveOptions, SolveReport,
};

/// Reprojection of `object` through `T_cam_object` against `image` pixels.
#[derive(Debug, Clone)]
pub struct PoseProblem<'a> {
    pub object: &'a [Pt3],
    pub image: &'a [Pt2],
    pub pinhole: PinholeParams,
    pub distortion: BrownConrady5,
}

impl PoseProblem<'_> {
    /// Pixel error of every point for the pose in `x`.
    pub fn point_errors(&self, x: &DVector<Real>) -> Vec<Real> {
        let r = self.residuals(x);
        r.as_slice()
            .chunks_exact(2)
            .map(|c| (c[0] * c[0] + c[1] * c[1]).sqrt())
            .collect()
    }
}

impl NllsProblem for PoseProblem<'_> {
    fn num_params(&self) -> usize {
        POSE_DIM
    }

    fn num_residuals(&self) -> usize {
        2 * self.object.len()
    }

    fn residuals(&self, x: &DVector<Real>) -> DVector<Real> {
        let pose = read_pose(x, 0);
        let mut r = DVector::zeros(self.num_residuals());
        for (k, (p, meas)) in self.object.iter().zip(self.image).enumerate() {
            let (dx, dy) = match project_camera_point(
                &self.pinhole,
                &self.distortion,
                &pose.transform_point(p),
            ) {
                Some(proj) => (proj.x - meas.x, proj.y - meas.y),
                None => (1e3, 1e3),
            };
            r[2 * k] = dx;
            r[2 * k + 1] = dy;
        }
        r
    }
}

#[derive(Debug, Clone)]
pub struct PoseEstimate {
    pub pose: Iso3,
    pub point_errors: Vec<Real>,
    pub report: SolveReport,
}

/// Refine `initial` by minimizing pixel reprojection error.
pub fn refine_pose<B: NllsSolverBackend>(
    backend: &B,
    problem: &PoseProblem<'_>,
    initial: &Iso3,
    opts: &SolveOptions,
) -> PoseEstimate {
    let mut x0 = DVector::zeros(POSE_DIM);
    write_pose(&mut x0, 0, initial);
    let (x, report) = backend.solve(problem, x0, opts);
    PoseEstimate {
        pose: read_pose(&x, 0),
        point_errors: problem.point_errors(&x),
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmBackend;
    use nalgebra::{Translation3, UnitQuaternion};
    use robocalib_core::{rotation_angle_between, CalibrationTarget};

    #[test]
    fn refines_a_perturbed_pose() {
        let pinhole = PinholeParams {
            fx: 700.0,
            fy: 700.0,
            cx: 320.0,
            cy: 240.0,
        };
        let distortion = BrownConrady5 {
            k1: -0.2,
            k2: 0.05,
            ..Default::default()
        };
        let gt = Iso3::from_parts(
            Translation3::new(-50.0, -30.0, 500.0),
            UnitQuaternion::from_euler_angles(0.3, 0.2, -0.1),
        );
        let object = CalibrationTarget::new(6, 5, 20.0).unwrap().object_points();
        let image: Vec<Pt2> = object
            .iter()
            .map(|p| project_camera_point(&pinhole, &distortion, &gt.transform_point(p)).unwrap())
            .collect();
        let problem = PoseProblem {
            object: &object,
            image: &image,
            pinhole,
            distortion,
        };
        let start = Iso3::from_parts(
            Translation3::new(5.0, -5.0, 20.0),
            UnitQuaternion::from_euler_angles(0.03, -0.02, 0.02),
        ) * gt;
        let est = refine_pose(&LmBackend, &problem, &start, &SolveOptions::default());
        assert!(rotation_angle_between(&est.pose, &gt) < 1e-9);
        assert!((est.pose.translation.vector - gt.translation.vector).norm() < 1e-6);
        assert!(est.point_errors.iter().all(|e| *e < 1e-8));
    }
}
