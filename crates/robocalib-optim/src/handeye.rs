//! Refinement of the hand-eye transform `X` on `AX = XB` residuals.

use nalgebra::DVector;
use robocalib_core::{Iso3, Real};

use crate::{
    params::{read_pose, write_pose, POSE_DIM},
    NllsProblem, NllsSolverBackend, SolveOptions, SolveReport,
};

/// One relative motion: robot chain `a`, camera chain `b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeMotion {
    pub a: Iso3,
    pub b: Iso3,
}

/// Residuals `log(R_err)·w` and `t_AX − t_XB` per motion, where
/// `E = (A X)⁻¹ (X B)`.
#[derive(Debug, Clone)]
pub struct HandEyeProblem {
    pub motions: Vec<RelativeMotion>,
    /// Millimetres per radian used to weigh rotation residuals against
    /// translation residuals.
    pub rotation_weight: Real,
}

impl NllsProblem for HandEyeProblem {
    fn num_params(&self) -> usize {
        POSE_DIM
    }

    fn num_residuals(&self) -> usize {
        6 * self.motions.len()
    }

    fn residuals(&self, x: &DVector<Real>) -> DVector<Real> {
        let x_pose = read_pose(x, 0);
        let mut r = DVector::zeros(self.num_residuals());
        for (k, m) in self.motions.iter().enumerate() {
            let ax = m.a * x_pose;
            let xb = x_pose * m.b;
            let rot_err = (ax.rotation.inverse() * xb.rotation).scaled_axis() * self.rotation_weight;
            let t_err = ax.translation.vector - xb.translation.vector;
            r.rows_mut(6 * k, 3).copy_from(&rot_err);
            r.rows_mut(6 * k + 3, 3).copy_from(&t_err);
        }
        r
    }
}

#[derive(Debug, Clone)]
pub struct HandEyeEstimate {
    pub transform: Iso3,
    pub report: SolveReport,
}

/// Refine `initial` on all motions.
pub fn refine_hand_eye<B: NllsSolverBackend>(
    backend: &B,
    problem: &HandEyeProblem,
    initial: &Iso3,
    opts: &SolveOptions,
) -> HandEyeEstimate {
    let mut x0 = DVector::zeros(POSE_DIM);
    write_pose(&mut x0, 0, initial);
    let (x, report) = backend.solve(problem, x0, opts);
    HandEyeEstimate {
        transform: read_pose(&x, 0),
        report,
    }
}
