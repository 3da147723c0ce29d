use nalgebra::{DMatrix, DVector};
use robocalib_core::Real;
use serde::{Deserialize, Serialize};

/// Non-linear least-squares problem with dense parameter and residual vectors.
pub trait NllsProblem {
    /// Number of parameters in the optimization vector.
    fn num_params(&self) -> usize;
    /// Number of residual rows.
    fn num_residuals(&self) -> usize;

    /// Residuals for the parameters `x`.
    fn residuals(&self, x: &DVector<Real>) -> DVector<Real>;

    /// Jacobian of [`Self::residuals`]. Defaults to central differences with
    /// a step relative to each parameter's magnitude.
    fn jacobian(&self, x: &DVector<Real>) -> DMatrix<Real> {
        let mut j = DMatrix::zeros(self.num_residuals(), x.len());
        let mut xp = x.clone();
        for k in 0..x.len() {
            let h = 1e-6 * x[k].abs().max(1.0);
            xp[k] = x[k] + h;
            let r_plus = self.residuals(&xp);
            xp[k] = x[k] - h;
            let r_minus = self.residuals(&xp);
            xp[k] = x[k];
            j.set_column(k, &((r_plus - r_minus) / (2.0 * h)));
        }
        j
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Iteration budget. The LM backend follows the MINPACK convention and
    /// allows `max_iters * (n + 1)` function evaluations.
    pub max_iters: usize,
    /// Relative tolerance on the cost reduction.
    pub ftol: Real,
    /// Orthogonality (gradient) tolerance.
    pub gtol: Real,
    /// Relative tolerance on parameter updates.
    pub xtol: Real,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_iters: 100,
            ftol: 1e-12,
            gtol: 1e-12,
            xtol: 1e-12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveReport {
    /// Residual evaluations spent by the backend.
    pub evaluations: usize,
    /// `0.5 · ‖r‖²` at the returned parameters.
    pub final_cost: Real,
    pub converged: bool,
}

pub trait NllsSolverBackend {
    fn solve<P: NllsProblem>(
        &self,
        problem: &P,
        x0: DVector<Real>,
        opts: &SolveOptions,
    ) -> (DVector<Real>, SolveReport);
}
