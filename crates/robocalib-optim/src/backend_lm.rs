use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use log::debug;
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn};
use robocalib_core::Real;

use crate::{NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};

struct LmWrapper<'a, P: NllsProblem> {
    problem: &'a P,
    params: DVector<Real>,
}

impl<P: NllsProblem> LeastSquaresProblem<Real, Dyn, Dyn> for LmWrapper<'_, P> {
    type ResidualStorage = Owned<Real, Dyn>;
    type JacobianStorage = Owned<Real, Dyn, Dyn>;
    type ParameterStorage = Owned<Real, Dyn>;

    fn set_params(&mut self, x: &DVector<Real>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<Real> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<Real>> {
        let r = self.problem.residuals(&self.params);
        r.iter().all(|v| v.is_finite()).then_some(r)
    }

    fn jacobian(&self) -> Option<DMatrix<Real>> {
        let j = self.problem.jacobian(&self.params);
        j.iter().all(|v| v.is_finite()).then_some(j)
    }
}

/// Levenberg–Marquardt backend (MINPACK port from `levenberg-marquardt`).
#[derive(Debug, Default, Clone)]
pub struct LmBackend;

impl NllsSolverBackend for LmBackend {
    fn solve<P: NllsProblem>(
        &self,
        problem: &P,
        x0: DVector<Real>,
        opts: &SolveOptions,
    ) -> (DVector<Real>, SolveReport) {
        let lm = LevenbergMarquardt::new()
            .with_ftol(opts.ftol)
            .with_xtol(opts.xtol)
            .with_gtol(opts.gtol)
            .with_patience(opts.max_iters.max(1));

        let (wrapper, report) = lm.minimize(LmWrapper {
            problem,
            params: x0,
        });
        let x_opt = wrapper.params();
        let final_cost = 0.5 * problem.residuals(&x_opt).norm_squared();
        debug!(
            "lm: {} params, {} residuals, {} evaluations, cost {:.6e}, {:?}",
            problem.num_params(),
            problem.num_residuals(),
            report.number_of_evaluations,
            final_cost,
            report.termination
        );

        (
            x_opt,
            SolveReport {
                evaluations: report.number_of_evaluations,
                final_cost,
                converged: report.termination.was_successful(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::LmBackend;
    use crate::{NllsProblem, NllsSolverBackend, SolveOptions};
    use nalgebra::DVector;
    use robocalib_core::Real;

    /// Rosenbrock written as residuals `(1 − x, 10 (y − x²))`.
    struct Rosenbrock;

    impl NllsProblem for Rosenbrock {
        fn num_params(&self) -> usize {
            2
        }

        fn num_residuals(&self) -> usize {
            2
        }

        fn residuals(&self, x: &DVector<Real>) -> DVector<Real> {
            DVector::from_vec(vec![1.0 - x[0], 10.0 * (x[1] - x[0] * x[0])])
        }
    }

    #[test]
    fn lm_backend_minimizes_rosenbrock() {
        let x0 = DVector::from_vec(vec![-1.2, 1.0]);
        let (x, report) = LmBackend.solve(&Rosenbrock, x0, &SolveOptions::default());
        assert!((x[0] - 1.0).abs() < 1e-6 && (x[1] - 1.0).abs() < 1e-6, "{x}");
        assert!(report.final_cost < 1e-12);
        assert!(report.converged, "{report:?}");
        assert!(report.evaluations > 0);
    }
}
