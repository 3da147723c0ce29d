//! Non-linear least-squares refinement for the calibration solvers.
//!
//! Each problem implements [`NllsProblem`] over a dense parameter vector and
//! is minimized by a [`NllsSolverBackend`]; [`LmBackend`] wraps the
//! `levenberg-marquardt` crate. Jacobians are central finite differences.

mod backend_lm;
pub mod handeye;
pub mod intrinsics;
pub mod params;
pub mod pose;
mod traits;

pub use backend_lm::LmBackend;
pub use traits::*;
