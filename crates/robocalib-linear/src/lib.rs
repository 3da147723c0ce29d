//! Closed-form (linear) initializers.
//!
//! Every solver here produces a starting point for the non-linear refinement
//! in `robocalib-optim`. Inputs are checked for the degenerate
//! configurations each method cannot handle and rejected with a
//! [`robocalib_core::CalibError`] instead of returning a meaningless estimate.

mod handeye;
mod homography;
pub mod math;
mod planar_pose;
mod pnp;
mod zhang_intrinsics;

pub use handeye::*;
pub use homography::*;
pub use planar_pose::*;
pub use pnp::*;
pub use zhang_intrinsics::*;
