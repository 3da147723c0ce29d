use nalgebra::{Rotation3, Translation3, UnitQuaternion};
use robocalib_core::{project_to_so3, CalibError, CalibResult, Iso3, Mat3};

/// Linear pose of a planar target (`Z = 0` in its own frame) from the
/// plane-to-image homography.
#[derive(Debug, Clone, Copy)]
pub struct PlanarPoseSolver;

/// `T_cam_board` from intrinsics `K` and a board-to-pixel homography `H`.
pub fn estimate_planar_pose_from_h(kmtx: &Mat3, hmtx: &Mat3) -> CalibResult<Iso3> {
    PlanarPoseSolver::from_homography(kmtx, hmtx)
}

impl PlanarPoseSolver {
    /// Decompose `H ~ K [r1 r2 t]` into a rigid pose.
    ///
    /// The scale is the mean of the norms of `K⁻¹h1` and `K⁻¹h2`; its sign is
    /// chosen so the board lies in front of the camera. The rotation is the
    /// SO(3) projection of `[r1 r2 r1×r2]`.
    pub fn from_homography(kmtx: &Mat3, hmtx: &Mat3) -> CalibResult<Iso3> {
        let k_inv = kmtx
            .try_inverse()
            .ok_or_else(|| CalibError::Numerical("intrinsics matrix is singular".into()))?;

        let k_inv_h1 = k_inv * hmtx.column(0);
        let k_inv_h2 = k_inv * hmtx.column(1);
        let k_inv_h3 = k_inv * hmtx.column(2);

        let norm = 0.5 * (k_inv_h1.norm() + k_inv_h2.norm());
        if !(norm.is_finite() && norm > 0.0) {
            return Err(CalibError::DegenerateGeometry(
                "homography has vanishing columns".into(),
            ));
        }
        let mut lambda = 1.0 / norm;
        if k_inv_h3.z < 0.0 {
            lambda = -lambda;
        }

        let r1 = k_inv_h1 * lambda;
        let r2 = k_inv_h2 * lambda;
        let r3 = r1.cross(&r2);
        let r_approx = Mat3::from_columns(&[r1, r2, r3]);
        let r = project_to_so3(&r_approx)
            .ok_or_else(|| CalibError::Numerical("svd failed in planar pose".into()))?;

        let t = k_inv_h3 * lambda;
        let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r));
        Ok(Iso3::from_parts(Translation3::from(t), rot))
    }
}
