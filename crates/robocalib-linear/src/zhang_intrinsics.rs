use log::debug;
use nalgebra::{DMatrix, SVector};
use robocalib_core::{
    singular_value_ratio, CalibError, CalibResult, CalibrationTarget, DetectedCorners, ImageSize,
    Mat3, PinholeParams, Real,
};

use crate::{dlt_homography, math::null_vector};

/// Settings for the closed-form intrinsics estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZhangOptions {
    /// Add the `B12 = 0` constraint so the recovered skew is zero.
    pub zero_skew: bool,
    /// Reject the view set when `σ5 / σ1` of the constraint matrix falls
    /// below this ratio (the conic `B` is then not uniquely determined).
    pub min_singular_ratio: Real,
}

impl Default for ZhangOptions {
    fn default() -> Self {
        Self {
            zero_skew: true,
            min_singular_ratio: 1e-4,
        }
    }
}

/// Build the 6-vector `v_ij(H)` of Zhang's constraint system.
fn v_ij(h: &Mat3, i: usize, j: usize) -> SVector<Real, 6> {
    let hi = h.column(i);
    let hj = h.column(j);
    SVector::<Real, 6>::from_row_slice(&[
        hi[0] * hj[0],
        hi[0] * hj[1] + hi[1] * hj[0],
        hi[1] * hj[1],
        hi[2] * hj[0] + hi[0] * hj[2],
        hi[2] * hj[1] + hi[1] * hj[2],
        hi[2] * hj[2],
    ])
}

/// Pixel preconditioner `N`: centers the image and scales it to roughly
/// unit extent so the conic entries are of comparable magnitude.
pub fn image_preconditioner(size: ImageSize) -> Mat3 {
    let w = size.width as Real;
    let h = size.height as Real;
    let s = 0.5 * (w + h);
    Mat3::new(1.0 / s, 0.0, -0.5 * w / s, 0.0, 1.0 / s, -0.5 * h / s, 0.0, 0.0, 1.0)
}

/// Board-to-image homography for every successful view.
pub fn view_homographies(
    target: &CalibrationTarget,
    views: &[DetectedCorners],
) -> CalibResult<Vec<Mat3>> {
    let board = target.object_points_2d();
    views
        .iter()
        .filter(|v| v.success())
        .map(|v| dlt_homography(&board, v.points()).map_err(CalibError::from))
        .collect()
}

/// Closed-form pinhole parameters from plane homographies (Zhang).
///
/// Homographies map board millimetres to pixels. They are preconditioned
/// with [`image_preconditioner`] before the conic `B = K⁻ᵀK⁻¹` is solved, and
/// the estimate is mapped back to pixel units afterwards. Distortion is
/// ignored at this stage.
pub fn estimate_intrinsics_from_homographies(
    homographies: &[Mat3],
    image_size: ImageSize,
    opts: &ZhangOptions,
) -> CalibResult<PinholeParams> {
    let m = homographies.len();
    if m < 3 {
        return Err(CalibError::InsufficientSamples { needed: 3, got: m });
    }

    let n_mat = image_preconditioner(image_size);
    let extra = usize::from(opts.zero_skew);
    let mut v = DMatrix::<Real>::zeros(2 * m + extra, 6);

    for (k, h) in homographies.iter().enumerate() {
        let mut hn = n_mat * h;
        let scale = 0.5 * (hn.column(0).norm() + hn.column(1).norm());
        if !(scale.is_finite() && scale > 0.0) {
            return Err(CalibError::DegenerateGeometry(format!(
                "homography {k} has vanishing columns"
            )));
        }
        hn /= scale;

        let v11 = v_ij(&hn, 0, 0);
        let v22 = v_ij(&hn, 1, 1);
        let v12 = v_ij(&hn, 0, 1);
        v.row_mut(2 * k).copy_from(&v12.transpose());
        v.row_mut(2 * k + 1).copy_from(&(v11 - v22).transpose());
    }
    if opts.zero_skew {
        v[(2 * m, 1)] = 1.0;
    }

    let (b, sv) = null_vector(&v)
        .ok_or_else(|| CalibError::Numerical("svd failed in intrinsics estimation".into()))?;
    let ratio = singular_value_ratio(&sv, 4);
    debug!("zhang: {m} views, sigma5/sigma1 = {ratio:.3e}");
    if !(ratio >= opts.min_singular_ratio) {
        return Err(CalibError::DegenerateGeometry(format!(
            "views do not constrain the intrinsics (sigma5/sigma1 = {ratio:.2e}); \
             tilt the target between captures"
        )));
    }

    let sign = if b[0] < 0.0 { -1.0 } else { 1.0 };
    let (b11, b12, b22, b13, b23, b33) = (
        sign * b[0],
        sign * b[1],
        sign * b[2],
        sign * b[3],
        sign * b[4],
        sign * b[5],
    );

    let denom = b11 * b22 - b12 * b12;
    if !(denom > 0.0 && b11 > 0.0) {
        return Err(CalibError::DegenerateGeometry(
            "conic from homographies is not positive definite".into(),
        ));
    }
    let v0 = (b12 * b13 - b11 * b23) / denom;
    let lambda = b33 - (b13 * b13 + v0 * (b12 * b13 - b11 * b23)) / b11;
    if !(lambda > 0.0) {
        return Err(CalibError::DegenerateGeometry(
            "invalid scale recovered from homographies".into(),
        ));
    }
    let alpha = (lambda / b11).sqrt();
    let beta = (lambda * b11 / denom).sqrt();
    let gamma = if opts.zero_skew {
        0.0
    } else {
        -b12 * alpha * alpha * beta / lambda
    };
    let u0 = gamma * v0 / beta - b13 * alpha * alpha / lambda;

    let k_n = Mat3::new(alpha, gamma, u0, 0.0, beta, v0, 0.0, 0.0, 1.0);
    let n_inv = n_mat
        .try_inverse()
        .ok_or_else(|| CalibError::Numerical("singular preconditioner".into()))?;
    let k = n_inv * k_n;
    let params = PinholeParams {
        fx: k[(0, 0)],
        fy: k[(1, 1)],
        cx: k[(0, 2)],
        cy: k[(1, 2)],
    };
    if ![params.fx, params.fy, params.cx, params.cy]
        .iter()
        .all(|x| x.is_finite())
        || params.fx <= 0.0
        || params.fy <= 0.0
    {
        return Err(CalibError::Numerical(format!(
            "non-physical intrinsics estimate {params:?}"
        )));
    }
    Ok(params)
}
