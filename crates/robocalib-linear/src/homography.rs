use nalgebra::DMatrix;
use robocalib_core::{from_homogeneous, to_homogeneous, CalibError, Mat3, Pt2, Real};
use thiserror::Error;

use crate::math::{mat3_from_vec, normalize_points_2d, null_vector};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HomographyError {
    #[error("need at least 4 point correspondences, got {0}")]
    NotEnoughPoints(usize),
    #[error("point sets differ in length: {0} vs {1}")]
    LengthMismatch(usize, usize),
    #[error("points are degenerate (coincident or collinear)")]
    Degenerate,
    #[error("svd failed")]
    SvdFailed,
}

impl From<HomographyError> for CalibError {
    fn from(e: HomographyError) -> Self {
        match e {
            HomographyError::NotEnoughPoints(got) => CalibError::InsufficientGeometry(format!(
                "homography needs 4 correspondences, got {got}"
            )),
            HomographyError::LengthMismatch(expected, got) => {
                CalibError::DimensionMismatch { expected, got }
            }
            HomographyError::Degenerate => CalibError::DegenerateGeometry(e.to_string()),
            HomographyError::SvdFailed => CalibError::Numerical(e.to_string()),
        }
    }
}

/// Estimate `H` such that `image ~ H · world` with the normalized DLT.
///
/// Both point sets are Hartley-normalized before building the design
/// matrix; the result is scaled so that `H[2, 2] == 1` when that entry is
/// not vanishing.
pub fn dlt_homography(world: &[Pt2], image: &[Pt2]) -> Result<Mat3, HomographyError> {
    let n = world.len();
    if image.len() != n {
        return Err(HomographyError::LengthMismatch(n, image.len()));
    }
    if n < 4 {
        return Err(HomographyError::NotEnoughPoints(n));
    }

    let (wn, tw) = normalize_points_2d(world).ok_or(HomographyError::Degenerate)?;
    let (im, ti) = normalize_points_2d(image).ok_or(HomographyError::Degenerate)?;

    let mut a = DMatrix::<Real>::zeros(2 * n, 9);
    for (i, (pw, pi)) in wn.iter().zip(im.iter()).enumerate() {
        let (x, y, u, v) = (pw.x, pw.y, pi.x, pi.y);
        let r0 = 2 * i;
        let r1 = r0 + 1;

        a[(r0, 0)] = -x;
        a[(r0, 1)] = -y;
        a[(r0, 2)] = -1.0;
        a[(r0, 6)] = u * x;
        a[(r0, 7)] = u * y;
        a[(r0, 8)] = u;

        a[(r1, 3)] = -x;
        a[(r1, 4)] = -y;
        a[(r1, 5)] = -1.0;
        a[(r1, 6)] = v * x;
        a[(r1, 7)] = v * y;
        a[(r1, 8)] = v;
    }

    let (h, sv) = null_vector(&a).ok_or(HomographyError::SvdFailed)?;
    // A second vanishing singular value means the null space is not unique.
    if sv[7] <= 1e-10 * sv[0] {
        return Err(HomographyError::Degenerate);
    }

    let ti_inv = ti.try_inverse().ok_or(HomographyError::Degenerate)?;
    let mut h_mat = ti_inv * mat3_from_vec(&h) * tw;

    let scale = h_mat[(2, 2)];
    if scale.abs() > Real::EPSILON {
        h_mat /= scale;
    }
    Ok(h_mat)
}

/// Map a point through `H`.
pub fn apply_homography(h: &Mat3, p: &Pt2) -> Pt2 {
    from_homogeneous(&(h * to_homogeneous(p)))
}

/// RMS transfer error of `H` over a correspondence set (pixels).
pub fn homography_rms(h: &Mat3, world: &[Pt2], image: &[Pt2]) -> Real {
    if world.is_empty() {
        return 0.0;
    }
    let sum: Real = world
        .iter()
        .zip(image)
        .map(|(w, i)| (apply_homography(h, w) - *i).norm_squared())
        .sum();
    (sum / world.len() as Real).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_maps_to_scaled_square() {
        let w = vec![
            Pt2::new(0.0, 0.0),
            Pt2::new(1.0, 0.0),
            Pt2::new(1.0, 1.0),
            Pt2::new(0.0, 1.0),
        ];
        let img = vec![
            Pt2::new(10.0, 20.0),
            Pt2::new(12.0, 20.0),
            Pt2::new(12.0, 22.0),
            Pt2::new(10.0, 22.0),
        ];
        let h = dlt_homography(&w, &img).unwrap();
        assert!((h[(0, 0)] - 2.0).abs() < 1e-9);
        assert!((h[(0, 2)] - 10.0).abs() < 1e-9);
        assert!(homography_rms(&h, &w, &img) < 1e-9);
    }

    #[test]
    fn perspective_homography_is_recovered() {
        let h_gt = Mat3::new(1.2, 0.1, 300.0, -0.05, 0.9, 200.0, 1e-4, -2e-4, 1.0);
        let w: Vec<Pt2> = (0..5)
            .flat_map(|j| (0..6).map(move |i| Pt2::new(i as Real * 25.0, j as Real * 25.0)))
            .collect();
        let img: Vec<Pt2> = w.iter().map(|p| apply_homography(&h_gt, p)).collect();
        let h = dlt_homography(&w, &img).unwrap();
        assert!((h - h_gt).norm() < 1e-6 * h_gt.norm());
    }

    #[test]
    fn collinear_points_are_rejected() {
        let w: Vec<Pt2> = (0..6).map(|i| Pt2::new(i as Real, 0.0)).collect();
        let img: Vec<Pt2> = (0..6).map(|i| Pt2::new(2.0 * i as Real, 1.0)).collect();
        assert_eq!(dlt_homography(&w, &img), Err(HomographyError::Degenerate));
        assert_eq!(
            dlt_homography(&w[..3], &img[..3]),
            Err(HomographyError::NotEnoughPoints(3))
        );
    }
}
