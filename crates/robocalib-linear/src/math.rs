//! Numerical helpers shared by the linear solvers.

use nalgebra::{DMatrix, DVector, Matrix3x4, SymmetricEigen};
use robocalib_core::{Mat3, Mat4, Pt2, Pt3, Real, Vec3};

/// Hartley normalization for 2D points.
///
/// Centers the points and scales them so the mean distance from the origin
/// is `√2`. Returns the normalized points and `T` with `p_norm = T · p`.
/// `None` if the input is empty or all points coincide.
pub fn normalize_points_2d(points: &[Pt2]) -> Option<(Vec<Pt2>, Mat3)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as Real;
    let (sx, sy) = points.iter().fold((0.0, 0.0), |(x, y), p| (x + p.x, y + p.y));
    let (cx, cy) = (sx / n, sy / n);
    let mean_dist = points
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<Real>()
        / n;
    if mean_dist <= Real::EPSILON {
        return None;
    }
    let s = Real::sqrt(2.0) / mean_dist;
    let t = Mat3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let norm = points
        .iter()
        .map(|p| Pt2::new((p.x - cx) * s, (p.y - cy) * s))
        .collect();
    Some((norm, t))
}

/// Hartley normalization for 3D points (mean distance `√3`).
pub fn normalize_points_3d(points: &[Pt3]) -> Option<(Vec<Pt3>, Mat4)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as Real;
    let c = points.iter().fold(Vec3::zeros(), |acc, p| acc + p.coords) / n;
    let mean_dist = points.iter().map(|p| (p.coords - c).norm()).sum::<Real>() / n;
    if mean_dist <= Real::EPSILON {
        return None;
    }
    let s = Real::sqrt(3.0) / mean_dist;
    #[rustfmt::skip]
    let t = Mat4::new(
        s, 0.0, 0.0, -s * c.x,
        0.0, s, 0.0, -s * c.y,
        0.0, 0.0, s, -s * c.z,
        0.0, 0.0, 0.0, 1.0,
    );
    let norm = points.iter().map(|p| Pt3::from((p.coords - c) * s)).collect();
    Some((norm, t))
}

/// Right singular vector of `a` for its smallest singular value, together
/// with all singular values sorted in descending order.
///
/// Wide systems are padded with zero rows so the null space is always part
/// of the decomposition.
pub fn null_vector(a: &DMatrix<Real>) -> Option<(DVector<Real>, Vec<Real>)> {
    let ncols = a.ncols();
    let padded;
    let a = if a.nrows() < ncols {
        let mut m = DMatrix::<Real>::zeros(ncols, ncols);
        m.view_mut((0, 0), (a.nrows(), ncols)).copy_from(a);
        padded = m;
        &padded
    } else {
        a
    };
    let svd = a.clone().svd(false, true);
    let v_t = svd.v_t?;
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|(_, x), (_, y)| x.total_cmp(y))?;
    let v = v_t.row(min_idx).transpose();
    let mut sv: Vec<Real> = svd.singular_values.iter().copied().collect();
    sv.sort_by(|x, y| y.total_cmp(x));
    Some((v, sv))
}

/// Reshape a 9-vector into a row-major 3×3 matrix.
pub fn mat3_from_vec(v: &DVector<Real>) -> Mat3 {
    Mat3::from_fn(|r, c| v[3 * r + c])
}

/// Reshape a 12-vector into a row-major 3×4 matrix.
pub fn mat34_from_vec(v: &DVector<Real>) -> Matrix3x4<Real> {
    Matrix3x4::from_fn(|r, c| v[4 * r + c])
}

/// Centroid, principal axes (columns, by decreasing spread) and the
/// corresponding RMS spreads of a 3D point cloud.
pub fn principal_axes(points: &[Pt3]) -> (Vec3, Mat3, [Real; 3]) {
    let n = points.len().max(1) as Real;
    let c = points.iter().fold(Vec3::zeros(), |acc, p| acc + p.coords) / n;
    let mut cov = Mat3::zeros();
    for p in points {
        let d = p.coords - c;
        cov += d * d.transpose();
    }
    cov /= n;

    let eig = SymmetricEigen::new(cov);
    let mut order = [0usize, 1, 2];
    order.sort_by(|&i, &j| eig.eigenvalues[j].total_cmp(&eig.eigenvalues[i]));
    let mut axes = Mat3::zeros();
    let mut spread = [0.0; 3];
    for (dst, &src) in order.iter().enumerate() {
        axes.set_column(dst, &eig.eigenvectors.column(src));
        spread[dst] = eig.eigenvalues[src].max(0.0).sqrt();
    }
    (c, axes, spread)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_2d_points_are_centered() {
        let pts = vec![
            Pt2::new(100.0, 200.0),
            Pt2::new(200.0, 300.0),
            Pt2::new(150.0, 250.0),
        ];
        let (norm, t) = normalize_points_2d(&pts).unwrap();
        let cx = norm.iter().map(|p| p.x).sum::<Real>() / 3.0;
        let mean = norm.iter().map(|p| p.coords.norm()).sum::<Real>() / 3.0;
        assert!(cx.abs() < 1e-12);
        assert!((mean - Real::sqrt(2.0)).abs() < 1e-12);
        let mapped = t * Vec3::new(100.0, 200.0, 1.0);
        assert!((mapped.x - norm[0].x).abs() < 1e-12);
    }

    #[test]
    fn coincident_points_cannot_be_normalized() {
        assert!(normalize_points_2d(&[Pt2::new(1.0, 1.0); 4]).is_none());
        assert!(normalize_points_3d(&[]).is_none());
    }

    #[test]
    fn null_vector_of_wide_system() {
        // x + y - z = 0 and x - y = 0: null space along (1, 1, 2).
        let a = DMatrix::from_row_slice(2, 3, &[1.0, 1.0, -1.0, 1.0, -1.0, 0.0]);
        let (v, sv) = null_vector(&a).unwrap();
        let v = &v / v[0];
        assert!((v[1] - 1.0).abs() < 1e-12 && (v[2] - 2.0).abs() < 1e-12);
        assert_eq!(sv.len(), 3);
        assert!(sv[2].abs() < 1e-12);
    }

    #[test]
    fn principal_axes_of_a_line() {
        let pts: Vec<Pt3> = (0..5).map(|i| Pt3::new(i as Real, 2.0 * i as Real, 0.0)).collect();
        let (_, axes, spread) = principal_axes(&pts);
        assert!(spread[1] < 1e-9 && spread[0] > 1.0);
        let dir = axes.column(0);
        assert!((dir.x.abs() * 2.0 - dir.y.abs()).abs() < 1e-9);
    }
}
