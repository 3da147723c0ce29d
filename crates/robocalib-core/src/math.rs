use nalgebra::{Isometry3, Matrix3, Matrix4, Point2, Point3, Vector2, Vector3};

pub type Real = f64;

pub type Vec2 = Vector2<Real>;
pub type Vec3 = Vector3<Real>;
pub type Pt2 = Point2<Real>;
pub type Pt3 = Point3<Real>;
pub type Mat3 = Matrix3<Real>;
pub type Mat4 = Matrix4<Real>;
pub type Iso3 = Isometry3<Real>;

pub fn to_homogeneous(p: &Pt2) -> Vec3 {
    Vec3::new(p.x, p.y, 1.0)
}

pub fn from_homogeneous(v: &Vec3) -> Pt2 {
    Pt2::new(v.x / v.z, v.y / v.z)
}

/// Project a general 3×3 matrix to the closest rotation matrix (SO(3)) using SVD.
///
/// Returns `None` if the SVD does not produce both factors.
pub fn project_to_so3(m: &Mat3) -> Option<Mat3> {
    let svd = m.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let mut r = u * v_t;

    // Ensure det(R) > 0
    if r.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r = u_flipped * v_t;
    }
    Some(r)
}

/// Check `R·Rᵀ ≈ I` and `det(R) ≈ 1` within `tol`.
pub fn is_proper_rotation(r: &Mat3, tol: Real) -> bool {
    let orth = (r * r.transpose() - Mat3::identity()).amax();
    orth <= tol && (r.determinant() - 1.0).abs() <= tol
}

/// Ratio `σ_k / σ_0` of `singular_values` after sorting them in descending order.
///
/// Used as a cheap conditioning measure: a ratio near zero for `k` below the
/// expected nullity signals a rank-deficient linear system.
pub fn singular_value_ratio(singular_values: &[Real], k: usize) -> Real {
    let mut sv: Vec<Real> = singular_values.to_vec();
    sv.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    match (sv.first(), sv.get(k)) {
        (Some(&s0), Some(&sk)) if s0 > 0.0 => sk / s0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Rotation3;

    #[test]
    fn project_to_so3_fixes_scaled_rotation() {
        let r = Rotation3::from_euler_angles(0.3, -0.2, 0.7).into_inner();
        let noisy = r * 1.05 + Mat3::from_element(1e-3);
        let fixed = project_to_so3(&noisy).unwrap();
        assert!(is_proper_rotation(&fixed, 1e-9));
        assert!((fixed - r).amax() < 1e-2);
    }

    #[test]
    fn reflection_is_not_a_proper_rotation() {
        let m = Mat3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, -1.0);
        assert!(!is_proper_rotation(&m, 1e-6));
        let fixed = project_to_so3(&m).unwrap();
        assert!(is_proper_rotation(&fixed, 1e-9));
    }

    #[test]
    fn singular_value_ratio_sorts_descending() {
        let ratio = singular_value_ratio(&[1.0, 4.0, 2.0], 1);
        assert!((ratio - 0.5).abs() < 1e-12);
        assert_eq!(singular_value_ratio(&[], 1), 0.0);
    }
}
