//! Packing of model quantities into optimizer parameter vectors.

use nalgebra::{DVector, Translation3, UnitQuaternion};
use robocalib_core::{BrownConrady5, Iso3, PinholeParams, Real, Vec3};

/// Parameters per rigid pose: rotation vector then translation.
pub const POSE_DIM: usize = 6;
/// `fx, fy, cx, cy, k1, k2, p1, p2, k3`.
pub const INTRINSICS_DIM: usize = 9;

pub fn write_pose(x: &mut DVector<Real>, offset: usize, pose: &Iso3) {
    let r = pose.rotation.scaled_axis();
    let t = pose.translation.vector;
    for (k, v) in [r.x, r.y, r.z, t.x, t.y, t.z].into_iter().enumerate() {
        x[offset + k] = v;
    }
}

pub fn read_pose(x: &DVector<Real>, offset: usize) -> Iso3 {
    let r = Vec3::new(x[offset], x[offset + 1], x[offset + 2]);
    let t = Vec3::new(x[offset + 3], x[offset + 4], x[offset + 5]);
    Iso3::from_parts(Translation3::from(t), UnitQuaternion::from_scaled_axis(r))
}

pub fn intrinsics_to_array(k: &PinholeParams, d: &BrownConrady5) -> [Real; INTRINSICS_DIM] {
    [k.fx, k.fy, k.cx, k.cy, d.k1, d.k2, d.p1, d.p2, d.k3]
}

pub fn intrinsics_from_array(a: &[Real; INTRINSICS_DIM]) -> (PinholeParams, BrownConrady5) {
    (
        PinholeParams {
            fx: a[0],
            fy: a[1],
            cx: a[2],
            cy: a[3],
        },
        BrownConrady5::from_coeffs([a[4], a[5], a[6], a[7], a[8]]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use robocalib_core::rotation_angle_between;

    #[test]
    fn pose_survives_packing() {
        let pose = Iso3::from_parts(
            Translation3::new(1.0, -2.0, 300.0),
            UnitQuaternion::from_euler_angles(0.3, -0.2, 1.1),
        );
        let mut x = DVector::zeros(8);
        write_pose(&mut x, 2, &pose);
        let back = read_pose(&x, 2);
        assert!(rotation_angle_between(&pose, &back) < 1e-12);
        assert_eq!(back.translation, pose.translation);
    }
}
