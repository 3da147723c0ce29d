//! Rigid-pose helpers on top of [`Iso3`].
//!
//! Stored poses use the `T_a_b` convention (points in `b` mapped into `a`).
//! The helpers here convert between the representations external consumers
//! exchange: Rodrigues rotation vectors, row-major 4×4 transformation matrices
//! and XYZ Euler angles in degrees.

use nalgebra::{Rotation3, Translation3, UnitQuaternion};
use serde::{Deserialize, Serialize};

use crate::{is_proper_rotation, project_to_so3, CalibError, CalibResult, Iso3, Mat3, Real, Vec3};

/// Row-major homogeneous 4×4 matrix as exchanged with external consumers.
pub type Matrix4Rows = [[Real; 4]; 4];

/// Build a pose from a Rodrigues rotation vector and a translation.
pub fn pose_from_rvec_tvec(rvec: &Vec3, tvec: &Vec3) -> Iso3 {
    Iso3::from_parts(
        Translation3::from(*tvec),
        UnitQuaternion::from_scaled_axis(*rvec),
    )
}

/// Rodrigues rotation vector (axis × angle) of a pose.
pub fn rotation_vector(pose: &Iso3) -> Vec3 {
    pose.rotation.scaled_axis()
}

/// 3×3 rotation matrix of a pose.
pub fn rotation_matrix(pose: &Iso3) -> Mat3 {
    pose.rotation.to_rotation_matrix().into_inner()
}

/// Row-major 4×4 homogeneous matrix of a pose.
pub fn pose_to_matrix4(pose: &Iso3) -> Matrix4Rows {
    let m = pose.to_homogeneous();
    let mut rows = [[0.0; 4]; 4];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, value) in row.iter_mut().enumerate() {
            *value = m[(r, c)];
        }
    }
    rows
}

/// Parse a row-major 4×4 homogeneous matrix into a pose.
///
/// The rotation block is re-orthonormalized; a block further than `1e-3` from a
/// proper rotation or a bottom row other than `[0, 0, 0, 1]` is rejected.
pub fn pose_from_matrix4(rows: &Matrix4Rows) -> CalibResult<Iso3> {
    let bottom = rows[3];
    if bottom[0].abs() > 1e-9 || bottom[1].abs() > 1e-9 || bottom[2].abs() > 1e-9 {
        return Err(CalibError::Numerical(
            "transformation matrix bottom row must be [0, 0, 0, 1]".to_string(),
        ));
    }
    if (bottom[3] - 1.0).abs() > 1e-9 {
        return Err(CalibError::Numerical(
            "transformation matrix is not normalized (m33 != 1)".to_string(),
        ));
    }

    let r = Mat3::new(
        rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
        rows[2][1], rows[2][2],
    );
    if !is_proper_rotation(&r, 1e-3) {
        return Err(CalibError::Numerical(
            "rotation block is not a proper rotation".to_string(),
        ));
    }
    let rotation = rotation_from_matrix(&r)?;
    let t = Vec3::new(rows[0][3], rows[1][3], rows[2][3]);
    Ok(Iso3::from_parts(Translation3::from(t), rotation))
}

/// Nearest proper rotation of `m` as a unit quaternion.
pub fn rotation_from_matrix(m: &Mat3) -> CalibResult<UnitQuaternion<Real>> {
    let r = project_to_so3(m)
        .ok_or_else(|| CalibError::Numerical("svd failed projecting onto SO(3)".to_string()))?;
    Ok(UnitQuaternion::from_rotation_matrix(
        &Rotation3::from_matrix_unchecked(r),
    ))
}

/// Re-orthonormalize the rotation part of a pose.
///
/// Quaternion-backed poses drift slowly off the unit sphere under long chains
/// of compositions; this renormalizes and returns a pose whose rotation
/// matrix satisfies `R·Rᵀ = I` to machine precision.
pub fn orthonormalize(pose: &Iso3) -> Iso3 {
    let q = pose.rotation.into_inner().normalize();
    Iso3::from_parts(pose.translation, UnitQuaternion::new_unchecked(q))
}

/// XYZ (roll, pitch, yaw) Euler angles in degrees.
pub fn euler_xyz_deg(pose: &Iso3) -> [Real; 3] {
    let (roll, pitch, yaw) = pose.rotation.euler_angles();
    [roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees()]
}

/// Rotation angle in radians between the rotation parts of two poses.
pub fn rotation_angle_between(a: &Iso3, b: &Iso3) -> Real {
    a.rotation.angle_to(&b.rotation)
}

/// Difference between two poses, as shown by history comparison screens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseDelta {
    /// Component-wise difference of the Rodrigues vectors (`a - b`).
    pub rotation_vector_delta: [Real; 3],
    /// Component-wise difference of the translations (`a - b`).
    pub translation_delta: [Real; 3],
    /// Geodesic rotation angle between the two poses (radians).
    pub rotation_angle_rad: Real,
    /// Euclidean distance between the translations.
    pub translation_distance: Real,
}

/// Compare two poses.
pub fn pose_difference(a: &Iso3, b: &Iso3) -> PoseDelta {
    let dr = rotation_vector(a) - rotation_vector(b);
    let dt = a.translation.vector - b.translation.vector;
    PoseDelta {
        rotation_vector_delta: [dr.x, dr.y, dr.z],
        translation_delta: [dt.x, dt.y, dt.z],
        rotation_angle_rad: rotation_angle_between(a, b),
        translation_distance: dt.norm(),
    }
}
