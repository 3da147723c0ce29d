use log::debug;
use nalgebra::{DMatrix, Rotation3, Translation3, UnitQuaternion};
use robocalib_core::{
    project_to_so3, CalibError, CalibResult, CameraIntrinsics, Iso3, Mat3, Pt2, Pt3, Real, Vec2,
};

use crate::{
    dlt_homography,
    math::{mat34_from_vec, normalize_points_3d, null_vector, principal_axes},
    PlanarPoseSolver,
};

/// Relative spread below which an axis of the point cloud counts as empty.
const FLAT_RATIO: Real = 1e-6;

/// Shape of a set of object points, as seen by the PnP initializers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLayout {
    /// All points lie on one plane (e.g. a checkerboard).
    Planar,
    /// Points span three dimensions.
    General,
}

/// Classify object points, rejecting coincident or collinear sets.
pub fn classify_points(object: &[Pt3]) -> CalibResult<PointLayout> {
    if object.len() < 4 {
        return Err(CalibError::InsufficientGeometry(format!(
            "pose needs at least 4 points, got {}",
            object.len()
        )));
    }
    let (_, _, spread) = principal_axes(object);
    if spread[0] <= Real::EPSILON || spread[1] < FLAT_RATIO * spread[0] {
        return Err(CalibError::InsufficientGeometry(
            "object points are collinear".into(),
        ));
    }
    Ok(if spread[2] < FLAT_RATIO * spread[0] {
        PointLayout::Planar
    } else {
        PointLayout::General
    })
}

/// Linear PnP initializers working on ideal normalized coordinates
/// (`K⁻¹ · undistorted pixel`). Both return `T_cam_object`.
#[derive(Debug, Clone, Copy)]
pub struct PnpSolver;

impl PnpSolver {
    /// Pose from coplanar object points via a plane homography.
    ///
    /// Points are first expressed in a frame aligned with their best-fit
    /// plane, so the plane need not be `Z = 0` in object coordinates.
    pub fn planar(object: &[Pt3], normalized: &[Vec2]) -> CalibResult<Iso3> {
        check_lengths(object, normalized)?;
        let (c, axes, _) = principal_axes(object);
        let e1 = axes.column(0).into_owned();
        let e2 = axes.column(1).into_owned();
        let n = e1.cross(&e2);
        let r_obj_plane = Mat3::from_columns(&[e1, e2, n]);
        let obj_from_plane = Iso3::from_parts(
            Translation3::from(c),
            UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r_obj_plane)),
        );

        let local: Vec<Pt2> = object
            .iter()
            .map(|p| {
                let d = p.coords - c;
                Pt2::new(e1.dot(&d), e2.dot(&d))
            })
            .collect();
        let image: Vec<Pt2> = normalized.iter().map(|v| Pt2::from(*v)).collect();

        let h = dlt_homography(&local, &image)?;
        let cam_from_plane = PlanarPoseSolver::from_homography(&Mat3::identity(), &h)?;
        Ok(cam_from_plane * obj_from_plane.inverse())
    }

    /// Pose from non-coplanar object points via the 3D DLT (at least 6).
    pub fn dlt(object: &[Pt3], normalized: &[Vec2]) -> CalibResult<Iso3> {
        check_lengths(object, normalized)?;
        let n = object.len();
        if n < 6 {
            return Err(CalibError::InsufficientGeometry(format!(
                "non-planar pose needs at least 6 points, got {n}"
            )));
        }
        let (obj_n, t_obj) = normalize_points_3d(object).ok_or_else(|| {
            CalibError::InsufficientGeometry("object points coincide".into())
        })?;

        let mut a = DMatrix::<Real>::zeros(2 * n, 12);
        for (i, (pw, pi)) in obj_n.iter().zip(normalized).enumerate() {
            let xw = [pw.x, pw.y, pw.z, 1.0];
            let (u, v) = (pi.x, pi.y);
            for (c, &x) in xw.iter().enumerate() {
                a[(2 * i, c)] = x;
                a[(2 * i, 8 + c)] = -u * x;
                a[(2 * i + 1, 4 + c)] = x;
                a[(2 * i + 1, 8 + c)] = -v * x;
            }
        }

        let (p, _) = null_vector(&a)
            .ok_or_else(|| CalibError::Numerical("svd failed in PnP DLT".into()))?;
        let mut p_mtx = mat34_from_vec(&p) * t_obj;

        let m = p_mtx.fixed_view::<3, 3>(0, 0).into_owned();
        if m.determinant() < 0.0 {
            p_mtx = -p_mtx;
        }
        let m = p_mtx.fixed_view::<3, 3>(0, 0).into_owned();
        let s = (m.row(0).norm() + m.row(1).norm() + m.row(2).norm()) / 3.0;
        if !(s.is_finite() && s > 0.0) {
            return Err(CalibError::Numerical("PnP DLT produced a null camera matrix".into()));
        }
        let r = project_to_so3(&(m / s))
            .ok_or_else(|| CalibError::Numerical("svd failed in PnP DLT".into()))?;
        let t = p_mtx.column(3) / s;

        Ok(Iso3::from_parts(
            Translation3::from(t),
            UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r)),
        ))
    }
}

fn check_lengths(object: &[Pt3], image: &[Vec2]) -> CalibResult<()> {
    if object.len() != image.len() {
        return Err(CalibError::DimensionMismatch {
            expected: object.len(),
            got: image.len(),
        });
    }
    Ok(())
}

/// Linear `T_cam_object` from pixel observations.
///
/// Pixels are undistorted and normalized with `camera`, then the planar or
/// general initializer is chosen from the layout of `object`.
pub fn solve_pnp_linear(
    object: &[Pt3],
    image: &[Pt2],
    camera: &CameraIntrinsics,
) -> CalibResult<Iso3> {
    if object.len() != image.len() {
        return Err(CalibError::DimensionMismatch {
            expected: object.len(),
            got: image.len(),
        });
    }
    let layout = classify_points(object)?;
    let normalized: Vec<Vec2> = image.iter().map(|px| camera.normalize_pixel(px)).collect();
    debug!("pnp: {} points, layout {:?}", object.len(), layout);
    match layout {
        PointLayout::Planar => PnpSolver::planar(object, &normalized),
        PointLayout::General => PnpSolver::dlt(object, &normalized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robocalib_core::{
        rotation_angle_between, BrownConrady5, CalibrationTarget, ImageSize, PinholeParams,
    };

    fn camera(dist: BrownConrady5) -> CameraIntrinsics {
        CameraIntrinsics::new(
            PinholeParams {
                fx: 800.0,
                fy: 800.0,
                cx: 320.0,
                cy: 240.0,
            },
            dist,
            ImageSize::new(640, 480),
        )
    }

    fn gt_pose() -> Iso3 {
        Iso3::from_parts(
            Translation3::new(-60.0, -40.0, 650.0),
            UnitQuaternion::from_euler_angles(0.2, -0.15, 0.05),
        )
    }

    fn project(cam: &CameraIntrinsics, pose: &Iso3, pts: &[Pt3]) -> Vec<Pt2> {
        pts.iter()
            .map(|p| cam.project_through(pose, p).unwrap())
            .collect()
    }

    #[test]
    fn planar_board_pose_is_exact_without_noise() {
        let cam = camera(BrownConrady5 {
            k1: -0.1,
            k2: 0.02,
            ..Default::default()
        });
        let object = CalibrationTarget::new(9, 6, 20.0).unwrap().object_points();
        let image = project(&cam, &gt_pose(), &object);
        let est = solve_pnp_linear(&object, &image, &cam).unwrap();
        assert!((est.translation.vector - gt_pose().translation.vector).norm() < 1e-4);
        assert!(rotation_angle_between(&est, &gt_pose()) < 1e-7);
    }

    #[test]
    fn tilted_plane_in_object_frame() {
        let cam = camera(BrownConrady5::default());
        let r = Rotation3::from_euler_angles(0.4, 0.3, 0.0);
        let object: Vec<Pt3> = (0..4)
            .flat_map(|j| (0..5).map(move |i| Pt3::new(i as Real * 30.0, j as Real * 30.0, 0.0)))
            .map(|p| r * p + nalgebra::Vector3::new(5.0, 5.0, 5.0))
            .collect();
        assert_eq!(classify_points(&object).unwrap(), PointLayout::Planar);
        let image = project(&cam, &gt_pose(), &object);
        let est = solve_pnp_linear(&object, &image, &cam).unwrap();
        assert!((est.translation.vector - gt_pose().translation.vector).norm() < 1e-4);
    }

    #[test]
    fn general_points_use_dlt() {
        let cam = camera(BrownConrady5::default());
        let object: Vec<Pt3> = (0..12)
            .map(|i| {
                let f = i as Real;
                Pt3::new(
                    40.0 * (f * 1.3).sin(),
                    30.0 * (f * 0.7).cos(),
                    25.0 * (f * 2.1).sin(),
                )
            })
            .collect();
        assert_eq!(classify_points(&object).unwrap(), PointLayout::General);
        let image = project(&cam, &gt_pose(), &object);
        let est = solve_pnp_linear(&object, &image, &cam).unwrap();
        assert!((est.translation.vector - gt_pose().translation.vector).norm() < 1e-3);
        assert!(rotation_angle_between(&est, &gt_pose()) < 1e-6);
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        let line: Vec<Pt3> = (0..6).map(|i| Pt3::new(i as Real, 0.0, 0.0)).collect();
        assert!(matches!(
            classify_points(&line),
            Err(CalibError::InsufficientGeometry(_))
        ));
        let three = vec![Pt3::origin(), Pt3::new(1.0, 0.0, 0.0), Pt3::new(0.0, 1.0, 0.0)];
        assert!(matches!(
            classify_points(&three),
            Err(CalibError::InsufficientGeometry(_))
        ));
        let tetra = vec![
            Pt3::origin(),
            Pt3::new(1.0, 0.0, 0.0),
            Pt3::new(0.0, 1.0, 0.0),
            Pt3::new(0.0, 0.0, 1.0),
            Pt3::new(1.0, 1.0, 1.0),
        ];
        let err = PnpSolver::dlt(&tetra, &[Vec2::zeros(); 5]).unwrap_err();
        assert!(matches!(err, CalibError::InsufficientGeometry(_)));
    }
}
