//! Robot motion generators for hand-eye problems.
//!
//! Gripper poses are `T_base_gripper`; generated camera poses are
//! `T_cam_target`, the same quantities the solver consumes.

use nalgebra::{Translation3, Unit, UnitQuaternion};

use super::noise::signed_unit;
use crate::{CalibrationSample, Iso3, Real, Vec3};

/// `n` gripper poses with rotation axes spread over the sphere and rotation
/// magnitudes between roughly 17° and 46°, translated around a nominal
/// working point 400 mm in front of the base.
pub fn diverse_gripper_poses(n: usize, seed: u64) -> Vec<Iso3> {
    (0..n)
        .map(|k| {
            let idx = 8 * k as u64;
            let raw = Vec3::new(
                signed_unit(seed, idx),
                signed_unit(seed, idx + 1),
                signed_unit(seed, idx + 2),
            );
            let axis = Unit::try_new(raw, 1e-6).unwrap_or_else(Vec3::z_axis);
            let magnitude = 0.3 + 0.25 * (signed_unit(seed, idx + 3) + 1.0);
            let angle = if k % 2 == 0 { magnitude } else { -magnitude };
            let t = Vec3::new(
                400.0 + 150.0 * signed_unit(seed, idx + 4),
                150.0 * signed_unit(seed, idx + 5),
                300.0 + 100.0 * signed_unit(seed, idx + 6),
            );
            Iso3::from_parts(
                Translation3::from(t),
                UnitQuaternion::from_axis_angle(&axis, angle),
            )
        })
        .collect()
}

/// `n` gripper poses that all rotate about the same `axis`. Relative motions
/// then share a single rotation axis, which leaves the hand-eye rotation
/// unobservable.
pub fn single_axis_gripper_poses(n: usize, axis: Vec3) -> Vec<Iso3> {
    let axis = Unit::try_new(axis, 1e-9).unwrap_or_else(Vec3::z_axis);
    (0..n)
        .map(|k| {
            let angle = 0.25 * k as Real;
            let t = Vec3::new(400.0 + 20.0 * k as Real, 10.0 * k as Real, 300.0);
            Iso3::from_parts(
                Translation3::from(t),
                UnitQuaternion::from_axis_angle(&axis, angle),
            )
        })
        .collect()
}

/// Camera observations for a camera mounted on the gripper.
///
/// `gripper_from_cam` is the unknown hand-eye transform; `base_from_target`
/// places the static target. `T_cam_target = X⁻¹ · G⁻¹ · T_base_target`.
pub fn eye_in_hand_samples(
    gripper_poses: &[Iso3],
    gripper_from_cam: &Iso3,
    base_from_target: &Iso3,
) -> Vec<CalibrationSample> {
    let cam_from_gripper = gripper_from_cam.inverse();
    gripper_poses
        .iter()
        .map(|g| {
            let camera_pose = cam_from_gripper * g.inverse() * base_from_target;
            CalibrationSample::new(camera_pose, *g)
        })
        .collect()
}

/// Camera observations for a static camera watching a target on the gripper.
///
/// `base_from_cam` is the unknown hand-eye transform; `gripper_from_target`
/// places the target on the flange. `T_cam_target = X⁻¹ · G · T_gripper_target`.
pub fn eye_to_hand_samples(
    gripper_poses: &[Iso3],
    base_from_cam: &Iso3,
    gripper_from_target: &Iso3,
) -> Vec<CalibrationSample> {
    let cam_from_base = base_from_cam.inverse();
    gripper_poses
        .iter()
        .map(|g| {
            let camera_pose = cam_from_base * g * gripper_from_target;
            CalibrationSample::new(camera_pose, *g)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diverse_poses_are_deterministic_and_distinct() {
        let a = diverse_gripper_poses(6, 3);
        let b = diverse_gripper_poses(6, 3);
        assert_eq!(a, b);
        let angle = a[0].rotation.angle_to(&a[1].rotation);
        assert!(angle > 0.1);
    }

    #[test]
    fn eye_in_hand_samples_close_the_loop() {
        let x = Iso3::from_parts(
            Translation3::new(10.0, -5.0, 40.0),
            UnitQuaternion::from_euler_angles(0.1, -0.2, 0.3),
        );
        let y = Iso3::translation(500.0, 0.0, 0.0);
        let grippers = diverse_gripper_poses(3, 1);
        for s in eye_in_hand_samples(&grippers, &x, &y) {
            let recovered = s.robot_pose * x * s.camera_pose;
            assert!((recovered.translation.vector - y.translation.vector).norm() < 1e-9);
        }
    }
}
