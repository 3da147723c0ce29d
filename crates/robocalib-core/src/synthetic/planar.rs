//! Synthetic planar target views.

use nalgebra::{Rotation3, Translation3, UnitQuaternion};

use super::noise::PixelNoise;
use crate::{CalibrationTarget, CameraIntrinsics, DetectedCorners, Iso3, Pt2, Real, Vec3};

/// Board pose in the camera frame (`T_cam_board`) that places the board
/// center on the optical axis at `distance`, rotated by XYZ Euler angles.
///
/// With zero angles the board x axis maps to image +x and the board y axis
/// to image +y.
pub fn board_pose(
    target: &CalibrationTarget,
    distance: Real,
    roll: Real,
    pitch: Real,
    yaw: Real,
) -> Iso3 {
    let rotation = Rotation3::from_euler_angles(roll, pitch, yaw);
    let center = target.center().coords;
    let t = Vec3::new(0.0, 0.0, distance) - rotation * center;
    Iso3::from_parts(Translation3::from(t), UnitQuaternion::from(rotation))
}

/// `n_views` well-conditioned board poses: tilts of about 20° about varying
/// in-plane axes, slight roll, distance varied by ±10 %.
pub fn tilted_board_poses(target: &CalibrationTarget, n_views: usize, distance: Real) -> Vec<Iso3> {
    (0..n_views)
        .map(|k| {
            let phase = 0.3 + 2.0 * std::f64::consts::PI * k as Real / n_views.max(1) as Real;
            let roll = 0.35 * phase.sin();
            let pitch = 0.35 * phase.cos();
            let yaw = 0.1 * (2.0 * phase).sin();
            let scale = 1.0 + 0.1 * ((k % 3) as Real - 1.0);
            board_pose(target, distance * scale, roll, pitch, yaw)
        })
        .collect()
}

/// Fronto-parallel poses (rotation about the optical axis only). These do not
/// constrain the intrinsics and exist to exercise degeneracy detection.
pub fn frontal_board_poses(target: &CalibrationTarget, n_views: usize, distance: Real) -> Vec<Iso3> {
    (0..n_views)
        .map(|k| {
            let yaw = 0.05 * k as Real;
            let mut pose = board_pose(target, distance * (1.0 + 0.05 * k as Real), 0.0, 0.0, yaw);
            pose.translation.vector.x += 5.0 * k as Real;
            pose
        })
        .collect()
}

/// Project the target through `cam_from_board`.
///
/// Returns a failed detection if any corner falls behind the camera or
/// outside the image, mirroring what a detector would report.
pub fn project_corners(
    camera: &CameraIntrinsics,
    target: &CalibrationTarget,
    cam_from_board: &Iso3,
    image_index: usize,
) -> DetectedCorners {
    let size = camera.image_size();
    let mut pixels = Vec::with_capacity(target.corner_count());
    for p in target.object_points() {
        let Some(px) = camera.project_through(cam_from_board, &p) else {
            return DetectedCorners::not_found(image_index);
        };
        let inside = px.x >= 0.0
            && px.y >= 0.0
            && px.x <= size.width as Real - 1.0
            && px.y <= size.height as Real - 1.0;
        if !inside {
            return DetectedCorners::not_found(image_index);
        }
        pixels.push(px);
    }
    DetectedCorners::found(image_index, pixels, target)
        .unwrap_or_else(|_| DetectedCorners::not_found(image_index))
}

/// Project several views, indexing them in order.
pub fn project_views(
    camera: &CameraIntrinsics,
    target: &CalibrationTarget,
    poses: &[Iso3],
) -> Vec<DetectedCorners> {
    poses
        .iter()
        .enumerate()
        .map(|(idx, pose)| project_corners(camera, target, pose, idx))
        .collect()
}

/// Project several views and perturb every corner with deterministic noise.
pub fn project_views_noisy(
    camera: &CameraIntrinsics,
    target: &CalibrationTarget,
    poses: &[Iso3],
    noise: &PixelNoise,
) -> Vec<DetectedCorners> {
    project_views(camera, target, poses)
        .into_iter()
        .map(|view| {
            if !view.success() {
                return view;
            }
            let idx = view.image_index();
            let noisy: Vec<Pt2> = view
                .points()
                .iter()
                .enumerate()
                .map(|(pt_idx, p)| noise.apply(idx, pt_idx, *p))
                .collect();
            DetectedCorners::found(idx, noisy, target).unwrap_or(view)
        })
        .collect()
}
