//! Synthetic checkerboard images for end-to-end tests.
//!
//! Every sub-sample of every pixel is back-projected through the camera
//! (undistorted, then intersected with the board plane) and takes the colour
//! of the square it lands on. The board carries `(x + 1) × (y + 1)` squares
//! around its `x × y` inner corners; everything off the board is light.

use image::{GrayImage, Luma};
use robocalib_core::{CalibrationTarget, CameraIntrinsics, Iso3, Pt2, Pt3, Real, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Sub-samples per pixel along each axis.
    pub supersample: u32,
    pub dark: u8,
    pub light: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            supersample: 4,
            dark: 30,
            light: 225,
        }
    }
}

/// Pixel rectangle `[x0, x1) × [y0, y1)` that can contain board pixels.
fn board_bounds(
    camera: &CameraIntrinsics,
    target: &CalibrationTarget,
    cam_from_board: &Iso3,
) -> (u32, u32, u32, u32) {
    let size = camera.image_size();
    let full = (0, 0, size.width, size.height);
    let s = target.square_size_mm();
    let (x0, y0) = (-s, -s);
    let x1 = target.inner_corners_x() as Real * s;
    let y1 = target.inner_corners_y() as Real * s;

    const STEPS: usize = 32;
    let mut lo = Pt2::new(Real::MAX, Real::MAX);
    let mut hi = Pt2::new(Real::MIN, Real::MIN);
    for k in 0..=STEPS {
        let t = k as Real / STEPS as Real;
        let edge = [
            Pt3::new(x0 + t * (x1 - x0), y0, 0.0),
            Pt3::new(x0 + t * (x1 - x0), y1, 0.0),
            Pt3::new(x0, y0 + t * (y1 - y0), 0.0),
            Pt3::new(x1, y0 + t * (y1 - y0), 0.0),
        ];
        for p in edge {
            // Part of the board behind the camera: fall back to the whole image.
            let Some(px) = camera.project_through(cam_from_board, &p) else {
                return full;
            };
            lo = Pt2::new(lo.x.min(px.x), lo.y.min(px.y));
            hi = Pt2::new(hi.x.max(px.x), hi.y.max(px.y));
        }
    }

    let margin = 3.0;
    let clamp_x = |v: Real| v.clamp(0.0, size.width as Real) as u32;
    let clamp_y = |v: Real| v.clamp(0.0, size.height as Real) as u32;
    (
        clamp_x((lo.x - margin).floor()),
        clamp_y((lo.y - margin).floor()),
        clamp_x((hi.x + margin).ceil() + 1.0),
        clamp_y((hi.y + margin).ceil() + 1.0),
    )
}

/// Render the target seen through `camera` at `cam_from_board` (`T_cam_board`).
pub fn render_checkerboard(
    camera: &CameraIntrinsics,
    target: &CalibrationTarget,
    cam_from_board: &Iso3,
    opts: &RenderOptions,
) -> GrayImage {
    let size = camera.image_size();
    let mut img = GrayImage::from_pixel(size.width, size.height, Luma([opts.light]));

    let board_from_cam = cam_from_board.inverse();
    let origin = board_from_cam.translation.vector;
    let s = target.square_size_mm();
    let nx = target.inner_corners_x() as i64;
    let ny = target.inner_corners_y() as i64;

    let is_dark = |sub: Pt2| -> bool {
        let n = camera.normalize_pixel(&sub);
        let dir = board_from_cam.rotation * Vec3::new(n.x, n.y, 1.0);
        if dir.z.abs() < 1e-12 {
            return false;
        }
        let lambda = -origin.z / dir.z;
        if lambda <= 0.0 {
            return false;
        }
        let hit = origin + dir * lambda;
        let sx = (hit.x / s).floor() as i64 + 1;
        let sy = (hit.y / s).floor() as i64 + 1;
        if sx < 0 || sy < 0 || sx > nx || sy > ny {
            return false;
        }
        (sx + sy) % 2 == 0
    };

    let ss = opts.supersample.max(1);
    let n_sub = (ss * ss) as Real;
    let dark = opts.dark as Real;
    let light = opts.light as Real;
    let (x0, y0, x1, y1) = board_bounds(camera, target, cam_from_board);
    for y in y0..y1 {
        for x in x0..x1 {
            let mut dark_count = 0u32;
            for sy in 0..ss {
                for sx in 0..ss {
                    let u = x as Real - 0.5 + (sx as Real + 0.5) / ss as Real;
                    let v = y as Real - 0.5 + (sy as Real + 0.5) / ss as Real;
                    if is_dark(Pt2::new(u, v)) {
                        dark_count += 1;
                    }
                }
            }
            let frac = dark_count as Real / n_sub;
            let value = light + (dark - light) * frac;
            img.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use robocalib_core::synthetic::planar::board_pose;
    use robocalib_core::{BrownConrady5, ImageSize, PinholeParams};

    #[test]
    fn frontal_board_has_expected_squares() {
        let camera = CameraIntrinsics::new(
            PinholeParams {
                fx: 500.0,
                fy: 500.0,
                cx: 160.0,
                cy: 120.0,
            },
            BrownConrady5::default(),
            ImageSize::new(320, 240),
        );
        let target = CalibrationTarget::new(4, 3, 20.0).unwrap();
        let pose = board_pose(&target, 500.0, 0.0, 0.0, 0.0);
        let img = render_checkerboard(&camera, &target, &pose, &RenderOptions::default());

        // Squares are 20 px wide; corner (0, 0) projects to (130, 100).
        assert_eq!(img.get_pixel(120, 90)[0], 30);
        assert_eq!(img.get_pixel(140, 90)[0], 225);
        assert_eq!(img.get_pixel(120, 110)[0], 225);
        assert_eq!(img.get_pixel(140, 110)[0], 30);
        // Outside the board.
        assert_eq!(img.get_pixel(5, 5)[0], 225);
    }
}
