use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::BrownConrady5;
use crate::{Iso3, Mat3, Pt2, Pt3, Real, Vec2, Vec3};

/// Pinhole parameters of the calibration matrix.
///
/// ```text
/// [ fx   0  cx ]
/// [  0  fy  cy ]
/// [  0   0   1 ]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinholeParams {
    pub fx: Real,
    pub fy: Real,
    pub cx: Real,
    pub cy: Real,
}

impl PinholeParams {
    pub fn k_matrix(&self) -> Mat3 {
        Mat3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    /// Attempt to read pinhole parameters from a 3×3 calibration matrix.
    ///
    /// The matrix is normalized so that `K[2, 2] == 1`; returns `None` if the
    /// structure is not upper triangular within a small tolerance. Skew is
    /// ignored.
    pub fn try_from_k_matrix(k: &Mat3) -> Option<Self> {
        let eps = 1e-9;
        let k33 = k[(2, 2)];
        if k33.abs() < eps {
            return None;
        }
        let k_norm = k / k33;
        if k_norm[(1, 0)].abs() > eps || k_norm[(2, 0)].abs() > eps || k_norm[(2, 1)].abs() > eps {
            return None;
        }
        Some(Self {
            fx: k_norm[(0, 0)],
            fy: k_norm[(1, 1)],
            cx: k_norm[(0, 2)],
            cy: k_norm[(1, 2)],
        })
    }

    /// Map normalized (already distorted) coordinates to pixels.
    pub fn to_pixel(&self, n: &Vec2) -> Pt2 {
        Pt2::new(self.fx * n.x + self.cx, self.fy * n.y + self.cy)
    }

    /// Map pixels to normalized (still distorted) coordinates.
    pub fn from_pixel(&self, px: &Pt2) -> Vec2 {
        Vec2::new((px.x - self.cx) / self.fx, (px.y - self.cy) / self.fy)
    }
}

/// Project a camera-frame point with explicit pinhole and distortion parameters.
///
/// Returns `None` for points on or behind the image plane.
pub fn project_camera_point(
    pinhole: &PinholeParams,
    distortion: &BrownConrady5,
    p_c: &Pt3,
) -> Option<Pt2> {
    if p_c.z <= 0.0 {
        return None;
    }
    let n = Vec2::new(p_c.x / p_c.z, p_c.y / p_c.z);
    Some(pinhole.to_pixel(&distortion.distort(&n)))
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Advisory interpretation of an RMS reprojection error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReprojectionQuality {
    /// RMS below 0.5 px.
    Good,
    /// RMS between 0.5 px and 1.0 px.
    Acceptable,
    /// RMS above 1.0 px; more or better images are recommended.
    Suspect,
}

impl ReprojectionQuality {
    pub fn from_rms(rms_px: Real) -> Self {
        if rms_px < 0.5 {
            Self::Good
        } else if rms_px <= 1.0 {
            Self::Acceptable
        } else {
            Self::Suspect
        }
    }
}

/// Calibrated camera intrinsics.
///
/// A value object: produced once per solver run and never mutated. Re-running
/// the solver produces a new instance stamped with its own creation time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    #[serde(flatten)]
    pinhole: PinholeParams,
    distortion: BrownConrady5,
    image_width: u32,
    image_height: u32,
    rms_reprojection_error: Real,
    created_at_ms: u64,
}

impl CameraIntrinsics {
    /// Intrinsics known from elsewhere (datasheet, stored record); RMS is zero.
    pub fn new(pinhole: PinholeParams, distortion: BrownConrady5, image_size: ImageSize) -> Self {
        Self::from_calibration(pinhole, distortion, image_size, 0.0)
    }

    /// Intrinsics produced by a calibration run.
    pub fn from_calibration(
        pinhole: PinholeParams,
        distortion: BrownConrady5,
        image_size: ImageSize,
        rms_reprojection_error: Real,
    ) -> Self {
        Self {
            pinhole,
            distortion,
            image_width: image_size.width,
            image_height: image_size.height,
            rms_reprojection_error: rms_reprojection_error.max(0.0),
            created_at_ms: now_ms(),
        }
    }

    pub fn fx(&self) -> Real {
        self.pinhole.fx
    }

    pub fn fy(&self) -> Real {
        self.pinhole.fy
    }

    pub fn cx(&self) -> Real {
        self.pinhole.cx
    }

    pub fn cy(&self) -> Real {
        self.pinhole.cy
    }

    pub fn pinhole(&self) -> &PinholeParams {
        &self.pinhole
    }

    pub fn distortion(&self) -> &BrownConrady5 {
        &self.distortion
    }

    pub fn image_size(&self) -> ImageSize {
        ImageSize::new(self.image_width, self.image_height)
    }

    pub fn rms_reprojection_error(&self) -> Real {
        self.rms_reprojection_error
    }

    /// Creation time in milliseconds since the Unix epoch.
    pub fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    pub fn quality(&self) -> ReprojectionQuality {
        ReprojectionQuality::from_rms(self.rms_reprojection_error)
    }

    pub fn k_matrix(&self) -> Mat3 {
        self.pinhole.k_matrix()
    }

    /// Project a point given in camera coordinates to (distorted) pixels.
    pub fn project(&self, p_c: &Pt3) -> Option<Pt2> {
        project_camera_point(&self.pinhole, &self.distortion, p_c)
    }

    /// Project a target-frame point through `cam_from_target`.
    pub fn project_through(&self, cam_from_target: &Iso3, p: &Pt3) -> Option<Pt2> {
        self.project(&cam_from_target.transform_point(p))
    }

    /// Back-project a distorted pixel to ideal normalized coordinates (z = 1).
    pub fn normalize_pixel(&self, px: &Pt2) -> Vec2 {
        self.distortion.undistort(&self.pinhole.from_pixel(px))
    }

    /// Remove lens distortion from a pixel, keeping the same `K`.
    pub fn undistort_pixel(&self, px: &Pt2) -> Pt2 {
        self.pinhole.to_pixel(&self.normalize_pixel(px))
    }

    /// Unit-norm viewing ray in camera coordinates for a distorted pixel.
    pub fn pixel_ray(&self, px: &Pt2) -> Vec3 {
        let n = self.normalize_pixel(px);
        Vec3::new(n.x, n.y, 1.0).normalize()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
