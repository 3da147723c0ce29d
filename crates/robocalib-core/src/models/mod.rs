mod distortion;
mod intrinsics;

pub use distortion::BrownConrady5;
pub use intrinsics::{
    project_camera_point, CameraIntrinsics, ImageSize, PinholeParams, ReprojectionQuality,
};
