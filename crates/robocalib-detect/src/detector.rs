use calib_targets::detect::detect_chessboard;
use image::{DynamicImage, GrayImage};
use log::debug;
use robocalib_core::{CalibrationTarget, DetectedCorners, Pt2};
use thiserror::Error;

use crate::gray::GrayF32;
use crate::labels::{labelled_positions, CornerGrid};
use crate::params::DetectorConfig;
use crate::subpix::refine_corners;

/// ChESS samples a ring of radius 5 around each pixel; anything smaller than
/// one ring plus a border pixel on each side has no candidate corners.
const MIN_IMAGE_SIDE: u32 = 13;

/// Why a checkerboard was not found. Routine during data collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectFailure {
    #[error("image {width}x{height} is too small")]
    ImageTooSmall { width: u32, height: u32 },
    #[error("no chessboard grid found")]
    NoBoard,
    #[error("grid labels {labelled} of {needed} corners")]
    IncompleteGrid { labelled: usize, needed: usize },
    #[error("grid spans {found_cols}x{found_rows} corners, expected {cols}x{rows}")]
    GridMismatch {
        cols: usize,
        rows: usize,
        found_cols: usize,
        found_rows: usize,
    },
    #[error("sub-pixel refinement failed")]
    RefinementFailed,
}

/// Locate the inner corners of `target`, refined to sub-pixel accuracy and
/// ordered like [`CalibrationTarget::object_points`].
pub fn find_chessboard(
    cfg: &DetectorConfig,
    image: &GrayImage,
    target: &CalibrationTarget,
) -> Result<Vec<Pt2>, DetectFailure> {
    let (width, height) = image.dimensions();
    if width < MIN_IMAGE_SIDE || height < MIN_IMAGE_SIDE {
        return Err(DetectFailure::ImageTooSmall { width, height });
    }

    let mut gray = GrayF32::from_gray(image);
    let stretched;
    let input = if cfg.normalize_contrast {
        gray.normalize_contrast();
        stretched = gray.to_gray();
        &stretched
    } else {
        image
    };

    let detection = detect_chessboard(input, &cfg.chess_config(), cfg.board_params(target))
        .ok_or(DetectFailure::NoBoard)?;

    let (cols, rows) = (target.inner_corners_x(), target.inner_corners_y());
    let labels = labelled_positions(&detection.detection.corners);
    let grid = CornerGrid::from_labels(labels, cols, rows)?;
    let mismatch = DetectFailure::GridMismatch {
        cols,
        rows,
        found_cols: grid.cols,
        found_rows: grid.rows,
    };
    let grid = grid.normalized(cols, rows).ok_or(mismatch)?;

    refine_corners(&gray, &grid.points, &cfg.subpix).ok_or(DetectFailure::RefinementFailed)
}

/// [`detect`] with explicit parameters.
pub fn detect_with(
    cfg: &DetectorConfig,
    image: &GrayImage,
    target: &CalibrationTarget,
    image_index: usize,
) -> DetectedCorners {
    match find_chessboard(cfg, image, target) {
        Ok(points) => {
            debug!("image {image_index}: found {} corners", points.len());
            DetectedCorners::found(image_index, points, target)
                .unwrap_or_else(|_| DetectedCorners::not_found(image_index))
        }
        Err(reason) => {
            debug!("image {image_index}: checkerboard not found ({reason})");
            DetectedCorners::not_found(image_index)
        }
    }
}

/// Detect the checkerboard in a grayscale image with default parameters.
///
/// Never fails: a missing or partially visible board yields
/// [`DetectedCorners::not_found`].
pub fn detect(image: &GrayImage, target: &CalibrationTarget, image_index: usize) -> DetectedCorners {
    detect_with(&DetectorConfig::default(), image, target, image_index)
}

/// Convert any decoded image to 8-bit grayscale, then detect.
pub fn detect_dynamic(
    cfg: &DetectorConfig,
    image: &DynamicImage,
    target: &CalibrationTarget,
    image_index: usize,
) -> DetectedCorners {
    detect_with(cfg, &image.to_luma8(), target, image_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_images_are_not_found() {
        let target = CalibrationTarget::standard_9x6();
        let img = GrayImage::from_pixel(320, 240, image::Luma([200]));
        let res = detect(&img, &target, 4);
        assert!(!res.success());
        assert_eq!(res.image_index(), 4);
        assert_eq!(
            find_chessboard(&DetectorConfig::default(), &img, &target),
            Err(DetectFailure::NoBoard)
        );

        let tiny = GrayImage::new(5, 5);
        assert_eq!(
            find_chessboard(&DetectorConfig::default(), &tiny, &target),
            Err(DetectFailure::ImageTooSmall { width: 5, height: 5 })
        );
    }
}
