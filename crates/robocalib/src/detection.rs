//! Detection over image batches.
//!
//! Images are consumed one at a time and dropped as soon as their corners are
//! extracted; only [`DetectedCorners`] survive.

use std::path::Path;

use image::GrayImage;
use log::{info, warn};
use rayon::prelude::*;
use robocalib_core::{CalibrationTarget, DetectedCorners};
use robocalib_detect::{detect_with, DetectorConfig};
use serde::{Deserialize, Serialize};

/// Per-image outcome shown to the operator after a detection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub image_index: usize,
    pub detected: bool,
    pub corner_count: usize,
}

impl From<&DetectedCorners> for DetectionSummary {
    fn from(d: &DetectedCorners) -> Self {
        Self {
            image_index: d.image_index(),
            detected: d.success(),
            corner_count: d.points().len(),
        }
    }
}

pub fn summarize(detections: &[DetectedCorners]) -> Vec<DetectionSummary> {
    detections.iter().map(DetectionSummary::from).collect()
}

fn log_pass(detections: &[DetectedCorners]) {
    let found = detections.iter().filter(|d| d.success()).count();
    info!("checkerboard found in {found} of {} images", detections.len());
}

/// Detect in images produced lazily by `images`, indexing them in order.
pub fn detect_batch<I>(
    images: I,
    target: &CalibrationTarget,
    cfg: &DetectorConfig,
) -> Vec<DetectedCorners>
where
    I: IntoIterator<Item = GrayImage>,
{
    let out: Vec<DetectedCorners> = images
        .into_iter()
        .enumerate()
        .map(|(idx, img)| detect_with(cfg, &img, target, idx))
        .collect();
    log_pass(&out);
    out
}

fn detect_file(path: &Path, idx: usize, target: &CalibrationTarget, cfg: &DetectorConfig) -> DetectedCorners {
    match image::open(path) {
        Ok(img) => detect_with(cfg, &img.to_luma8(), target, idx),
        Err(e) => {
            warn!("image {idx} ({}): cannot be read: {e}", path.display());
            DetectedCorners::not_found(idx)
        }
    }
}

/// Load and detect image files in parallel. Each worker decodes one file at a
/// time and drops the pixels once its corners are extracted. Unreadable files
/// count as missed detections.
pub fn detect_files<P>(paths: &[P], target: &CalibrationTarget, cfg: &DetectorConfig) -> Vec<DetectedCorners>
where
    P: AsRef<Path> + Sync,
{
    let out: Vec<DetectedCorners> = paths
        .par_iter()
        .enumerate()
        .map(|(idx, p)| detect_file(p.as_ref(), idx, target, cfg))
        .collect();
    log_pass(&out);
    out
}
