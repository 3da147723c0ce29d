use calib_targets::{detect::default_chess_config, ChessboardParams};
use chess_corners::ChessConfig;
use robocalib_core::{CalibrationTarget, Real};
use serde::{Deserialize, Serialize};

/// Gradient-orthogonality refinement parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SubPixParams {
    /// Half size of the search window; the window is `2 * half_window + 1` wide.
    pub half_window: u32,
    pub max_iters: usize,
    /// Stop once a corner moves less than this many pixels.
    pub epsilon: Real,
}

impl Default for SubPixParams {
    fn default() -> Self {
        Self {
            half_window: 5,
            max_iters: 30,
            epsilon: 1e-3,
        }
    }
}

/// Parameters of the checkerboard detector.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Stretch intensities to `[0, 255]` before looking for corners.
    pub normalize_contrast: bool,
    /// ChESS response threshold relative to the strongest response in the image.
    pub threshold_rel: f32,
    /// Half size of the ChESS non-maximum suppression window.
    pub nms_radius: u32,
    /// Share of the board that the grid search must label before a component
    /// is considered. The result is still rejected unless every corner is found.
    pub completeness_threshold: f32,
    pub subpix: SubPixParams,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            normalize_contrast: true,
            threshold_rel: 0.2,
            nms_radius: 2,
            completeness_threshold: 0.7,
            subpix: SubPixParams::default(),
        }
    }
}

impl DetectorConfig {
    /// ChESS corner detector settings.
    pub fn chess_config(&self) -> ChessConfig {
        let mut cfg = default_chess_config();
        cfg.params.threshold_rel = self.threshold_rel;
        cfg.params.nms_radius = self.nms_radius;
        cfg
    }

    /// Grid search settings for the inner-corner layout of `target`.
    pub fn board_params(&self, target: &CalibrationTarget) -> ChessboardParams {
        ChessboardParams {
            expected_rows: Some(target.inner_corners_y() as u32),
            expected_cols: Some(target.inner_corners_x() as u32),
            min_corners: target.corner_count(),
            completeness_threshold: self.completeness_threshold,
            ..ChessboardParams::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: DetectorConfig =
            serde_json::from_str(r#"{"threshold_rel": 0.3, "subpix": {"max_iters": 10}}"#).unwrap();
        assert_eq!(cfg.threshold_rel, 0.3);
        assert_eq!(cfg.subpix.max_iters, 10);
        assert_eq!(cfg.subpix.half_window, 5);
        assert_eq!(cfg.nms_radius, 2);
        assert!(cfg.normalize_contrast);
    }

    #[test]
    fn board_params_follow_the_target() {
        let target = CalibrationTarget::new(9, 6, 25.0).unwrap();
        let cfg = DetectorConfig {
            threshold_rel: 0.1,
            ..DetectorConfig::default()
        };
        let params = cfg.board_params(&target);
        assert_eq!(params.expected_cols, Some(9));
        assert_eq!(params.expected_rows, Some(6));
        assert_eq!(params.min_corners, 54);
        assert_eq!(cfg.chess_config().params.threshold_rel, 0.1);
        assert_eq!(cfg.chess_config().params.nms_radius, 2);
    }
}
