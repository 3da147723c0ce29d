use robocalib_core::{PairingStrategy, Real};
use robocalib_detect::DetectorConfig;
use robocalib_linear::{HandEyeLinearOptions, ZhangOptions};
use robocalib_optim::{intrinsics::DistortionMask, SolveOptions};
use serde::{Deserialize, Serialize};

/// Intrinsic solver settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntrinsicsOptions {
    /// Force zero skew in the closed-form estimate.
    pub zero_skew: bool,
    /// Conditioning threshold on `σ5 / σ1` of Zhang's constraint matrix.
    pub min_singular_ratio: Real,
    /// Distortion terms held at zero during refinement.
    pub distortion_mask: DistortionMask,
}

impl Default for IntrinsicsOptions {
    fn default() -> Self {
        let zhang = ZhangOptions::default();
        Self {
            zero_skew: zhang.zero_skew,
            min_singular_ratio: zhang.min_singular_ratio,
            distortion_mask: DistortionMask::default(),
        }
    }
}

impl IntrinsicsOptions {
    pub fn zhang(&self) -> ZhangOptions {
        ZhangOptions {
            zero_skew: self.zero_skew,
            min_singular_ratio: self.min_singular_ratio,
        }
    }
}

/// PnP settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PnpOptions {
    /// Refine the linear pose on distorted pixel residuals.
    pub refine: bool,
}

impl Default for PnpOptions {
    fn default() -> Self {
        Self { refine: true }
    }
}

/// Hand-eye solver settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandEyeOptions {
    pub pairing: PairingStrategy,
    /// Motion pairs rotating less than this are skipped.
    pub min_rotation_deg: Real,
    /// Conditioning threshold on `σ3 / σ1` of the rotation system.
    pub min_singular_ratio: Real,
    /// Smallest angle (degrees) the motion rotation axes must span.
    pub min_axis_spread_deg: Real,
    /// Refine the closed-form transform on `AX = XB` residuals.
    pub refine: bool,
    /// Translation units per radian when mixing rotation and translation
    /// residuals during refinement.
    pub rotation_weight: Real,
}

impl Default for HandEyeOptions {
    fn default() -> Self {
        let linear = HandEyeLinearOptions::default();
        Self {
            pairing: linear.pairing,
            min_rotation_deg: linear.min_rotation_deg,
            min_singular_ratio: linear.min_singular_ratio,
            min_axis_spread_deg: linear.min_axis_spread_deg,
            refine: true,
            rotation_weight: 100.0,
        }
    }
}

impl HandEyeOptions {
    pub fn linear(&self) -> HandEyeLinearOptions {
        HandEyeLinearOptions {
            pairing: self.pairing,
            min_rotation_deg: self.min_rotation_deg,
            min_singular_ratio: self.min_singular_ratio,
            min_axis_spread_deg: self.min_axis_spread_deg,
        }
    }
}

/// All solver settings, usually loaded from a JSON file. Missing sections
/// and fields take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub detector: DetectorConfig,
    pub intrinsics: IntrinsicsOptions,
    pub pnp: PnpOptions,
    pub hand_eye: HandEyeOptions,
    pub solver: SolveOptions,
}

impl CalibrationConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
