//! Deterministic noise for synthetic corner observations.
//!
//! Nothing here touches a global RNG: every sample is a pure function of a
//! seed and an index key, so generated datasets are stable across runs and
//! platforms.

use crate::{Pt2, Real, Vec2};

/// Shape of the per-axis pixel perturbation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoiseModel {
    /// Uniform in `[-half_width, +half_width]`.
    Uniform { half_width: Real },
    /// Zero-mean Gaussian with the given standard deviation (Box–Muller).
    Gaussian { sigma: Real },
}

/// Seeded pixel noise keyed by `(view, corner)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelNoise {
    pub seed: u64,
    pub model: NoiseModel,
}

impl PixelNoise {
    pub fn uniform(seed: u64, half_width: Real) -> Self {
        Self {
            seed,
            model: NoiseModel::Uniform { half_width },
        }
    }

    pub fn gaussian(seed: u64, sigma: Real) -> Self {
        Self {
            seed,
            model: NoiseModel::Gaussian { sigma },
        }
    }

    /// Offset in pixels for one corner of one view.
    pub fn sample(&self, view_idx: usize, corner_idx: usize) -> Vec2 {
        let key = stream_key(self.seed, view_idx as u64, corner_idx as u64);
        let u = unit_interval(splitmix64(key));
        let v = unit_interval(splitmix64(key ^ 0x94D0_49BB_1331_11EB));
        match self.model {
            NoiseModel::Uniform { half_width } => {
                let h = half_width.abs();
                Vec2::new((2.0 * u - 1.0) * h, (2.0 * v - 1.0) * h)
            }
            NoiseModel::Gaussian { sigma } => {
                // Keep u away from zero so ln stays finite.
                let r = (-2.0 * (u.max(Real::MIN_POSITIVE)).ln()).sqrt() * sigma.abs();
                let theta = 2.0 * std::f64::consts::PI * v;
                Vec2::new(r * theta.cos(), r * theta.sin())
            }
        }
    }

    pub fn apply(&self, view_idx: usize, corner_idx: usize, px: Pt2) -> Pt2 {
        px + self.sample(view_idx, corner_idx)
    }
}

/// Deterministic value in `[-1, 1)` for `(seed, index)`.
pub fn signed_unit(seed: u64, index: u64) -> Real {
    2.0 * unit_interval(splitmix64(stream_key(seed, index, 0x5EED))) - 1.0
}

fn stream_key(seed: u64, a: u64, b: u64) -> u64 {
    seed ^ a.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ b.wrapping_mul(0xBF58_476D_1CE4_E5B9)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Top 53 bits as a double in `[0, 1)`.
fn unit_interval(x: u64) -> Real {
    (x >> 11) as Real * (1.0 / (1u64 << 53) as Real)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_repeat_for_the_same_key() {
        let noise = PixelNoise::uniform(7, 0.5);
        assert_eq!(noise.sample(2, 3), noise.sample(2, 3));
        assert_ne!(noise.sample(2, 3), noise.sample(2, 4));
        let s = noise.sample(0, 0);
        assert!(s.x.abs() <= 0.5 && s.y.abs() <= 0.5);
    }

    #[test]
    fn gaussian_spread_is_close_to_sigma() {
        let noise = PixelNoise::gaussian(11, 0.3);
        let n = 4000;
        let var = (0..n)
            .map(|i| noise.sample(i / 50, i % 50).x.powi(2))
            .sum::<Real>()
            / n as Real;
        assert!((var.sqrt() - 0.3).abs() < 0.03, "std {}", var.sqrt());
    }

    #[test]
    fn signed_unit_stays_in_range() {
        for i in 0..100 {
            let v = signed_unit(42, i);
            assert!((-1.0..1.0).contains(&v));
        }
    }
}
