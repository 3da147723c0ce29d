use serde::{Deserialize, Serialize};

use crate::{Real, Vec2};

/// Fixed-point iterations used when inverting the distortion model.
const UNDISTORT_MAX_ITERS: usize = 20;
const UNDISTORT_TOL: Real = 1e-14;

/// Radial–tangential (Brown–Conrady) 5-parameter distortion model.
///
/// Applied in normalized camera coordinates, before the pinhole projection.
/// Coefficient order follows the usual `[k1, k2, p1, p2, k3]` layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BrownConrady5 {
    pub k1: Real,
    pub k2: Real,
    pub p1: Real,
    pub p2: Real,
    pub k3: Real,
}

impl BrownConrady5 {
    pub fn from_coeffs(c: [Real; 5]) -> Self {
        Self {
            k1: c[0],
            k2: c[1],
            p1: c[2],
            p2: c[3],
            k3: c[4],
        }
    }

    /// Coefficients as `[k1, k2, p1, p2, k3]`.
    pub fn coeffs(&self) -> [Real; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs().iter().all(|c| *c == 0.0)
    }

    fn distort_impl(&self, x: Real, y: Real) -> (Real, Real) {
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;

        let radial = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;

        let xy = x * y;
        let x_tan = 2.0 * self.p1 * xy + self.p2 * (r2 + 2.0 * x * x);
        let y_tan = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * xy;

        (x * radial + x_tan, y * radial + y_tan)
    }

    /// Map ideal normalized coordinates to distorted normalized coordinates.
    pub fn distort(&self, n_undist: &Vec2) -> Vec2 {
        let (xd, yd) = self.distort_impl(n_undist.x, n_undist.y);
        Vec2::new(xd, yd)
    }

    /// Invert [`Self::distort`] by fixed-point iteration.
    pub fn undistort(&self, n_dist: &Vec2) -> Vec2 {
        if self.is_zero() {
            return *n_dist;
        }
        let mut x = n_dist.x;
        let mut y = n_dist.y;

        for _ in 0..UNDISTORT_MAX_ITERS {
            let (xd, yd) = self.distort_impl(x, y);
            let ex = xd - n_dist.x;
            let ey = yd - n_dist.y;
            x -= ex;
            y -= ey;
            if ex.abs().max(ey.abs()) < UNDISTORT_TOL {
                break;
            }
        }
        Vec2::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undistort_inverts_distort() {
        let d = BrownConrady5 {
            k1: -0.2,
            k2: 0.05,
            p1: 0.001,
            p2: -0.0015,
            k3: 0.0,
        };
        let n = Vec2::new(0.21, -0.17);
        let back = d.undistort(&d.distort(&n));
        assert!((back - n).norm() < 1e-10, "residual {}", (back - n).norm());
    }

    #[test]
    fn zero_model_is_identity() {
        let d = BrownConrady5::default();
        let n = Vec2::new(0.3, 0.4);
        assert_eq!(d.distort(&n), n);
        assert_eq!(d.undistort(&n), n);
    }
}
