//! Sub-pixel corner refinement.
//!
//! At the true corner `q`, the image gradient `g(p)` at every point `p` of the
//! surrounding window is orthogonal to `p − q`. Stacking `g gᵀ (q − p) = 0`
//! with Gaussian weights gives a 2×2 normal system that is solved and
//! re-centred until the update falls below `epsilon`.

use nalgebra::Matrix2;
use robocalib_core::{Pt2, Real, Vec2};

use crate::gray::GrayF32;
use crate::params::SubPixParams;

/// Refine one corner. Returns `None` when the window is textureless or the
/// corner drifts further than the window half size from its start.
pub fn refine_corner(img: &GrayF32, start: Pt2, params: &SubPixParams) -> Option<Pt2> {
    let hw = params.half_window as i32;
    if hw == 0 {
        return Some(start);
    }
    let inv_sigma_sq = 1.0 / (hw * hw) as Real;

    let mut q = start;
    for _ in 0..params.max_iters {
        let mut a = Matrix2::<Real>::zeros();
        let mut b = Vec2::zeros();

        for dy in -hw..=hw {
            for dx in -hw..=hw {
                let (px, py) = (q.x + dx as Real, q.y + dy as Real);
                let gx = 0.5 * (img.sample_bilinear(px + 1.0, py) - img.sample_bilinear(px - 1.0, py));
                let gy = 0.5 * (img.sample_bilinear(px, py + 1.0) - img.sample_bilinear(px, py - 1.0));
                let g = Vec2::new(gx as Real, gy as Real);
                let w = (-((dx * dx + dy * dy) as Real) * inv_sigma_sq).exp();
                let ggt = g * g.transpose() * w;
                a += ggt;
                b += ggt * Vec2::new(px, py);
            }
        }

        if a.determinant().abs() <= 1e-9 * a.norm_squared().max(Real::MIN_POSITIVE) {
            return None;
        }
        let next = Pt2::from(a.try_inverse()? * b);
        let shift = (next - q).norm();
        q = next;
        if shift < params.epsilon {
            break;
        }
    }

    ((q - start).norm() <= hw as Real && q.x.is_finite() && q.y.is_finite()).then_some(q)
}

/// Refine every corner; fails if any single corner cannot be refined.
pub fn refine_corners(img: &GrayF32, corners: &[Pt2], params: &SubPixParams) -> Option<Vec<Pt2>> {
    corners
        .iter()
        .map(|c| refine_corner(img, *c, params))
        .collect()
}
