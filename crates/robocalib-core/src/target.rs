use serde::{Deserialize, Serialize};

use crate::{CalibError, CalibResult, Pt2, Pt3, Real};

/// Planar checkerboard descriptor.
///
/// `inner_corners_x × inner_corners_y` counts the saddle points between
/// squares, not the squares themselves. Immutable once built; construction
/// validates the ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TargetSpec", into = "TargetSpec")]
pub struct CalibrationTarget {
    inner_corners_x: usize,
    inner_corners_y: usize,
    square_size_mm: Real,
}

/// Serialized form of [`CalibrationTarget`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct TargetSpec {
    inner_corners_x: usize,
    inner_corners_y: usize,
    square_size_mm: Real,
}

impl TryFrom<TargetSpec> for CalibrationTarget {
    type Error = CalibError;

    fn try_from(spec: TargetSpec) -> CalibResult<Self> {
        CalibrationTarget::new(spec.inner_corners_x, spec.inner_corners_y, spec.square_size_mm)
    }
}

impl From<CalibrationTarget> for TargetSpec {
    fn from(t: CalibrationTarget) -> Self {
        TargetSpec {
            inner_corners_x: t.inner_corners_x,
            inner_corners_y: t.inner_corners_y,
            square_size_mm: t.square_size_mm,
        }
    }
}

impl CalibrationTarget {
    pub fn new(inner_corners_x: usize, inner_corners_y: usize, square_size_mm: Real) -> CalibResult<Self> {
        if inner_corners_x < 2 || inner_corners_y < 2 {
            return Err(CalibError::InvalidTarget(format!(
                "need at least 2x2 inner corners, got {inner_corners_x}x{inner_corners_y}"
            )));
        }
        if !(square_size_mm.is_finite() && square_size_mm > 0.0) {
            return Err(CalibError::InvalidTarget(format!(
                "square size must be positive, got {square_size_mm}"
            )));
        }
        Ok(Self {
            inner_corners_x,
            inner_corners_y,
            square_size_mm,
        })
    }

    /// 9×6 inner corners, 24 mm squares.
    pub fn standard_9x6() -> Self {
        Self {
            inner_corners_x: 9,
            inner_corners_y: 6,
            square_size_mm: 24.0,
        }
    }

    /// 14×8 inner corners, 17.4 mm squares.
    pub fn board_14x8() -> Self {
        Self {
            inner_corners_x: 14,
            inner_corners_y: 8,
            square_size_mm: 17.4,
        }
    }

    pub fn inner_corners_x(&self) -> usize {
        self.inner_corners_x
    }

    pub fn inner_corners_y(&self) -> usize {
        self.inner_corners_y
    }

    pub fn square_size_mm(&self) -> Real {
        self.square_size_mm
    }

    pub fn corner_count(&self) -> usize {
        self.inner_corners_x * self.inner_corners_y
    }

    /// Board-frame 3D points `(i*s, j*s, 0)` in row-major order (`i` fastest).
    pub fn object_points(&self) -> Vec<Pt3> {
        self.object_points_2d()
            .into_iter()
            .map(|p| Pt3::new(p.x, p.y, 0.0))
            .collect()
    }

    /// Same as [`Self::object_points`] without the zero `z` coordinate.
    pub fn object_points_2d(&self) -> Vec<Pt2> {
        let s = self.square_size_mm;
        let mut points = Vec::with_capacity(self.corner_count());
        for j in 0..self.inner_corners_y {
            for i in 0..self.inner_corners_x {
                points.push(Pt2::new(i as Real * s, j as Real * s));
            }
        }
        points
    }

    /// Geometric center of the inner-corner grid in board coordinates.
    pub fn center(&self) -> Pt3 {
        let s = self.square_size_mm;
        Pt3::new(
            0.5 * (self.inner_corners_x - 1) as Real * s,
            0.5 * (self.inner_corners_y - 1) as Real * s,
            0.0,
        )
    }
}

/// Inner-corner detections for one image.
///
/// Either the full grid was found (`success`, `points.len() == x*y`, row-major
/// order matching [`CalibrationTarget::object_points`]) or nothing was
/// (`!success`, no points). Partial grids are never represented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedCorners {
    image_index: usize,
    points: Vec<Pt2>,
    success: bool,
}

impl DetectedCorners {
    /// A complete detection; fails if `points` does not cover the whole grid.
    pub fn found(image_index: usize, points: Vec<Pt2>, target: &CalibrationTarget) -> CalibResult<Self> {
        if points.len() != target.corner_count() {
            return Err(CalibError::DimensionMismatch {
                expected: target.corner_count(),
                got: points.len(),
            });
        }
        Ok(Self {
            image_index,
            points,
            success: true,
        })
    }

    /// The target was not found in image `image_index`.
    pub fn not_found(image_index: usize) -> Self {
        Self {
            image_index,
            points: Vec::new(),
            success: false,
        }
    }

    pub fn image_index(&self) -> usize {
        self.image_index
    }

    pub fn points(&self) -> &[Pt2] {
        &self.points
    }

    pub fn success(&self) -> bool {
        self.success
    }
}
