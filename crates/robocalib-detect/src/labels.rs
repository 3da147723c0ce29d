//! Turn the `(i, j)` labels of a chessboard detection into a complete,
//! canonically oriented corner grid.
//!
//! The grid search labels corners relative to an arbitrary origin and axis
//! sign, and may swap rows and columns. Labels are shifted to start at zero,
//! checked for full coverage of the board, then relabelled so that `i` runs
//! toward image +x and `j` toward image +y.

use std::collections::HashMap;

use calib_targets::LabeledCorner;
use robocalib_core::{Pt2, Real, Vec2};

use crate::detector::DetectFailure;

/// Corners of a complete grid, row-major with `i` fastest.
#[derive(Clone, Debug, PartialEq)]
pub struct CornerGrid {
    pub cols: usize,
    pub rows: usize,
    pub points: Vec<Pt2>,
}

impl CornerGrid {
    /// Grid from labelled corners. Corners without a label are ignored.
    ///
    /// Fails unless the labels cover a `cols × rows` (or `rows × cols`)
    /// block exactly once per cell.
    pub fn from_labels(
        labelled: impl IntoIterator<Item = ((i32, i32), Pt2)>,
        cols: usize,
        rows: usize,
    ) -> Result<Self, DetectFailure> {
        let needed = cols * rows;
        let mut cells: HashMap<(i32, i32), Pt2> = HashMap::new();
        let mut duplicates = 0usize;
        for (cell, p) in labelled {
            if cells.insert(cell, p).is_some() {
                duplicates += 1;
            }
        }
        if duplicates > 0 || cells.len() != needed {
            return Err(DetectFailure::IncompleteGrid {
                labelled: cells.len() + duplicates,
                needed,
            });
        }

        let min_i = cells.keys().map(|c| c.0).min().unwrap_or(0);
        let min_j = cells.keys().map(|c| c.1).min().unwrap_or(0);
        let max_i = cells.keys().map(|c| c.0).max().unwrap_or(-1);
        let max_j = cells.keys().map(|c| c.1).max().unwrap_or(-1);
        let width = (max_i - min_i + 1) as usize;
        let height = (max_j - min_j + 1) as usize;
        if !((width == cols && height == rows) || (width == rows && height == cols)) {
            return Err(DetectFailure::GridMismatch {
                cols,
                rows,
                found_cols: width,
                found_rows: height,
            });
        }

        // Exactly `needed` distinct cells inside a `needed`-cell box: every
        // cell is present.
        let mut points = vec![Pt2::origin(); needed];
        for ((i, j), p) in cells {
            points[(j - min_j) as usize * width + (i - min_i) as usize] = p;
        }
        Ok(Self {
            cols: width,
            rows: height,
            points,
        })
    }

    fn at(&self, i: usize, j: usize) -> Pt2 {
        self.points[j * self.cols + i]
    }

    /// Mean step along `i` and along `j`.
    fn mean_axes(&self) -> (Vec2, Vec2) {
        let mut u = Vec2::zeros();
        let mut v = Vec2::zeros();
        for j in 0..self.rows {
            for i in 0..self.cols {
                if i + 1 < self.cols {
                    u += self.at(i + 1, j) - self.at(i, j);
                }
                if j + 1 < self.rows {
                    v += self.at(i, j + 1) - self.at(i, j);
                }
            }
        }
        (u, v)
    }

    fn transposed(&self) -> Self {
        let mut points = Vec::with_capacity(self.points.len());
        for i in 0..self.cols {
            for j in 0..self.rows {
                points.push(self.at(i, j));
            }
        }
        Self {
            cols: self.rows,
            rows: self.cols,
            points,
        }
    }

    fn flipped(&self, flip_i: bool, flip_j: bool) -> Self {
        let mut points = Vec::with_capacity(self.points.len());
        for j in 0..self.rows {
            for i in 0..self.cols {
                let si = if flip_i { self.cols - 1 - i } else { i };
                let sj = if flip_j { self.rows - 1 - j } else { j };
                points.push(self.at(si, sj));
            }
        }
        Self {
            cols: self.cols,
            rows: self.rows,
            points,
        }
    }

    /// Relabel so that the grid is `cols × rows`, `i` runs toward image +x
    /// and `j` toward image +y.
    ///
    /// When the board is turned by more than 45° in the image, `i` follows
    /// whichever image axis it is closest to and `j` is chosen so that the
    /// labelling stays a rotation of the image axes, never a mirror.
    pub fn normalized(self, cols: usize, rows: usize) -> Option<Self> {
        let (u, _) = self.mean_axes();
        let keep = self.cols == cols && self.rows == rows;
        let swap = self.cols == rows && self.rows == cols;
        let grid = match (keep, swap) {
            // Square boards: prefer the labelling whose i axis is horizontal.
            (true, true) if u.x.abs() < u.y.abs() => self.transposed(),
            (true, _) => self,
            (false, true) => self.transposed(),
            (false, false) => return None,
        };

        let (u, v) = grid.mean_axes();
        let flip_i = if u.x.abs() >= u.y.abs() {
            u.x < 0.0
        } else {
            u.y < 0.0
        };
        let u = if flip_i { -u } else { u };
        let flip_j = u.x * v.y - u.y * v.x < 0.0;
        Some(grid.flipped(flip_i, flip_j))
    }
}

/// `(i, j)` label and position of every labelled corner of a detection.
pub fn labelled_positions(corners: &[LabeledCorner]) -> Vec<((i32, i32), Pt2)> {
    corners
        .iter()
        .filter_map(|c| {
            let g = c.grid?;
            Some((
                (g.i, g.j),
                Pt2::new(c.position.x as Real, c.position.y as Real),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Labels of a 4×3 grid drawn with `i` along image -y and `j` along
    /// image -x, starting at label `(-2, 5)`.
    fn rotated_labels() -> Vec<((i32, i32), Pt2)> {
        let mut out = Vec::new();
        for j in 0..3 {
            for i in 0..4 {
                let p = Pt2::new(200.0 - 20.0 * j as Real, 300.0 - 20.0 * i as Real);
                out.push(((i - 2, j + 5), p));
            }
        }
        out
    }

    #[test]
    fn labels_are_shifted_and_reoriented() {
        let grid = CornerGrid::from_labels(rotated_labels(), 4, 3).unwrap();
        assert_eq!((grid.cols, grid.rows), (4, 3));
        let grid = grid.normalized(4, 3).unwrap();
        // The i axis is closest to image y, so it is turned to run toward +y.
        let p = &grid.points;
        assert!(p[1].y > p[0].y && (p[1].x - p[0].x).abs() < 1e-9);
        let (u, v) = grid.mean_axes();
        assert!(u.x * v.y - u.y * v.x > 0.0, "labelling must not be mirrored");
    }

    #[test]
    fn transposed_labels_are_accepted() {
        let labels = rotated_labels()
            .into_iter()
            .map(|((i, j), p)| ((j, i), p))
            .collect::<Vec<_>>();
        let grid = CornerGrid::from_labels(labels, 4, 3).unwrap();
        assert_eq!((grid.cols, grid.rows), (3, 4));
        let grid = grid.normalized(4, 3).unwrap();
        assert_eq!((grid.cols, grid.rows), (4, 3));
    }

    #[test]
    fn missing_or_duplicate_labels_are_rejected() {
        let mut labels = rotated_labels();
        labels.pop();
        assert_eq!(
            CornerGrid::from_labels(labels.clone(), 4, 3),
            Err(DetectFailure::IncompleteGrid {
                labelled: 11,
                needed: 12
            })
        );

        labels.push(labels[0]);
        assert!(matches!(
            CornerGrid::from_labels(labels, 4, 3),
            Err(DetectFailure::IncompleteGrid { .. })
        ));
    }

    #[test]
    fn wrong_extent_is_rejected() {
        // Twelve labels spread over a 6 x 2 block.
        let labels: Vec<_> = (0..12)
            .map(|k| ((k % 6, k / 6), Pt2::new(10.0 * (k % 6) as Real, 10.0 * (k / 6) as Real)))
            .collect();
        assert_eq!(
            CornerGrid::from_labels(labels, 4, 3),
            Err(DetectFailure::GridMismatch {
                cols: 4,
                rows: 3,
                found_cols: 6,
                found_rows: 2
            })
        );
    }

    #[test]
    fn upright_grid_is_unchanged() {
        let labels: Vec<_> = (0..6)
            .map(|k| ((k % 3, k / 3), Pt2::new(10.0 * (k % 3) as Real, 10.0 * (k / 3) as Real)))
            .collect();
        let grid = CornerGrid::from_labels(labels, 3, 2).unwrap();
        let expected = grid.points.clone();
        assert_eq!(grid.normalized(3, 2).unwrap().points, expected);
    }
}
