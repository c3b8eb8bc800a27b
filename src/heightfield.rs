//! Row-major height grid and point queries over it.
//!
//! Rows run along Z (or Y of the alpha map), columns along X. The compositor
//! never indexes the grid directly; it goes through [`HeightQuery`] so the
//! alpha-map resolution can differ from the heightmap resolution.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::math::lerp;

/// Normalized height lookup at normalized coordinates in [0, 1] x [0, 1].
pub trait HeightQuery: Send + Sync {
    fn height_at(&self, norm_x: f32, norm_y: f32) -> f32;
}

impl<T: HeightQuery + ?Sized> HeightQuery for &T {
    fn height_at(&self, norm_x: f32, norm_y: f32) -> f32 {
        (**self).height_at(norm_x, norm_y)
    }
}

impl<T: HeightQuery + ?Sized> HeightQuery for Arc<T> {
    fn height_at(&self, norm_x: f32, norm_y: f32) -> f32 {
        (**self).height_at(norm_x, norm_y)
    }
}

/// Adapts a plain function or closure into a [`HeightQuery`].
#[derive(Clone, Copy, Debug)]
pub struct HeightFn<F>(pub F);

impl<F> HeightQuery for HeightFn<F>
where
    F: Fn(f32, f32) -> f32 + Send + Sync,
{
    fn height_at(&self, norm_x: f32, norm_y: f32) -> f32 {
        (self.0)(norm_x, norm_y)
    }
}

/// Thread-safe shared height source for background bakes
pub type SharedHeightQuery = Arc<dyn HeightQuery>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeightField {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl HeightField {
    /// Flat grid of zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Wrap existing row-major data. Returns `None` if the length does not match.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Option<Self> {
        if data.len() != rows * cols {
            return None;
        }
        Some(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row * self.cols + col] = value;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Smallest and largest stored value, `None` for an empty grid
    pub fn min_max(&self) -> Option<(f32, f32)> {
        let mut iter = self.data.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    /// Rescale a raw-scale grid into [0, 1]. A flat grid becomes all zeros.
    pub fn normalized(&self) -> Self {
        let Some((lo, hi)) = self.min_max() else {
            return self.clone();
        };
        let range = hi - lo;
        let data = if range > 0.0 {
            self.data.iter().map(|v| (v - lo) / range).collect()
        } else {
            vec![0.0; self.data.len()]
        };
        Self {
            rows: self.rows,
            cols: self.cols,
            data,
        }
    }

    /// Bilinear sample at normalized coordinates. Coordinates are clamped to
    /// the grid; an empty grid samples to 0.
    pub fn sample(&self, norm_x: f32, norm_y: f32) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }

        let gx = norm_x.clamp(0.0, 1.0) * (self.cols - 1) as f32;
        let gy = norm_y.clamp(0.0, 1.0) * (self.rows - 1) as f32;

        let x0 = gx.floor() as usize;
        let y0 = gy.floor() as usize;
        let x1 = (x0 + 1).min(self.cols - 1);
        let y1 = (y0 + 1).min(self.rows - 1);

        let fx = gx - x0 as f32;
        let fy = gy - y0 as f32;

        let top = lerp(self.get(y0, x0), self.get(y0, x1), fx);
        let bottom = lerp(self.get(y1, x0), self.get(y1, x1), fx);
        lerp(top, bottom, fy)
    }
}

impl HeightQuery for HeightField {
    fn height_at(&self, norm_x: f32, norm_y: f32) -> f32 {
        self.sample(norm_x, norm_y).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> HeightField {
        // 2x3: columns 0, 0.5, 1 on every row
        HeightField::from_vec(2, 3, vec![0.0, 0.5, 1.0, 0.0, 0.5, 1.0]).unwrap()
    }

    #[test]
    fn test_new_is_zeroed() {
        let field = HeightField::new(4, 5);
        assert_eq!(field.rows(), 4);
        assert_eq!(field.cols(), 5);
        assert_eq!(field.len(), 20);
        assert!(field.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_from_vec_rejects_bad_length() {
        assert!(HeightField::from_vec(2, 2, vec![0.0; 3]).is_none());
    }

    #[test]
    fn test_set_get_row_major() {
        let mut field = HeightField::new(3, 4);
        field.set(2, 1, 0.75);
        assert_eq!(field.get(2, 1), 0.75);
        assert_eq!(field.as_slice()[2 * 4 + 1], 0.75);
    }

    #[test]
    fn test_sample_corners_and_midpoints() {
        let field = ramp();
        assert_eq!(field.sample(0.0, 0.0), 0.0);
        assert_eq!(field.sample(1.0, 1.0), 1.0);
        assert!((field.sample(0.25, 0.5) - 0.25).abs() < 1e-6);
        assert!((field.sample(0.75, 0.0) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_sample_clamps_outside() {
        let field = ramp();
        assert_eq!(field.sample(-1.0, 0.5), 0.0);
        assert_eq!(field.sample(2.0, 0.5), 1.0);
    }

    #[test]
    fn test_single_cell_sample() {
        let field = HeightField::from_vec(1, 1, vec![0.3]).unwrap();
        assert_eq!(field.sample(0.7, 0.2), 0.3);
    }

    #[test]
    fn test_empty_sample_is_zero() {
        let field = HeightField::new(0, 0);
        assert!(field.is_empty());
        assert_eq!(field.sample(0.5, 0.5), 0.0);
        assert!(field.min_max().is_none());
    }

    #[test]
    fn test_height_query_clamps() {
        let field = HeightField::from_vec(1, 2, vec![-0.5, 2.0]).unwrap();
        assert_eq!(field.height_at(0.0, 0.0), 0.0);
        assert_eq!(field.height_at(1.0, 0.0), 1.0);
    }

    #[test]
    fn test_closure_height_query() {
        let query = HeightFn(|x: f32, y: f32| x * y);
        assert_eq!(query.height_at(0.5, 0.5), 0.25);
        assert_eq!((&query).height_at(1.0, 0.5), 0.5);
    }

    #[test]
    fn test_shared_height_query() {
        let shared: SharedHeightQuery = Arc::new(ramp());
        let other = Arc::clone(&shared);
        assert_eq!(other.height_at(1.0, 0.0), 1.0);
        assert!((shared.height_at(0.5, 0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_normalized() {
        let field = HeightField::from_vec(1, 3, vec![10.0, 15.0, 20.0]).unwrap();
        let n = field.normalized();
        assert_eq!(n.as_slice(), &[0.0, 0.5, 1.0]);

        let flat = HeightField::from_vec(1, 2, vec![3.0, 3.0]).unwrap();
        assert_eq!(flat.normalized().as_slice(), &[0.0, 0.0]);
    }
}
