//! Row-parallel driver shared by the synthesizer and the compositor.
//!
//! Every output row depends only on its index and read-only inputs, so rows
//! are computed independently on the rayon pool. Cancellation is checked once
//! per row.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::{TerrainError, TerrainResult};

/// Cooperative cancellation flag, cheap to clone and share with an editor UI.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// A grid computation that fills one row of output at a time.
pub trait RowKernel: Sync {
    /// Number of output rows
    fn rows(&self) -> usize;
    /// Floats produced per row
    fn row_len(&self) -> usize;
    /// Fill `out` (exactly `row_len()` long) for `row`
    fn compute_row(&self, row: usize, out: &mut [f32]);
}

fn check_output_len<K: RowKernel + ?Sized>(kernel: &K, out: &[f32]) -> TerrainResult<()> {
    let expected = kernel.rows() * kernel.row_len();
    if out.len() != expected {
        return Err(TerrainError::ResolutionMismatch {
            expected: (kernel.rows(), kernel.row_len()),
            actual: (out.len() / kernel.row_len().max(1), kernel.row_len()),
        });
    }
    Ok(())
}

/// Fill `out` row by row in parallel.
pub fn run_rows<K: RowKernel + ?Sized>(
    kernel: &K,
    out: &mut [f32],
    cancel: Option<&CancelToken>,
) -> TerrainResult<()> {
    check_output_len(kernel, out)?;
    let row_len = kernel.row_len();
    if row_len == 0 {
        return Ok(());
    }

    out.par_chunks_mut(row_len)
        .enumerate()
        .try_for_each(|(row, chunk)| {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                return Err(TerrainError::Cancelled);
            }
            kernel.compute_row(row, chunk);
            Ok(())
        })
}

/// Single-threaded variant of [`run_rows`]; produces identical output.
pub fn run_rows_serial<K: RowKernel + ?Sized>(
    kernel: &K,
    out: &mut [f32],
    cancel: Option<&CancelToken>,
) -> TerrainResult<()> {
    check_output_len(kernel, out)?;
    let row_len = kernel.row_len();
    if row_len == 0 {
        return Ok(());
    }

    for (row, chunk) in out.chunks_mut(row_len).enumerate() {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(TerrainError::Cancelled);
        }
        kernel.compute_row(row, chunk);
    }
    Ok(())
}

/// Compute `row_count` rows starting at `start_row` into a fresh buffer.
/// Rows past the end of the kernel are skipped.
pub fn compute_band<K: RowKernel + ?Sized>(kernel: &K, start_row: usize, row_count: usize) -> Vec<f32> {
    let row_len = kernel.row_len();
    let end = (start_row + row_count).min(kernel.rows());
    if start_row >= end || row_len == 0 {
        return Vec::new();
    }

    let mut band = vec![0.0; (end - start_row) * row_len];
    for (i, chunk) in band.chunks_mut(row_len).enumerate() {
        kernel.compute_row(start_row + i, chunk);
    }
    band
}
