//! Debug logging infrastructure for bake investigation
//!
//! Writes to `debug_terrain.log` in the working directory, or to a chosen
//! path via `init_debug_log_at()`. The log file is recreated on each init.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::weight_grid::WeightGrid;

lazy_static::lazy_static! {
    static ref DEBUG_LOG: Mutex<Option<File>> = Mutex::new(None);
}

/// Log a debug message to the terrain debug log file
pub fn debug_log(msg: &str) {
    if let Ok(mut guard) = DEBUG_LOG.lock() {
        if let Some(ref mut file) = *guard {
            let _ = writeln!(file, "{}", msg);
            let _ = file.flush();
        }
    }
}

/// Initialize the debug log file (overwrites any existing log)
pub fn init_debug_log() {
    init_debug_log_at("debug_terrain.log");
}

/// Initialize the debug log at `path` (overwrites any existing log)
pub fn init_debug_log_at(path: impl AsRef<Path>) {
    if let Ok(mut guard) = DEBUG_LOG.lock() {
        *guard = File::create(path).ok();
        if let Some(ref mut file) = *guard {
            let _ = writeln!(file, "=== PIXY TERRAIN BAKE LOG ===");
            let _ = writeln!(file, "Timestamp: {:?}", std::time::SystemTime::now());
            let _ = writeln!(file);
        }
    }
}

/// Statistics about per-cell weight sums in a painted grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightStats {
    pub min_sum: f32,
    pub max_sum: f32,
    /// Cells whose weights do not form a distribution
    pub degenerate_count: usize,
    /// Cells with no weight at all
    pub empty_count: usize,
}

/// Tolerance on a cell's weight sum before it counts as degenerate
const SUM_TOLERANCE: f32 = 1e-4;

/// Compute statistics about weight sums.
/// A cell is degenerate if its sum is not close to 1.0, it holds a negative
/// weight, or it contains NaN. All-zero cells are counted separately.
pub fn compute_weight_stats(grid: &WeightGrid) -> WeightStats {
    let mut min_sum = f32::MAX;
    let mut max_sum = f32::MIN;
    let mut degenerate_count = 0;
    let mut empty_count = 0;
    let mut cells = 0;

    if grid.layers() > 0 {
        for cell in grid.as_slice().chunks_exact(grid.layers()) {
            cells += 1;
            let sum: f32 = cell.iter().sum();
            min_sum = min_sum.min(sum);
            max_sum = max_sum.max(sum);

            if sum == 0.0 {
                empty_count += 1;
            } else if (sum - 1.0).abs() > SUM_TOLERANCE
                || sum.is_nan()
                || cell.iter().any(|&w| w < 0.0)
            {
                degenerate_count += 1;
            }
        }
    }

    if cells == 0 {
        min_sum = 0.0;
        max_sum = 0.0;
    }

    WeightStats {
        min_sum,
        max_sum,
        degenerate_count,
        empty_count,
    }
}
