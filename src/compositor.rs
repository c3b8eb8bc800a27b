//! Layer weight compositor: turns heights plus texture groups into a
//! normalized weight vector per alpha-map cell.
//!
//! Per cell:
//! 1. Height picks base weights for the four groups ([`GroupWeightCurve`]).
//! 2. Each weighted group splits its weight among its textures using
//!    contrast-sharpened noise, suppressing textures far below the local
//!    winner. A group whose factors all vanish splits evenly.
//! 3. The whole vector is renormalized to sum to 1.
//!
//! Empty groups drop their base weight; it is not handed to other groups.

use crate::error::TerrainResult;
use crate::group_weights::GroupWeightCurve;
use crate::heightfield::HeightQuery;
use crate::math::normalized_coord;
use crate::noise_field::NoiseSource;
use crate::row_kernel::{run_rows, CancelToken, RowKernel};
use crate::texture_group::{LayerEntry, LayerSet, TerrainGroup, TextureGroups};
use crate::weight_grid::WeightGrid;

/// Power applied to each noise sample before weighting
pub const CONTRAST_EXPONENT: f32 = 2.0;
/// Factors below this fraction of the group maximum are dropped
pub const SUPPRESSION_RATIO: f32 = 0.2;

/// An immutable paint job over an alpha map of `width x height` cells.
///
/// `H` and `N` may be borrowed (`&HeightField`) or shared (`Arc<...>`); the
/// latter makes the job `'static` for [`crate::bake_worker::BakeWorkerPool`].
pub struct LayerCompositor<H: HeightQuery, N: NoiseSource> {
    heights: H,
    noise: N,
    curve: GroupWeightCurve,
    layers: LayerSet,
    width: usize,
    height: usize,
}

impl<H: HeightQuery, N: NoiseSource> LayerCompositor<H, N> {
    /// Empty groups are reported once here, not per cell.
    pub fn new(
        heights: H,
        noise: N,
        width: usize,
        height: usize,
        curve: GroupWeightCurve,
        groups: &TextureGroups,
    ) -> Self {
        for group in groups.empty_groups() {
            log::warn!(
                "{} group has no textures; its weight will be dropped",
                group.name()
            );
        }

        Self {
            heights,
            noise,
            curve,
            layers: LayerSet::from_groups(groups),
            width,
            height,
        }
    }

    pub fn layer_set(&self) -> &LayerSet {
        &self.layers
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Weight vector at normalized coordinates
    pub fn weights_at(&self, norm_x: f32, norm_y: f32) -> Vec<f32> {
        let mut out = vec![0.0; self.layers.len()];
        self.write_cell(norm_x, norm_y, &mut out);
        out
    }

    /// Fill `out` (one slot per layer) for a single cell.
    pub fn write_cell(&self, norm_x: f32, norm_y: f32, out: &mut [f32]) {
        out.fill(0.0);
        if out.is_empty() {
            return;
        }

        let h = self.heights.height_at(norm_x, norm_y);
        let base = self.curve.base_weights(h);

        for group in TerrainGroup::ALL {
            let weight = base[group.index()];
            let range = self.layers.group_range(group);
            if weight <= 0.0 || range.is_empty() {
                continue;
            }
            self.distribute_group(
                self.layers.group_elements(group),
                weight,
                norm_x,
                norm_y,
                &mut out[range],
            );
        }

        let total: f32 = out.iter().sum();
        if total > 0.0 {
            for w in out.iter_mut() {
                *w /= total;
            }
        }
    }

    /// Split `group_weight` across `entries`, writing into `out`.
    fn distribute_group(
        &self,
        entries: &[LayerEntry],
        group_weight: f32,
        norm_x: f32,
        norm_y: f32,
        out: &mut [f32],
    ) {
        if entries.len() == 1 {
            out[0] = group_weight;
            return;
        }

        let mut max_factor = 0.0f32;
        for (slot, entry) in out.iter_mut().zip(entries) {
            let e = &entry.element;
            let sample = self.noise.sample(
                norm_x * e.noise_scale + e.noise_offset[0],
                norm_y * e.noise_scale + e.noise_offset[1],
            );
            *slot = sample.powf(CONTRAST_EXPONENT) * e.strength;
            max_factor = max_factor.max(*slot);
        }

        let cutoff = SUPPRESSION_RATIO * max_factor;
        let mut sum = 0.0f32;
        for slot in out.iter_mut() {
            if *slot < cutoff {
                *slot = 0.0;
            }
            sum += *slot;
        }

        if sum <= 0.0 {
            let share = 1.0 / entries.len() as f32;
            out.fill(share * group_weight);
        } else {
            for slot in out.iter_mut() {
                *slot = *slot / sum * group_weight;
            }
        }
    }

    /// Paint the full alpha map on the rayon pool.
    pub fn paint(&self) -> WeightGrid {
        let mut grid = WeightGrid::new(self.height, self.width, self.layers.len());
        if let Err(err) = run_rows(self, grid.as_mut_slice(), None) {
            log::error!("layer painting failed: {err}");
        }
        grid
    }

    /// Like [`paint`](Self::paint) but aborts between rows once `cancel` is set.
    pub fn paint_cancellable(&self, cancel: &CancelToken) -> TerrainResult<WeightGrid> {
        let mut grid = WeightGrid::new(self.height, self.width, self.layers.len());
        run_rows(self, grid.as_mut_slice(), Some(cancel))?;
        Ok(grid)
    }
}

impl<H: HeightQuery, N: NoiseSource> RowKernel for LayerCompositor<H, N> {
    fn rows(&self) -> usize {
        self.height
    }

    fn row_len(&self) -> usize {
        self.width * self.layers.len()
    }

    fn compute_row(&self, row: usize, out: &mut [f32]) {
        let layer_count = self.layers.len();
        let norm_y = normalized_coord(row, self.height);
        for (col, cell) in out.chunks_exact_mut(layer_count).enumerate() {
            let norm_x = normalized_coord(col, self.width);
            self.write_cell(norm_x, norm_y, cell);
        }
    }
}

/// Paint a `width x height` alpha map in one call.
pub fn paint<H, N>(
    heights: &H,
    noise: &N,
    width: usize,
    height: usize,
    curve: GroupWeightCurve,
    groups: &TextureGroups,
) -> WeightGrid
where
    H: HeightQuery + ?Sized,
    N: NoiseSource + ?Sized,
{
    LayerCompositor::new(heights, noise, width, height, curve, groups).paint()
}
