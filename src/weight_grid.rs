//! Per-cell texture weight storage for a whole alpha map.
//!
//! Layout is row-major `(row, col, layer)`, which is what engine alpha-map
//! writers expect. Each cell holds one weight per [`crate::LayerSet`] entry.

/// Layers packed into one RGBA splat texture
pub const SPLAT_CHANNELS: usize = 4;

#[derive(Clone, Debug, PartialEq)]
pub struct WeightGrid {
    rows: usize,
    cols: usize,
    layers: usize,
    data: Vec<f32>,
}

impl WeightGrid {
    pub fn new(rows: usize, cols: usize, layers: usize) -> Self {
        Self {
            rows,
            cols,
            layers,
            data: vec![0.0; rows * cols * layers],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn layers(&self) -> usize {
        self.layers
    }

    /// Number of floats in one row of cells
    pub fn row_len(&self) -> usize {
        self.cols * self.layers
    }

    fn offset(&self, row: usize, col: usize) -> usize {
        (row * self.cols + col) * self.layers
    }

    /// Weight vector of a single cell
    pub fn cell(&self, row: usize, col: usize) -> &[f32] {
        let start = self.offset(row, col);
        &self.data[start..start + self.layers]
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> &mut [f32] {
        let start = self.offset(row, col);
        let layers = self.layers;
        &mut self.data[start..start + layers]
    }

    pub fn get(&self, row: usize, col: usize, layer: usize) -> f32 {
        self.data[self.offset(row, col) + layer]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Copy a band of computed rows into place, starting at `start_row`.
    /// Returns the number of rows written.
    pub fn write_rows(&mut self, start_row: usize, rows: &[f32]) -> usize {
        let row_len = self.row_len();
        if row_len == 0 || start_row >= self.rows {
            return 0;
        }
        let start = start_row * row_len;
        let count = (rows.len() / row_len).min(self.rows - start_row);
        self.data[start..start + count * row_len].copy_from_slice(&rows[..count * row_len]);
        count
    }

    /// Index of the heaviest layer in a cell, `None` if the cell has no weight.
    /// Ties resolve to the lowest index.
    pub fn dominant_layer(&self, row: usize, col: usize) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &w) in self.cell(row, col).iter().enumerate() {
            if w > 0.0 && best.map_or(true, |(_, bw)| w > bw) {
                best = Some((i, w));
            }
        }
        best.map(|(i, _)| i)
    }

    /// One layer's alpha channel, row-major
    pub fn layer_plane(&self, layer: usize) -> Vec<f32> {
        if layer >= self.layers {
            return Vec::new();
        }
        self.data
            .chunks_exact(self.layers)
            .map(|cell| cell[layer])
            .collect()
    }

    /// Pack layers into RGBA splat maps, four layers per map.
    /// The last map is zero-padded when the layer count is not a multiple of four.
    pub fn to_splat_maps(&self) -> Vec<Vec<[f32; SPLAT_CHANNELS]>> {
        if self.layers == 0 {
            return Vec::new();
        }
        let map_count = self.layers.div_ceil(SPLAT_CHANNELS);
        let mut maps = vec![Vec::with_capacity(self.rows * self.cols); map_count];

        for cell in self.data.chunks_exact(self.layers) {
            for (map_index, map) in maps.iter_mut().enumerate() {
                let mut rgba = [0.0; SPLAT_CHANNELS];
                let base = map_index * SPLAT_CHANNELS;
                for (channel, value) in rgba.iter_mut().enumerate() {
                    if let Some(w) = cell.get(base + channel) {
                        *value = *w;
                    }
                }
                map.push(rgba);
            }
        }

        maps
    }
}
