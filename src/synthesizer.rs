//! Heightfield synthesis from fBm noise plus a plains/mountains shaping curve.

use serde::{Deserialize, Serialize};

use crate::error::{TerrainError, TerrainResult};
use crate::heightfield::HeightField;
use crate::math::{lerp, normalized_coord, smoothstep};
use crate::noise_field::{fbm, NoiseSource};
use crate::row_kernel::{run_rows, CancelToken, RowKernel};

/// Parameters for [`synthesize`]. The grid is `(length + 1) x (width + 1)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightfieldSettings {
    pub width: usize,
    pub length: usize,
    /// Multiplier on normalized coordinates before sampling
    pub scale: f32,
    pub octaves: u32,
    pub lacunarity: f32,
    pub gain: f32,
    /// Added to scaled coordinates (x, z)
    pub offset: [f32; 2],
    /// Noise value where plains give way to mountains
    pub mountain_threshold: f32,
    /// Steepness of the plains-to-mountain ramp
    pub blend_strength: f32,
    /// Height of the plains plateau
    pub plain_height_multiplier: f32,
}

impl Default for HeightfieldSettings {
    fn default() -> Self {
        Self {
            width: 256,
            length: 256,
            scale: 4.0,
            octaves: 6,
            lacunarity: 2.0,
            gain: 0.5,
            offset: [0.0, 0.0],
            mountain_threshold: 0.5,
            blend_strength: 2.0,
            plain_height_multiplier: 0.3,
        }
    }
}

impl HeightfieldSettings {
    /// Grid rows (along z)
    pub fn rows(&self) -> usize {
        self.length + 1
    }

    /// Grid columns (along x)
    pub fn cols(&self) -> usize {
        self.width + 1
    }

    /// Plains/mountains remap of a [0, 1] noise value
    pub fn shape(&self, noise_value: f32) -> f32 {
        if noise_value < self.mountain_threshold {
            let blend = smoothstep(0.0, 1.0, noise_value / self.mountain_threshold);
            blend * self.plain_height_multiplier
        } else {
            let blend = smoothstep(
                0.0,
                1.0,
                (noise_value - self.mountain_threshold) * self.blend_strength,
            );
            lerp(self.plain_height_multiplier, noise_value, blend)
        }
    }

    /// Height at normalized grid coordinates
    pub fn height_at<N: NoiseSource + ?Sized>(&self, noise: &N, norm_x: f32, norm_z: f32) -> f32 {
        let x = norm_x * self.scale + self.offset[0];
        let z = norm_z * self.scale + self.offset[1];
        let value = fbm(noise, x, z, self.octaves, self.lacunarity, self.gain);
        let noise_value = ((value + 1.0) * 0.5).clamp(0.0, 1.0);
        self.shape(noise_value)
    }
}

/// Row kernel producing one z-row of heights per call.
pub struct HeightfieldSynthesizer<N: NoiseSource> {
    noise: N,
    settings: HeightfieldSettings,
}

impl<N: NoiseSource> HeightfieldSynthesizer<N> {
    pub fn new(noise: N, settings: HeightfieldSettings) -> Self {
        Self { noise, settings }
    }

    pub fn settings(&self) -> &HeightfieldSettings {
        &self.settings
    }
}

impl<N: NoiseSource> RowKernel for HeightfieldSynthesizer<N> {
    fn rows(&self) -> usize {
        self.settings.rows()
    }

    fn row_len(&self) -> usize {
        self.settings.cols()
    }

    fn compute_row(&self, row: usize, out: &mut [f32]) {
        let rows = self.settings.rows();
        let cols = self.settings.cols();
        let norm_z = normalized_coord(row, rows);
        for (col, height) in out.iter_mut().enumerate() {
            let norm_x = normalized_coord(col, cols);
            *height = self.settings.height_at(&self.noise, norm_x, norm_z);
        }
    }
}

/// Build a new heightfield.
pub fn synthesize<N: NoiseSource + ?Sized>(noise: &N, settings: &HeightfieldSettings) -> HeightField {
    let mut field = HeightField::new(settings.rows(), settings.cols());
    let kernel = HeightfieldSynthesizer::new(noise, *settings);
    // Sized from `settings` with no token; run_rows has nothing to reject
    if let Err(err) = run_rows(&kernel, field.as_mut_slice(), None) {
        log::error!("heightfield synthesis failed: {err}");
    }
    field
}

/// Overwrite `field` in place. Its resolution must match `settings`.
pub fn synthesize_into<N: NoiseSource + ?Sized>(
    noise: &N,
    settings: &HeightfieldSettings,
    field: &mut HeightField,
    cancel: Option<&CancelToken>,
) -> TerrainResult<()> {
    let expected = (settings.rows(), settings.cols());
    let actual = (field.rows(), field.cols());
    if expected != actual {
        return Err(TerrainError::ResolutionMismatch { expected, actual });
    }

    let kernel = HeightfieldSynthesizer::new(noise, *settings);
    run_rows(&kernel, field.as_mut_slice(), cancel)
}

/// Cancellable variant of [`synthesize`].
pub fn synthesize_cancellable<N: NoiseSource + ?Sized>(
    noise: &N,
    settings: &HeightfieldSettings,
    cancel: &CancelToken,
) -> TerrainResult<HeightField> {
    let mut field = HeightField::new(settings.rows(), settings.cols());
    synthesize_into(noise, settings, &mut field, Some(cancel))?;
    Ok(field)
}
