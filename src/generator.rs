//! End-to-end terrain bake: heights, layer weights, layers, sink.

use std::sync::Arc;

use crate::bake_worker::{bake_in_bands, BakeWorkerPool, SharedKernel, DEFAULT_BAND_ROWS};
use crate::compositor::LayerCompositor;
use crate::config::TerrainConfig;
use crate::debug_log::{compute_weight_stats, debug_log, WeightStats};
use crate::error::{TerrainError, TerrainResult};
use crate::heightfield::HeightField;
use crate::layer_resources::{AlphaMapSink, LayerFactory, TerrainLayer};
use crate::noise_field::NoiseField;
use crate::row_kernel::CancelToken;
use crate::synthesizer::{synthesize, synthesize_cancellable, HeightfieldSynthesizer};
use crate::texture_group::LayerSet;
use crate::weight_grid::WeightGrid;

/// Everything one bake produces
#[derive(Clone, Debug)]
pub struct GeneratedTerrain {
    pub heights: HeightField,
    pub layer_set: LayerSet,
    pub weights: WeightGrid,
    pub stats: WeightStats,
}

/// Runs bakes for one configuration. The noise source is seeded once and
/// shared by the height and paint stages.
pub struct TerrainGenerator {
    config: TerrainConfig,
    noise: Arc<NoiseField>,
}

impl TerrainGenerator {
    pub fn new(config: TerrainConfig) -> Self {
        let noise = Arc::new(NoiseField::new(config.seed));
        Self { config, noise }
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn noise(&self) -> &NoiseField {
        &self.noise
    }

    /// Heights only
    pub fn synthesize_heights(&self) -> HeightField {
        synthesize(self.noise.as_ref(), &self.config.heightfield)
    }

    fn compositor<'a>(&'a self, heights: &'a HeightField) -> LayerCompositor<&'a HeightField, &'a NoiseField> {
        LayerCompositor::new(
            heights,
            self.noise.as_ref(),
            self.config.alpha_map.width,
            self.config.alpha_map.height,
            self.config.curve,
            &self.config.groups,
        )
    }

    /// Synthesize heights and paint the alpha map on the rayon pool.
    pub fn generate(&self) -> GeneratedTerrain {
        let heights = self.synthesize_heights();
        let compositor = self.compositor(&heights);
        let weights = compositor.paint();
        let layer_set = compositor.layer_set().clone();
        finish(heights, layer_set, weights)
    }

    /// Like [`generate`](Self::generate), checking `cancel` once per row.
    pub fn generate_cancellable(&self, cancel: &CancelToken) -> TerrainResult<GeneratedTerrain> {
        let heights = synthesize_cancellable(self.noise.as_ref(), &self.config.heightfield, cancel)?;
        let compositor = self.compositor(&heights);
        let weights = compositor.paint_cancellable(cancel)?;
        let layer_set = compositor.layer_set().clone();
        Ok(finish(heights, layer_set, weights))
    }

    /// Run both stages as row bands through `pool`.
    pub fn generate_in_bands(
        &self,
        pool: &BakeWorkerPool,
        cancel: Option<&CancelToken>,
    ) -> TerrainResult<GeneratedTerrain> {
        let settings = self.config.heightfield;
        let height_kernel: SharedKernel =
            Arc::new(HeightfieldSynthesizer::new(Arc::clone(&self.noise), settings));
        let raw = bake_in_bands(pool, height_kernel, settings.cols(), 1, DEFAULT_BAND_ROWS, cancel)?;
        let heights = Arc::new(
            HeightField::from_vec(settings.rows(), settings.cols(), raw.as_slice().to_vec()).ok_or(
                TerrainError::ResolutionMismatch {
                    expected: (settings.rows(), settings.cols()),
                    actual: (raw.rows(), raw.cols()),
                },
            )?,
        );

        let compositor = Arc::new(LayerCompositor::new(
            Arc::clone(&heights),
            Arc::clone(&self.noise),
            self.config.alpha_map.width,
            self.config.alpha_map.height,
            self.config.curve,
            &self.config.groups,
        ));
        let layer_set = compositor.layer_set().clone();
        let paint_kernel: SharedKernel = compositor;
        let weights = bake_in_bands(
            pool,
            paint_kernel,
            self.config.alpha_map.width,
            layer_set.len(),
            DEFAULT_BAND_ROWS,
            cancel,
        )?;

        let heights = Arc::try_unwrap(heights).unwrap_or_else(|shared| (*shared).clone());
        Ok(finish(heights, layer_set, weights))
    }

    /// Full bake: generate, build layers through `factory`, hand both to `sink`.
    pub fn bake_into<F, S>(&self, factory: &F, sink: &mut S) -> TerrainResult<GeneratedTerrain>
    where
        F: LayerFactory + ?Sized,
        S: AlphaMapSink + ?Sized,
    {
        let terrain = self.generate();
        apply(&terrain, factory, sink)?;
        Ok(terrain)
    }

    /// Cancellable [`bake_into`](Self::bake_into). The sink is untouched on cancel.
    pub fn bake_into_cancellable<F, S>(
        &self,
        factory: &F,
        sink: &mut S,
        cancel: &CancelToken,
    ) -> TerrainResult<GeneratedTerrain>
    where
        F: LayerFactory + ?Sized,
        S: AlphaMapSink + ?Sized,
    {
        let terrain = self.generate_cancellable(cancel)?;
        apply(&terrain, factory, sink)?;
        Ok(terrain)
    }
}

fn apply<F, S>(terrain: &GeneratedTerrain, factory: &F, sink: &mut S) -> TerrainResult<()>
where
    F: LayerFactory + ?Sized,
    S: AlphaMapSink + ?Sized,
{
    let layers: Vec<TerrainLayer> = factory.create_layers(&terrain.layer_set);
    sink.apply(&layers, &terrain.weights)?;
    log::info!(
        "applied {} layers over a {}x{} alpha map",
        layers.len(),
        terrain.weights.cols(),
        terrain.weights.rows()
    );
    Ok(())
}

fn finish(heights: HeightField, layer_set: LayerSet, weights: WeightGrid) -> GeneratedTerrain {
    let stats = compute_weight_stats(&weights);

    debug_log(&format!(
        "[bake] heights {}x{}, alpha {}x{}, layers {:?}",
        heights.cols(),
        heights.rows(),
        weights.cols(),
        weights.rows(),
        layer_set.names()
    ));
    debug_log(&format!(
        "[bake] weight sums min={:.6} max={:.6} degenerate={} empty={}",
        stats.min_sum, stats.max_sum, stats.degenerate_count, stats.empty_count
    ));
    log::debug!(
        "bake finished: {} layers, weight sums in [{}, {}], {} degenerate cells",
        layer_set.len(),
        stats.min_sum,
        stats.max_sum,
        stats.degenerate_count
    );

    GeneratedTerrain {
        heights,
        layer_set,
        weights,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlphaMapSettings;
    use crate::layer_resources::{AcceptAllTextures, DefaultLayerFactory, InMemoryAlphaMap};
    use crate::synthesizer::HeightfieldSettings;
    use crate::texture_group::{TerrainGroup, TextureGroups};

    fn small_config() -> TerrainConfig {
        TerrainConfig {
            seed: 42,
            heightfield: HeightfieldSettings {
                width: 24,
                length: 20,
                ..Default::default()
            },
            alpha_map: AlphaMapSettings {
                width: 18,
                height: 14,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_generate_shapes() {
        let terrain = TerrainGenerator::new(small_config()).generate();
        assert_eq!(terrain.heights.rows(), 21);
        assert_eq!(terrain.heights.cols(), 25);
        assert_eq!(terrain.weights.rows(), 14);
        assert_eq!(terrain.weights.cols(), 18);
        assert_eq!(terrain.weights.layers(), 5);
        assert_eq!(
            terrain.layer_set.names(),
            vec!["Sand", "Grass", "Meadow", "Rock", "Snow"]
        );
    }

    #[test]
    fn test_every_cell_is_a_distribution() {
        let terrain = TerrainGenerator::new(small_config()).generate();
        assert_eq!(terrain.stats.degenerate_count, 0);
        assert_eq!(terrain.stats.empty_count, 0);
        for row in 0..terrain.weights.rows() {
            for col in 0..terrain.weights.cols() {
                let cell = terrain.weights.cell(row, col);
                assert!(cell.iter().all(|&w| w >= 0.0));
                let sum: f32 = cell.iter().sum();
                assert!((sum - 1.0).abs() < 1e-4, "cell ({}, {}) sums to {}", row, col, sum);
            }
        }
    }

    #[test]
    fn test_same_config_same_bake() {
        let a = TerrainGenerator::new(small_config()).generate();
        let b = TerrainGenerator::new(small_config()).generate();
        assert_eq!(a.heights, b.heights);
        assert_eq!(a.weights, b.weights);
    }

    #[test]
    fn test_seed_changes_heights() {
        let a = TerrainGenerator::new(small_config()).generate();
        let mut config = small_config();
        config.seed = 7;
        let b = TerrainGenerator::new(config).generate();
        assert_ne!(a.heights, b.heights);
    }

    #[test]
    fn test_banded_matches_direct() {
        let generator = TerrainGenerator::new(small_config());
        let direct = generator.generate();
        let pool = BakeWorkerPool::new(2, 8);
        let banded = generator.generate_in_bands(&pool, None).unwrap();
        assert_eq!(banded.heights, direct.heights);
        assert_eq!(banded.weights, direct.weights);
        assert_eq!(banded.layer_set, direct.layer_set);
    }

    #[test]
    fn test_bake_into_sink() {
        let generator = TerrainGenerator::new(small_config());
        let factory = DefaultLayerFactory::new(AcceptAllTextures);
        let mut sink = InMemoryAlphaMap::default();
        let terrain = generator.bake_into(&factory, &mut sink).unwrap();

        assert_eq!(sink.layers.len(), 5);
        assert_eq!(sink.layers[2].name, "Meadow");
        assert_eq!(sink.layers[0].tile_size, [15.0, 15.0]);
        assert_eq!(sink.weights.as_ref(), Some(&terrain.weights));
    }

    #[test]
    fn test_cancelled_bake_leaves_sink_untouched() {
        let generator = TerrainGenerator::new(small_config());
        let factory = DefaultLayerFactory::new(AcceptAllTextures);
        let mut sink = InMemoryAlphaMap::default();
        let token = CancelToken::new();
        token.cancel();

        let result = generator.bake_into_cancellable(&factory, &mut sink, &token);
        assert!(matches!(result, Err(TerrainError::Cancelled)));
        assert!(sink.weights.is_none());
        assert!(sink.layers.is_empty());
    }

    #[test]
    fn test_empty_groups_drop_weight() {
        // Only rock: cells fully in sand/grass/snow territory paint nothing
        let mut config = small_config();
        config.groups = TextureGroups::new().with(
            TerrainGroup::Rock,
            vec![crate::texture_group::TextureElement::new("Rock", 1.0)],
        );
        let terrain = TerrainGenerator::new(config).generate();
        assert_eq!(terrain.weights.layers(), 1);
        assert_eq!(terrain.stats.degenerate_count, 0);
        for &w in terrain.weights.as_slice() {
            assert!(w == 0.0 || (w - 1.0).abs() < 1e-5, "unexpected weight {}", w);
        }
    }

    #[test]
    fn test_no_textures_at_all() {
        let mut config = small_config();
        config.groups = TextureGroups::new();
        let terrain = TerrainGenerator::new(config).generate();
        assert_eq!(terrain.weights.layers(), 0);
        assert!(terrain.weights.as_slice().is_empty());
        assert_eq!(terrain.stats.degenerate_count, 0);
    }
}
