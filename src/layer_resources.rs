//! Boundary types for the host engine: layer handles and alpha-map sinks.
//!
//! The core only needs index-stable layers; how an engine materializes them
//! is up to the [`LayerFactory`] and [`AlphaMapSink`] implementations.

use std::collections::HashSet;

use crate::error::{TerrainError, TerrainResult};
use crate::texture_group::{LayerSet, TextureElement, TextureHandle};
use crate::weight_grid::WeightGrid;

/// World-space tile size of every created layer
pub const DEFAULT_TILE_SIZE: [f32; 2] = [15.0, 15.0];

/// Engine-side texture layer. A missing texture leaves its slot `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainLayer {
    pub name: String,
    pub diffuse: Option<TextureHandle>,
    pub normal: Option<TextureHandle>,
    pub tile_size: [f32; 2],
}

/// Lookup of texture resources known to the host.
pub trait TextureCatalog: Sync {
    fn contains(&self, handle: &TextureHandle) -> bool;
}

/// Accepts every handle; for hosts that resolve textures lazily.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptAllTextures;

impl TextureCatalog for AcceptAllTextures {
    fn contains(&self, _handle: &TextureHandle) -> bool {
        true
    }
}

impl TextureCatalog for HashSet<TextureHandle> {
    fn contains(&self, handle: &TextureHandle) -> bool {
        HashSet::contains(self, handle)
    }
}

pub trait LayerFactory {
    fn create_layer(&self, element: &TextureElement) -> TerrainLayer;

    /// One layer per [`LayerSet`] entry, same order
    fn create_layers(&self, layers: &LayerSet) -> Vec<TerrainLayer> {
        layers.iter().map(|entry| self.create_layer(&entry.element)).collect()
    }
}

/// Builds layers with a fixed tile size, dropping textures the catalog lacks.
#[derive(Clone, Debug)]
pub struct DefaultLayerFactory<C: TextureCatalog> {
    catalog: C,
    tile_size: [f32; 2],
}

impl<C: TextureCatalog> DefaultLayerFactory<C> {
    pub fn new(catalog: C) -> Self {
        Self {
            catalog,
            tile_size: DEFAULT_TILE_SIZE,
        }
    }

    pub fn with_tile_size(mut self, tile_size: [f32; 2]) -> Self {
        self.tile_size = tile_size;
        self
    }

    fn resolve(&self, layer: &str, slot: &str, handle: Option<&TextureHandle>) -> Option<TextureHandle> {
        let handle = handle?;
        if self.catalog.contains(handle) {
            Some(handle.clone())
        } else {
            log::warn!(
                "{}",
                TerrainError::MissingExternalResource(format!(
                    "{slot} texture '{}' for layer '{layer}'",
                    handle.as_str()
                ))
            );
            None
        }
    }
}

impl Default for DefaultLayerFactory<AcceptAllTextures> {
    fn default() -> Self {
        Self::new(AcceptAllTextures)
    }
}

impl<C: TextureCatalog> LayerFactory for DefaultLayerFactory<C> {
    fn create_layer(&self, element: &TextureElement) -> TerrainLayer {
        TerrainLayer {
            name: element.name.clone(),
            diffuse: self.resolve(&element.name, "diffuse", element.diffuse.as_ref()),
            normal: self.resolve(&element.name, "normal", element.normal.as_ref()),
            tile_size: self.tile_size,
        }
    }
}

/// Receives the finished bake and applies it to persistent terrain state.
pub trait AlphaMapSink {
    fn apply(&mut self, layers: &[TerrainLayer], weights: &WeightGrid) -> TerrainResult<()>;
}

/// Sink that simply keeps the last applied bake.
#[derive(Clone, Debug, Default)]
pub struct InMemoryAlphaMap {
    pub layers: Vec<TerrainLayer>,
    pub weights: Option<WeightGrid>,
}

impl AlphaMapSink for InMemoryAlphaMap {
    fn apply(&mut self, layers: &[TerrainLayer], weights: &WeightGrid) -> TerrainResult<()> {
        if layers.len() != weights.layers() {
            return Err(TerrainError::LayerCountMismatch {
                expected: layers.len(),
                actual: weights.layers(),
            });
        }
        self.layers = layers.to_vec();
        self.weights = Some(weights.clone());
        Ok(())
    }
}
