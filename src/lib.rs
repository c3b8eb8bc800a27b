//! Procedural terrain baking: fBm heightfields and Sand/Grass/Rock/Snow
//! texture weight maps.

pub mod bake_worker;
pub mod compositor;
pub mod config;
pub mod debug_log;
pub mod error;
pub mod generator;
pub mod group_weights;
pub mod heightfield;
pub mod layer_resources;
pub mod math;
pub mod noise_field;
pub mod row_kernel;
pub mod synthesizer;
pub mod texture_group;
pub mod weight_grid;

pub use bake_worker::BakeWorkerPool;
pub use compositor::{paint, LayerCompositor};
pub use config::{AlphaMapSettings, TerrainConfig};
pub use error::{ConfigError, TerrainError, TerrainResult};
pub use generator::{GeneratedTerrain, TerrainGenerator};
pub use group_weights::{GroupWeightCurve, GroupWeights};
pub use heightfield::{HeightField, HeightFn, HeightQuery};
pub use layer_resources::{
    AlphaMapSink, DefaultLayerFactory, InMemoryAlphaMap, LayerFactory, TerrainLayer, TextureCatalog,
};
pub use noise_field::{NoiseField, NoiseSource};
pub use row_kernel::{CancelToken, RowKernel};
pub use synthesizer::{synthesize, synthesize_into, HeightfieldSettings};
pub use texture_group::{LayerSet, TerrainGroup, TextureElement, TextureGroups, TextureHandle};
pub use weight_grid::WeightGrid;
