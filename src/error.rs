use thiserror::Error;

use crate::texture_group::TerrainGroup;

/// Configuration problems found by [`crate::TerrainConfig::validate`].
/// The bake itself never checks these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{group:?} texture '{name}' has non-positive noise scale {scale}")]
    NonPositiveNoiseScale {
        group: TerrainGroup,
        name: String,
        scale: f32,
    },
    #[error("{field} must be within [0, 1], got {value}")]
    ThresholdOutOfRange { field: &'static str, value: f32 },
    #[error("octaves must be at least 1")]
    NoOctaves,
    #[error("blend zones overlap: {lower} band ends at {lower_end}, {upper} band starts at {upper_start}")]
    OverlappingBlendZones {
        lower: &'static str,
        lower_end: f32,
        upper: &'static str,
        upper_start: f32,
    },
    #[error("alpha map resolution must be non-zero, got {width}x{height}")]
    EmptyAlphaMap { width: usize, height: usize },
}

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("invalid terrain config: {0}")]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("preset parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bake cancelled")]
    Cancelled,
    #[error("grid resolution mismatch: expected {expected:?}, got {actual:?}")]
    ResolutionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("layer count mismatch: {expected} layers, weight grid has {actual}")]
    LayerCountMismatch { expected: usize, actual: usize },
    #[error("missing external resource: {0}")]
    MissingExternalResource(String),
    #[error("bake worker channel disconnected")]
    WorkerDisconnected,
}

pub type TerrainResult<T> = Result<T, TerrainError>;
