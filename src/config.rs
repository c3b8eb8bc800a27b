//! Terrain bake configuration and JSON presets.
//!
//! One immutable struct describes a whole bake. Editors build it, optionally
//! validate it, and pass it by reference; nothing is retained between bakes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, TerrainResult};
use crate::group_weights::GroupWeightCurve;
use crate::synthesizer::HeightfieldSettings;
use crate::texture_group::{TerrainGroup, TextureElement, TextureGroups};

/// Default alpha-map resolution per axis
pub const DEFAULT_ALPHA_MAP_RESOLUTION: usize = 512;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlphaMapSettings {
    pub width: usize,
    pub height: usize,
}

impl Default for AlphaMapSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_ALPHA_MAP_RESOLUTION,
            height: DEFAULT_ALPHA_MAP_RESOLUTION,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Seed for the Perlin noise source
    pub seed: u32,
    pub heightfield: HeightfieldSettings,
    pub alpha_map: AlphaMapSettings,
    pub curve: GroupWeightCurve,
    pub groups: TextureGroups,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            heightfield: HeightfieldSettings::default(),
            alpha_map: AlphaMapSettings::default(),
            curve: GroupWeightCurve::default(),
            groups: default_groups(),
        }
    }
}

/// Starter texture set with decorrelated noise offsets.
pub fn default_groups() -> TextureGroups {
    TextureGroups::new()
        .with(
            TerrainGroup::Sand,
            vec![TextureElement::new("Sand", 1.0).with_noise(10.0, [0.0, 0.0])],
        )
        .with(
            TerrainGroup::Grass,
            vec![
                TextureElement::new("Grass", 1.0).with_noise(10.0, [0.0, 0.0]),
                TextureElement::new("Meadow", 0.8).with_noise(14.0, [37.0, 11.0]),
            ],
        )
        .with(
            TerrainGroup::Rock,
            vec![TextureElement::new("Rock", 1.0).with_noise(8.0, [71.0, 23.0])],
        )
        .with(
            TerrainGroup::Snow,
            vec![TextureElement::new("Snow", 1.0).with_noise(6.0, [13.0, 97.0])],
        )
}

impl TerrainConfig {
    pub fn from_json_str(json: &str) -> TerrainResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> TerrainResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a preset file
    pub fn load_json(path: impl AsRef<Path>) -> TerrainResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        log::info!("loaded terrain preset from {}", path.as_ref().display());
        Ok(config)
    }

    /// Save as a pretty-printed preset file
    pub fn save_json(&self, path: impl AsRef<Path>) -> TerrainResult<()> {
        fs::write(path.as_ref(), self.to_json_string()?)?;
        log::info!("saved terrain preset to {}", path.as_ref().display());
        Ok(())
    }

    /// Check for settings the bake would accept but produce nonsense from.
    /// Bakes never call this themselves.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heightfield.octaves == 0 {
            return Err(ConfigError::NoOctaves);
        }

        if self.alpha_map.width == 0 || self.alpha_map.height == 0 {
            return Err(ConfigError::EmptyAlphaMap {
                width: self.alpha_map.width,
                height: self.alpha_map.height,
            });
        }

        let thresholds = [
            ("heightfield.mountain_threshold", self.heightfield.mountain_threshold),
            ("curve.water_level", self.curve.water_level),
            ("curve.mountain_threshold", self.curve.mountain_threshold),
        ];
        for (field, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { field, value });
            }
        }

        for (group, elements) in self.groups.iter() {
            for element in elements {
                if element.noise_scale <= 0.0 {
                    return Err(ConfigError::NonPositiveNoiseScale {
                        group,
                        name: element.name.clone(),
                        scale: element.noise_scale,
                    });
                }
            }
        }

        let c = &self.curve;
        let bands = [
            ("water", c.water_level - c.water_blend_range, c.water_level + c.water_blend_range),
            (
                "mountain",
                c.mountain_threshold - c.mountain_blend_range,
                c.mountain_threshold + c.mountain_blend_range,
            ),
            ("snow", 1.0 - c.snow_blend_range, 1.0),
        ];
        for pair in bands.windows(2) {
            let (lower, _, lower_end) = pair[0];
            let (upper, upper_start, _) = pair[1];
            if lower_end > upper_start {
                return Err(ConfigError::OverlappingBlendZones {
                    lower,
                    lower_end,
                    upper,
                    upper_start,
                });
            }
        }

        Ok(())
    }
}
