//! Height-driven base weights for the four terrain groups.

use serde::{Deserialize, Serialize};

use crate::math::inverse_lerp;
use crate::texture_group::{TerrainGroup, GROUP_COUNT};

/// Base weight per group, indexed by [`TerrainGroup::index`].
pub type GroupWeights = [f32; GROUP_COUNT];

/// Normalized height thresholds and the width of each transition band.
///
/// Bands are not checked for overlap here; see [`crate::config::TerrainConfig::validate`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupWeightCurve {
    pub water_level: f32,
    pub mountain_threshold: f32,
    pub water_blend_range: f32,
    pub mountain_blend_range: f32,
    pub snow_blend_range: f32,
}

impl Default for GroupWeightCurve {
    fn default() -> Self {
        Self {
            water_level: 0.2,
            mountain_threshold: 0.6,
            water_blend_range: 0.05,
            mountain_blend_range: 0.05,
            snow_blend_range: 0.05,
        }
    }
}

impl GroupWeightCurve {
    /// Base group weights at normalized height `h`.
    ///
    /// The sand/grass band interpolates from its upper edge down to its lower
    /// edge; the grass/rock and rock/snow bands interpolate upwards.
    pub fn base_weights(&self, h: f32) -> GroupWeights {
        let mut w = [0.0; GROUP_COUNT];
        let sand = TerrainGroup::Sand.index();
        let grass = TerrainGroup::Grass.index();
        let rock = TerrainGroup::Rock.index();
        let snow = TerrainGroup::Snow.index();

        let water_lo = self.water_level - self.water_blend_range;
        let water_hi = self.water_level + self.water_blend_range;
        let mountain_lo = self.mountain_threshold - self.mountain_blend_range;
        let mountain_hi = self.mountain_threshold + self.mountain_blend_range;
        let snow_lo = 1.0 - self.snow_blend_range;

        if h < water_lo {
            w[sand] = 1.0;
        } else if h < water_hi {
            let t = inverse_lerp(water_hi, water_lo, h);
            w[sand] = 1.0 - t;
            w[grass] = t;
        } else if h < mountain_lo {
            w[grass] = 1.0;
        } else if h < mountain_hi {
            let t = inverse_lerp(mountain_lo, mountain_hi, h);
            w[grass] = 1.0 - t;
            w[rock] = t;
        } else if h < snow_lo {
            w[rock] = 1.0;
        } else if h < 1.0 {
            let t = inverse_lerp(snow_lo, 1.0, h);
            w[rock] = 1.0 - t;
            w[snow] = t;
        } else {
            w[snow] = 1.0;
        }

        w
    }
}
