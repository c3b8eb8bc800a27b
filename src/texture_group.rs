//! Texture groups and the flattened layer ordering.
//!
//! Layers are always ordered Sand, Grass, Rock, Snow, then element order
//! within each group. Weight vectors and layer handles share this indexing.

use std::ops::{Index, IndexMut, Range};

use serde::{Deserialize, Serialize};

/// Number of terrain groups
pub const GROUP_COUNT: usize = 4;

/// Terrain-type group, in painting order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerrainGroup {
    Sand = 0,
    Grass = 1,
    Rock = 2,
    Snow = 3,
}

impl TerrainGroup {
    pub const ALL: [TerrainGroup; GROUP_COUNT] = [
        TerrainGroup::Sand,
        TerrainGroup::Grass,
        TerrainGroup::Rock,
        TerrainGroup::Snow,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            TerrainGroup::Sand => "Sand",
            TerrainGroup::Grass => "Grass",
            TerrainGroup::Rock => "Rock",
            TerrainGroup::Snow => "Snow",
        }
    }
}

/// Opaque reference to an engine texture resource (asset path or id).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextureHandle(pub String);

impl TextureHandle {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One blendable texture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureElement {
    /// Layer name; not required to be unique across groups
    pub name: String,
    /// Static bias on the noise factor, in [0, 1]
    pub strength: f32,
    /// Frequency applied to normalized cell coordinates before sampling noise
    pub noise_scale: f32,
    /// Added after scaling so textures in one group sample decorrelated noise
    pub noise_offset: [f32; 2],
    pub diffuse: Option<TextureHandle>,
    pub normal: Option<TextureHandle>,
}

impl Default for TextureElement {
    fn default() -> Self {
        Self {
            name: String::from("New Texture"),
            strength: 1.0,
            noise_scale: 10.0,
            noise_offset: [0.0, 0.0],
            diffuse: None,
            normal: None,
        }
    }
}

impl TextureElement {
    pub fn new(name: impl Into<String>, strength: f32) -> Self {
        Self {
            name: name.into(),
            strength,
            ..Default::default()
        }
    }

    pub fn with_noise(mut self, scale: f32, offset: [f32; 2]) -> Self {
        self.noise_scale = scale;
        self.noise_offset = offset;
        self
    }

    pub fn with_textures(mut self, diffuse: Option<TextureHandle>, normal: Option<TextureHandle>) -> Self {
        self.diffuse = diffuse;
        self.normal = normal;
        self
    }
}

/// Texture elements for each of the four groups.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureGroups {
    pub sand: Vec<TextureElement>,
    pub grass: Vec<TextureElement>,
    pub rock: Vec<TextureElement>,
    pub snow: Vec<TextureElement>,
}

impl TextureGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, group: TerrainGroup, elements: Vec<TextureElement>) -> Self {
        self[group] = elements;
        self
    }

    pub fn push(&mut self, group: TerrainGroup, element: TextureElement) {
        self[group].push(element);
    }

    /// Groups in painting order
    pub fn iter(&self) -> impl Iterator<Item = (TerrainGroup, &[TextureElement])> + '_ {
        TerrainGroup::ALL
            .into_iter()
            .map(move |group| (group, self[group].as_slice()))
    }

    /// Groups that contribute nothing when painted
    pub fn empty_groups(&self) -> Vec<TerrainGroup> {
        self.iter()
            .filter(|(_, elements)| elements.is_empty())
            .map(|(group, _)| group)
            .collect()
    }

    pub fn total_elements(&self) -> usize {
        self.iter().map(|(_, elements)| elements.len()).sum()
    }
}

impl Index<TerrainGroup> for TextureGroups {
    type Output = Vec<TextureElement>;

    fn index(&self, group: TerrainGroup) -> &Self::Output {
        match group {
            TerrainGroup::Sand => &self.sand,
            TerrainGroup::Grass => &self.grass,
            TerrainGroup::Rock => &self.rock,
            TerrainGroup::Snow => &self.snow,
        }
    }
}

impl IndexMut<TerrainGroup> for TextureGroups {
    fn index_mut(&mut self, group: TerrainGroup) -> &mut Self::Output {
        match group {
            TerrainGroup::Sand => &mut self.sand,
            TerrainGroup::Grass => &mut self.grass,
            TerrainGroup::Rock => &mut self.rock,
            TerrainGroup::Snow => &mut self.snow,
        }
    }
}

/// A layer in the flattened set: which group it came from and its element.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerEntry {
    pub group: TerrainGroup,
    pub element: TextureElement,
}

/// Flattened, order-stable sequence of every configured texture.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerSet {
    entries: Vec<LayerEntry>,
    ranges: [Range<usize>; GROUP_COUNT],
}

impl LayerSet {
    pub fn from_groups(groups: &TextureGroups) -> Self {
        let mut entries = Vec::with_capacity(groups.total_elements());
        let mut ranges: [Range<usize>; GROUP_COUNT] = Default::default();

        for (group, elements) in groups.iter() {
            let start = entries.len();
            entries.extend(elements.iter().cloned().map(|element| LayerEntry { group, element }));
            ranges[group.index()] = start..entries.len();
        }

        Self { entries, ranges }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LayerEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerEntry> {
        self.entries.iter()
    }

    /// Layer indices belonging to `group`
    pub fn group_range(&self, group: TerrainGroup) -> Range<usize> {
        self.ranges[group.index()].clone()
    }

    pub fn group_elements(&self, group: TerrainGroup) -> &[LayerEntry] {
        &self.entries[self.group_range(group)]
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.element.name.as_str()).collect()
    }
}
