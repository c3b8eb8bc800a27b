use noise::{NoiseFn, Perlin, Seedable};
use std::sync::Arc;

/// Deterministic 2D scalar noise in [0, 1].
///
/// Same coordinate must always produce the same value; the synthesizer and
/// compositor rely on this for reproducible bakes.
pub trait NoiseSource: Send + Sync {
    fn sample(&self, x: f32, y: f32) -> f32;
}

impl<T: NoiseSource + ?Sized> NoiseSource for Arc<T> {
    fn sample(&self, x: f32, y: f32) -> f32 {
        (**self).sample(x, y)
    }
}

impl<T: NoiseSource + ?Sized> NoiseSource for &T {
    fn sample(&self, x: f32, y: f32) -> f32 {
        (**self).sample(x, y)
    }
}

/// Seeded Perlin noise remapped from [-1, 1] to [0, 1].
/// Lattice points sample to 0.5.
#[derive(Clone, Debug)]
pub struct NoiseField {
    perlin: Perlin,
}

impl NoiseField {
    pub fn new(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
        }
    }

    pub fn seed(&self) -> u32 {
        self.perlin.seed()
    }
}

impl Default for NoiseField {
    fn default() -> Self {
        Self::new(Perlin::DEFAULT_SEED)
    }
}

impl NoiseSource for NoiseField {
    fn sample(&self, x: f32, y: f32) -> f32 {
        let raw = self.perlin.get([x as f64, y as f64]) as f32;
        (raw * 0.5 + 0.5).clamp(0.0, 1.0)
    }
}

/// Fractal Brownian motion over a [0, 1] noise source.
///
/// Each octave is remapped to [-1, 1] before accumulation; the sum is divided
/// by the total amplitude, so the result lies in roughly [-1, 1].
/// `octaves == 0` is degenerate and returns 0.
pub fn fbm<N: NoiseSource + ?Sized>(
    noise: &N,
    x: f32,
    y: f32,
    octaves: u32,
    lacunarity: f32,
    gain: f32,
) -> f32 {
    let mut total = 0.0f32;
    let mut frequency = 1.0f32;
    let mut amplitude = 1.0f32;
    let mut amplitude_sum = 0.0f32;

    for _ in 0..octaves {
        let n = noise.sample(x * frequency, y * frequency) * 2.0 - 1.0;
        total += n * amplitude;
        amplitude_sum += amplitude;
        frequency *= lacunarity;
        amplitude *= gain;
    }

    if amplitude_sum > 0.0 {
        total / amplitude_sum
    } else {
        0.0
    }
}

/// Thread-safe shared noise source for parallel bakes
pub type SharedNoiseSource = Arc<dyn NoiseSource>;
