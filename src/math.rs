//! Scalar helpers shared by the synthesizer and the compositor.

/// Linear interpolation: `a + t * (b - a)`. `t` is not clamped.
#[inline]
#[must_use]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}

/// Where `value` sits between `a` and `b`, clamped to [0, 1].
///
/// Argument order matters: `inverse_lerp(hi, lo, v)` runs backwards.
/// A degenerate range (`a == b`) yields 0.
#[inline]
#[must_use]
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if a == b {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}

/// Cubic Hermite smoothstep between `edge0` and `edge1`, clamped at both edges.
#[inline]
#[must_use]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = inverse_lerp(edge0, edge1, x);
    t * t * (3.0 - 2.0 * t)
}

/// Map `i` in `0..count` onto [0, 1], endpoints inclusive.
/// A single-sample axis maps to 0.
#[inline]
#[must_use]
pub fn normalized_coord(i: usize, count: usize) -> f32 {
    if count <= 1 {
        0.0
    } else {
        i as f32 / (count - 1) as f32
    }
}
