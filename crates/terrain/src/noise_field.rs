//! Deterministic layered-noise sampling.
//!
//! Accumulates octaves of gradient noise at geometrically increasing
//! frequency and decreasing amplitude. Each octave is decorrelated by a
//! pseudo-random jitter offset derived from the seed, and the world-space
//! sample center is folded into those offsets so adjacent chunks sample a
//! continuous field. `Global` normalization is a per-cell function of the
//! accumulated value alone, which is what keeps chunk borders seam-free;
//! `Local` rescales against per-chunk extremes and is documented as
//! seam-producing.

use bevy::math::Vec2;
use fastnoise_lite::{FastNoiseLite, NoiseType};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{
    DEFAULT_LACUNARITY, DEFAULT_NOISE_SCALE, DEFAULT_OCTAVES, DEFAULT_PERSISTENCE,
    GLOBAL_AMPLITUDE_ESTIMATE, MIN_NOISE_SCALE, OCTAVE_JITTER_RANGE,
};
use crate::heightmap::HeightMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizeMode {
    /// Rescale each chunk against its own observed min/max. Every chunk
    /// spans the full [0,1] range, at the cost of visible seams between
    /// chunks with different extremes.
    Local,
    /// Rescale against a fixed analytic amplitude estimate. Usable across
    /// independently generated chunks without seams.
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseParameters {
    pub seed: i32,
    pub scale: f32,
    pub octaves: u32,
    /// Amplitude decay per octave, intended range [0,1].
    pub persistence: f32,
    /// Frequency growth per octave, >= 1.
    pub lacunarity: f32,
    /// User offset in sample units, added on top of the per-chunk center.
    pub offset: [f32; 2],
    pub normalize_mode: NormalizeMode,
}

impl NoiseParameters {
    /// Clamps parameters into their valid ranges. All clamping happens at
    /// this acceptance boundary; `sample` itself never clamps.
    pub fn sanitized(mut self) -> Self {
        self.scale = self.scale.max(MIN_NOISE_SCALE);
        self.lacunarity = self.lacunarity.max(1.0);
        self.persistence = self.persistence.clamp(0.0, 1.0);
        self
    }
}

impl Default for NoiseParameters {
    fn default() -> Self {
        Self {
            seed: 0,
            scale: DEFAULT_NOISE_SCALE,
            octaves: DEFAULT_OCTAVES,
            persistence: DEFAULT_PERSISTENCE,
            lacunarity: DEFAULT_LACUNARITY,
            offset: [0.0, 0.0],
            normalize_mode: NormalizeMode::Global,
        }
    }
}

/// Samples a `width` x `height` grid of layered noise centered on
/// `sample_center` (in sample units). Identical inputs produce bit-identical
/// output.
pub fn sample(
    width: usize,
    height: usize,
    params: &NoiseParameters,
    sample_center: Vec2,
) -> HeightMap {
    #[cfg(feature = "trace")]
    let _span = bevy::log::info_span!("noise_sample").entered();
    debug_assert!(params.scale > 0.0, "parameters must be sanitized before sampling");

    let mut rng = ChaCha8Rng::seed_from_u64(params.seed as i64 as u64);
    let mut octave_offsets = Vec::with_capacity(params.octaves as usize);
    let mut max_possible = 0.0f32;
    let mut amplitude = 1.0f32;
    for _ in 0..params.octaves {
        let jitter_x = rng.gen_range(-OCTAVE_JITTER_RANGE..OCTAVE_JITTER_RANGE) as f32;
        let jitter_y = rng.gen_range(-OCTAVE_JITTER_RANGE..OCTAVE_JITTER_RANGE) as f32;
        octave_offsets.push(Vec2::new(
            jitter_x + params.offset[0] + sample_center.x,
            jitter_y - params.offset[1] - sample_center.y,
        ));
        max_possible += amplitude;
        amplitude *= params.persistence;
    }

    let mut noise = FastNoiseLite::with_seed(params.seed);
    noise.set_noise_type(Some(NoiseType::Perlin));
    // Frequency pinned to 1: all frequency math lives in the octave loop.
    noise.set_frequency(Some(1.0));

    let half_width = width as f32 / 2.0;
    let half_height = height as f32 / 2.0;
    let mut values = vec![0.0f32; width * height];
    let mut min_accumulated = f32::MAX;
    let mut max_accumulated = f32::MIN;
    for y in 0..height {
        for x in 0..width {
            let mut amplitude = 1.0f32;
            let mut frequency = 1.0f32;
            let mut accumulated = 0.0f32;
            for offset in &octave_offsets {
                let sx = (x as f32 - half_width + offset.x) / params.scale * frequency;
                let sy = (y as f32 - half_height + offset.y) / params.scale * frequency;
                accumulated += noise.get_noise_2d(sx, sy) * amplitude;
                amplitude *= params.persistence;
                frequency *= params.lacunarity;
            }
            min_accumulated = min_accumulated.min(accumulated);
            max_accumulated = max_accumulated.max(accumulated);
            values[y * width + x] = accumulated;
        }
    }

    let mut min_value = f32::MAX;
    let mut max_value = f32::MIN;
    match params.normalize_mode {
        NormalizeMode::Global => {
            // Floored so octaves == 0 still yields a defined flat map.
            let estimate = (max_possible * GLOBAL_AMPLITUDE_ESTIMATE).max(f32::EPSILON);
            for value in &mut values {
                *value = ((*value / estimate + 1.0) * 0.5).clamp(0.0, 1.0);
                min_value = min_value.min(*value);
                max_value = max_value.max(*value);
            }
        }
        NormalizeMode::Local => {
            let span = max_accumulated - min_accumulated;
            for value in &mut values {
                *value = if span <= f32::EPSILON {
                    0.0
                } else {
                    (*value - min_accumulated) / span
                };
                min_value = min_value.min(*value);
                max_value = max_value.max(*value);
            }
        }
    }

    HeightMap::new(width, height, values, min_value, max_value)
}
