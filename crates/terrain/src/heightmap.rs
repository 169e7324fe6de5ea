//! Per-chunk heightmap generation: layered noise, optional falloff
//! attenuation, then the response curve and height multiplier.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_HEIGHT_MULTIPLIER;
use crate::falloff::FalloffField;
use crate::height_curve::HeightCurve;
use crate::noise_field::{self, NoiseParameters};

/// Immutable grid of heights plus the range they span. Produced once per
/// chunk and shared read-only by every mesh build for that chunk.
#[derive(Debug, Clone)]
pub struct HeightMap {
    width: usize,
    height: usize,
    values: Vec<f32>,
    min_value: f32,
    max_value: f32,
}

impl HeightMap {
    pub fn new(width: usize, height: usize, values: Vec<f32>, min_value: f32, max_value: f32) -> Self {
        assert_eq!(
            values.len(),
            width * height,
            "height buffer length must match {width}x{height}"
        );
        Self {
            width,
            height,
            values,
            min_value,
            max_value,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Lowest height the generator could have produced (or observed, for
    /// normalized noise output).
    pub fn min_value(&self) -> f32 {
        self.min_value
    }

    pub fn max_value(&self) -> f32 {
        self.max_value
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightMapSettings {
    pub noise: NoiseParameters,
    pub height_multiplier: f32,
    pub height_curve: HeightCurve,
    pub use_falloff: bool,
}

impl HeightMapSettings {
    pub fn sanitized(mut self) -> Self {
        self.noise = self.noise.sanitized();
        self
    }

    /// Final height of a zero-noise cell. With the curve evaluated at its
    /// endpoints this bounds the output analytically, no rescan needed.
    pub fn min_height(&self) -> f32 {
        self.height_curve.evaluate(0.0) * self.height_multiplier
    }

    pub fn max_height(&self) -> f32 {
        self.height_curve.evaluate(1.0) * self.height_multiplier
    }
}

impl Default for HeightMapSettings {
    fn default() -> Self {
        Self {
            noise: NoiseParameters::default(),
            height_multiplier: DEFAULT_HEIGHT_MULTIPLIER,
            height_curve: HeightCurve::unit_ramp(),
            use_falloff: false,
        }
    }
}

/// Generates the finished heightmap for one chunk. Pure: runs unchanged on a
/// worker task.
pub fn generate(
    width: usize,
    height: usize,
    settings: &HeightMapSettings,
    sample_center: Vec2,
) -> HeightMap {
    #[cfg(feature = "trace")]
    let _span = bevy::log::info_span!("generate_heightmap").entered();

    let noise_map = noise_field::sample(width, height, &settings.noise, sample_center);
    let mut values = noise_map.into_values();

    if settings.use_falloff {
        let falloff = FalloffField::generate(width.max(height));
        for y in 0..height {
            for x in 0..width {
                let index = y * width + x;
                values[index] = (values[index] - falloff.get(x, y)).clamp(0.0, 1.0);
            }
        }
    }

    for value in &mut values {
        *value = settings.height_curve.evaluate(*value) * settings.height_multiplier;
    }

    HeightMap::new(
        width,
        height,
        values,
        settings.min_height(),
        settings.max_height(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise_field::NormalizeMode;

    fn flat_settings() -> HeightMapSettings {
        // Zero octaves gives a constant 0.5 field in Global mode.
        HeightMapSettings {
            noise: NoiseParameters {
                octaves: 0,
                normalize_mode: NormalizeMode::Global,
                ..NoiseParameters::default()
            },
            height_multiplier: 10.0,
            height_curve: HeightCurve::unit_ramp(),
            use_falloff: false,
        }
    }

    #[test]
    fn storage_is_row_major() {
        let map = HeightMap::new(3, 2, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0], 0.0, 5.0);
        assert_eq!(map.get(0, 0), 0.0);
        assert_eq!(map.get(2, 0), 2.0);
        assert_eq!(map.get(0, 1), 3.0);
        assert_eq!(map.get(2, 1), 5.0);
    }

    #[test]
    #[should_panic(expected = "height buffer length")]
    fn mismatched_buffer_length_panics() {
        let _ = HeightMap::new(4, 4, vec![0.0; 15], 0.0, 0.0);
    }

    #[test]
    fn curve_and_multiplier_are_applied_per_cell() {
        let map = generate(16, 16, &flat_settings(), Vec2::ZERO);
        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(map.get(x, y), 5.0, "flat 0.5 field times 10 at ({x},{y})");
            }
        }
    }

    #[test]
    fn reported_range_is_the_analytic_curve_range() {
        let settings = HeightMapSettings {
            height_curve: HeightCurve::new([(0.0, 0.2), (1.0, 0.8)]),
            ..flat_settings()
        };
        let map = generate(8, 8, &settings, Vec2::ZERO);
        assert!((map.min_value() - 2.0).abs() < 1e-6);
        assert!((map.max_value() - 8.0).abs() < 1e-6);
    }

    #[test]
    fn falloff_attenuates_the_border_more_than_the_center() {
        let without = generate(33, 33, &HeightMapSettings::default(), Vec2::ZERO);
        let with = generate(
            33,
            33,
            &HeightMapSettings {
                use_falloff: true,
                ..HeightMapSettings::default()
            },
            Vec2::ZERO,
        );
        assert!(with.get(0, 0) <= without.get(0, 0));
        assert!(
            with.get(0, 0) <= with.get(16, 16),
            "corner should not rise above the untouched center"
        );
    }
}
