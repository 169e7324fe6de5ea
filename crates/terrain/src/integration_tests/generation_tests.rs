//! Integration tests for the heightmap pipeline: determinism, normalization
//! bounds, and continuity across chunk borders.

use bevy::math::Vec2;

use crate::height_curve::HeightCurve;
use crate::heightmap::{self, HeightMapSettings};
use crate::noise_field::{self, NoiseParameters, NormalizeMode};

const GRID: usize = 53;
/// Distance between the sample centers of two adjacent chunks, in sample
/// units: the visible span of one chunk.
const CENTER_STEP: f32 = 50.0;

#[test]
fn test_generation_is_deterministic() {
    let settings = HeightMapSettings {
        noise: NoiseParameters {
            seed: 7,
            ..NoiseParameters::default()
        },
        ..HeightMapSettings::default()
    };
    let center = Vec2::new(120.5, -40.25);
    let a = heightmap::generate(GRID, GRID, &settings, center);
    let b = heightmap::generate(GRID, GRID, &settings, center);
    assert_eq!(
        a.values(),
        b.values(),
        "identical settings and center must reproduce the map bit for bit"
    );
}

#[test]
fn test_global_mode_stays_in_unit_range() {
    for seed in [0, 1, 42, -17] {
        for center in [Vec2::ZERO, Vec2::new(500.0, -250.0), Vec2::new(-3000.0, 9000.0)] {
            let params = NoiseParameters {
                seed,
                ..NoiseParameters::default()
            };
            let map = noise_field::sample(GRID, GRID, &params, center);
            for y in 0..GRID {
                for x in 0..GRID {
                    let v = map.get(x, y);
                    assert!(
                        (0.0..=1.0).contains(&v),
                        "seed {seed} center {center:?}: value {v} at ({x},{y}) out of [0,1]"
                    );
                }
            }
        }
    }
}

#[test]
fn test_global_mode_chunk_borders_line_up() {
    let params = NoiseParameters {
        seed: 3,
        ..NoiseParameters::default()
    };
    let a = noise_field::sample(GRID, GRID, &params, Vec2::ZERO);

    // Horizontal neighbor: the last three columns of `a` cover the same
    // world positions as the first three columns of `b`.
    let b = noise_field::sample(GRID, GRID, &params, Vec2::new(CENTER_STEP, 0.0));
    for k in 0..3 {
        for y in 0..GRID {
            assert_eq!(
                a.get(GRID - 3 + k, y),
                b.get(k, y),
                "column overlap mismatch at k={k} y={y}"
            );
        }
    }

    // Vertical neighbor: the first three rows of `a` cover the same world
    // positions as the last three rows of `c`.
    let c = noise_field::sample(GRID, GRID, &params, Vec2::new(0.0, CENTER_STEP));
    for k in 0..3 {
        for x in 0..GRID {
            assert_eq!(
                a.get(x, k),
                c.get(x, k + GRID - 3),
                "row overlap mismatch at k={k} x={x}"
            );
        }
    }
}

#[test]
fn test_local_mode_borders_can_mismatch() {
    let params = NoiseParameters {
        seed: 3,
        normalize_mode: NormalizeMode::Local,
        ..NoiseParameters::default()
    };
    let a = noise_field::sample(GRID, GRID, &params, Vec2::ZERO);
    let b = noise_field::sample(GRID, GRID, &params, Vec2::new(CENTER_STEP, 0.0));

    let mut mismatches = 0;
    for k in 0..3 {
        for y in 0..GRID {
            if a.get(GRID - 3 + k, y) != b.get(k, y) {
                mismatches += 1;
            }
        }
    }
    assert!(
        mismatches > 0,
        "neighboring chunks rescaled against different extremes should disagree in the overlap"
    );
}

#[test]
fn test_full_pipeline_stays_within_analytic_bounds() {
    let settings = HeightMapSettings {
        noise: NoiseParameters {
            seed: 1,
            ..NoiseParameters::default()
        },
        ..HeightMapSettings::default()
    };
    let map = heightmap::generate(245, 245, &settings, Vec2::new(CENTER_STEP, CENTER_STEP));

    assert_eq!(map.width(), 245);
    assert_eq!(map.height(), 245);
    let lo = settings.min_height();
    let hi = settings.max_height();
    let mut observed_lo = f32::MAX;
    let mut observed_hi = f32::MIN;
    for y in 0..245 {
        for x in 0..245 {
            let v = map.get(x, y);
            assert!(
                v >= lo - 1e-4 && v <= hi + 1e-4,
                "height {v} at ({x},{y}) escapes [{lo}, {hi}]"
            );
            observed_lo = observed_lo.min(v);
            observed_hi = observed_hi.max(v);
        }
    }
    assert!(
        observed_hi - observed_lo > 1.0,
        "terrain should have relief, got span {}",
        observed_hi - observed_lo
    );
}

#[test]
fn test_settings_reproduce_the_map_after_a_json_round_trip() {
    let settings = HeightMapSettings {
        noise: NoiseParameters {
            seed: 9,
            scale: 35.0,
            offset: [4.0, -2.5],
            ..NoiseParameters::default()
        },
        height_multiplier: 12.5,
        height_curve: HeightCurve::new([(0.0, 0.0), (0.4, 0.1), (1.0, 1.0)]),
        use_falloff: true,
    };
    let json = serde_json::to_string(&settings).unwrap();
    let decoded: HeightMapSettings = serde_json::from_str(&json).unwrap();

    let center = Vec2::new(-CENTER_STEP, CENTER_STEP);
    let original = heightmap::generate(GRID, GRID, &settings, center);
    let restored = heightmap::generate(GRID, GRID, &decoded, center);
    assert_eq!(
        original.values(),
        restored.values(),
        "settings loaded from JSON must generate the identical map"
    );
}

#[test]
fn test_falloff_floors_the_island_corners() {
    let settings = HeightMapSettings {
        noise: NoiseParameters {
            seed: 5,
            ..NoiseParameters::default()
        },
        use_falloff: true,
        ..HeightMapSettings::default()
    };
    let map = heightmap::generate(GRID, GRID, &settings, Vec2::ZERO);

    // The x = 0 and y = 0 edges map to an attenuation of exactly 1; the far
    // edges sit one cell short of it, so they get a small tolerance.
    assert_eq!(map.get(0, 0), settings.min_height());
    for (x, y) in [(GRID - 1, 0), (0, GRID - 1), (GRID - 1, GRID - 1)] {
        let v = map.get(x, y);
        assert!(
            v - settings.min_height() < 0.05,
            "corner ({x},{y}) should be almost fully attenuated, got {v}"
        );
    }
}
