//! Integration tests for detail-tier mesh building at real chunk sizes:
//! buffer budgets, border agreement across tiers, and normal orientation.

use bevy::math::Vec2;

use crate::config::NUM_SUPPORTED_LODS;
use crate::heightmap::{self, HeightMap, HeightMapSettings};
use crate::lod_mesh::{self, MeshDimensions, MeshPayload, MeshSettings};
use crate::noise_field::NoiseParameters;

fn settings_for_index(chunk_size_index: usize) -> MeshSettings {
    MeshSettings {
        chunk_size_index,
        ..MeshSettings::default()
    }
}

fn heightmap_for(settings: &MeshSettings, seed: i32) -> HeightMap {
    let n = settings.num_vertices_per_line();
    let map_settings = HeightMapSettings {
        noise: NoiseParameters {
            seed,
            ..NoiseParameters::default()
        },
        ..HeightMapSettings::default()
    };
    heightmap::generate(n, n, &map_settings, Vec2::ZERO)
}

#[test]
fn test_largest_chunk_fills_its_budget_at_every_lod() {
    let settings = settings_for_index(8);
    let n = settings.num_vertices_per_line();
    assert_eq!(n, 245);
    let map = heightmap_for(&settings, 11);

    for lod in 0..NUM_SUPPORTED_LODS {
        let payload = lod_mesh::build(&map, &settings, lod);
        let dims = MeshDimensions::for_grid(n, lod_mesh::skip_increment(lod));
        assert_eq!(
            payload.vertex_count(),
            dims.visible_vertices(),
            "vertex count at lod {lod}"
        );
        assert_eq!(
            payload.triangle_count(),
            dims.visible_triangles(),
            "triangle count at lod {lod}"
        );
        for uv in &payload.uvs {
            assert!(
                (0.0..=1.0).contains(&uv[0]) && (0.0..=1.0).contains(&uv[1]),
                "uv {uv:?} out of range at lod {lod}"
            );
        }
    }
}

/// Every tier keeps the full-resolution outline ring, so the border vertex
/// positions of any two tiers built from the same heightmap are identical.
#[test]
fn test_border_vertices_identical_across_lods() {
    let settings = settings_for_index(0);
    let map = heightmap_for(&settings, 23);
    let half = settings.mesh_world_size() / 2.0;

    let border_of = |payload: &MeshPayload| {
        let mut border: Vec<[f32; 3]> = payload
            .positions
            .iter()
            .copied()
            .filter(|p| p[0].abs() == half || p[2].abs() == half)
            .collect();
        border.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[2].total_cmp(&b[2])));
        border
    };

    let reference = border_of(&lod_mesh::build(&map, &settings, 0));
    let n = settings.num_vertices_per_line();
    assert_eq!(reference.len(), (n - 2) * 4 - 4, "outline ring size");

    for lod in 1..NUM_SUPPORTED_LODS {
        let border = border_of(&lod_mesh::build(&map, &settings, lod));
        assert_eq!(
            border, reference,
            "lod {lod} border ring must match full resolution exactly"
        );
    }
}

#[test]
fn test_gentle_terrain_gets_upward_unit_normals() {
    let settings = settings_for_index(0);
    let n = settings.num_vertices_per_line();
    let map_settings = HeightMapSettings {
        noise: NoiseParameters {
            seed: 2,
            scale: 200.0,
            ..NoiseParameters::default()
        },
        height_multiplier: 2.0,
        ..HeightMapSettings::default()
    };
    let map = heightmap::generate(n, n, &map_settings, Vec2::ZERO);

    let payload = lod_mesh::build(&map, &settings, 0);
    for (i, normal) in payload.normals.iter().enumerate() {
        let len = (normal[0] * normal[0] + normal[1] * normal[1] + normal[2] * normal[2]).sqrt();
        assert!((len - 1.0).abs() < 1e-3, "normal {i} has length {len}");
        assert!(
            normal[1] > 0.0,
            "normal {i} points down on gentle terrain: {normal:?}"
        );
    }
}

/// The y component of a face normal depends only on the footprint winding,
/// never on the sampled heights, so it must be positive for every triangle.
#[test]
fn test_triangles_wind_counter_clockwise_seen_from_above() {
    let settings = settings_for_index(1);
    let map = heightmap_for(&settings, 31);

    for lod in 0..NUM_SUPPORTED_LODS {
        let payload = lod_mesh::build(&map, &settings, lod);
        for triangle in payload.indices.chunks_exact(3) {
            let a = payload.positions[triangle[0] as usize];
            let b = payload.positions[triangle[1] as usize];
            let c = payload.positions[triangle[2] as usize];
            let footprint =
                (b[2] - a[2]) * (c[0] - a[0]) - (b[0] - a[0]) * (c[2] - a[2]);
            assert!(
                footprint > 0.0,
                "triangle {triangle:?} at lod {lod} winds the wrong way"
            );
        }
    }
}

#[test]
fn test_flat_shading_produces_unshared_face_vertices() {
    let settings = MeshSettings {
        use_flat_shading: true,
        ..MeshSettings::default()
    };
    let map = heightmap_for(&settings, 13);
    let payload = lod_mesh::build(&map, &settings, 0);

    assert_eq!(
        payload.vertex_count(),
        payload.indices.len(),
        "flat shading duplicates vertices per face"
    );
    assert!(
        payload.indices.iter().enumerate().all(|(i, &v)| v as usize == i),
        "flat shaded indices are sequential"
    );
    for face in payload.normals.chunks_exact(3) {
        assert_eq!(face[0], face[1], "face corners share one normal");
        assert_eq!(face[1], face[2], "face corners share one normal");
    }
}
