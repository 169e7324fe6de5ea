use bevy::prelude::*;

pub mod config;
pub mod falloff;
pub mod height_curve;
pub mod heightmap;
pub mod lod_mesh;
pub mod noise_field;
pub mod streaming;

#[cfg(test)]
mod integration_tests;
#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

/// Fixed-tick phases of the terrain update. `Collect` polls finished
/// generation tasks so freshly cached results are observable in the same
/// tick's `Stream` pass.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerrainSet {
    Collect,
    Stream,
}

/// Streamed procedural terrain in one plugin: deterministic heightmap
/// synthesis, per-tier mesh building, and chunk lifecycle around the
/// `streaming::Viewer` resource.
pub struct TerrainPlugin;

impl Plugin for TerrainPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(streaming::StreamingPlugin);
    }
}
