//! Chunk identity, per-chunk cached state, and LOD selection.

use std::sync::Arc;

use bevy::math::{IVec2, Vec2};
use bevy::tasks::Task;
use serde::{Deserialize, Serialize};

use crate::heightmap::HeightMap;
use crate::lod_mesh::MeshPayload;

/// Integer chunk-grid coordinate on the XZ plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkCoord(pub IVec2);

impl ChunkCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self(IVec2::new(x, y))
    }

    /// Chunk whose center is nearest to `position`.
    pub fn from_world_position(position: Vec2, chunk_world_size: f32) -> Self {
        Self(IVec2::new(
            (position.x / chunk_world_size).round() as i32,
            (position.y / chunk_world_size).round() as i32,
        ))
    }

    pub fn world_center(&self, chunk_world_size: f32) -> Vec2 {
        self.0.as_vec2() * chunk_world_size
    }

    /// Center of this chunk in heightmap sample units, folded into the noise
    /// offsets so adjacent chunks sample a continuous field.
    pub fn sample_center(&self, chunk_world_size: f32, mesh_scale: f32) -> Vec2 {
        self.0.as_vec2() * chunk_world_size / mesh_scale
    }
}

/// One tier of the detail-level ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LodThreshold {
    pub lod: u32,
    pub visible_distance: f32,
    pub use_for_collider: bool,
}

impl LodThreshold {
    pub fn sqr_visible_distance(&self) -> f32 {
        self.visible_distance * self.visible_distance
    }
}

/// Tier index for a viewer at `sqr_distance`, or None past the last
/// threshold (chunk not visible). Thresholds are ordered ascending, so the
/// first tier whose distance is not exceeded wins.
pub fn select_lod(sqr_distance: f32, thresholds: &[LodThreshold]) -> Option<usize> {
    thresholds
        .iter()
        .position(|tier| sqr_distance <= tier.sqr_visible_distance())
}

/// Axis-aligned world-space footprint of a chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkBounds {
    pub center: Vec2,
    pub half_extent: f32,
}

impl ChunkBounds {
    /// Squared distance from `point` to the nearest point of the footprint;
    /// zero inside it.
    pub fn sqr_distance(&self, point: Vec2) -> f32 {
        let delta = (point - self.center).abs() - Vec2::splat(self.half_extent);
        delta.max(Vec2::ZERO).length_squared()
    }
}

/// Cache slot for one detail tier's mesh. A build is requested at most once
/// per tier; the result is kept for every future visit.
pub struct LodMeshSlot {
    pub lod: u32,
    pub requested: bool,
    pub task: Option<Task<MeshPayload>>,
    pub mesh: Option<Arc<MeshPayload>>,
}

impl LodMeshSlot {
    fn new(lod: u32) -> Self {
        Self {
            lod,
            requested: false,
            task: None,
            mesh: None,
        }
    }

    pub fn has_mesh(&self) -> bool {
        self.mesh.is_some()
    }
}

/// One streamed terrain tile: its heightmap, per-tier mesh cache, and
/// display state. Created on first visit to a grid coordinate; the heightmap
/// is requested exactly once and shared by every mesh build.
pub struct TerrainChunk {
    pub coord: ChunkCoord,
    pub bounds: ChunkBounds,
    pub heightmap: Option<Arc<HeightMap>>,
    pub heightmap_requested: bool,
    pub heightmap_task: Option<Task<HeightMap>>,
    pub lod_meshes: Vec<LodMeshSlot>,
    pub visible: bool,
    /// Tier index currently shown by the renderer, if any.
    pub displayed_lod: Option<usize>,
    pub has_set_collider: bool,
}

impl TerrainChunk {
    pub fn new(coord: ChunkCoord, chunk_world_size: f32, thresholds: &[LodThreshold]) -> Self {
        Self {
            coord,
            bounds: ChunkBounds {
                center: coord.world_center(chunk_world_size),
                half_extent: chunk_world_size / 2.0,
            },
            heightmap: None,
            heightmap_requested: false,
            heightmap_task: None,
            lod_meshes: thresholds.iter().map(|tier| LodMeshSlot::new(tier.lod)).collect(),
            visible: false,
            displayed_lod: None,
            has_set_collider: false,
        }
    }

    pub fn heightmap_received(&self) -> bool {
        self.heightmap.is_some()
    }

    pub fn has_tasks_in_flight(&self) -> bool {
        self.heightmap_task.is_some() || self.lod_meshes.iter().any(|slot| slot.task.is_some())
    }
}
