//! The chunk registry and its bookkeeping: visible-set recomputation with
//! movement hysteresis, per-chunk LOD selection, async generation requests,
//! and result collection.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bevy::log::debug;
use bevy::math::Vec2;
use bevy::prelude::Resource;
use bevy::tasks::{block_on, AsyncComputeTaskPool};
use futures_lite::future;

use crate::config::{COLLIDER_GENERATION_DISTANCE, NUM_SUPPORTED_LODS, VIEWER_MOVE_THRESHOLD};
use crate::heightmap::{self, HeightMapSettings};
use crate::lod_mesh::{self, MeshSettings};

use super::chunk::{select_lod, ChunkCoord, LodThreshold, TerrainChunk};
use super::eviction::{EvictionCandidate, EvictionPolicy, RetainAll};
use super::{ChunkColliderReady, ChunkLodChanged, ChunkMeshReady, ChunkVisibilityChanged};

/// Default detail ladder: full resolution with collision nearby, two coarser
/// rings out to the maximum view distance.
pub fn default_detail_levels() -> Vec<LodThreshold> {
    vec![
        LodThreshold {
            lod: 0,
            visible_distance: 200.0,
            use_for_collider: true,
        },
        LodThreshold {
            lod: 2,
            visible_distance: 400.0,
            use_for_collider: false,
        },
        LodThreshold {
            lod: 4,
            visible_distance: 600.0,
            use_for_collider: false,
        },
    ]
}

/// Immutable configuration shared by every chunk update. Settings are held
/// behind `Arc` so worker tasks snapshot them without copying.
#[derive(Clone)]
pub struct StreamerConfig {
    pub heightmap_settings: Arc<HeightMapSettings>,
    pub mesh_settings: Arc<MeshSettings>,
    pub detail_levels: Vec<LodThreshold>,
    /// First tier flagged for collision, if any.
    pub collider_lod: Option<usize>,
    pub max_view_distance: f32,
    pub chunks_in_view_distance: i32,
    pub chunk_world_size: f32,
}

/// Request and completion counters, mostly for tests and progress logging.
#[derive(Debug, Default, Clone, Copy)]
pub struct StreamerStats {
    pub heightmap_requests: u64,
    pub heightmaps_completed: u64,
    pub mesh_requests: u64,
    pub meshes_completed: u64,
    pub chunks_evicted: u64,
}

/// Handoff events produced during an update, drained into Bevy event
/// writers by the owning systems.
#[derive(Default)]
pub struct PendingEvents {
    pub mesh_ready: Vec<ChunkMeshReady>,
    pub lod_changed: Vec<ChunkLodChanged>,
    pub visibility_changed: Vec<ChunkVisibilityChanged>,
    pub collider_ready: Vec<ChunkColliderReady>,
}

#[derive(Resource)]
pub struct ChunkStreamer {
    config: StreamerConfig,
    chunks: HashMap<ChunkCoord, TerrainChunk>,
    visible: Vec<ChunkCoord>,
    last_recompute_position: Option<Vec2>,
    last_tick_position: Option<Vec2>,
    eviction: Box<dyn EvictionPolicy>,
    stats: StreamerStats,
}

impl ChunkStreamer {
    /// Builds a streamer from sanitized settings and a detail ladder. The
    /// ladder shape is collaborator wiring, so a malformed one is a panic,
    /// not a runtime condition.
    pub fn new(
        heightmap_settings: HeightMapSettings,
        mesh_settings: MeshSettings,
        detail_levels: Vec<LodThreshold>,
    ) -> Self {
        assert!(!detail_levels.is_empty(), "at least one detail level is required");
        assert!(
            detail_levels
                .windows(2)
                .all(|pair| pair[0].visible_distance <= pair[1].visible_distance),
            "detail levels must be ordered by ascending visible distance"
        );
        assert!(
            detail_levels.iter().all(|tier| tier.lod < NUM_SUPPORTED_LODS),
            "detail level lod out of supported range"
        );

        let heightmap_settings = heightmap_settings.sanitized();
        let mesh_settings = mesh_settings.sanitized();
        let collider_lod = detail_levels.iter().position(|tier| tier.use_for_collider);
        let max_view_distance = detail_levels[detail_levels.len() - 1].visible_distance;
        let chunk_world_size = mesh_settings.mesh_world_size();
        let chunks_in_view_distance = (max_view_distance / chunk_world_size).round() as i32;

        Self {
            config: StreamerConfig {
                heightmap_settings: Arc::new(heightmap_settings),
                mesh_settings: Arc::new(mesh_settings),
                detail_levels,
                collider_lod,
                max_view_distance,
                chunks_in_view_distance,
                chunk_world_size,
            },
            chunks: HashMap::new(),
            visible: Vec::new(),
            last_recompute_position: None,
            last_tick_position: None,
            eviction: Box::new(RetainAll),
            stats: StreamerStats::default(),
        }
    }

    pub fn with_eviction_policy(mut self, policy: impl EvictionPolicy + 'static) -> Self {
        self.eviction = Box::new(policy);
        self
    }

    pub fn config(&self) -> &StreamerConfig {
        &self.config
    }

    pub fn stats(&self) -> StreamerStats {
        self.stats
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&TerrainChunk> {
        self.chunks.get(&coord)
    }

    pub fn visible_chunks(&self) -> &[ChunkCoord] {
        &self.visible
    }

    /// Number of generation tasks currently in flight.
    pub fn pending_requests(&self) -> usize {
        self.chunks
            .values()
            .map(|chunk| {
                usize::from(chunk.heightmap_task.is_some())
                    + chunk.lod_meshes.iter().filter(|slot| slot.task.is_some()).count()
            })
            .sum()
    }

    /// Per-tick entry point. Collision upkeep runs on any movement; the full
    /// visible-set recompute only once the viewer has moved past the
    /// hysteresis threshold.
    pub fn update_visible_chunks(&mut self, viewer: Vec2, out: &mut PendingEvents) {
        #[cfg(feature = "trace")]
        let _span = bevy::log::info_span!("update_visible_chunks").entered();

        let moved = self.last_tick_position != Some(viewer);
        self.last_tick_position = Some(viewer);
        if moved {
            for coord in self.visible.clone() {
                if let Some(chunk) = self.chunks.get_mut(&coord) {
                    update_collision(chunk, viewer, &self.config, &mut self.stats, out);
                }
            }
        }

        let needs_recompute = match self.last_recompute_position {
            None => true,
            Some(last) => {
                last.distance_squared(viewer) > VIEWER_MOVE_THRESHOLD * VIEWER_MOVE_THRESHOLD
            }
        };
        if !needs_recompute {
            return;
        }
        self.last_recompute_position = Some(viewer);
        self.recompute_visible_set(viewer, out);
        self.evict(viewer);
    }

    /// Polls in-flight heightmap tasks. A completed chunk is re-evaluated
    /// right away instead of waiting for the next recompute.
    pub fn collect_heightmap_results(&mut self, viewer: Vec2, out: &mut PendingEvents) {
        let polling: Vec<ChunkCoord> = self
            .chunks
            .iter()
            .filter(|(_, chunk)| chunk.heightmap_task.is_some())
            .map(|(coord, _)| *coord)
            .collect();
        for coord in polling {
            let mut change = None;
            if let Some(chunk) = self.chunks.get_mut(&coord) {
                if let Some(mut task) = chunk.heightmap_task.take() {
                    match block_on(future::poll_once(&mut task)) {
                        Some(map) => {
                            chunk.heightmap = Some(Arc::new(map));
                            self.stats.heightmaps_completed += 1;
                            change = update_chunk(chunk, viewer, &self.config, &mut self.stats, out);
                        }
                        None => chunk.heightmap_task = Some(task),
                    }
                }
            }
            if let Some(visible) = change {
                self.set_visible(coord, visible);
            }
        }
    }

    /// Polls in-flight mesh builds, caches results, and emits the mesh
    /// handoff for each completion.
    pub fn collect_mesh_results(&mut self, viewer: Vec2, out: &mut PendingEvents) {
        let polling: Vec<ChunkCoord> = self
            .chunks
            .iter()
            .filter(|(_, chunk)| chunk.lod_meshes.iter().any(|slot| slot.task.is_some()))
            .map(|(coord, _)| *coord)
            .collect();
        for coord in polling {
            let mut change = None;
            if let Some(chunk) = self.chunks.get_mut(&coord) {
                let mut completed_any = false;
                for index in 0..chunk.lod_meshes.len() {
                    if let Some(mut task) = chunk.lod_meshes[index].task.take() {
                        match block_on(future::poll_once(&mut task)) {
                            Some(payload) => {
                                let payload = Arc::new(payload);
                                chunk.lod_meshes[index].mesh = Some(Arc::clone(&payload));
                                self.stats.meshes_completed += 1;
                                completed_any = true;
                                out.mesh_ready.push(ChunkMeshReady {
                                    coord,
                                    lod: chunk.lod_meshes[index].lod,
                                    payload,
                                });
                            }
                            None => chunk.lod_meshes[index].task = Some(task),
                        }
                    }
                }
                if completed_any {
                    change = update_chunk(chunk, viewer, &self.config, &mut self.stats, out);
                }
            }
            if let Some(visible) = change {
                self.set_visible(coord, visible);
            }
        }
    }

    fn recompute_visible_set(&mut self, viewer: Vec2, out: &mut PendingEvents) {
        let mut already_updated: HashSet<ChunkCoord> = HashSet::new();

        // Currently visible chunks first, so ones that fell out of range can
        // hide themselves even when outside the scan window.
        for coord in self.visible.clone() {
            already_updated.insert(coord);
            let mut change = None;
            if let Some(chunk) = self.chunks.get_mut(&coord) {
                change = update_chunk(chunk, viewer, &self.config, &mut self.stats, out);
            }
            if let Some(visible) = change {
                self.set_visible(coord, visible);
            }
        }

        let center = ChunkCoord::from_world_position(viewer, self.config.chunk_world_size);
        let range = self.config.chunks_in_view_distance;
        for y_offset in -range..=range {
            for x_offset in -range..=range {
                let coord = ChunkCoord::new(center.0.x + x_offset, center.0.y + y_offset);
                if already_updated.contains(&coord) {
                    continue;
                }
                if self.chunks.contains_key(&coord) {
                    let mut change = None;
                    if let Some(chunk) = self.chunks.get_mut(&coord) {
                        change = update_chunk(chunk, viewer, &self.config, &mut self.stats, out);
                    }
                    if let Some(visible) = change {
                        self.set_visible(coord, visible);
                    }
                } else {
                    self.create_chunk(coord);
                }
            }
        }
    }

    fn create_chunk(&mut self, coord: ChunkCoord) {
        debug!("creating chunk at {:?}", coord.0);
        let mut chunk = TerrainChunk::new(coord, self.config.chunk_world_size, &self.config.detail_levels);
        request_heightmap(&mut chunk, &self.config, &mut self.stats);
        self.chunks.insert(coord, chunk);
    }

    fn evict(&mut self, viewer: Vec2) {
        let candidates: Vec<EvictionCandidate> = self
            .chunks
            .iter()
            .filter(|(_, chunk)| !chunk.visible && !chunk.has_tasks_in_flight())
            .map(|(coord, chunk)| EvictionCandidate {
                coord: *coord,
                sqr_distance: chunk.bounds.sqr_distance(viewer),
            })
            .collect();
        let victims = self.eviction.plan(self.chunks.len(), &candidates);
        if victims.is_empty() {
            return;
        }
        debug!("evicting {} chunks", victims.len());
        for coord in victims {
            if self.chunks.remove(&coord).is_some() {
                self.stats.chunks_evicted += 1;
            }
        }
    }

    fn set_visible(&mut self, coord: ChunkCoord, visible: bool) {
        if visible {
            if !self.visible.contains(&coord) {
                self.visible.push(coord);
            }
        } else {
            self.visible.retain(|c| *c != coord);
        }
    }
}

impl Default for ChunkStreamer {
    fn default() -> Self {
        Self::new(
            HeightMapSettings::default(),
            MeshSettings::default(),
            default_detail_levels(),
        )
    }
}

/// Re-evaluates one chunk: visibility, displayed tier, lazy mesh requests.
/// Returns the new visibility when it changed so the caller can maintain the
/// visible list.
fn update_chunk(
    chunk: &mut TerrainChunk,
    viewer: Vec2,
    config: &StreamerConfig,
    stats: &mut StreamerStats,
    out: &mut PendingEvents,
) -> Option<bool> {
    if !chunk.heightmap_received() {
        return None;
    }

    let sqr_distance = chunk.bounds.sqr_distance(viewer);
    let selected = select_lod(sqr_distance, &config.detail_levels);

    if let Some(tier) = selected {
        if chunk.displayed_lod != Some(tier) {
            if chunk.lod_meshes[tier].has_mesh() {
                chunk.displayed_lod = Some(tier);
                out.lod_changed.push(ChunkLodChanged {
                    coord: chunk.coord,
                    lod: chunk.lod_meshes[tier].lod,
                });
            } else if !chunk.lod_meshes[tier].requested {
                request_mesh(chunk, tier, config, stats);
            }
        }
    }

    let visible = selected.is_some();
    if visible == chunk.visible {
        return None;
    }
    chunk.visible = visible;
    out.visibility_changed.push(ChunkVisibilityChanged {
        coord: chunk.coord,
        visible,
    });
    Some(visible)
}

/// Keeps the collider tier's mesh populated while the viewer is inside that
/// tier's range, and hands the payload off exactly once within attach range.
fn update_collision(
    chunk: &mut TerrainChunk,
    viewer: Vec2,
    config: &StreamerConfig,
    stats: &mut StreamerStats,
    out: &mut PendingEvents,
) {
    if chunk.has_set_collider || !chunk.heightmap_received() {
        return;
    }
    let tier = match config.collider_lod {
        Some(tier) => tier,
        None => return,
    };

    let sqr_distance = chunk.bounds.sqr_distance(viewer);
    if sqr_distance < config.detail_levels[tier].sqr_visible_distance()
        && !chunk.lod_meshes[tier].requested
    {
        request_mesh(chunk, tier, config, stats);
    }
    if sqr_distance < COLLIDER_GENERATION_DISTANCE * COLLIDER_GENERATION_DISTANCE {
        if let Some(mesh) = chunk.lod_meshes[tier].mesh.as_ref() {
            chunk.has_set_collider = true;
            out.collider_ready.push(ChunkColliderReady {
                coord: chunk.coord,
                payload: Arc::clone(mesh),
            });
        }
    }
}

fn request_heightmap(chunk: &mut TerrainChunk, config: &StreamerConfig, stats: &mut StreamerStats) {
    debug_assert!(!chunk.heightmap_requested, "heightmap is requested exactly once");
    let settings = Arc::clone(&config.heightmap_settings);
    let n = config.mesh_settings.num_vertices_per_line();
    let sample_center = chunk
        .coord
        .sample_center(config.chunk_world_size, config.mesh_settings.mesh_scale);
    let pool = AsyncComputeTaskPool::get();
    chunk.heightmap_task =
        Some(pool.spawn(async move { heightmap::generate(n, n, &settings, sample_center) }));
    chunk.heightmap_requested = true;
    stats.heightmap_requests += 1;
}

fn request_mesh(
    chunk: &mut TerrainChunk,
    tier: usize,
    config: &StreamerConfig,
    stats: &mut StreamerStats,
) {
    let heightmap = match chunk.heightmap.as_ref() {
        Some(map) => Arc::clone(map),
        None => return,
    };
    let slot = &mut chunk.lod_meshes[tier];
    debug_assert!(!slot.requested && slot.task.is_none(), "mesh requests are idempotent per tier");
    let mesh_settings = Arc::clone(&config.mesh_settings);
    let lod = slot.lod;
    let pool = AsyncComputeTaskPool::get();
    slot.task = Some(pool.spawn(async move { lod_mesh::build(&heightmap, &mesh_settings, lod) }));
    slot.requested = true;
    stats.mesh_requests += 1;
}
