//! Endless-terrain streaming: a grid of chunks tracked around a moving
//! viewer, each holding a shared heightmap and one lazily built mesh per
//! detail tier. Generation runs on the async compute pool; results come back
//! through Bevy events so display and physics layers can react without
//! touching the registry.

mod chunk;
mod eviction;
mod streamer;

pub use chunk::{select_lod, ChunkBounds, ChunkCoord, LodMeshSlot, LodThreshold, TerrainChunk};
pub use eviction::{EvictionCandidate, EvictionPolicy, FurthestFirst, RetainAll};
pub use streamer::{
    default_detail_levels, ChunkStreamer, PendingEvents, StreamerConfig, StreamerStats,
};

use std::sync::Arc;

use bevy::prelude::*;

use crate::lod_mesh::MeshPayload;
use crate::TerrainSet;

/// The position chunks stream around, in world XZ.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct Viewer {
    pub position: Vec2,
}

/// A mesh build finished for one chunk tier. Fired once per build; the
/// payload is also cached on the chunk for later re-display.
#[derive(Event, Debug, Clone)]
pub struct ChunkMeshReady {
    pub coord: ChunkCoord,
    pub lod: u32,
    pub payload: Arc<MeshPayload>,
}

/// The displayed detail level of a chunk switched to an already built mesh.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLodChanged {
    pub coord: ChunkCoord,
    pub lod: u32,
}

#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkVisibilityChanged {
    pub coord: ChunkCoord,
    pub visible: bool,
}

/// The collider tier's mesh is ready for a chunk the viewer is close to.
/// Fired at most once per chunk lifetime.
#[derive(Event, Debug, Clone)]
pub struct ChunkColliderReady {
    pub coord: ChunkCoord,
    pub payload: Arc<MeshPayload>,
}

fn drain_events(
    out: PendingEvents,
    mesh_ready: &mut EventWriter<ChunkMeshReady>,
    lod_changed: &mut EventWriter<ChunkLodChanged>,
    visibility_changed: &mut EventWriter<ChunkVisibilityChanged>,
    collider_ready: &mut EventWriter<ChunkColliderReady>,
) {
    mesh_ready.send_batch(out.mesh_ready);
    lod_changed.send_batch(out.lod_changed);
    visibility_changed.send_batch(out.visibility_changed);
    collider_ready.send_batch(out.collider_ready);
}

fn collect_heightmaps(
    mut streamer: ResMut<ChunkStreamer>,
    viewer: Res<Viewer>,
    mut mesh_ready: EventWriter<ChunkMeshReady>,
    mut lod_changed: EventWriter<ChunkLodChanged>,
    mut visibility_changed: EventWriter<ChunkVisibilityChanged>,
    mut collider_ready: EventWriter<ChunkColliderReady>,
) {
    let mut out = PendingEvents::default();
    streamer.collect_heightmap_results(viewer.position, &mut out);
    drain_events(
        out,
        &mut mesh_ready,
        &mut lod_changed,
        &mut visibility_changed,
        &mut collider_ready,
    );
}

fn collect_meshes(
    mut streamer: ResMut<ChunkStreamer>,
    viewer: Res<Viewer>,
    mut mesh_ready: EventWriter<ChunkMeshReady>,
    mut lod_changed: EventWriter<ChunkLodChanged>,
    mut visibility_changed: EventWriter<ChunkVisibilityChanged>,
    mut collider_ready: EventWriter<ChunkColliderReady>,
) {
    let mut out = PendingEvents::default();
    streamer.collect_mesh_results(viewer.position, &mut out);
    drain_events(
        out,
        &mut mesh_ready,
        &mut lod_changed,
        &mut visibility_changed,
        &mut collider_ready,
    );
}

fn stream_chunks(
    mut streamer: ResMut<ChunkStreamer>,
    viewer: Res<Viewer>,
    mut mesh_ready: EventWriter<ChunkMeshReady>,
    mut lod_changed: EventWriter<ChunkLodChanged>,
    mut visibility_changed: EventWriter<ChunkVisibilityChanged>,
    mut collider_ready: EventWriter<ChunkColliderReady>,
) {
    let mut out = PendingEvents::default();
    streamer.update_visible_chunks(viewer.position, &mut out);
    drain_events(
        out,
        &mut mesh_ready,
        &mut lod_changed,
        &mut visibility_changed,
        &mut collider_ready,
    );
}

/// Registers the streamer resource, the handoff events, and the fixed-tick
/// update systems. A pre-inserted `ChunkStreamer` is kept as is.
pub struct StreamingPlugin;

impl Plugin for StreamingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Viewer>()
            .init_resource::<ChunkStreamer>()
            .add_event::<ChunkMeshReady>()
            .add_event::<ChunkLodChanged>()
            .add_event::<ChunkVisibilityChanged>()
            .add_event::<ChunkColliderReady>()
            .configure_sets(
                FixedUpdate,
                (TerrainSet::Collect, TerrainSet::Stream).chain(),
            )
            .add_systems(
                FixedUpdate,
                (
                    (collect_heightmaps, collect_meshes)
                        .chain()
                        .in_set(TerrainSet::Collect),
                    stream_chunks.in_set(TerrainSet::Stream),
                ),
            );
    }
}
