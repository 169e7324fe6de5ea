use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;

use terrain::height_curve::HeightCurve;
use terrain::heightmap::HeightMapSettings;
use terrain::lod_mesh::MeshSettings;
use terrain::noise_field::NoiseParameters;
use terrain::streaming::{
    default_detail_levels, ChunkColliderReady, ChunkLodChanged, ChunkMeshReady, ChunkStreamer,
    ChunkVisibilityChanged, Viewer,
};
use terrain::{TerrainPlugin, TerrainSet};

fn main() {
    let seed: i32 = std::env::var("OVERLAND_SEED")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(7);
    let max_ticks: u32 = std::env::var("OVERLAND_TICKS")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(3600);

    let streamer = ChunkStreamer::new(
        HeightMapSettings {
            noise: NoiseParameters {
                seed,
                ..NoiseParameters::default()
            },
            height_curve: HeightCurve::new([(0.0, 0.0), (0.3, 0.15), (1.0, 1.0)]),
            ..HeightMapSettings::default()
        },
        MeshSettings::default(),
        default_detail_levels(),
    );

    let mut app = App::new();
    app.add_plugins(
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
            1.0 / 60.0,
        ))),
    )
    .add_plugins(LogPlugin::default())
    .insert_resource(streamer)
    .add_plugins(TerrainPlugin)
    .insert_resource(FlyoverPath {
        radius: 400.0,
        angular_speed: 0.1,
        angle: 0.0,
        ticks: 0,
        max_ticks,
    })
    .add_systems(Startup, log_session_config)
    .add_systems(
        FixedUpdate,
        (
            drive_viewer.before(TerrainSet::Collect),
            report_stream_activity.after(TerrainSet::Stream),
        ),
    );

    app.run();
}

/// Circular flyover: the viewer orbits the origin, crossing fresh chunks on
/// the way out and revisiting cached ones as the circle closes.
#[derive(Resource)]
struct FlyoverPath {
    radius: f32,
    angular_speed: f32,
    angle: f32,
    ticks: u32,
    max_ticks: u32,
}

fn log_session_config(streamer: Res<ChunkStreamer>) {
    let config = streamer.config();
    info!(
        "streaming {} detail tiers out to {} world units, {:.0}-unit chunks, {}x{} scan window",
        config.detail_levels.len(),
        config.max_view_distance,
        config.chunk_world_size,
        config.chunks_in_view_distance * 2 + 1,
        config.chunks_in_view_distance * 2 + 1,
    );
}

fn drive_viewer(
    time: Res<Time>,
    mut path: ResMut<FlyoverPath>,
    mut viewer: ResMut<Viewer>,
    streamer: Res<ChunkStreamer>,
    mut exit: EventWriter<AppExit>,
) {
    path.ticks += 1;
    if path.ticks >= path.max_ticks {
        let stats = streamer.stats();
        info!(
            "flyover done: {} chunks resident, {} heightmaps, {} meshes, {} evicted",
            streamer.chunk_count(),
            stats.heightmaps_completed,
            stats.meshes_completed,
            stats.chunks_evicted,
        );
        exit.send(AppExit::Success);
        return;
    }

    path.angle += path.angular_speed * time.delta_secs();
    viewer.position = Vec2::new(path.angle.cos(), path.angle.sin()) * path.radius;
}

fn report_stream_activity(
    streamer: Res<ChunkStreamer>,
    viewer: Res<Viewer>,
    mut meshes: EventReader<ChunkMeshReady>,
    mut lod_switches: EventReader<ChunkLodChanged>,
    mut visibility: EventReader<ChunkVisibilityChanged>,
    mut colliders: EventReader<ChunkColliderReady>,
) {
    let built = meshes.read().count();
    let switched = lod_switches.read().count();
    let mut shown = 0;
    let mut hidden = 0;
    for event in visibility.read() {
        if event.visible {
            shown += 1;
        } else {
            hidden += 1;
        }
    }
    let attached = colliders.read().count();
    if built + switched + shown + hidden + attached == 0 {
        return;
    }
    info!(
        "viewer ({:>5.0}, {:>5.0}): {built} meshes built, {switched} lod switches, +{shown}/-{hidden} visibility, {attached} colliders, {} resident",
        viewer.position.x,
        viewer.position.y,
        streamer.chunk_count(),
    );
}
