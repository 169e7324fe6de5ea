//! # TestTerrain: headless harness for streaming integration tests
//!
//! Wraps `bevy::app::App` + `TerrainPlugin` so tests can drive fixed ticks
//! by hand, settle on async generation, and inspect emitted events without
//! a window or renderer.

use bevy::app::App;
use bevy::prelude::*;

use crate::streaming::{ChunkStreamer, Viewer};
use crate::TerrainPlugin;

pub struct TestTerrain {
    app: App,
}

impl TestTerrain {
    /// Harness around a default streamer: default noise and mesh settings,
    /// the default detail ladder, no eviction.
    pub fn new() -> Self {
        Self::with_streamer(ChunkStreamer::default())
    }

    /// Harness around a pre-built streamer. Inserted before `TerrainPlugin`
    /// so the plugin's `init_resource` keeps it.
    pub fn with_streamer(streamer: ChunkStreamer) -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(streamer);
        app.add_plugins(TerrainPlugin);
        Self { app }
    }

    pub fn with_viewer(mut self, position: Vec2) -> Self {
        self.move_viewer(position);
        self
    }

    pub fn move_viewer(&mut self, position: Vec2) {
        self.app.world_mut().resource_mut::<Viewer>().position = position;
    }

    pub fn viewer(&self) -> Vec2 {
        self.app.world().resource::<Viewer>().position
    }

    /// Run N fixed-update ticks by directly executing the `FixedUpdate`
    /// schedule, bypassing Bevy's time accumulator. A `yield_now()` between
    /// ticks lets `AsyncComputeTaskPool` workers make progress even when the
    /// test drives the schedule in a tight loop on a low-core CI runner.
    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.world_mut().run_schedule(FixedUpdate);
            std::thread::yield_now();
        }
    }

    /// Tick until no generation task is in flight. Panics after `max_ticks`
    /// so a stuck pipeline fails loudly instead of hanging the test run.
    pub fn settle(&mut self, max_ticks: u32) {
        for _ in 0..max_ticks {
            self.tick(1);
            if self.streamer().pending_requests() == 0 {
                return;
            }
        }
        panic!(
            "streaming did not settle within {max_ticks} ticks, {} requests still in flight",
            self.streamer().pending_requests()
        );
    }

    pub fn streamer(&self) -> &ChunkStreamer {
        self.app.world().resource::<ChunkStreamer>()
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    /// Drain every pending event of one type, oldest first. The harness never
    /// runs Bevy's event-clearing schedule, so the full history since startup
    /// is available until drained.
    pub fn drain_events<E: Event>(&mut self) -> Vec<E> {
        self.app
            .world_mut()
            .resource_mut::<Events<E>>()
            .drain()
            .collect()
    }
}
