//! Headless integration tests covering heightmap generation, detail-tier
//! meshing, and chunk streaming through the `TestTerrain` harness.

mod generation_tests;
mod lod_mesh_tests;
