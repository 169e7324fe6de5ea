/// Chunk sizes (in quads along one edge) the mesh pipeline supports. All are
/// multiples of 24 so the strided interior divides evenly by every LOD skip
/// increment (1, 2, 4, 6, 8).
pub const SUPPORTED_CHUNK_SIZES: [u32; 9] = [48, 72, 96, 120, 144, 168, 192, 216, 240];

/// LOD levels 0..NUM_SUPPORTED_LODS. Level 0 is full resolution; level L > 0
/// emits every (2*L)-th interior sample.
pub const NUM_SUPPORTED_LODS: u32 = 5;

/// Flat shading duplicates vertices per triangle corner (~6x), so only the
/// smallest chunk sizes stay under index-buffer comfort limits.
pub const NUM_SUPPORTED_FLAT_SHADED_SIZES: usize = 3;

/// Floor for the noise scale. Non-positive scales clamp here instead of
/// failing, leaving output degenerate but defined.
pub const MIN_NOISE_SCALE: f32 = 1e-4;

/// Fraction of the theoretical octave-amplitude sum assumed reachable in
/// practice. Global normalization divides by this scaled estimate.
pub const GLOBAL_AMPLITUDE_ESTIMATE: f32 = 0.9;

/// Half-open range for the per-octave jitter offsets drawn from the seed.
pub const OCTAVE_JITTER_RANGE: i32 = 100_000;

pub const FALLOFF_STEEPNESS: f32 = 3.0;
pub const FALLOFF_SHIFT: f32 = 2.2;

pub const DEFAULT_NOISE_SCALE: f32 = 50.0;
pub const DEFAULT_OCTAVES: u32 = 4;
pub const DEFAULT_PERSISTENCE: f32 = 0.5;
pub const DEFAULT_LACUNARITY: f32 = 2.0;
pub const DEFAULT_HEIGHT_MULTIPLIER: f32 = 25.0;
pub const DEFAULT_MESH_SCALE: f32 = 2.0;

/// Viewer must move this far (world units) before the visible-chunk set is
/// recomputed. Collision upkeep still runs on any movement.
pub const VIEWER_MOVE_THRESHOLD: f32 = 25.0;

/// Distance at which a chunk's collider payload is handed off, once the
/// collider-LOD mesh is ready.
pub const COLLIDER_GENERATION_DISTANCE: f32 = 5.0;
