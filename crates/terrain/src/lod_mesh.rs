//! Heightmap to mesh conversion with LOD-aware vertex decimation.
//!
//! A chunk heightmap carries two extra rings of samples beyond the visible
//! area. The outermost ring never reaches the vertex buffer; its geometry
//! only feeds normal accumulation so chunk borders shade continuously into
//! their neighbors. The ring inside it is always emitted at full resolution
//! regardless of LOD, which is what lets chunks of different LOD sit next to
//! each other without cracks. Interior samples are decimated by the LOD skip
//! increment, with an always-emitted connection ring anchoring the stitching
//! triangles between the full-resolution border strip and the decimated
//! interior. Every emitted vertex takes its height straight from the
//! heightmap cell it sits on.

use bevy::math::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::{
    DEFAULT_MESH_SCALE, NUM_SUPPORTED_FLAT_SHADED_SIZES, NUM_SUPPORTED_LODS, SUPPORTED_CHUNK_SIZES,
};
use crate::heightmap::HeightMap;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshSettings {
    /// World units per heightmap cell.
    pub mesh_scale: f32,
    pub use_flat_shading: bool,
    /// Index into `SUPPORTED_CHUNK_SIZES` used when shading is smooth.
    pub chunk_size_index: usize,
    /// Index used when flat shading is on. Restricted to the smallest sizes
    /// because un-sharing multiplies the vertex count by six.
    pub flat_shaded_chunk_size_index: usize,
}

impl MeshSettings {
    /// Clamps the size indices into their supported ranges.
    pub fn sanitized(mut self) -> Self {
        self.chunk_size_index = self.chunk_size_index.min(SUPPORTED_CHUNK_SIZES.len() - 1);
        self.flat_shaded_chunk_size_index = self
            .flat_shaded_chunk_size_index
            .min(NUM_SUPPORTED_FLAT_SHADED_SIZES - 1);
        self
    }

    pub fn chunk_size(&self) -> u32 {
        if self.use_flat_shading {
            SUPPORTED_CHUNK_SIZES[self.flat_shaded_chunk_size_index]
        } else {
            SUPPORTED_CHUNK_SIZES[self.chunk_size_index]
        }
    }

    /// Heightmap samples per side, including both border rings.
    pub fn num_vertices_per_line(&self) -> usize {
        self.chunk_size() as usize + 5
    }

    /// World-space edge length of the visible chunk area.
    pub fn mesh_world_size(&self) -> f32 {
        (self.num_vertices_per_line() as f32 - 3.0) * self.mesh_scale
    }
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            mesh_scale: DEFAULT_MESH_SCALE,
            use_flat_shading: false,
            chunk_size_index: 0,
            flat_shaded_chunk_size_index: 0,
        }
    }
}

/// Grid-cell stride between emitted interior vertices at a given LOD.
pub fn skip_increment(lod: u32) -> usize {
    if lod == 0 {
        1
    } else {
        2 * lod as usize
    }
}

// ---------------------------------------------------------------------------
// Vertex taxonomy and buffer sizing
// ---------------------------------------------------------------------------

/// Role of a heightmap grid cell in the emitted mesh, in classification
/// precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexKind {
    /// Outermost ring: feeds normals only, never part of the visible mesh.
    OutOfMesh,
    /// Second ring: always full resolution, shared exactly with neighboring
    /// chunks of any LOD.
    MeshEdge,
    /// Interior cell on the skip stride (origin two cells in from the edge).
    Main,
    /// Third-ring cell off the stride: always emitted to anchor the
    /// stitching triangles between border strip and decimated interior.
    EdgeConnection,
    /// Interior cell off the stride: no geometry.
    Skipped,
}

pub fn classify_vertex(x: usize, y: usize, n: usize, skip: usize) -> VertexKind {
    if x == 0 || y == 0 || x == n - 1 || y == n - 1 {
        return VertexKind::OutOfMesh;
    }
    let interior = x > 2 && x < n - 3 && y > 2 && y < n - 3;
    if interior && ((x - 2) % skip != 0 || (y - 2) % skip != 0) {
        return VertexKind::Skipped;
    }
    if x == 1 || y == 1 || x == n - 2 || y == n - 2 {
        return VertexKind::MeshEdge;
    }
    if (x - 2) % skip == 0 && (y - 2) % skip == 0 {
        return VertexKind::Main;
    }
    VertexKind::EdgeConnection
}

/// Closed-form buffer sizes for a grid of side `n` at a given skip. The
/// builder preallocates from these and asserts the emitted counts against
/// them, so an indexing bug surfaces as a hard failure instead of a buffer
/// overrun.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshDimensions {
    pub mesh_edge_vertices: usize,
    pub edge_connection_vertices: usize,
    pub main_vertices_per_line: usize,
    pub main_vertices: usize,
    pub out_of_mesh_vertices: usize,
    pub mesh_edge_triangles: usize,
    pub main_triangles: usize,
    pub border_triangles: usize,
}

impl MeshDimensions {
    pub fn for_grid(n: usize, skip: usize) -> Self {
        debug_assert!(n >= 8, "grid too small for two border rings");
        debug_assert_eq!((n - 5) % skip, 0, "stride must divide the interior span");
        let main_vertices_per_line = (n - 5) / skip + 1;
        Self {
            mesh_edge_vertices: (n - 2) * 4 - 4,
            edge_connection_vertices: (skip - 1) * (n - 5) / skip * 4,
            main_vertices_per_line,
            main_vertices: main_vertices_per_line * main_vertices_per_line,
            out_of_mesh_vertices: n * 4 - 4,
            mesh_edge_triangles: 8 * (n - 4),
            main_triangles: (main_vertices_per_line - 1) * (main_vertices_per_line - 1) * 2,
            border_triangles: 8 * (n - 2),
        }
    }

    pub fn visible_vertices(&self) -> usize {
        self.mesh_edge_vertices + self.edge_connection_vertices + self.main_vertices
    }

    pub fn visible_triangles(&self) -> usize {
        self.mesh_edge_triangles + self.main_triangles
    }
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Renderer-ready mesh buffers. Plain arrays, no engine types.
#[derive(Debug, Clone)]
pub struct MeshPayload {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl MeshPayload {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Reference to an emitted vertex: either in the visible buffers or in the
/// normals-only out-of-mesh buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VertexRef {
    Visible(u32),
    OutOfMesh(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VertexSlot {
    Visible(u32),
    OutOfMesh(u32),
    Skipped,
}

fn build_index_map(n: usize, skip: usize) -> Vec<VertexSlot> {
    let mut map = vec![VertexSlot::Skipped; n * n];
    let mut visible = 0u32;
    let mut out_of_mesh = 0u32;
    for y in 0..n {
        for x in 0..n {
            match classify_vertex(x, y, n, skip) {
                VertexKind::OutOfMesh => {
                    map[y * n + x] = VertexSlot::OutOfMesh(out_of_mesh);
                    out_of_mesh += 1;
                }
                VertexKind::Skipped => {}
                _ => {
                    map[y * n + x] = VertexSlot::Visible(visible);
                    visible += 1;
                }
            }
        }
    }
    map
}

fn resolve_slot(slot: VertexSlot) -> VertexRef {
    match slot {
        VertexSlot::Visible(index) => VertexRef::Visible(index),
        VertexSlot::OutOfMesh(index) => VertexRef::OutOfMesh(index),
        // Quad corners are chosen on-stride or inside the always-emitted
        // rings, so a skipped corner is an indexing bug.
        VertexSlot::Skipped => unreachable!("triangle corner landed on a skipped grid cell"),
    }
}

struct MeshBuffers {
    positions: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    indices: Vec<u32>,
    out_of_mesh_positions: Vec<[f32; 3]>,
    border_triangles: Vec<[VertexRef; 3]>,
}

impl MeshBuffers {
    fn with_dimensions(dims: &MeshDimensions) -> Self {
        Self {
            positions: Vec::with_capacity(dims.visible_vertices()),
            uvs: Vec::with_capacity(dims.visible_vertices()),
            indices: Vec::with_capacity(dims.visible_triangles() * 3),
            out_of_mesh_positions: Vec::with_capacity(dims.out_of_mesh_vertices),
            border_triangles: Vec::with_capacity(dims.border_triangles),
        }
    }

    fn add_vertex(&mut self, slot: VertexSlot, position: [f32; 3], uv: [f32; 2]) {
        match slot {
            VertexSlot::Visible(index) => {
                debug_assert_eq!(self.positions.len(), index as usize);
                self.positions.push(position);
                self.uvs.push(uv);
            }
            VertexSlot::OutOfMesh(index) => {
                debug_assert_eq!(self.out_of_mesh_positions.len(), index as usize);
                self.out_of_mesh_positions.push(position);
            }
            VertexSlot::Skipped => unreachable!("skipped cells emit no vertex"),
        }
    }

    fn add_triangle(&mut self, a: VertexRef, b: VertexRef, c: VertexRef) {
        match (a, b, c) {
            (VertexRef::Visible(a), VertexRef::Visible(b), VertexRef::Visible(c)) => {
                self.indices.extend([a, b, c]);
            }
            _ => self.border_triangles.push([a, b, c]),
        }
    }

    fn position_of(&self, vertex: VertexRef) -> Vec3 {
        match vertex {
            VertexRef::Visible(index) => Vec3::from_array(self.positions[index as usize]),
            VertexRef::OutOfMesh(index) => {
                Vec3::from_array(self.out_of_mesh_positions[index as usize])
            }
        }
    }

    /// Smooth normals: accumulate the raw (area-weighted) cross product of
    /// every touching triangle per vertex, then normalize once. Border
    /// triangles contribute too, so edge vertices shade as if the neighbor
    /// chunk geometry were present.
    fn into_smooth(self) -> MeshPayload {
        let mut sums = vec![Vec3::ZERO; self.positions.len()];
        for corners in self.indices.chunks_exact(3) {
            let (a, b, c) = (
                corners[0] as usize,
                corners[1] as usize,
                corners[2] as usize,
            );
            let normal = triangle_normal(
                Vec3::from_array(self.positions[a]),
                Vec3::from_array(self.positions[b]),
                Vec3::from_array(self.positions[c]),
            );
            sums[a] += normal;
            sums[b] += normal;
            sums[c] += normal;
        }
        for corners in &self.border_triangles {
            let normal = triangle_normal(
                self.position_of(corners[0]),
                self.position_of(corners[1]),
                self.position_of(corners[2]),
            );
            for corner in corners {
                if let VertexRef::Visible(index) = corner {
                    sums[*index as usize] += normal;
                }
            }
        }
        let normals = sums.into_iter().map(normalized_or_up).collect();
        MeshPayload {
            positions: self.positions,
            normals,
            uvs: self.uvs,
            indices: self.indices,
        }
    }

    /// Flat shading: un-share every triangle corner and give the three
    /// copies the face normal.
    fn into_flat_shaded(self) -> MeshPayload {
        let corner_count = self.indices.len();
        let mut positions = Vec::with_capacity(corner_count);
        let mut uvs = Vec::with_capacity(corner_count);
        let mut normals = Vec::with_capacity(corner_count);
        let mut indices = Vec::with_capacity(corner_count);
        for corners in self.indices.chunks_exact(3) {
            let face = normalized_or_up(triangle_normal(
                Vec3::from_array(self.positions[corners[0] as usize]),
                Vec3::from_array(self.positions[corners[1] as usize]),
                Vec3::from_array(self.positions[corners[2] as usize]),
            ));
            for &corner in corners {
                indices.push(positions.len() as u32);
                positions.push(self.positions[corner as usize]);
                uvs.push(self.uvs[corner as usize]);
                normals.push(face);
            }
        }
        MeshPayload {
            positions,
            normals,
            uvs,
            indices,
        }
    }
}

fn triangle_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a)
}

fn normalized_or_up(v: Vec3) -> [f32; 3] {
    let length = v.length();
    if length < 1e-8 {
        [0.0, 1.0, 0.0]
    } else {
        (v / length).to_array()
    }
}

/// Builds the mesh for one chunk at the given LOD. The grid side comes from
/// the heightmap itself; `settings` supplies world scale and shading.
pub fn build(heightmap: &HeightMap, settings: &MeshSettings, lod: u32) -> MeshPayload {
    #[cfg(feature = "trace")]
    let _span = bevy::log::info_span!("build_lod_mesh").entered();

    let n = heightmap.width();
    debug_assert_eq!(heightmap.width(), heightmap.height(), "chunk heightmaps are square");
    debug_assert!(lod < NUM_SUPPORTED_LODS, "lod {lod} out of range");

    let skip = skip_increment(lod);
    let dims = MeshDimensions::for_grid(n, skip);
    let index_map = build_index_map(n, skip);
    let mut buffers = MeshBuffers::with_dimensions(&dims);

    let span = n as f32 - 3.0;
    let mesh_world_size = span * settings.mesh_scale;
    let top_left_x = -mesh_world_size / 2.0;
    let top_left_z = mesh_world_size / 2.0;

    for y in 0..n {
        for x in 0..n {
            let kind = classify_vertex(x, y, n, skip);
            if kind == VertexKind::Skipped {
                continue;
            }

            let percent_x = (x as f32 - 1.0) / span;
            let percent_y = (y as f32 - 1.0) / span;
            let height = heightmap.get(x, y);
            let position = [
                top_left_x + percent_x * mesh_world_size,
                height,
                top_left_z - percent_y * mesh_world_size,
            ];
            buffers.add_vertex(index_map[y * n + x], position, [percent_x, percent_y]);

            // Edge-connection cells on the left/top seam never own a quad;
            // the main vertex behind them already covers that area.
            let creates_quad = x < n - 1
                && y < n - 1
                && (kind != VertexKind::EdgeConnection || (x != 2 && y != 2));
            if creates_quad {
                let increment = if kind == VertexKind::Main && x != n - 3 && y != n - 3 {
                    skip
                } else {
                    1
                };
                let a = resolve_slot(index_map[y * n + x]);
                let b = resolve_slot(index_map[y * n + x + increment]);
                let c = resolve_slot(index_map[(y + increment) * n + x]);
                let d = resolve_slot(index_map[(y + increment) * n + x + increment]);
                buffers.add_triangle(a, d, c);
                buffers.add_triangle(d, a, b);
            }
        }
    }

    assert_eq!(buffers.positions.len(), dims.visible_vertices());
    assert_eq!(buffers.out_of_mesh_positions.len(), dims.out_of_mesh_vertices);
    assert_eq!(buffers.indices.len(), dims.visible_triangles() * 3);
    assert_eq!(buffers.border_triangles.len(), dims.border_triangles);

    if settings.use_flat_shading {
        buffers.into_flat_shaded()
    } else {
        buffers.into_smooth()
    }
}
