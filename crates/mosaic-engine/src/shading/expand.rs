use glam::{UVec2, Vec2, Vec4};

use crate::render::{ChunkInstance, ViewUniform};

/// Result of expanding one `vertex_index` of a chunk draw.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ChunkVertex {
    pub clip_position: Vec4,
    /// Unit-quad corner, one of (0,0), (0,1), (1,0), (1,1).
    pub uv: Vec2,
    pub tile_index: u32,
    pub tile_position: UVec2,
    pub local_position: Vec2,
}

// WGSL integer division/remainder by zero are defined (`e1` and `0`); Rust's
// panic. Mirror the shader so malformed descriptors behave the same on both.
#[inline]
fn wgsl_div(a: u32, b: u32) -> u32 {
    if b == 0 { a } else { a / b }
}

#[inline]
fn wgsl_rem(a: u32, b: u32) -> u32 {
    if b == 0 { 0 } else { a % b }
}

#[inline]
pub fn tile_index(vertex_index: u32) -> u32 {
    vertex_index / 4
}

/// Grid position of a tile inside its chunk.
///
/// The row stride is `chunk_size.x` but the row number divides by
/// `chunk_size.y`, exactly as the shader does. The two agree only for square
/// chunks; see `TileMap::new`.
#[inline]
pub fn tile_position(tile_index: u32, chunk_size: UVec2) -> UVec2 {
    UVec2::new(
        wgsl_rem(tile_index, chunk_size.x),
        wgsl_div(tile_index, chunk_size.y),
    )
}

/// Corner of the unit quad emitted for `vertex_index`.
///
/// Order as `vertex_index % 4` goes 0..3: (0,0), (0,1), (1,0), (1,1).
#[inline]
pub fn corner_position(vertex_index: u32) -> UVec2 {
    let corner = vertex_index % 4;
    UVec2::new(corner / 2, corner % 2)
}

/// Chunk-space position of a tile corner, before the instance transform.
#[inline]
pub fn local_position(tile_position: UVec2, corner: UVec2, tile_size: UVec2) -> Vec2 {
    ((tile_position + corner) * tile_size).as_vec2()
}

/// CPU mirror of the chunk/debug-index vertex stage.
pub fn expand_vertex(
    vertex_index: u32,
    instance: &ChunkInstance,
    view: &ViewUniform,
) -> ChunkVertex {
    let tile_index = tile_index(vertex_index);
    let tile_position = tile_position(tile_index, instance.chunk_size());
    let corner = corner_position(vertex_index);
    let local = local_position(tile_position, corner, instance.tile_size());

    let world = instance.transform() * Vec4::new(local.x, local.y, 0.0, 1.0);
    let clip = view.view_proj() * world;

    ChunkVertex {
        clip_position: clip,
        uv: corner.as_vec2(),
        tile_index,
        tile_position,
        local_position: local,
    }
}

/// The four chunk-space corners of `tile_index`, in emission order.
pub fn tile_corners(tile_index: u32, chunk_size: UVec2, tile_size: UVec2) -> [Vec2; 4] {
    let position = tile_position(tile_index, chunk_size);
    std::array::from_fn(|corner| {
        local_position(position, corner_position(corner as u32), tile_size)
    })
}

/// Index buffer contents for `tile_count` tiles.
///
/// Each entry is a `vertex_index` value; per tile the two triangles cover the
/// corners in [`CORNER_TRIANGLES`] order.
pub fn tile_indices(tile_count: u32) -> Vec<u32> {
    let mut indices = Vec::with_capacity(tile_count as usize * CORNER_TRIANGLES.len());
    for tile in 0..tile_count {
        indices.extend(CORNER_TRIANGLES.iter().map(|c| c + tile * 4));
    }
    indices
}

/// Two triangles over corners 0:(0,0) 1:(0,1) 2:(1,0) 3:(1,1).
pub const CORNER_TRIANGLES: [u32; 6] = [0, 2, 1, 1, 2, 3];
