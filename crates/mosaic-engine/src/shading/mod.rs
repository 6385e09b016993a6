//! CPU reference for the tile programs.
//!
//! Each function here computes what the matching WGSL stage computes for one
//! invocation. Tests pin the shader contract through these, and host code uses
//! them where it needs the same geometry, e.g. chunk bounds.

mod expand;
mod resolve;

use glam::Vec2;

pub use expand::{
    CORNER_TRIANGLES, ChunkVertex, corner_position, expand_vertex, local_position, tile_corners,
    tile_index, tile_indices, tile_position,
};
pub use resolve::{
    Fragment, UV_MAX, UV_MIN, resolve_chunk_fragment, resolve_debug_fragment,
    resolve_sprite_fragment, transform_uv, uv_in_bounds,
};

/// Something a fragment stage can sample: a texture array plus its sampler.
pub trait TextureSource {
    /// Returns a linear RGBA texel for `uv` in `layer`.
    fn sample(&self, uv: Vec2, layer: i32) -> [f32; 4];
}
