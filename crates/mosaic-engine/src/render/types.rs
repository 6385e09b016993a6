//! GPU-visible data shared by the tile programs.
//!
//! Every type here is `#[repr(C)]` + `Pod` and mirrors a WGSL declaration in
//! `tiles/shaders/`. Field order and padding are part of the binding contract.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, UVec2, Vec3};

use crate::color::Color;

// ── view uniform ──────────────────────────────────────────────────────────

/// Per-view uniform bound at `@group(0) @binding(0)` by every tile program.
///
/// Layout (80 bytes):
///
///  offset  0  view_proj       mat4x4<f32>
///  offset 64  world_position  vec3<f32>  (padded to 16)
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ViewUniform {
    pub view_proj: [[f32; 4]; 4],
    /// Camera position in world space. Reserved; no fragment stage reads it yet.
    pub world_position: [f32; 3],
    pub _pad: f32,
}

impl ViewUniform {
    #[inline]
    pub fn new(view_proj: Mat4, world_position: Vec3) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            world_position: world_position.to_array(),
            _pad: 0.0,
        }
    }

    #[inline]
    pub fn identity() -> Self {
        Self::new(Mat4::IDENTITY, Vec3::ZERO)
    }

    #[inline]
    pub fn view_proj(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.view_proj)
    }
}

impl Default for ViewUniform {
    fn default() -> Self {
        Self::identity()
    }
}

// ── chunk instance ────────────────────────────────────────────────────────

/// Per-draw instance attributes for the chunk and debug-index programs.
///
/// Layout (80 bytes):
///
///  offset  0  transform[0]  vec4<f32>   loc 0
///  offset 16  transform[1]  vec4<f32>   loc 1
///  offset 32  transform[2]  vec4<f32>   loc 2
///  offset 48  transform[3]  vec4<f32>   loc 3
///  offset 64  chunk_size    vec2<u32>   loc 4
///  offset 72  tile_size     vec2<u32>   loc 5
///
/// The four transform slots are fed to the WGSL `mat4x4` constructor in slot
/// order, so slot `i` holds column `i` of the glam matrix.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ChunkInstance {
    pub transform: [[f32; 4]; 4],
    pub chunk_size: [u32; 2],
    pub tile_size: [u32; 2],
}

impl ChunkInstance {
    pub(crate) const ATTRS: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        0 => Float32x4, // transform row_0
        1 => Float32x4, // transform row_1
        2 => Float32x4, // transform row_2
        3 => Float32x4, // transform row_3
        4 => Uint32x2,  // chunk_size
        5 => Uint32x2   // tile_size
    ];

    #[inline]
    pub fn new(transform: Mat4, chunk_size: UVec2, tile_size: UVec2) -> Self {
        Self {
            transform: transform.to_cols_array_2d(),
            chunk_size: chunk_size.to_array(),
            tile_size: tile_size.to_array(),
        }
    }

    #[inline]
    pub fn transform(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.transform)
    }

    #[inline]
    pub fn chunk_size(&self) -> UVec2 {
        UVec2::from_array(self.chunk_size)
    }

    #[inline]
    pub fn tile_size(&self) -> UVec2 {
        UVec2::from_array(self.tile_size)
    }

    /// Number of tiles the draw covers (`chunk_size.x * chunk_size.y`).
    #[inline]
    pub fn tile_count(&self) -> u32 {
        self.chunk_size[0].saturating_mul(self.chunk_size[1])
    }

    /// Number of distinct `vertex_index` values the draw produces (4 per tile).
    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.tile_count().saturating_mul(4)
    }

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ChunkInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

// ── tile record ───────────────────────────────────────────────────────────

/// One entry of the chunk program's read-only tile storage buffer.
///
/// Layout (96 bytes, WGSL storage rules):
///
///  offset  0  atlas_layer   i32
///  offset 16  uv_transform  mat4x4<f32>
///  offset 80  mask_color    vec4<f32>
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct TileRecord {
    pub atlas_layer: i32,
    pub _pad: [u32; 3],
    pub uv_transform: [[f32; 4]; 4],
    pub mask_color: [f32; 4],
}

impl TileRecord {
    /// `atlas_layer` value for a tile drawn as its mask color with no texture.
    pub const SOLID_LAYER: i32 = -1;
    /// `atlas_layer` value for a tile with no visible content.
    pub const ABSENT_LAYER: i32 = -2;

    #[inline]
    pub fn absent() -> Self {
        Self {
            atlas_layer: Self::ABSENT_LAYER,
            _pad: [0; 3],
            uv_transform: Mat4::IDENTITY.to_cols_array_2d(),
            mask_color: Color::TRANSPARENT.to_array(),
        }
    }

    #[inline]
    pub fn solid(color: Color) -> Self {
        Self {
            atlas_layer: Self::SOLID_LAYER,
            mask_color: color.to_array(),
            ..Self::absent()
        }
    }

    #[inline]
    pub fn sprite(layer: u16, uv_transform: Mat4, mask: Color) -> Self {
        Self {
            atlas_layer: layer as i32,
            _pad: [0; 3],
            uv_transform: uv_transform.to_cols_array_2d(),
            mask_color: mask.to_array(),
        }
    }

    #[inline]
    pub fn uv_transform(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.uv_transform)
    }

    #[inline]
    pub fn mask_color(&self) -> Color {
        Color::from_array(self.mask_color)
    }

    #[inline]
    pub fn is_absent(&self) -> bool {
        self.atlas_layer == Self::ABSENT_LAYER
    }
}

impl Default for TileRecord {
    fn default() -> Self {
        Self::absent()
    }
}

// ── sprite ────────────────────────────────────────────────────────────────

/// Vertex of the sprite program's explicit quad.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SpriteVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl SpriteVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x2  // uv
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Unit quad in local sprite space; UV follows position so (0,0) is bottom-left.
pub(crate) const SPRITE_QUAD: [SpriteVertex; 4] = [
    SpriteVertex { position: [0.0, 0.0, 0.0], uv: [0.0, 0.0] },
    SpriteVertex { position: [1.0, 0.0, 0.0], uv: [1.0, 0.0] },
    SpriteVertex { position: [1.0, 1.0, 0.0], uv: [1.0, 1.0] },
    SpriteVertex { position: [0.0, 1.0, 0.0], uv: [0.0, 1.0] },
];

pub(crate) const SPRITE_QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Per-sprite instance attributes.
///
/// Layout (80 bytes):
///
///  offset  0  transform[0..4]  4 × vec4<f32>  loc 2..5
///  offset 64  atlas_layer      i32            loc 6
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SpriteInstance {
    pub transform: [[f32; 4]; 4],
    pub atlas_layer: i32,
    pub _pad: [u32; 3],
}

impl SpriteInstance {
    const ATTRS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        2 => Float32x4, // transform row_0
        3 => Float32x4, // transform row_1
        4 => Float32x4, // transform row_2
        5 => Float32x4, // transform row_3
        6 => Sint32     // atlas_layer
    ];

    /// `transform` places the unit quad; fold the sprite size into its scale.
    #[inline]
    pub fn new(transform: Mat4, atlas_layer: u16) -> Self {
        Self {
            transform: transform.to_cols_array_2d(),
            atlas_layer: atlas_layer as i32,
            _pad: [0; 3],
        }
    }

    #[inline]
    pub fn transform(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.transform)
    }

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::mem::{offset_of, size_of};

    use glam::{UVec2, Vec3};

    use super::*;

    // ── sizes / offsets ───────────────────────────────────────────────────

    #[test]
    fn view_uniform_matches_wgsl_layout() {
        assert_eq!(size_of::<ViewUniform>(), 80);
        assert_eq!(offset_of!(ViewUniform, world_position), 64);
    }

    #[test]
    fn tile_record_matches_wgsl_storage_layout() {
        assert_eq!(size_of::<TileRecord>(), 96);
        assert_eq!(offset_of!(TileRecord, atlas_layer), 0);
        assert_eq!(offset_of!(TileRecord, uv_transform), 16);
        assert_eq!(offset_of!(TileRecord, mask_color), 80);
    }

    #[test]
    fn chunk_instance_attribute_offsets() {
        assert_eq!(size_of::<ChunkInstance>(), 80);
        let offsets: Vec<u64> = ChunkInstance::ATTRS.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 16, 32, 48, 64, 72]);
        let locations: Vec<u32> = ChunkInstance::ATTRS.iter().map(|a| a.shader_location).collect();
        assert_eq!(locations, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn sprite_attribute_locations() {
        let v: Vec<u32> = SpriteVertex::ATTRS.iter().map(|a| a.shader_location).collect();
        let i: Vec<u32> = SpriteInstance::ATTRS.iter().map(|a| a.shader_location).collect();
        assert_eq!(v, vec![0, 1]);
        assert_eq!(i, vec![2, 3, 4, 5, 6]);
        assert_eq!(SpriteInstance::ATTRS[4].offset, 64);
    }

    // ── constructors ──────────────────────────────────────────────────────

    #[test]
    fn chunk_instance_round_trips_transform() {
        let m = Mat4::from_translation(Vec3::new(3.0, 4.0, 5.0));
        let inst = ChunkInstance::new(m, UVec2::new(8, 8), UVec2::new(16, 16));
        assert_eq!(inst.transform(), m);
        assert_eq!(inst.tile_count(), 64);
        assert_eq!(inst.vertex_count(), 256);
    }

    #[test]
    fn tile_record_sentinels() {
        assert!(TileRecord::absent().is_absent());
        let solid = TileRecord::solid(Color::BLACK);
        assert_eq!(solid.atlas_layer, -1);
        assert_eq!(solid.mask_color(), Color::BLACK);
        let sprite = TileRecord::sprite(7, Mat4::IDENTITY, Color::WHITE);
        assert_eq!(sprite.atlas_layer, 7);
        assert_eq!(sprite.uv_transform(), Mat4::IDENTITY);
    }
}
