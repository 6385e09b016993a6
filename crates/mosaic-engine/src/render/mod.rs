//! GPU rendering subsystem.
//!
//! Renderers consume host-built tile data and issue GPU commands via wgpu.
//! Each renderer is responsible for its own GPU resources (pipelines, buffers).
//!
//! Convention:
//! - world space is y-up; chunk geometry starts at the chunk's local origin.
//! - every program reads the view uniform at `@group(0) @binding(0)`.

mod ctx;
mod types;
pub mod tiles;

pub use ctx::{RenderCtx, RenderTarget};
pub use tiles::{
    BlendMode, ChunkDraw, DebugIndexDraw, DebugIndexMode, RenderConfig, SpriteDraw, SpriteMode,
};
pub use types::{ChunkInstance, SpriteInstance, SpriteVertex, TileRecord, ViewUniform};
pub(crate) use types::{SPRITE_QUAD, SPRITE_QUAD_INDICES};
