//! Tile renderers: chunk, sprite and debug-index programs.

mod common;

pub mod chunk;
pub mod debug_index;
pub mod sprite;

pub use chunk::{ChunkDraw, ChunkRenderer};
pub use common::{BlendMode, DebugIndexMode, RenderConfig, SpriteMode};
pub use debug_index::{DebugIndexDraw, DebugIndexRenderer};
pub use sprite::{SpriteDraw, SpriteRenderer};
