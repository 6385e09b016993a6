//! Host-side tile map model and per-chunk GPU data.

mod chunk;
mod map;
mod tile;

pub use chunk::{ChunkBounds, ChunkCoord, ChunkData};
pub use map::{TileMap, TileMapError};
pub use tile::{Tile, TileKind, TileTransform, flat_index, tile_record};
