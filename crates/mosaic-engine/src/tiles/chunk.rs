use std::fmt;

use glam::{Mat4, UVec2, UVec3, Vec2, Vec3};

use crate::render::{ChunkDraw, ChunkInstance, DebugIndexDraw, TileRecord};
use crate::shading;

use super::map::TileMap;
use super::tile::{flat_index, tile_record};

/// Chunk position in chunk units: `(x, y, layer)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ChunkCoord(pub UVec3);

impl ChunkCoord {
    #[inline]
    pub fn new(x: u32, y: u32, layer: u32) -> Self {
        Self(UVec3::new(x, y, layer))
    }

    #[inline]
    pub fn layer(&self) -> u32 {
        self.0.z
    }

    /// Layer, then row, then column.
    #[inline]
    pub(crate) fn sort_key(&self) -> (u32, u32, u32) {
        (self.0.z, self.0.y, self.0.x)
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk({}, {}, layer {})", self.0.x, self.0.y, self.0.z)
    }
}

/// Axis-aligned chunk-local rectangle.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ChunkBounds {
    pub min: Vec2,
    pub max: Vec2,
}

/// Everything the tile renderers need for one chunk, built from a [`TileMap`].
///
/// `records[i]` and `flat[i]` describe the tile the shader expands at
/// `tile_index = i`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkData {
    pub coord: ChunkCoord,
    chunk_size: UVec2,
    tile_size: UVec2,
    origin: Vec3,
    records: Vec<TileRecord>,
    flat: Vec<i32>,
    occupied: u32,
    bounds: Option<ChunkBounds>,
}

impl ChunkData {
    pub fn build(map: &TileMap, coord: ChunkCoord) -> Self {
        let chunk_size = map.chunk_size();
        let tile_size = map.tile_size();
        let tile_count = chunk_size.x * chunk_size.y;
        let base = coord.0.truncate() * chunk_size;

        let mut records = Vec::with_capacity(tile_count as usize);
        let mut flat = Vec::with_capacity(tile_count as usize);
        let mut occupied = 0;
        let mut bounds: Option<ChunkBounds> = None;

        for tile_index in 0..tile_count {
            // Same cell the vertex stage will place at this index.
            let local = shading::tile_position(tile_index, chunk_size);
            let cell = (base + local).extend(coord.layer());
            let tile = map.get(cell).copied().flatten();

            let record = tile_record(&tile);
            if !record.is_absent() {
                occupied += 1;
                for corner in shading::tile_corners(tile_index, chunk_size, tile_size) {
                    let b = bounds.get_or_insert(ChunkBounds { min: corner, max: corner });
                    b.min = b.min.min(corner);
                    b.max = b.max.max(corner);
                }
            }
            records.push(record);
            flat.push(flat_index(&tile));
        }

        let origin = Vec3::new(
            (coord.0.x * chunk_size.x * tile_size.x) as f32,
            (coord.0.y * chunk_size.y * tile_size.y) as f32,
            coord.layer() as f32,
        );

        Self {
            coord,
            chunk_size,
            tile_size,
            origin,
            records,
            flat,
            occupied,
            bounds,
        }
    }

    /// Map-local position of the chunk's bottom-left corner; z is the layer.
    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline]
    pub fn records(&self) -> &[TileRecord] {
        &self.records
    }

    /// Debug-index values: sheet layer, `0` for color tiles, `-1` for empty.
    #[inline]
    pub fn flat_indices(&self) -> &[i32] {
        &self.flat
    }

    #[inline]
    pub fn occupied(&self) -> u32 {
        self.occupied
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Chunk-local extent of the occupied tiles, `None` when empty.
    #[inline]
    pub fn local_bounds(&self) -> Option<ChunkBounds> {
        self.bounds
    }

    /// Instance for this chunk under `map_transform`.
    pub fn instance(&self, map_transform: Mat4) -> ChunkInstance {
        ChunkInstance::new(
            map_transform * Mat4::from_translation(self.origin),
            self.chunk_size,
            self.tile_size,
        )
    }

    pub fn draw(&self, map_transform: Mat4) -> ChunkDraw<'_> {
        ChunkDraw::new(self.instance(map_transform), &self.records)
    }

    pub fn debug_draw(&self, map_transform: Mat4) -> DebugIndexDraw<'_> {
        DebugIndexDraw::new(self.instance(map_transform), &self.flat)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;
    use crate::color::Color;
    use crate::render::ViewUniform;
    use crate::tiles::TileKind;

    fn map() -> TileMap {
        TileMap::new(UVec2::new(6, 4), UVec2::splat(4), UVec2::new(16, 8)).unwrap()
    }

    // ── records ───────────────────────────────────────────────────────────

    #[test]
    fn empty_chunk_is_all_absent() {
        let data = ChunkData::build(&map(), ChunkCoord::new(0, 0, 0));
        assert!(data.is_empty());
        assert_eq!(data.records().len(), 16);
        assert!(data.records().iter().all(TileRecord::is_absent));
        assert!(data.flat_indices().iter().all(|v| *v == -1));
        assert_eq!(data.local_bounds(), None);
    }

    #[test]
    fn records_follow_shader_tile_order() {
        let mut m = map();
        m[(1, 2, 0)] = Some(TileKind::sprite(7));
        m[(0, 0, 0)] = Some(TileKind::Color(Color::BLACK));
        let data = ChunkData::build(&m, ChunkCoord::new(0, 0, 0));

        // Cell (1, 2) is tile_index 2 * 4 + 1.
        assert_eq!(data.records()[9].atlas_layer, 7);
        assert_eq!(data.flat_indices()[9], 7);
        assert_eq!(data.records()[0].atlas_layer, TileRecord::SOLID_LAYER);
        assert_eq!(data.flat_indices()[0], 0);
        assert_eq!(data.occupied(), 2);
    }

    #[test]
    fn edge_chunk_pads_with_absent() {
        let mut m = map();
        m[(5, 3, 0)] = Some(TileKind::sprite(1));
        let data = ChunkData::build(&m, ChunkCoord::new(1, 0, 0));
        // Map is 6 wide, so local columns 2 and 3 fall outside it.
        assert_eq!(data.records()[3 * 4 + 1].atlas_layer, 1);
        assert!(data.records()[3 * 4 + 2].is_absent());
        assert!(data.records()[3].is_absent());
    }

    // ── geometry ──────────────────────────────────────────────────────────

    #[test]
    fn origin_is_chunk_times_tile_size() {
        let mut m = map();
        m.add_empty_layer();
        let data = ChunkData::build(&m, ChunkCoord::new(1, 0, 1));
        assert_eq!(data.origin(), Vec3::new(64.0, 0.0, 1.0));
    }

    #[test]
    fn bounds_cover_occupied_tiles() {
        let mut m = map();
        m[(1, 0, 0)] = Some(TileKind::sprite(0));
        m[(2, 3, 0)] = Some(TileKind::sprite(0));
        let data = ChunkData::build(&m, ChunkCoord::new(0, 0, 0));
        assert_eq!(
            data.local_bounds(),
            Some(ChunkBounds {
                min: Vec2::new(16.0, 0.0),
                max: Vec2::new(48.0, 32.0),
            })
        );
    }

    #[test]
    fn instance_places_tiles_in_map_space() {
        let mut m = map();
        m[(5, 1, 0)] = Some(TileKind::sprite(0));
        let data = ChunkData::build(&m, ChunkCoord::new(1, 0, 0));
        let inst = data.instance(Mat4::IDENTITY);

        // Local cell (1, 1) of chunk (1, 0) is map cell (5, 1).
        let v = shading::expand_vertex(5 * 4, &inst, &ViewUniform::identity());
        assert_eq!(v.clip_position, Vec4::new(80.0, 8.0, 0.0, 1.0));
    }

    #[test]
    fn draws_borrow_chunk_buffers() {
        let data = ChunkData::build(&map(), ChunkCoord::new(0, 0, 0));
        let draw = data.draw(Mat4::IDENTITY);
        assert_eq!(draw.tiles.len() as u32, draw.instance.tile_count());
        let debug = data.debug_draw(Mat4::IDENTITY);
        assert_eq!(debug.indices.len(), 16);
    }
}
