use std::collections::HashSet;
use std::fmt;
use std::ops::{Index, IndexMut};

use glam::{UVec2, UVec3};

use super::chunk::ChunkCoord;
use super::tile::Tile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileMapError {
    ZeroChunkSize,
    /// A layer passed to `add_layer` has the wrong number of cells.
    LayerSize { expected: usize, actual: usize },
}

impl fmt::Display for TileMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileMapError::ZeroChunkSize => write!(f, "chunk size must be at least 1x1"),
            TileMapError::LayerSize { expected, actual } => {
                write!(f, "layer has {actual} tiles, map layers hold {expected}")
            }
        }
    }
}

impl std::error::Error for TileMapError {}

/// Layered grid of tiles, split into fixed-size chunks for drawing.
///
/// Coordinates are `(x, y, layer)`; `(0, 0)` is the bottom-left cell and
/// each layer is stored row-major. Writes through `get_mut` / `IndexMut` mark
/// the containing chunk dirty.
#[derive(Debug, Clone)]
pub struct TileMap {
    layers: Vec<Vec<Tile>>,
    size: UVec3,
    chunk_size: UVec2,
    tile_size: UVec2,
    dirty: HashSet<ChunkCoord>,
}

impl TileMap {
    /// Creates a one-layer map of empty cells.
    ///
    /// Every chunk starts dirty.
    pub fn new(size: UVec2, chunk_size: UVec2, tile_size: UVec2) -> Result<Self, TileMapError> {
        if chunk_size.x == 0 || chunk_size.y == 0 {
            return Err(TileMapError::ZeroChunkSize);
        }
        if chunk_size.x != chunk_size.y {
            log::warn!(
                "TileMap: non-square chunk size {}x{}; chunk rows are laid out by {} so tiles will overlap or leave gaps",
                chunk_size.x,
                chunk_size.y,
                chunk_size.y
            );
        }

        let mut map = Self {
            layers: vec![vec![None; cell_count(size)]],
            size: size.extend(1),
            chunk_size,
            tile_size,
            dirty: HashSet::new(),
        };
        map.mark_all_chunks_dirty();
        Ok(map)
    }

    /// `(width, height, layers)` in cells.
    #[inline]
    pub fn size(&self) -> UVec3 {
        self.size
    }

    #[inline]
    pub fn layer_count(&self) -> u32 {
        self.size.z
    }

    #[inline]
    pub fn chunk_size(&self) -> UVec2 {
        self.chunk_size
    }

    #[inline]
    pub fn tile_size(&self) -> UVec2 {
        self.tile_size
    }

    #[inline]
    pub fn contains(&self, coord: UVec3) -> bool {
        coord.cmplt(self.size).all()
    }

    #[inline]
    fn cell_index(&self, coord: UVec3) -> usize {
        (coord.y * self.size.x + coord.x) as usize
    }

    pub fn get(&self, coord: UVec3) -> Option<&Tile> {
        if !self.contains(coord) {
            return None;
        }
        self.layers
            .get(coord.z as usize)?
            .get(self.cell_index(coord))
    }

    /// Mutable access; marks the chunk dirty when `coord` is in bounds.
    pub fn get_mut(&mut self, coord: UVec3) -> Option<&mut Tile> {
        if !self.contains(coord) {
            return None;
        }
        self.mark_chunk_dirty(coord);
        let index = self.cell_index(coord);
        self.layers.get_mut(coord.z as usize)?.get_mut(index)
    }

    /// Writes `tile` at `coord`. Returns `false` if out of bounds.
    pub fn set(&mut self, coord: UVec3, tile: Tile) -> bool {
        match self.get_mut(coord) {
            Some(cell) => {
                *cell = tile;
                true
            }
            None => false,
        }
    }

    /// Sets every cell of `layer` to `tile`.
    pub fn fill_layer(&mut self, layer: u32, tile: Tile) {
        let Some(cells) = self.layers.get_mut(layer as usize) else { return };
        cells.fill(tile);
        self.mark_layer_dirty(layer);
    }

    /// Appends a layer of empty cells and returns its index.
    pub fn add_empty_layer(&mut self) -> u32 {
        self.layers.push(vec![None; cell_count(self.size.truncate())]);
        self.size.z += 1;
        let layer = self.size.z - 1;
        self.mark_layer_dirty(layer);
        layer
    }

    /// Appends a row-major layer and returns its index.
    pub fn add_layer(&mut self, tiles: Vec<Tile>) -> Result<u32, TileMapError> {
        let expected = cell_count(self.size.truncate());
        if tiles.len() != expected {
            return Err(TileMapError::LayerSize {
                expected,
                actual: tiles.len(),
            });
        }
        self.layers.push(tiles);
        self.size.z += 1;
        let layer = self.size.z - 1;
        self.mark_layer_dirty(layer);
        Ok(layer)
    }

    // ── chunks ────────────────────────────────────────────────────────────

    /// Chunks per axis; partial chunks at the right/top edges count.
    #[inline]
    pub fn chunk_counts(&self) -> UVec3 {
        let xy = (self.size.truncate() + self.chunk_size - UVec2::ONE) / self.chunk_size;
        xy.extend(self.size.z)
    }

    /// Chunk containing the cell `coord`.
    #[inline]
    pub fn chunk_of(&self, coord: UVec3) -> ChunkCoord {
        ChunkCoord((coord.truncate() / self.chunk_size).extend(coord.z))
    }

    /// Every chunk, layer by layer, rows bottom to top.
    pub fn chunks(&self) -> impl Iterator<Item = ChunkCoord> + use<> {
        let counts = self.chunk_counts();
        (0..counts.z).flat_map(move |z| {
            (0..counts.y).flat_map(move |y| (0..counts.x).map(move |x| ChunkCoord(UVec3::new(x, y, z))))
        })
    }

    #[inline]
    pub fn mark_chunk_dirty(&mut self, coord: UVec3) {
        let chunk = self.chunk_of(coord);
        self.dirty.insert(chunk);
    }

    pub fn mark_layer_dirty(&mut self, layer: u32) {
        let chunks: Vec<ChunkCoord> = self.chunks().filter(|c| c.layer() == layer).collect();
        self.dirty.extend(chunks);
    }

    pub fn mark_all_chunks_dirty(&mut self) {
        let chunks: Vec<ChunkCoord> = self.chunks().collect();
        self.dirty.extend(chunks);
    }

    #[inline]
    pub fn is_dirty(&self, chunk: ChunkCoord) -> bool {
        self.dirty.contains(&chunk)
    }

    /// Drains the dirty set, ordered by layer then row then column.
    pub fn take_dirty_chunks(&mut self) -> Vec<ChunkCoord> {
        let mut chunks: Vec<ChunkCoord> = self.dirty.drain().collect();
        chunks.sort_by_key(|c| c.sort_key());
        chunks
    }
}

#[inline]
fn cell_count(size: UVec2) -> usize {
    size.x as usize * size.y as usize
}

impl Index<UVec3> for TileMap {
    type Output = Tile;

    /// Panics if `coord` is out of bounds.
    #[inline]
    fn index(&self, coord: UVec3) -> &Self::Output {
        assert!(self.contains(coord), "tile {coord} outside map of size {}", self.size);
        let index = self.cell_index(coord);
        &self.layers[coord.z as usize][index]
    }
}

impl IndexMut<UVec3> for TileMap {
    #[inline]
    fn index_mut(&mut self, coord: UVec3) -> &mut Self::Output {
        assert!(self.contains(coord), "tile {coord} outside map of size {}", self.size);
        self.mark_chunk_dirty(coord);
        let index = self.cell_index(coord);
        &mut self.layers[coord.z as usize][index]
    }
}

impl Index<(u32, u32, u32)> for TileMap {
    type Output = Tile;

    #[inline]
    fn index(&self, coord: (u32, u32, u32)) -> &Self::Output {
        &self[UVec3::from(coord)]
    }
}

impl IndexMut<(u32, u32, u32)> for TileMap {
    #[inline]
    fn index_mut(&mut self, coord: (u32, u32, u32)) -> &mut Self::Output {
        &mut self[UVec3::from(coord)]
    }
}

impl Index<[u32; 3]> for TileMap {
    type Output = Tile;

    #[inline]
    fn index(&self, coord: [u32; 3]) -> &Self::Output {
        &self[UVec3::from(coord)]
    }
}

impl IndexMut<[u32; 3]> for TileMap {
    #[inline]
    fn index_mut(&mut self, coord: [u32; 3]) -> &mut Self::Output {
        &mut self[UVec3::from(coord)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::tiles::TileKind;

    fn map(w: u32, h: u32, chunk: u32) -> TileMap {
        TileMap::new(UVec2::new(w, h), UVec2::splat(chunk), UVec2::splat(16)).unwrap()
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn zero_chunk_size_is_rejected() {
        let r = TileMap::new(UVec2::splat(4), UVec2::new(0, 4), UVec2::ONE);
        assert_eq!(r.err(), Some(TileMapError::ZeroChunkSize));
    }

    #[test]
    fn new_map_is_one_empty_layer() {
        let m = map(3, 2, 2);
        assert_eq!(m.size(), UVec3::new(3, 2, 1));
        assert_eq!(m[(2, 1, 0)], None);
    }

    // ── access ────────────────────────────────────────────────────────────

    #[test]
    fn index_forms_agree() {
        let mut m = map(4, 4, 2);
        m[[1, 2, 0]] = Some(TileKind::sprite(3));
        assert_eq!(m[(1, 2, 0)], Some(TileKind::sprite(3)));
        assert_eq!(m[UVec3::new(1, 2, 0)], Some(TileKind::sprite(3)));
        assert_eq!(m.get(UVec3::new(1, 2, 0)), Some(&Some(TileKind::sprite(3))));
    }

    #[test]
    fn get_is_bounds_checked_per_axis() {
        let mut m = map(4, 2, 2);
        // x past the row end must not wrap into the next row.
        assert_eq!(m.get(UVec3::new(4, 0, 0)), None);
        assert_eq!(m.get(UVec3::new(0, 2, 0)), None);
        assert_eq!(m.get(UVec3::new(0, 0, 1)), None);
        assert!(!m.set(UVec3::new(9, 9, 0), None));
    }

    #[test]
    #[should_panic]
    fn index_out_of_bounds_panics() {
        let m = map(2, 2, 2);
        let _tile = m[(2, 0, 0)];
    }

    // ── layers ────────────────────────────────────────────────────────────

    #[test]
    fn add_layer_checks_length() {
        let mut m = map(2, 2, 2);
        assert_eq!(
            m.add_layer(vec![None; 3]),
            Err(TileMapError::LayerSize { expected: 4, actual: 3 })
        );
        let red = Some(TileKind::Color(Color::new(1.0, 0.0, 0.0, 1.0)));
        assert_eq!(m.add_layer(vec![red; 4]), Ok(1));
        assert_eq!(m.layer_count(), 2);
        assert_eq!(m[(1, 1, 1)], red);
        assert_eq!(m.add_empty_layer(), 2);
        assert_eq!(m[(1, 1, 2)], None);
    }

    // ── chunks ────────────────────────────────────────────────────────────

    #[test]
    fn chunk_counts_round_up() {
        let m = map(17, 8, 8);
        assert_eq!(m.chunk_counts(), UVec3::new(3, 1, 1));
        assert_eq!(m.chunks().count(), 3);
    }

    #[test]
    fn chunk_of_divides_by_chunk_size() {
        let m = map(32, 32, 8);
        assert_eq!(m.chunk_of(UVec3::new(9, 17, 0)), ChunkCoord(UVec3::new(1, 2, 0)));
    }

    // ── dirty tracking ────────────────────────────────────────────────────

    #[test]
    fn new_map_has_every_chunk_dirty() {
        let mut m = map(16, 8, 8);
        assert_eq!(m.take_dirty_chunks().len(), 2);
        assert!(m.take_dirty_chunks().is_empty());
    }

    #[test]
    fn writes_mark_only_their_chunk() {
        let mut m = map(16, 16, 8);
        m.take_dirty_chunks();

        m[(9, 1, 0)] = Some(TileKind::sprite(0));
        let _ = m.get(UVec3::new(0, 0, 0));
        assert_eq!(m.take_dirty_chunks(), vec![ChunkCoord(UVec3::new(1, 0, 0))]);
    }

    #[test]
    fn dirty_chunks_are_sorted() {
        let mut m = map(16, 16, 8);
        m.take_dirty_chunks();
        m.set(UVec3::new(9, 9, 0), None);
        m.set(UVec3::new(0, 9, 0), None);
        m.set(UVec3::new(9, 0, 0), None);
        let coords: Vec<UVec3> = m.take_dirty_chunks().into_iter().map(|c| c.0).collect();
        assert_eq!(
            coords,
            vec![UVec3::new(1, 0, 0), UVec3::new(0, 1, 0), UVec3::new(1, 1, 0)]
        );
    }

    #[test]
    fn new_layer_marks_its_chunks() {
        let mut m = map(16, 8, 8);
        m.take_dirty_chunks();
        let layer = m.add_empty_layer();
        let dirty = m.take_dirty_chunks();
        assert_eq!(dirty.len(), 2);
        assert!(dirty.iter().all(|c| c.layer() == layer));
    }
}
