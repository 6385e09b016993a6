//! Procedural demo scene: a generated tile sheet, a two-layer map and the
//! chunk cache that keeps GPU-ready data in step with map edits.

use std::collections::HashMap;

use anyhow::{Context, Result};
use glam::{Mat4, UVec2, UVec3, Vec2, Vec3};
use mosaic_engine::color::Color;
use mosaic_engine::render::{SpriteInstance, tiles::{ChunkDraw, DebugIndexDraw}};
use mosaic_engine::sheet::{SheetImage, TileSheet};
use mosaic_engine::tiles::{ChunkCoord, ChunkData, TileKind, TileMap, TileTransform};

pub const MAP_SIZE: UVec2 = UVec2::new(32, 32);
pub const CHUNK_SIZE: UVec2 = UVec2::new(8, 8);
pub const TILE_SIZE: UVec2 = UVec2::new(16, 16);

/// Number of generated sheet layers.
pub const SHEET_LAYERS: u32 = 4;

/// Overlay cell whose content spins every frame.
const SPINNER: UVec3 = UVec3::new(12, 12, 1);

// ── sheet ─────────────────────────────────────────────────────────────────

/// One row of `SHEET_LAYERS` 16×16 patterns: checker, stripes, frame, arrow.
pub fn build_sheet() -> Result<TileSheet> {
    let (tw, th) = (TILE_SIZE.x, TILE_SIZE.y);
    let width = tw * SHEET_LAYERS;
    let mut rgba = Vec::with_capacity((width * th * 4) as usize);

    for y in 0..th {
        for x in 0..width {
            let (layer, lx, ly) = (x / tw, x % tw, y);
            rgba.extend_from_slice(&pattern_texel(layer, lx, ly));
        }
    }

    TileSheet::from_rgba(&[SheetImage::new(width, th, &rgba)], TILE_SIZE)
        .context("failed to build demo tile sheet")
}

/// `ly` counts down from the image top.
fn pattern_texel(layer: u32, lx: u32, ly: u32) -> [u8; 4] {
    let last = TILE_SIZE.x - 1;
    match layer {
        0 => {
            if ((lx / 4) + (ly / 4)) % 2 == 0 {
                [90, 140, 70, 255]
            } else {
                [70, 115, 55, 255]
            }
        }
        1 => {
            if (lx + ly) % 6 < 3 {
                [160, 120, 80, 255]
            } else {
                [120, 85, 55, 255]
            }
        }
        2 => {
            if lx == 0 || ly == 0 || lx == last || ly == last {
                [40, 40, 48, 255]
            } else {
                [0, 0, 0, 0]
            }
        }
        _ => {
            // Upward arrow; transparent background shows the ground through it.
            let centre = TILE_SIZE.x / 2;
            let shaft = lx.abs_diff(centre) <= 1 && ly >= 6;
            let head = ly < 8 && lx.abs_diff(centre) <= ly.saturating_sub(1) / 2 + 1 && ly >= 2;
            if shaft || head {
                [250, 250, 250, 255]
            } else {
                [0, 0, 0, 0]
            }
        }
    }
}

// ── map ───────────────────────────────────────────────────────────────────

/// Cheap integer hash; deterministic across runs.
fn hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = x.wrapping_mul(0x9E37_79B1) ^ y.wrapping_mul(0x85EB_CA77) ^ seed;
    h ^= h >> 15;
    h = h.wrapping_mul(0x2C1B_3C6D);
    h ^= h >> 12;
    h
}

/// Ground layer of mixed sprites, color tiles and holes; sparse overlay above.
pub fn build_map() -> Result<TileMap> {
    let mut map = TileMap::new(MAP_SIZE, CHUNK_SIZE, TILE_SIZE).context("invalid demo map")?;
    map.add_empty_layer();

    for y in 0..MAP_SIZE.y {
        for x in 0..MAP_SIZE.x {
            let ground = match hash(x, y, 1) % 16 {
                0 => None,
                1 | 2 => Some(TileKind::Color(Color::from_srgb_u8(60, 90, 150, 255))),
                3..=5 => Some(TileKind::sprite(1)),
                _ => Some(TileKind::sprite(0)),
            };
            map[(x, y, 0)] = ground;

            if hash(x, y, 2) % 11 == 0 {
                map[(x, y, 1)] = Some(TileKind::Sprite {
                    layer: 2,
                    transform: TileTransform::default(),
                    mask: Color::from_srgb_u8(255, 220, 160, 255),
                });
            }
        }
    }

    map[SPINNER] = Some(TileKind::sprite(3));
    log::info!(
        "demo map: {}x{} tiles, {} layers, {} chunks",
        MAP_SIZE.x,
        MAP_SIZE.y,
        map.layer_count(),
        map.chunks().count()
    );
    Ok(map)
}

/// Rotates the spinner cell to `angle`; `set` dirties its chunk.
pub fn spin(map: &mut TileMap, angle: f32) {
    map.set(
        SPINNER,
        Some(TileKind::Sprite {
            layer: 3,
            transform: TileTransform::from_angle(angle).recenter(),
            mask: Color::WHITE,
        }),
    );
}

/// Sprites orbiting the map centre, one per sheet layer.
pub fn orbiting_sprites(elapsed: f32) -> Vec<SpriteInstance> {
    let centre = (MAP_SIZE * TILE_SIZE).as_vec2() / 2.0;
    let size = TILE_SIZE.as_vec2() * 2.0;
    (0..SHEET_LAYERS)
        .map(|i| {
            let phase = elapsed * 0.6 + i as f32 * std::f32::consts::TAU / SHEET_LAYERS as f32;
            let pos = centre + Vec2::from_angle(phase) * 160.0 - size / 2.0;
            let transform = Mat4::from_translation(pos.extend(8.0))
                * Mat4::from_scale(size.extend(1.0));
            SpriteInstance::new(transform, i as u16)
        })
        .collect()
}

/// Map transform placing the map's centre on the world origin.
pub fn map_transform() -> Mat4 {
    let half = (MAP_SIZE * TILE_SIZE).as_vec2() / 2.0;
    Mat4::from_translation(Vec3::new(-half.x, -half.y, 0.0))
}

// ── chunk cache ───────────────────────────────────────────────────────────

/// Built chunk data, rebuilt only for chunks the map reports dirty.
#[derive(Default)]
pub struct ChunkCache {
    chunks: HashMap<ChunkCoord, ChunkData>,
    order: Vec<ChunkCoord>,
}

impl ChunkCache {
    /// Rebuilds dirty chunks; returns how many were rebuilt.
    pub fn refresh(&mut self, map: &mut TileMap) -> usize {
        let dirty = map.take_dirty_chunks();
        for &coord in &dirty {
            let data = ChunkData::build(map, coord);
            if data.is_empty() {
                self.chunks.remove(&coord);
            } else {
                self.chunks.insert(coord, data);
            }
        }
        if !dirty.is_empty() {
            self.order = map.chunks().filter(|c| self.chunks.contains_key(c)).collect();
            log::trace!("rebuilt {} chunk(s)", dirty.len());
        }
        dirty.len()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn draws(&self, map_transform: Mat4) -> Vec<ChunkDraw<'_>> {
        self.iter().map(|c| c.draw(map_transform)).collect()
    }

    pub fn debug_draws(&self, map_transform: Mat4) -> Vec<DebugIndexDraw<'_>> {
        self.iter().map(|c| c.debug_draw(map_transform)).collect()
    }

    fn iter(&self) -> impl Iterator<Item = &ChunkData> {
        self.order.iter().filter_map(|c| self.chunks.get(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── sheet ─────────────────────────────────────────────────────────────

    #[test]
    fn sheet_has_one_layer_per_pattern() {
        let sheet = build_sheet().unwrap();
        assert_eq!(sheet.layer_count(), SHEET_LAYERS);
        assert_eq!(sheet.tile_size(), TILE_SIZE);
    }

    #[test]
    fn frame_pattern_is_hollow() {
        let sheet = build_sheet().unwrap();
        assert_eq!(sheet.texel(2, 0, 0).map(|t| t[3]), Some(255));
        assert_eq!(sheet.texel(2, 8, 8).map(|t| t[3]), Some(0));
    }

    // ── map ───────────────────────────────────────────────────────────────

    #[test]
    fn map_is_deterministic() {
        let a = build_map().unwrap();
        let b = build_map().unwrap();
        for y in 0..MAP_SIZE.y {
            for x in 0..MAP_SIZE.x {
                assert_eq!(a[(x, y, 0)], b[(x, y, 0)]);
            }
        }
    }

    #[test]
    fn spinner_dirties_only_its_chunk() {
        let mut map = build_map().unwrap();
        map.take_dirty_chunks();
        spin(&mut map, 1.0);
        assert_eq!(map.take_dirty_chunks(), vec![map.chunk_of(SPINNER)]);
    }

    // ── chunk cache ───────────────────────────────────────────────────────

    #[test]
    fn first_refresh_builds_every_chunk() {
        let mut map = build_map().unwrap();
        let mut cache = ChunkCache::default();
        let total = map.chunks().count();
        assert_eq!(cache.refresh(&mut map), total);
        assert!(cache.len() <= total);
        assert_eq!(cache.refresh(&mut map), 0);
    }

    #[test]
    fn refresh_after_spin_rebuilds_one() {
        let mut map = build_map().unwrap();
        let mut cache = ChunkCache::default();
        cache.refresh(&mut map);
        spin(&mut map, 0.5);
        assert_eq!(cache.refresh(&mut map), 1);
        assert_eq!(cache.draws(Mat4::IDENTITY).len(), cache.len());
    }

    #[test]
    fn orbit_has_one_sprite_per_layer() {
        let sprites = orbiting_sprites(0.0);
        assert_eq!(sprites.len(), SHEET_LAYERS as usize);
        assert_eq!(sprites[3].atlas_layer, 3);
    }
}
