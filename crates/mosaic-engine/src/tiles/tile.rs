use glam::{Mat3, Mat4, Vec2};

use crate::color::Color;
use crate::render::TileRecord;

/// Content of one grid cell. `None` is an empty cell.
pub type Tile = Option<TileKind>;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TileKind {
    /// Flat color, no texture lookup.
    Color(Color),
    /// A sheet layer, optionally transformed in uv space and tinted by `mask`.
    Sprite {
        layer: u16,
        transform: TileTransform,
        mask: Color,
    },
}

impl TileKind {
    /// Untransformed, untinted sprite.
    #[inline]
    pub fn sprite(layer: u16) -> Self {
        TileKind::Sprite {
            layer,
            transform: TileTransform::default(),
            mask: Color::WHITE,
        }
    }

    /// Storage record read by the chunk program.
    pub fn record(&self) -> TileRecord {
        match *self {
            TileKind::Color(c) => TileRecord::solid(c),
            TileKind::Sprite {
                layer,
                transform,
                mask,
            } => TileRecord::sprite(layer, transform.uv_matrix(), mask),
        }
    }

    /// Value stored for this tile in the debug-index buffer.
    ///
    /// Color tiles have no layer and report `0` so they still show as present.
    #[inline]
    pub fn flat_index(&self) -> i32 {
        match *self {
            TileKind::Color(_) => 0,
            TileKind::Sprite { layer, .. } => layer as i32,
        }
    }
}

/// Record for an optional tile; empty cells become the absent sentinel.
#[inline]
pub fn tile_record(tile: &Tile) -> TileRecord {
    tile.as_ref().map_or_else(TileRecord::absent, TileKind::record)
}

/// Debug-index value for an optional tile; empty cells are `-1`.
#[inline]
pub fn flat_index(tile: &Tile) -> i32 {
    tile.as_ref().map_or(-1, TileKind::flat_index)
}

/// Transform of a tile's content inside its cell, in uv units.
///
/// `translation` moves the image, `scale` grows it and `angle` rotates it
/// (radians, counter-clockwise). Rotation and scale pivot on uv (0,0) unless
/// the transform is [`recenter`](TileTransform::recenter)ed.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TileTransform {
    pub angle: f32,
    pub translation: Vec2,
    pub scale: Vec2,
}

impl Default for TileTransform {
    fn default() -> Self {
        Self {
            angle: 0.0,
            translation: Vec2::ZERO,
            scale: Vec2::ONE,
        }
    }
}

impl TileTransform {
    pub fn from_angle(angle: f32) -> Self {
        Self {
            angle,
            ..Self::default()
        }
    }

    /// Matrix mapping a cell's unit uv to a sheet uv.
    ///
    /// This is the inverse of placing the image: scale is reciprocal and the
    /// translation negated.
    pub fn uv_matrix3(&self) -> Mat3 {
        Mat3::from_scale_angle_translation(Vec2::ONE / self.scale, self.angle, -self.translation)
    }

    /// [`uv_matrix3`](Self::uv_matrix3) promoted to the 4×4 the GPU record
    /// holds; the translation lands in the z column, read with `z = 1`.
    #[inline]
    pub fn uv_matrix(&self) -> Mat4 {
        Mat4::from_mat3(self.uv_matrix3())
    }

    /// Adjusts `translation` so the cell centre maps to itself.
    pub fn recenter(&self) -> Self {
        let centre = Vec2::splat(0.5);
        let offset = self.uv_matrix3().transform_point2(centre);
        Self {
            translation: self.translation - (centre - offset),
            ..*self
        }
    }
}

impl From<TileTransform> for Mat3 {
    fn from(t: TileTransform) -> Self {
        t.uv_matrix3()
    }
}

impl From<TileTransform> for Mat4 {
    fn from(t: TileTransform) -> Self {
        t.uv_matrix()
    }
}
