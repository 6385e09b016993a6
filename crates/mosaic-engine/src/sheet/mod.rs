//! Tile sheets: RGBA8 images sliced into the layers of a texture array.
//!
//! Layers are numbered row-major from the top-left tile of the first image,
//! continuing through later images. Each layer is stored flipped vertically
//! so that uv (0,0) is the tile's bottom-left corner in y-up world space.

mod gpu;

use std::fmt;

use glam::{UVec2, Vec2};

use crate::color::srgb_to_linear;
use crate::shading::TextureSource;

pub use gpu::GpuTileSheet;

const BYTES_PER_TEXEL: usize = 4;

// ── errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetError {
    /// No images were supplied, or they contained no whole tiles.
    Empty,
    ZeroTileSize,
    /// Image dimensions are not a multiple of the tile size.
    NotTileMultiple {
        image: usize,
        size: UVec2,
        tile_size: UVec2,
    },
    /// `rgba` length does not equal `width * height * 4`.
    ByteLength {
        image: usize,
        expected: usize,
        actual: usize,
    },
    /// More layers than the device allows in one texture array.
    TooManyLayers { layers: u32, max: u32 },
}

impl fmt::Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetError::Empty => write!(f, "tile sheet has no tiles"),
            SheetError::ZeroTileSize => write!(f, "tile size must be non-zero"),
            SheetError::NotTileMultiple { image, size, tile_size } => write!(
                f,
                "sheet image {image} is {}x{}, not a multiple of the {}x{} tile size",
                size.x, size.y, tile_size.x, tile_size.y
            ),
            SheetError::ByteLength { image, expected, actual } => write!(
                f,
                "sheet image {image} has {actual} bytes, expected {expected}"
            ),
            SheetError::TooManyLayers { layers, max } => write!(
                f,
                "tile sheet has {layers} layers, device allows at most {max}"
            ),
        }
    }
}

impl std::error::Error for SheetError {}

// ── input image ───────────────────────────────────────────────────────────

/// Borrowed RGBA8 (sRGB) image, rows top to bottom.
#[derive(Debug, Copy, Clone)]
pub struct SheetImage<'a> {
    pub width: u32,
    pub height: u32,
    pub rgba: &'a [u8],
}

impl<'a> SheetImage<'a> {
    pub fn new(width: u32, height: u32, rgba: &'a [u8]) -> Self {
        Self { width, height, rgba }
    }
}

// ── sheet ─────────────────────────────────────────────────────────────────

/// CPU copy of a texture array, one tile per layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSheet {
    tile_size: UVec2,
    layer_count: u32,
    /// `layer_count` layers of `tile_size` RGBA8 texels, bottom row first.
    texels: Vec<u8>,
}

impl TileSheet {
    /// Slices `images` into `tile_size` layers.
    pub fn from_rgba(images: &[SheetImage<'_>], tile_size: UVec2) -> Result<Self, SheetError> {
        if tile_size.x == 0 || tile_size.y == 0 {
            return Err(SheetError::ZeroTileSize);
        }

        for (i, img) in images.iter().enumerate() {
            let expected = img.width as usize * img.height as usize * BYTES_PER_TEXEL;
            if img.rgba.len() != expected {
                return Err(SheetError::ByteLength {
                    image: i,
                    expected,
                    actual: img.rgba.len(),
                });
            }
            if img.width % tile_size.x != 0 || img.height % tile_size.y != 0 {
                return Err(SheetError::NotTileMultiple {
                    image: i,
                    size: UVec2::new(img.width, img.height),
                    tile_size,
                });
            }
        }

        let tw = tile_size.x as usize;
        let th = tile_size.y as usize;
        let row_bytes = tw * BYTES_PER_TEXEL;

        let mut texels = Vec::new();
        let mut layer_count = 0u32;

        for img in images {
            let width = img.width as usize;
            let cols = img.width / tile_size.x;
            let rows = img.height / tile_size.y;

            for row in 0..rows as usize {
                for col in 0..cols as usize {
                    for y in 0..th {
                        let src_y = row * th + (th - 1 - y);
                        let start = (src_y * width + col * tw) * BYTES_PER_TEXEL;
                        texels.extend_from_slice(&img.rgba[start..start + row_bytes]);
                    }
                    layer_count += 1;
                }
            }
        }

        if layer_count == 0 {
            return Err(SheetError::Empty);
        }

        log::debug!(
            "tile sheet: {} layers of {}x{} from {} image(s)",
            layer_count,
            tile_size.x,
            tile_size.y,
            images.len()
        );

        Ok(Self {
            tile_size,
            layer_count,
            texels,
        })
    }

    /// A single 1×1 opaque white layer.
    pub fn solid() -> Self {
        Self {
            tile_size: UVec2::ONE,
            layer_count: 1,
            texels: vec![255; BYTES_PER_TEXEL],
        }
    }

    #[inline]
    pub fn tile_size(&self) -> UVec2 {
        self.tile_size
    }

    #[inline]
    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }

    /// All layers back to back, in upload order.
    #[inline]
    pub fn texels(&self) -> &[u8] {
        &self.texels
    }

    fn layer_bytes(&self) -> usize {
        self.tile_size.x as usize * self.tile_size.y as usize * BYTES_PER_TEXEL
    }

    pub fn layer(&self, layer: u32) -> Option<&[u8]> {
        if layer >= self.layer_count {
            return None;
        }
        let n = self.layer_bytes();
        let start = layer as usize * n;
        self.texels.get(start..start + n)
    }

    /// Raw texel at `(x, y)` of `layer`; `y = 0` is the bottom row.
    pub fn texel(&self, layer: u32, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.tile_size.x || y >= self.tile_size.y {
            return None;
        }
        let data = self.layer(layer)?;
        let i = (y as usize * self.tile_size.x as usize + x as usize) * BYTES_PER_TEXEL;
        let t = data.get(i..i + BYTES_PER_TEXEL)?;
        Some([t[0], t[1], t[2], t[3]])
    }
}

/// Nearest, clamp-to-edge sampling with sRGB decode, like the GPU sampler on
/// an `Rgba8UnormSrgb` array. Out-of-range layers clamp as WGSL array
/// indices do.
impl TextureSource for TileSheet {
    fn sample(&self, uv: Vec2, layer: i32) -> [f32; 4] {
        let layer = layer.clamp(0, self.layer_count as i32 - 1) as u32;
        let size = self.tile_size.as_vec2();
        let x = (uv.x * size.x).floor().clamp(0.0, size.x - 1.0) as u32;
        let y = (uv.y * size.y).floor().clamp(0.0, size.y - 1.0) as u32;

        let Some([r, g, b, a]) = self.texel(layer, x, y) else {
            return [0.0; 4];
        };
        [
            srgb_to_linear(r as f32 / 255.0),
            srgb_to_linear(g as f32 / 255.0),
            srgb_to_linear(b as f32 / 255.0),
            a as f32 / 255.0,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2×2-tile image of 2×2 px tiles; every texel of tile `t` is `[t, y, 0, 255]`
    /// where `y` is the image row.
    fn quad_image() -> Vec<u8> {
        let mut data = Vec::new();
        for y in 0..4u8 {
            for x in 0..4u8 {
                let tile = (y / 2) * 2 + x / 2;
                data.extend_from_slice(&[tile, y, 0, 255]);
            }
        }
        data
    }

    // ── slicing ───────────────────────────────────────────────────────────

    #[test]
    fn layers_are_row_major_from_top_left() {
        let data = quad_image();
        let sheet = TileSheet::from_rgba(&[SheetImage::new(4, 4, &data)], UVec2::new(2, 2)).unwrap();
        assert_eq!(sheet.layer_count(), 4);
        for layer in 0..4 {
            assert_eq!(sheet.texel(layer, 0, 0).unwrap()[0], layer as u8);
        }
    }

    #[test]
    fn layers_are_flipped_vertically() {
        let data = quad_image();
        let sheet = TileSheet::from_rgba(&[SheetImage::new(4, 4, &data)], UVec2::new(2, 2)).unwrap();
        // Layer 0 covers image rows 0..2; its bottom row (y = 0) is image row 1.
        assert_eq!(sheet.texel(0, 0, 0).unwrap()[1], 1);
        assert_eq!(sheet.texel(0, 0, 1).unwrap()[1], 0);
        // Layer 2 covers image rows 2..4.
        assert_eq!(sheet.texel(2, 1, 0).unwrap()[1], 3);
    }

    #[test]
    fn layers_continue_across_images() {
        let a = quad_image();
        let b = vec![9u8; 2 * 2 * 4];
        let sheet = TileSheet::from_rgba(
            &[SheetImage::new(4, 4, &a), SheetImage::new(2, 2, &b)],
            UVec2::new(2, 2),
        )
        .unwrap();
        assert_eq!(sheet.layer_count(), 5);
        assert_eq!(sheet.texel(4, 1, 1), Some([9, 9, 9, 9]));
    }

    // ── errors ────────────────────────────────────────────────────────────

    #[test]
    fn rejects_bad_input() {
        let data = quad_image();
        let img = SheetImage::new(4, 4, &data);
        assert_eq!(TileSheet::from_rgba(&[img], UVec2::ZERO), Err(SheetError::ZeroTileSize));
        assert_eq!(TileSheet::from_rgba(&[], UVec2::ONE), Err(SheetError::Empty));
        assert!(matches!(
            TileSheet::from_rgba(&[img], UVec2::new(3, 3)),
            Err(SheetError::NotTileMultiple { image: 0, .. })
        ));
        assert!(matches!(
            TileSheet::from_rgba(&[SheetImage::new(4, 4, &data[..8])], UVec2::ONE),
            Err(SheetError::ByteLength { expected: 64, actual: 8, .. })
        ));
    }

    #[test]
    fn error_messages_name_the_image() {
        let e = SheetError::ByteLength { image: 2, expected: 64, actual: 8 };
        assert_eq!(e.to_string(), "sheet image 2 has 8 bytes, expected 64");
    }

    // ── sampling ──────────────────────────────────────────────────────────

    #[test]
    fn solid_samples_opaque_white() {
        let sheet = TileSheet::solid();
        assert_eq!(sheet.sample(Vec2::new(0.3, 0.9), 0), [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn sampling_is_nearest_and_clamped() {
        let data = quad_image();
        let sheet = TileSheet::from_rgba(&[SheetImage::new(4, 4, &data)], UVec2::new(2, 2)).unwrap();
        // v just below 0.5 → bottom row; v = 1.0 clamps to the top row.
        let bottom = sheet.sample(Vec2::new(0.0, 0.49), 2);
        let top = sheet.sample(Vec2::new(0.0, 1.0), 2);
        let below = sheet.sample(Vec2::new(-0.5, -0.5), 2);
        assert_eq!(bottom, below);
        assert!(top[1] < bottom[1]);
    }

    #[test]
    fn out_of_range_layer_clamps() {
        let data = quad_image();
        let sheet = TileSheet::from_rgba(&[SheetImage::new(4, 4, &data)], UVec2::new(2, 2)).unwrap();
        assert_eq!(sheet.sample(Vec2::ZERO, 99), sheet.sample(Vec2::ZERO, 3));
        assert_eq!(sheet.sample(Vec2::ZERO, -5), sheet.sample(Vec2::ZERO, 0));
    }
}
