use glam::{Vec2, Vec4};

use crate::color::Color;
use crate::render::{DebugIndexMode, SpriteMode, TileRecord};

use super::TextureSource;

/// UVs in `[UV_MIN, UV_MAX]` are kept; the margin hides seams from float error.
pub const UV_MIN: f32 = -0.01;
pub const UV_MAX: f32 = 1.01;

/// Outcome of one fragment invocation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Fragment {
    Color([f32; 4]),
    Discard,
}

impl Fragment {
    #[inline]
    pub fn is_discard(&self) -> bool {
        matches!(self, Fragment::Discard)
    }

    #[inline]
    pub fn color(&self) -> Option<[f32; 4]> {
        match self {
            Fragment::Color(c) => Some(*c),
            Fragment::Discard => None,
        }
    }
}

/// Same predicate as the fragment stage: a tile is clipped only when a
/// component compares outside the bounds, so NaN uvs are kept.
#[inline]
pub fn uv_in_bounds(uv: Vec2) -> bool {
    !(uv.x < UV_MIN || uv.y < UV_MIN || uv.x > UV_MAX || uv.y > UV_MAX)
}

/// Applies a tile's uv transform to the unit corner uv (`z = 1`, `w = 1`).
#[inline]
pub fn transform_uv(unit_uv: Vec2, tile: &TileRecord) -> Vec2 {
    let uv = tile.uv_transform() * Vec4::new(unit_uv.x, unit_uv.y, 1.0, 1.0);
    Vec2::new(uv.x, uv.y)
}

/// CPU mirror of the chunk fragment stage.
pub fn resolve_chunk_fragment(
    unit_uv: Vec2,
    tile: &TileRecord,
    texture: &impl TextureSource,
) -> Fragment {
    let uv = transform_uv(unit_uv, tile);

    if tile.atlas_layer == TileRecord::ABSENT_LAYER || !uv_in_bounds(uv) {
        return Fragment::Discard;
    }

    let mask = tile.mask_color();
    if tile.atlas_layer == TileRecord::SOLID_LAYER {
        return Fragment::Color(mask.to_array());
    }
    // Any other negative layer is a host bug; the shader would sample it anyway.
    let texel = Color::from_array(texture.sample(uv, tile.atlas_layer));
    Fragment::Color(texel.tint(mask).to_array())
}

/// CPU mirror of the sprite fragment stage.
pub fn resolve_sprite_fragment(
    uv: Vec2,
    layer: i32,
    texture: &impl TextureSource,
    mode: SpriteMode,
) -> Fragment {
    match mode {
        SpriteMode::Textured => Fragment::Color(texture.sample(uv, layer)),
        SpriteMode::UvDebug => Fragment::Color([uv.x, uv.y, 0.0, 1.0]),
    }
}

/// CPU mirror of the debug-index fragment stage.
pub fn resolve_debug_fragment(
    value: i32,
    unit_uv: Vec2,
    texture: &impl TextureSource,
    mode: DebugIndexMode,
) -> Fragment {
    if value < 0 {
        return Fragment::Discard;
    }
    match mode {
        DebugIndexMode::Presence => Fragment::Color(Color::WHITE.to_array()),
        DebugIndexMode::Sampled => Fragment::Color(texture.sample(unit_uv, value)),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use glam::{Mat3, Mat4, Vec2, Vec3};

    use super::*;

    /// Returns a layer-dependent texel and counts calls.
    struct CountingTexture {
        calls: Cell<u32>,
    }

    impl CountingTexture {
        fn new() -> Self {
            Self { calls: Cell::new(0) }
        }
    }

    impl TextureSource for CountingTexture {
        fn sample(&self, uv: Vec2, layer: i32) -> [f32; 4] {
            self.calls.set(self.calls.get() + 1);
            [uv.x, uv.y, layer as f32 / 10.0, 1.0]
        }
    }

    fn uv_shift(dx: f32, dy: f32) -> Mat4 {
        Mat4::from_translation(Vec3::new(dx, dy, 0.0))
    }

    // ── sentinels ─────────────────────────────────────────────────────────

    #[test]
    fn absent_always_discards() {
        let tex = CountingTexture::new();
        let tile = TileRecord::absent();
        for uv in [Vec2::ZERO, Vec2::ONE, Vec2::new(0.5, 0.5)] {
            assert!(resolve_chunk_fragment(uv, &tile, &tex).is_discard());
        }
        assert_eq!(tex.calls.get(), 0);
    }

    #[test]
    fn solid_returns_mask_without_sampling() {
        let tex = CountingTexture::new();
        let mask = Color::new(0.1, 0.2, 0.3, 0.4);
        let tile = TileRecord::solid(mask);
        let frag = resolve_chunk_fragment(Vec2::new(1.0, 0.0), &tile, &tex);
        assert_eq!(frag, Fragment::Color(mask.to_array()));
        assert_eq!(tex.calls.get(), 0);
    }

    // ── sampling ──────────────────────────────────────────────────────────

    #[test]
    fn white_mask_yields_raw_sample() {
        let tex = CountingTexture::new();
        let tile = TileRecord::sprite(5, Mat4::IDENTITY, Color::WHITE);
        let uv = Vec2::new(0.25, 0.75);
        let frag = resolve_chunk_fragment(uv, &tile, &tex);
        assert_eq!(frag, Fragment::Color(tex.sample(uv, 5)));
    }

    #[test]
    fn mask_multiplies_sample() {
        let tex = CountingTexture::new();
        let mask = Color::new(0.5, 0.5, 1.0, 0.5);
        let tile = TileRecord::sprite(0, Mat4::IDENTITY, mask);
        let frag = resolve_chunk_fragment(Vec2::ONE, &tile, &tex);
        assert_eq!(frag, Fragment::Color([0.5, 0.5, 0.0, 0.5]));
    }

    #[test]
    fn uv_transform_is_applied_before_sampling() {
        let tex = CountingTexture::new();
        let tile = TileRecord::sprite(1, uv_shift(0.5, 0.0), Color::WHITE);
        let frag = resolve_chunk_fragment(Vec2::new(0.25, 0.0), &tile, &tex);
        assert_eq!(frag.color().map(|c| c[0]), Some(0.75));
    }

    #[test]
    fn affine_uv_matrix_from_mat3_keeps_translation() {
        // z = 1 picks up the translation column of a Mat3 promoted to Mat4.
        let m = Mat4::from_mat3(Mat3::from_translation(Vec2::new(0.25, 0.0)));
        let tile = TileRecord::sprite(0, m, Color::WHITE);
        assert_eq!(transform_uv(Vec2::ZERO, &tile), Vec2::new(0.25, 0.0));
    }

    // ── uv bounds ─────────────────────────────────────────────────────────

    #[test]
    fn uv_at_unit_edges_is_kept() {
        let tex = CountingTexture::new();
        let tile = TileRecord::sprite(0, Mat4::IDENTITY, Color::WHITE);
        for uv in [Vec2::ZERO, Vec2::ONE, Vec2::new(0.0, 1.0), Vec2::new(1.0, 0.0)] {
            assert!(!resolve_chunk_fragment(uv, &tile, &tex).is_discard());
        }
    }

    #[test]
    fn nan_uv_is_not_clipped() {
        // Comparisons with NaN are false, so the fragment stage keeps it.
        assert!(uv_in_bounds(Vec2::NAN));
        assert!(uv_in_bounds(Vec2::new(f32::NAN, 0.5)));
        assert!(!uv_in_bounds(Vec2::new(f32::NAN, 1.5)));
    }

    #[test]
    fn zero_scale_transform_still_samples() {
        let tex = CountingTexture::new();
        let transform = crate::tiles::TileTransform {
            scale: Vec2::new(0.0, 1.0),
            ..Default::default()
        };
        let tile = TileRecord::sprite(0, transform.uv_matrix(), Color::WHITE);
        let uv = transform_uv(Vec2::ZERO, &tile);
        assert!(uv.x.is_nan() && uv.y.is_nan());
        assert!(!resolve_chunk_fragment(Vec2::ZERO, &tile, &tex).is_discard());
        assert_eq!(tex.calls.get(), 1);
    }

    #[test]
    fn uv_outside_margin_is_discarded() {
        let tex = CountingTexture::new();
        for (dx, dy) in [(0.02, 0.0), (-0.02, 0.0), (0.0, 0.02), (0.0, -0.02)] {
            let tile = TileRecord::sprite(0, uv_shift(dx, dy), Color::WHITE);
            let unit = Vec2::new(if dx > 0.0 { 1.0 } else { 0.0 }, if dy > 0.0 { 1.0 } else { 0.0 });
            assert!(resolve_chunk_fragment(unit, &tile, &tex).is_discard(), "{dx},{dy}");
        }
        assert_eq!(tex.calls.get(), 0);
    }

    #[test]
    fn solid_tiles_are_clipped_too() {
        let tex = CountingTexture::new();
        let tile = TileRecord {
            uv_transform: uv_shift(2.0, 0.0).to_cols_array_2d(),
            ..TileRecord::solid(Color::BLACK)
        };
        assert!(resolve_chunk_fragment(Vec2::ZERO, &tile, &tex).is_discard());
    }

    // ── sprite ────────────────────────────────────────────────────────────

    #[test]
    fn sprite_samples_its_layer() {
        let tex = CountingTexture::new();
        let frag = resolve_sprite_fragment(Vec2::new(0.5, 0.5), 3, &tex, SpriteMode::Textured);
        assert_eq!(frag, Fragment::Color([0.5, 0.5, 0.3, 1.0]));
    }

    #[test]
    fn sprite_uv_debug_outputs_uv() {
        let tex = CountingTexture::new();
        let frag = resolve_sprite_fragment(Vec2::new(0.2, 0.8), 3, &tex, SpriteMode::UvDebug);
        assert_eq!(frag, Fragment::Color([0.2, 0.8, 0.0, 1.0]));
        assert_eq!(tex.calls.get(), 0);
    }

    // ── debug index ───────────────────────────────────────────────────────

    #[test]
    fn debug_negative_discards() {
        let tex = CountingTexture::new();
        for mode in [DebugIndexMode::Presence, DebugIndexMode::Sampled] {
            assert!(resolve_debug_fragment(-1, Vec2::ZERO, &tex, mode).is_discard());
        }
        assert_eq!(tex.calls.get(), 0);
    }

    #[test]
    fn debug_present_is_opaque_white() {
        let tex = CountingTexture::new();
        for value in [0, 1, 42] {
            let frag = resolve_debug_fragment(value, Vec2::ZERO, &tex, DebugIndexMode::Presence);
            assert_eq!(frag, Fragment::Color([1.0, 1.0, 1.0, 1.0]));
        }
    }

    #[test]
    fn debug_sampled_uses_value_as_layer() {
        let tex = CountingTexture::new();
        let frag = resolve_debug_fragment(2, Vec2::ONE, &tex, DebugIndexMode::Sampled);
        assert_eq!(frag, Fragment::Color([1.0, 1.0, 0.2, 1.0]));
    }
}
