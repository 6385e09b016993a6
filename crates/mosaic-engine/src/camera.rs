//! 2D orthographic camera producing the per-view uniform.

use glam::{Mat4, Vec2};

use crate::render::ViewUniform;

/// World depth range kept inside the clip volume; tile layers use z = layer.
const DEPTH_RANGE: f32 = 1000.0;

/// Orthographic camera over a y-up world, one world unit per pixel at zoom 1.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera2d {
    position: Vec2,
    zoom: f32,
}

impl Default for Camera2d {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Camera2d {
    pub fn new(position: Vec2, zoom: f32) -> Self {
        let mut cam = Self { position, zoom: 1.0 };
        cam.set_zoom(zoom);
        cam
    }

    /// Centres the view on `position`.
    pub fn target(&mut self, position: Vec2) {
        self.position = position;
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Clamped to `[0.05, 32.0]`.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(0.05, 32.0);
    }

    #[inline]
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Visible world rectangle as `(min, max)`.
    pub fn visible_rect(&self, screen_size: Vec2) -> (Vec2, Vec2) {
        let half = screen_size / 2.0 / self.zoom;
        (self.position - half, self.position + half)
    }

    pub fn view_proj(&self, screen_size: Vec2) -> Mat4 {
        let (min, max) = self.visible_rect(screen_size.max(Vec2::ONE));
        Mat4::orthographic_rh(min.x, max.x, min.y, max.y, -DEPTH_RANGE, DEPTH_RANGE)
    }

    pub fn view_uniform(&self, screen_size: Vec2) -> ViewUniform {
        ViewUniform::new(self.view_proj(screen_size), self.position.extend(0.0))
    }

    /// Screen pixel (top-left origin, y down) to world point.
    pub fn screen_to_world(&self, screen: Vec2, screen_size: Vec2) -> Vec2 {
        let centred = screen - screen_size / 2.0;
        Vec2::new(centred.x, -centred.y) / self.zoom + self.position
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec3, Vec4};

    use super::*;

    fn close(a: Vec4, b: Vec4) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn target_maps_to_clip_centre() {
        let mut cam = Camera2d::default();
        cam.target(Vec2::new(100.0, 50.0));
        let clip = cam.view_proj(Vec2::new(800.0, 600.0)) * Vec4::new(100.0, 50.0, 0.0, 1.0);
        assert!(close(clip, Vec4::new(0.0, 0.0, 0.5, 1.0)));
    }

    #[test]
    fn world_y_up_is_clip_y_up() {
        let cam = Camera2d::default();
        let clip = cam.view_proj(Vec2::new(800.0, 600.0)) * Vec4::new(400.0, 300.0, 0.0, 1.0);
        assert!(close(clip, Vec4::new(1.0, 1.0, 0.5, 1.0)));
    }

    #[test]
    fn zoom_shrinks_visible_rect() {
        let cam = Camera2d::new(Vec2::ZERO, 2.0);
        let (min, max) = cam.visible_rect(Vec2::new(800.0, 600.0));
        assert_eq!(min, Vec2::new(-200.0, -150.0));
        assert_eq!(max, Vec2::new(200.0, 150.0));
    }

    #[test]
    fn layers_stay_inside_depth_range() {
        let cam = Camera2d::default();
        let vp = cam.view_proj(Vec2::splat(100.0));
        for layer in [0.0, 1.0, 16.0] {
            let z = (vp * Vec3::new(0.0, 0.0, layer).extend(1.0)).z;
            assert!((0.0..=1.0).contains(&z));
        }
    }

    #[test]
    fn screen_to_world_flips_y() {
        let cam = Camera2d::default();
        let w = cam.screen_to_world(Vec2::new(0.0, 0.0), Vec2::new(800.0, 600.0));
        assert_eq!(w, Vec2::new(-400.0, 300.0));
    }

    #[test]
    fn view_uniform_carries_position() {
        let cam = Camera2d::new(Vec2::new(3.0, 4.0), 1.0);
        let u = cam.view_uniform(Vec2::splat(10.0));
        assert_eq!(u.world_position, [3.0, 4.0, 0.0]);
    }
}
