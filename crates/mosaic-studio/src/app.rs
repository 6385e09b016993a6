use glam::Vec2;
use mosaic_engine::camera::Camera2d;
use mosaic_engine::color::Color;
use mosaic_engine::core::{App, AppControl, FrameCtx};
use mosaic_engine::render::tiles::{ChunkRenderer, DebugIndexRenderer, SpriteRenderer};
use mosaic_engine::render::{DebugIndexMode, RenderConfig, SpriteMode};
use mosaic_engine::sheet::{GpuTileSheet, TileSheet};
use mosaic_engine::tiles::TileMap;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use crate::scene::{self, ChunkCache};

const CLEAR: Color = Color::new(0.06, 0.06, 0.08, 1.0);

/// What the chunk layer of the frame shows.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Tiles,
    DebugIndex,
}

impl ViewMode {
    fn toggled(self) -> Self {
        match self {
            ViewMode::Tiles => ViewMode::DebugIndex,
            ViewMode::DebugIndex => ViewMode::Tiles,
        }
    }
}

/// Command-line options.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Options {
    pub view: ViewMode,
    pub debug_mode: DebugIndexMode,
    pub sprite_mode: SpriteMode,
    pub samples: u32,
}

impl Options {
    /// Flags: `--debug-index`, `--sampled`, `--uv-debug`, `--msaa`.
    /// Unknown flags are logged and ignored.
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut opts = Options {
            samples: 1,
            ..Options::default()
        };
        for arg in args {
            match arg.as_ref() {
                "--debug-index" => opts.view = ViewMode::DebugIndex,
                "--sampled" => opts.debug_mode = DebugIndexMode::Sampled,
                "--uv-debug" => opts.sprite_mode = SpriteMode::UvDebug,
                "--msaa" => opts.samples = 4,
                other => log::warn!("ignoring unknown argument `{other}`"),
            }
        }
        opts
    }
}

/// The studio application: owns the scene and the three tile renderers.
pub struct Studio {
    options: Options,

    map: TileMap,
    cache: ChunkCache,
    sheet: TileSheet,
    gpu_sheet: Option<GpuTileSheet>,
    camera: Camera2d,

    chunks: ChunkRenderer,
    debug_index: DebugIndexRenderer,
    sprites: SpriteRenderer,
}

impl Studio {
    pub fn new(options: Options) -> anyhow::Result<Self> {
        Ok(Self {
            map: scene::build_map()?,
            cache: ChunkCache::default(),
            sheet: scene::build_sheet()?,
            gpu_sheet: None,
            camera: Camera2d::new(Vec2::ZERO, 1.5),
            chunks: ChunkRenderer::new(),
            debug_index: DebugIndexRenderer::new(options.debug_mode),
            sprites: SpriteRenderer::new(options.sprite_mode),
            options,
        })
    }

    fn on_key(&mut self, code: KeyCode) -> AppControl {
        match code {
            KeyCode::Escape => return AppControl::Exit,
            KeyCode::Tab => {
                self.options.view = self.options.view.toggled();
                log::info!("view: {:?}", self.options.view);
            }
            KeyCode::KeyS => {
                let mode = match self.debug_index.mode() {
                    DebugIndexMode::Presence => DebugIndexMode::Sampled,
                    DebugIndexMode::Sampled => DebugIndexMode::Presence,
                };
                self.debug_index.set_mode(mode);
                log::info!("debug index: {mode:?}");
            }
            KeyCode::KeyU => {
                let mode = match self.sprites.mode() {
                    SpriteMode::Textured => SpriteMode::UvDebug,
                    SpriteMode::UvDebug => SpriteMode::Textured,
                };
                self.sprites.set_mode(mode);
                log::info!("sprites: {mode:?}");
            }
            KeyCode::Equal => self.camera.set_zoom(self.camera.zoom() * 1.25),
            KeyCode::Minus => self.camera.set_zoom(self.camera.zoom() / 1.25),
            _ => {}
        }
        AppControl::Continue
    }
}

impl App for Studio {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && !event.repeat =>
            {
                match event.physical_key {
                    PhysicalKey::Code(code) => self.on_key(code),
                    PhysicalKey::Unidentified(_) => AppControl::Continue,
                }
            }
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        scene::spin(&mut self.map, ctx.time.elapsed * 1.5);
        self.cache.refresh(&mut self.map);

        if self.gpu_sheet.is_none() {
            match self.sheet.upload(ctx.gpu.device(), ctx.gpu.queue()) {
                Ok(sheet) => self.gpu_sheet = Some(sheet),
                Err(e) => {
                    log::error!("tile sheet upload failed: {e}");
                    return AppControl::Exit;
                }
            }
        }
        let Some(sheet) = self.gpu_sheet.as_ref() else {
            return AppControl::Continue;
        };

        let view = self.camera.view_uniform(ctx.window.physical_size());
        let config = RenderConfig {
            samples: self.options.samples,
            ..RenderConfig::default()
        };
        let map_transform = scene::map_transform();
        let sprites = scene::orbiting_sprites(ctx.time.elapsed);

        let mode = self.options.view;
        let cache = &self.cache;
        let (chunks, debug_index, sprite_renderer) =
            (&mut self.chunks, &mut self.debug_index, &mut self.sprites);

        ctx.render_with(config, CLEAR, view, |rctx, target| {
            match mode {
                ViewMode::Tiles => {
                    chunks.render(rctx, target, sheet, &cache.draws(map_transform));
                }
                ViewMode::DebugIndex => {
                    debug_index.render(rctx, target, sheet, &cache.debug_draws(map_transform));
                }
            }
            sprite_renderer.render(rctx, target, sheet, &sprites);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_is_default_view() {
        let o = Options::parse(Vec::<String>::new());
        assert_eq!(o.view, ViewMode::Tiles);
        assert_eq!(o.debug_mode, DebugIndexMode::Presence);
        assert_eq!(o.sprite_mode, SpriteMode::Textured);
        assert_eq!(o.samples, 1);
    }

    #[test]
    fn flags_select_modes() {
        let o = Options::parse(["--debug-index", "--sampled", "--uv-debug", "--msaa"]);
        assert_eq!(o.view, ViewMode::DebugIndex);
        assert_eq!(o.debug_mode, DebugIndexMode::Sampled);
        assert_eq!(o.sprite_mode, SpriteMode::UvDebug);
        assert_eq!(o.samples, 4);
    }

    #[test]
    fn unknown_flags_are_ignored() {
        let o = Options::parse(["--bogus"]);
        assert_eq!(o.view, ViewMode::Tiles);
    }

    #[test]
    fn view_toggle_round_trips() {
        assert_eq!(ViewMode::Tiles.toggled().toggled(), ViewMode::Tiles);
    }
}
