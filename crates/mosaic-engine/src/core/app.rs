use winit::event::WindowEvent;
use winit::window::WindowId;

use super::ctx::FrameCtx;

/// What the runtime does after an app callback returns.
///
/// `Exit` ends the event loop after the callback returns. From `on_frame`
/// the frame has already been submitted by then.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Implemented by whatever owns the tile renderers and the scene they draw.
pub trait App {
    /// Sees every window event before the runtime handles resize and close.
    fn on_window_event(&mut self, _window_id: WindowId, _event: &WindowEvent) -> AppControl {
        AppControl::Continue
    }

    /// Once per redraw: update the scene, then draw through
    /// [`FrameCtx::render`] or [`FrameCtx::render_with`], which presents.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;
}
