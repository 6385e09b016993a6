/// Outcome of [`Gpu::handle_surface_error`](super::Gpu::handle_surface_error).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Lost or outdated surface, configured again; the next frame can render.
    Reconfigured,
    /// Acquire timed out or failed transiently; drop this frame.
    SkipFrame,
    /// Out of memory; the runtime exits.
    Fatal,
}
