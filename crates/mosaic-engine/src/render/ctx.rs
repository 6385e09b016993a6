use crate::render::{RenderConfig, ViewUniform};

/// Renderer-facing context (device/queue + surface format + view).
///
/// This is intentionally small and stable.
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub surface_format: wgpu::TextureFormat,
    pub view: ViewUniform,
    pub config: RenderConfig,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        view: ViewUniform,
    ) -> Self {
        Self {
            device,
            queue,
            surface_format,
            view,
            config: RenderConfig::default(),
        }
    }

    #[inline]
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }
}

/// Target for drawing (encoder + color view).
///
/// With MSAA, draws go to `msaa_view` and resolve into `color_view`.
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
    pub msaa_view: Option<&'a wgpu::TextureView>,
}

impl<'a> RenderTarget<'a> {
    #[inline]
    pub fn new(encoder: &'a mut wgpu::CommandEncoder, color_view: &'a wgpu::TextureView) -> Self {
        Self {
            encoder,
            color_view,
            msaa_view: None,
        }
    }

    #[inline]
    pub fn with_msaa(mut self, msaa_view: &'a wgpu::TextureView) -> Self {
        self.msaa_view = Some(msaa_view);
        self
    }

    /// `(view, resolve_target)` for a color attachment.
    #[inline]
    pub fn attachment(&self) -> (&'a wgpu::TextureView, Option<&'a wgpu::TextureView>) {
        match self.msaa_view {
            Some(msaa) => (msaa, Some(self.color_view)),
            None => (self.color_view, None),
        }
    }
}
