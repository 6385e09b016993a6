use winit::dpi::PhysicalSize;

/// Multisampled color texture matching the surface, recreated on change.
#[derive(Default)]
pub(crate) struct MsaaTarget {
    key: Option<(u32, wgpu::TextureFormat, PhysicalSize<u32>)>,
    view: Option<wgpu::TextureView>,
}

impl MsaaTarget {
    /// Makes sure a `samples`-sample target exists; `samples <= 1` drops it.
    pub(crate) fn ensure(
        &mut self,
        device: &wgpu::Device,
        samples: u32,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
    ) {
        if samples <= 1 || size.width == 0 || size.height == 0 {
            self.key = None;
            self.view = None;
            return;
        }

        let key = (samples, format, size);
        if self.key == Some(key) && self.view.is_some() {
            return;
        }

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("mosaic msaa color"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: samples,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        log::debug!("msaa target: {samples}x at {}x{}", size.width, size.height);

        self.view = Some(texture.create_view(&wgpu::TextureViewDescriptor::default()));
        self.key = Some(key);
    }

    pub(crate) fn view(&self) -> Option<&wgpu::TextureView> {
        self.view.as_ref()
    }
}
