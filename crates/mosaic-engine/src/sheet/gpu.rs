use std::sync::atomic::{AtomicU64, Ordering};

use glam::UVec2;

use super::{SheetError, TileSheet};

static NEXT_SHEET_ID: AtomicU64 = AtomicU64::new(1);

/// A tile sheet resident on the GPU: `D2Array` texture, view and sampler.
///
/// Renderers cache bind groups per sheet keyed on [`GpuTileSheet::id`].
pub struct GpuTileSheet {
    id: u64,
    tile_size: UVec2,
    layer_count: u32,
    // Kept alive for the view.
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl GpuTileSheet {
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn tile_size(&self) -> UVec2 {
        self.tile_size
    }

    #[inline]
    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[inline]
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}

impl TileSheet {
    /// Creates the texture array and uploads every layer.
    pub fn upload(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<GpuTileSheet, SheetError> {
        let limits = device.limits();
        check_layer_limit(self.layer_count(), limits.max_texture_array_layers)?;

        let size = self.tile_size();
        let extent = wgpu::Extent3d {
            width: size.x,
            height: size.y,
            depth_or_array_layers: self.layer_count(),
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("mosaic tile sheet"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            self.texels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size.x * 4),
                rows_per_image: Some(size.y),
            },
            extent,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("mosaic tile sheet view"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("mosaic tile sheet sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let id = NEXT_SHEET_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "uploaded tile sheet #{id}: {} layers of {}x{}",
            self.layer_count(),
            size.x,
            size.y
        );

        Ok(GpuTileSheet {
            id,
            tile_size: size,
            layer_count: self.layer_count(),
            _texture: texture,
            view,
            sampler,
        })
    }
}

fn check_layer_limit(layers: u32, max: u32) -> Result<(), SheetError> {
    if layers > max {
        log::warn!("tile sheet has {layers} layers; device limit is {max}");
        return Err(SheetError::TooManyLayers { layers, max });
    }
    Ok(())
}
