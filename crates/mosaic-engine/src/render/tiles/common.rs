//! Shared pipeline state and bind group layouts for the tile renderers.

use std::num::NonZeroU64;

use wgpu::util::DeviceExt;

use crate::render::{RenderCtx, ViewUniform};
use crate::sheet::GpuTileSheet;
use crate::shading;

// ── shader sources ────────────────────────────────────────────────────────

pub(super) const CHUNK_WGSL: &str = concat!(
    include_str!("shaders/common.wgsl"),
    include_str!("shaders/expand.wgsl"),
    include_str!("shaders/chunk.wgsl"),
);

pub(super) const SPRITE_WGSL: &str = concat!(
    include_str!("shaders/common.wgsl"),
    include_str!("shaders/sprite.wgsl"),
);

pub(super) const DEBUG_INDEX_WGSL: &str = concat!(
    include_str!("shaders/common.wgsl"),
    include_str!("shaders/expand.wgsl"),
    include_str!("shaders/debug_index.wgsl"),
);

// ── configuration ─────────────────────────────────────────────────────────

/// How fragment output is composited over the target.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Straight alpha; what tile masks and sheet texels carry.
    #[default]
    Alpha,
    /// Colors already multiplied by alpha.
    Premultiplied,
    Replace,
}

/// Fragment entry point of the debug-index program.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum DebugIndexMode {
    /// Opaque white where the flat value is non-negative.
    #[default]
    Presence,
    /// Sample the sheet using the flat value as the layer.
    Sampled,
}

impl DebugIndexMode {
    pub(super) fn entry_point(self) -> &'static str {
        match self {
            DebugIndexMode::Presence => "fs_main",
            DebugIndexMode::Sampled => "fs_sampled",
        }
    }
}

/// Fragment entry point of the sprite program.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum SpriteMode {
    #[default]
    Textured,
    /// Output the interpolated UV as red/green.
    UvDebug,
}

impl SpriteMode {
    pub(super) fn entry_point(self) -> &'static str {
        match self {
            SpriteMode::Textured => "fs_main",
            SpriteMode::UvDebug => "fs_uv_debug",
        }
    }
}

/// Pipeline-affecting render settings shared by all tile renderers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RenderConfig {
    /// MSAA sample count of the color attachment (1 = off).
    pub samples: u32,
    pub blend: BlendMode,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            samples: 1,
            blend: BlendMode::Alpha,
        }
    }
}

/// Everything a cached pipeline depends on besides its shader.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(super) struct PipelineKey {
    pub format: wgpu::TextureFormat,
    pub samples: u32,
    pub blend: BlendMode,
}

impl PipelineKey {
    pub(super) fn from_ctx(ctx: &RenderCtx<'_>) -> Self {
        Self {
            format: ctx.surface_format,
            samples: ctx.config.samples.max(1),
            blend: ctx.config.blend,
        }
    }
}

// ── blend ─────────────────────────────────────────────────────────────────

pub(super) fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    match mode {
        BlendMode::Alpha => wgpu::BlendState::ALPHA_BLENDING,
        BlendMode::Premultiplied => wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
        BlendMode::Replace => wgpu::BlendState::REPLACE,
    }
}

// ── pipeline ──────────────────────────────────────────────────────────────

/// Builds a tile render pipeline; only shader, buffers and entry point differ.
pub(super) fn create_pipeline(
    ctx: &RenderCtx<'_>,
    key: PipelineKey,
    label: &str,
    shader: &wgpu::ShaderModule,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    buffers: &[wgpu::VertexBufferLayout<'_>],
    fs_entry: &str,
) -> wgpu::RenderPipeline {
    let pipeline_layout = ctx
        .device
        .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts,
            immediate_size: 0,
        });

    ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),

        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers,
        },

        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fs_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: key.format,
                blend: Some(blend_state(key.blend)),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: key.samples,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },

        multiview_mask: None,
        cache: None,
    })
}

// ── bind group layouts ────────────────────────────────────────────────────

/// Minimum binding size of the view uniform.
///
/// `ViewUniform` is 80 bytes, so the conversion never fails.
pub(super) fn view_ubo_min_binding_size() -> NonZeroU64 {
    NonZeroU64::new(std::mem::size_of::<ViewUniform>() as u64)
        .unwrap_or(NonZeroU64::MIN)
}

/// Group 0: the view uniform.
pub(super) fn view_bgl(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: Some(view_ubo_min_binding_size()),
            },
            count: None,
        }],
    })
}

/// A single read-only storage buffer at binding 0.
///
/// Visible to both stages: the chunk program reads it per fragment, the
/// debug-index program per vertex.
pub(super) fn storage_bgl(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

/// Texture array at binding 0, sampler at binding 1.
pub(super) fn sheet_bgl(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2Array,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

// ── view uniform ──────────────────────────────────────────────────────────

/// View UBO and its group 0 bind group.
pub(super) struct ViewBinding {
    ubo: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl ViewBinding {
    pub(super) fn new(device: &wgpu::Device, bgl: &wgpu::BindGroupLayout, label: &str) -> Self {
        let ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<ViewUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            }],
        });

        Self { ubo, bind_group }
    }

    pub(super) fn write(&self, ctx: &RenderCtx<'_>) {
        ctx.queue.write_buffer(&self.ubo, 0, bytemuck::bytes_of(&ctx.view));
    }

    pub(super) fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

// ── tile sheet binding ────────────────────────────────────────────────────

/// Bind group over a [`GpuTileSheet`], rebuilt when a different sheet is passed.
#[derive(Default)]
pub(super) struct SheetBinding {
    sheet_id: Option<u64>,
    bind_group: Option<wgpu::BindGroup>,
}

impl SheetBinding {
    pub(super) fn ensure(
        &mut self,
        device: &wgpu::Device,
        bgl: &wgpu::BindGroupLayout,
        sheet: &GpuTileSheet,
        label: &str,
    ) {
        if self.sheet_id == Some(sheet.id()) && self.bind_group.is_some() {
            return;
        }

        self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(sheet.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sheet.sampler()),
                },
            ],
        }));
        self.sheet_id = Some(sheet.id());
    }

    pub(super) fn invalidate(&mut self) {
        self.sheet_id = None;
        self.bind_group = None;
    }

    pub(super) fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }
}

// ── per-draw storage ──────────────────────────────────────────────────────

/// A read-only storage buffer and its bind group, reused across frames.
///
/// One slot per draw in a frame: `queue.write_buffer` lands before the pass
/// executes, so draws cannot share a buffer.
pub(super) struct StorageSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: u64,
}

impl StorageSlot {
    pub(super) fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

/// Writes `contents` into `slots[index]`, creating or growing the slot first.
///
/// `contents` must be non-empty.
pub(super) fn write_storage_slot(
    ctx: &RenderCtx<'_>,
    slots: &mut Vec<StorageSlot>,
    index: usize,
    bgl: &wgpu::BindGroupLayout,
    label: &str,
    contents: &[u8],
) {
    let required = contents.len() as u64;
    let fits = slots.get(index).is_some_and(|s| s.capacity >= required);

    if !fits {
        let capacity = required.next_power_of_two().max(256);
        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: capacity,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        let slot = StorageSlot {
            buffer,
            bind_group,
            capacity,
        };
        if index < slots.len() {
            slots[index] = slot;
        } else {
            slots.push(slot);
        }
    }

    if let Some(slot) = slots.get(index) {
        ctx.queue.write_buffer(&slot.buffer, 0, contents);
    }
}

// ── shared index buffer ───────────────────────────────────────────────────

/// `u32` index buffer holding the per-tile corner pattern for `capacity` tiles.
///
/// A chunk of `n` tiles draws indices `0..n * 6`, so one buffer serves every
/// chunk size up to the capacity.
#[derive(Default)]
pub(super) struct TileIndexBuffer {
    buffer: Option<wgpu::Buffer>,
    capacity: u32,
}

impl TileIndexBuffer {
    pub(super) fn ensure(&mut self, device: &wgpu::Device, tiles: u32, label: &str) {
        if tiles <= self.capacity && self.buffer.is_some() {
            return;
        }

        let capacity = tiles.next_power_of_two().max(64);
        let indices = shading::tile_indices(capacity);
        self.buffer = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        }));
        self.capacity = capacity;
        log::debug!("{label}: grown to {capacity} tiles");
    }

    pub(super) fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }
}

/// Number of indices drawn for `tiles` tiles.
#[inline]
pub(super) fn index_count(tiles: u32) -> u32 {
    tiles * shading::CORNER_TRIANGLES.len() as u32
}

// ── instance buffer ───────────────────────────────────────────────────────

/// Growable instance vertex buffer (power-of-two capacity, min 64).
#[derive(Default)]
pub(super) struct InstanceBuffer {
    buffer: Option<wgpu::Buffer>,
    capacity: usize,
}

impl InstanceBuffer {
    pub(super) fn write<T: bytemuck::Pod>(&mut self, ctx: &RenderCtx<'_>, items: &[T], label: &str) {
        if items.len() > self.capacity || self.buffer.is_none() {
            let new_cap = items.len().next_power_of_two().max(64);
            self.buffer = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: (new_cap * std::mem::size_of::<T>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.capacity = new_cap;
        }

        if let Some(buffer) = self.buffer.as_ref() {
            ctx.queue.write_buffer(buffer, 0, bytemuck::cast_slice(items));
        }
    }

    pub(super) fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }
}

// ── render pass ───────────────────────────────────────────────────────────

/// Opens a pass that loads the existing target contents.
pub(super) fn begin_load_pass<'e>(
    target: &'e mut crate::render::RenderTarget<'_>,
    label: &str,
) -> wgpu::RenderPass<'e> {
    let (view, resolve_target) = target.attachment();
    target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── shader bindings ───────────────────────────────────────────────────

    #[test]
    fn every_program_binds_the_view_at_group_zero() {
        for src in [CHUNK_WGSL, SPRITE_WGSL, DEBUG_INDEX_WGSL] {
            assert!(src.contains("@group(0) @binding(0) var<uniform> view: View;"));
        }
    }

    #[test]
    fn chunk_program_bindings() {
        assert!(CHUNK_WGSL.contains("@group(1) @binding(0) var<storage, read> tiles: array<Tile>;"));
        assert!(CHUNK_WGSL.contains("@group(2) @binding(0) var tile_sheet: texture_2d_array<f32>;"));
        assert!(CHUNK_WGSL.contains("@group(2) @binding(1) var tile_sampler: sampler;"));
        assert!(CHUNK_WGSL.contains("@interpolate(flat) tile_index: u32"));
    }

    #[test]
    fn sprite_program_bindings() {
        assert!(SPRITE_WGSL.contains("@group(1) @binding(0) var sprite_sheet: texture_2d_array<f32>;"));
        assert!(SPRITE_WGSL.contains("@location(6) atlas_layer: i32"));
        assert!(!SPRITE_WGSL.contains("@group(2)"));
    }

    #[test]
    fn debug_index_program_bindings() {
        assert!(
            DEBUG_INDEX_WGSL
                .contains("@group(1) @binding(0) var<storage, read> tile_indices: array<i32>;")
        );
        assert!(DEBUG_INDEX_WGSL.contains("@interpolate(flat) tile_value: i32"));
    }

    #[test]
    fn shader_sentinels_match_host_constants() {
        use crate::render::TileRecord;
        use crate::shading::{UV_MAX, UV_MIN};

        assert!(CHUNK_WGSL.contains(&format!("ABSENT_LAYER: i32 = {};", TileRecord::ABSENT_LAYER)));
        assert!(CHUNK_WGSL.contains(&format!("SOLID_LAYER: i32 = {};", TileRecord::SOLID_LAYER)));
        assert!(CHUNK_WGSL.contains(&format!("UV_MIN: f32 = {UV_MIN};")));
        assert!(CHUNK_WGSL.contains(&format!("UV_MAX: f32 = {UV_MAX};")));
    }

    // ── validation ────────────────────────────────────────────────────────

    fn validate(label: &str, src: &str) -> naga::Module {
        let module = naga::front::wgsl::parse_str(src)
            .unwrap_or_else(|e| panic!("{label}: {}", e.emit_to_string(src)));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        )
        .validate(&module)
        .unwrap_or_else(|e| panic!("{label}: {e:?}"));
        module
    }

    fn has_entry(module: &naga::Module, name: &str, stage: naga::ShaderStage) -> bool {
        module
            .entry_points
            .iter()
            .any(|ep| ep.name == name && ep.stage == stage)
    }

    #[test]
    fn chunk_program_validates() {
        let module = validate("chunk", CHUNK_WGSL);
        assert!(has_entry(&module, "vs_main", naga::ShaderStage::Vertex));
        assert!(has_entry(&module, "fs_main", naga::ShaderStage::Fragment));
    }

    #[test]
    fn sprite_program_validates() {
        let module = validate("sprite", SPRITE_WGSL);
        assert!(has_entry(&module, "vs_main", naga::ShaderStage::Vertex));
        for mode in [SpriteMode::Textured, SpriteMode::UvDebug] {
            assert!(has_entry(&module, mode.entry_point(), naga::ShaderStage::Fragment));
        }
    }

    #[test]
    fn debug_index_program_validates() {
        let module = validate("debug index", DEBUG_INDEX_WGSL);
        assert!(has_entry(&module, "vs_main", naga::ShaderStage::Vertex));
        for mode in [DebugIndexMode::Presence, DebugIndexMode::Sampled] {
            assert!(has_entry(&module, mode.entry_point(), naga::ShaderStage::Fragment));
        }
    }

    // ── entry points ──────────────────────────────────────────────────────

    #[test]
    fn mode_entry_points_exist() {
        for mode in [DebugIndexMode::Presence, DebugIndexMode::Sampled] {
            assert!(DEBUG_INDEX_WGSL.contains(&format!("fn {}(", mode.entry_point())));
        }
        for mode in [SpriteMode::Textured, SpriteMode::UvDebug] {
            assert!(SPRITE_WGSL.contains(&format!("fn {}(", mode.entry_point())));
        }
    }

    // ── config ────────────────────────────────────────────────────────────

    #[test]
    fn default_config_is_single_sample_alpha() {
        let c = RenderConfig::default();
        assert_eq!(c.samples, 1);
        assert_eq!(c.blend, BlendMode::Alpha);
        assert_eq!(blend_state(c.blend), wgpu::BlendState::ALPHA_BLENDING);
    }

    #[test]
    fn index_count_is_six_per_tile() {
        assert_eq!(index_count(0), 0);
        assert_eq!(index_count(64), 384);
    }

    #[test]
    fn view_binding_size_is_the_uniform_size() {
        assert_eq!(view_ubo_min_binding_size().get(), 80);
    }
}
