use crate::render::{ChunkInstance, DebugIndexMode, RenderCtx, RenderTarget};
use crate::sheet::GpuTileSheet;

use super::common::{
    DEBUG_INDEX_WGSL, InstanceBuffer, PipelineKey, SheetBinding, StorageSlot, TileIndexBuffer,
    ViewBinding, begin_load_pass, create_pipeline, index_count, sheet_bgl, storage_bgl, view_bgl,
    write_storage_slot,
};

/// One chunk for the debug-index program: one `i32` per tile, negative = empty.
#[derive(Debug, Copy, Clone)]
pub struct DebugIndexDraw<'a> {
    pub instance: ChunkInstance,
    pub indices: &'a [i32],
}

impl<'a> DebugIndexDraw<'a> {
    pub fn new(instance: ChunkInstance, indices: &'a [i32]) -> Self {
        Self { instance, indices }
    }
}

/// Draws chunk geometry from flat tile indices.
///
/// [`DebugIndexMode::Presence`] paints occupied tiles white;
/// [`DebugIndexMode::Sampled`] paints them with the sheet layer they name.
#[derive(Default)]
pub struct DebugIndexRenderer {
    mode: DebugIndexMode,

    pipeline_key: Option<(PipelineKey, DebugIndexMode)>,
    pipeline: Option<wgpu::RenderPipeline>,

    view_bgl: Option<wgpu::BindGroupLayout>,
    indices_bgl: Option<wgpu::BindGroupLayout>,
    sheet_bgl: Option<wgpu::BindGroupLayout>,

    view: Option<ViewBinding>,
    sheet: SheetBinding,
    index_slots: Vec<StorageSlot>,

    ibo: TileIndexBuffer,
    instances: InstanceBuffer,

    warned_len: bool,
}

impl DebugIndexRenderer {
    pub fn new(mode: DebugIndexMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    #[inline]
    pub fn mode(&self) -> DebugIndexMode {
        self.mode
    }

    /// Takes effect on the next `render`.
    pub fn set_mode(&mut self, mode: DebugIndexMode) {
        self.mode = mode;
    }

    /// Renders `draws` in the given order.
    ///
    /// The sheet is bound in both modes; only `Sampled` reads it. One call
    /// per submitted encoder, as with [`ChunkRenderer::render`](super::ChunkRenderer::render).
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        sheet: &GpuTileSheet,
        draws: &[DebugIndexDraw<'_>],
    ) {
        self.ensure_pipeline(ctx);
        self.ensure_bindings(ctx, sheet);

        let mut valid: Vec<&DebugIndexDraw<'_>> = Vec::with_capacity(draws.len());
        for draw in draws {
            let tiles = draw.instance.tile_count();
            if tiles == 0 {
                continue;
            }
            if draw.indices.len() != tiles as usize {
                if !self.warned_len {
                    log::warn!(
                        "DebugIndexRenderer: {} indices for {} tiles; chunk skipped",
                        draw.indices.len(),
                        tiles
                    );
                    self.warned_len = true;
                }
                continue;
            }
            valid.push(draw);
        }

        if valid.is_empty() {
            return;
        }

        let max_tiles = valid.iter().map(|d| d.instance.tile_count()).max().unwrap_or(0);
        self.ibo.ensure(ctx.device, max_tiles, "mosaic debug index ibo");

        let raw: Vec<ChunkInstance> = valid.iter().map(|d| d.instance).collect();
        self.instances.write(ctx, &raw, "mosaic debug index instance vbo");

        let Some(indices_bgl) = self.indices_bgl.as_ref() else { return };
        for (i, draw) in valid.iter().enumerate() {
            write_storage_slot(
                ctx,
                &mut self.index_slots,
                i,
                indices_bgl,
                "mosaic debug index values",
                bytemuck::cast_slice(draw.indices),
            );
        }

        let Some(view) = self.view.as_ref() else { return };
        view.write(ctx);

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(sheet_bg) = self.sheet.bind_group() else { return };
        let Some(instance_vbo) = self.instances.buffer() else { return };
        let Some(ibo) = self.ibo.buffer() else { return };

        let mut rpass = begin_load_pass(target, "mosaic debug index pass");

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, view.bind_group(), &[]);
        rpass.set_bind_group(2, sheet_bg, &[]);
        rpass.set_vertex_buffer(0, instance_vbo.slice(..));
        rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint32);

        for (i, (draw, slot)) in valid.iter().zip(&self.index_slots).enumerate() {
            let i = i as u32;
            rpass.set_bind_group(1, slot.bind_group(), &[]);
            rpass.draw_indexed(0..index_count(draw.instance.tile_count()), 0, i..i + 1);
        }
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        let key = (PipelineKey::from_ctx(ctx), self.mode);
        if self.pipeline_key == Some(key) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mosaic debug index shader"),
            source: wgpu::ShaderSource::Wgsl(DEBUG_INDEX_WGSL.into()),
        });

        let view = view_bgl(ctx.device, "mosaic debug index view bgl");
        let indices = storage_bgl(ctx.device, "mosaic debug index values bgl");
        let sheet = sheet_bgl(ctx.device, "mosaic debug index sheet bgl");

        let pipeline = create_pipeline(
            ctx,
            key.0,
            "mosaic debug index pipeline",
            &shader,
            &[&view, &indices, &sheet],
            &[ChunkInstance::layout()],
            self.mode.entry_point(),
        );
        log::debug!("DebugIndexRenderer: pipeline built for {key:?}");

        self.pipeline_key = Some(key);
        self.pipeline = Some(pipeline);
        self.view_bgl = Some(view);
        self.indices_bgl = Some(indices);
        self.sheet_bgl = Some(sheet);

        self.view = None;
        self.sheet.invalidate();
        self.index_slots.clear();
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>, sheet: &GpuTileSheet) {
        let Some(view_bgl) = self.view_bgl.as_ref() else { return };
        if self.view.is_none() {
            self.view = Some(ViewBinding::new(ctx.device, view_bgl, "mosaic debug index view"));
        }
        if let Some(bgl) = self.sheet_bgl.as_ref() {
            self.sheet.ensure(ctx.device, bgl, sheet, "mosaic debug index sheet");
        }
    }
}
