use crate::render::{ChunkInstance, RenderCtx, RenderTarget, TileRecord};
use crate::sheet::GpuTileSheet;

use super::common::{
    CHUNK_WGSL, InstanceBuffer, PipelineKey, SheetBinding, StorageSlot, TileIndexBuffer,
    ViewBinding, begin_load_pass, create_pipeline, index_count, sheet_bgl, storage_bgl, view_bgl,
    write_storage_slot,
};

/// One chunk to draw: placement/geometry plus its tile records.
///
/// `tiles.len()` must equal `instance.tile_count()`.
#[derive(Debug, Copy, Clone)]
pub struct ChunkDraw<'a> {
    pub instance: ChunkInstance,
    pub tiles: &'a [TileRecord],
}

impl<'a> ChunkDraw<'a> {
    pub fn new(instance: ChunkInstance, tiles: &'a [TileRecord]) -> Self {
        Self { instance, tiles }
    }

    /// World-space z of the chunk origin; lower z is painted first.
    #[inline]
    pub fn depth(&self) -> f32 {
        self.instance.transform[3][2]
    }
}

/// Chunk renderer: one indexed draw per chunk, no per-tile vertex data.
///
/// Each draw binds its own tile storage buffer at group 1; the tile sheet is
/// shared at group 2.
#[derive(Default)]
pub struct ChunkRenderer {
    pipeline_key: Option<PipelineKey>,
    pipeline: Option<wgpu::RenderPipeline>,

    view_bgl: Option<wgpu::BindGroupLayout>,
    tiles_bgl: Option<wgpu::BindGroupLayout>,
    sheet_bgl: Option<wgpu::BindGroupLayout>,

    view: Option<ViewBinding>,
    sheet: SheetBinding,
    tile_slots: Vec<StorageSlot>,

    indices: TileIndexBuffer,
    instances: InstanceBuffer,

    warned_tile_count: bool,
}

impl ChunkRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders `draws` into `target`, lowest [`ChunkDraw::depth`] first.
    ///
    /// Chunks with no tiles are skipped. Chunks whose tile buffer length does
    /// not match the instance are skipped (one-time warning).
    ///
    /// Uploads go through `queue.write_buffer` into buffers this renderer
    /// reuses, so call it at most once per submitted encoder; a second call
    /// overwrites the data the first pass reads.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        sheet: &GpuTileSheet,
        draws: &[ChunkDraw<'_>],
    ) {
        self.ensure_pipeline(ctx);
        self.ensure_bindings(ctx, sheet);

        let mut order: Vec<&ChunkDraw<'_>> = Vec::with_capacity(draws.len());
        for draw in draws {
            let tiles = draw.instance.tile_count();
            if tiles == 0 {
                continue;
            }
            if draw.tiles.len() != tiles as usize {
                if !self.warned_tile_count {
                    log::warn!(
                        "ChunkRenderer: chunk has {} tile records for {} tiles; skipped",
                        draw.tiles.len(),
                        tiles
                    );
                    self.warned_tile_count = true;
                }
                continue;
            }
            order.push(draw);
        }

        if order.is_empty() {
            return;
        }
        order.sort_by(|a, b| a.depth().total_cmp(&b.depth()));

        // Mutating uploads first; the pass below only borrows.
        let max_tiles = order.iter().map(|d| d.instance.tile_count()).max().unwrap_or(0);
        self.indices.ensure(ctx.device, max_tiles, "mosaic chunk ibo");

        let raw: Vec<ChunkInstance> = order.iter().map(|d| d.instance).collect();
        self.instances.write(ctx, &raw, "mosaic chunk instance vbo");

        let Some(tiles_bgl) = self.tiles_bgl.as_ref() else { return };
        for (i, draw) in order.iter().enumerate() {
            write_storage_slot(
                ctx,
                &mut self.tile_slots,
                i,
                tiles_bgl,
                "mosaic chunk tiles",
                bytemuck::cast_slice(draw.tiles),
            );
        }

        let Some(view) = self.view.as_ref() else { return };
        view.write(ctx);

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(sheet_bg) = self.sheet.bind_group() else { return };
        let Some(instance_vbo) = self.instances.buffer() else { return };
        let Some(ibo) = self.indices.buffer() else { return };

        let mut rpass = begin_load_pass(target, "mosaic chunk pass");

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, view.bind_group(), &[]);
        rpass.set_bind_group(2, sheet_bg, &[]);
        rpass.set_vertex_buffer(0, instance_vbo.slice(..));
        rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint32);

        for (i, (draw, slot)) in order.iter().zip(&self.tile_slots).enumerate() {
            let i = i as u32;
            rpass.set_bind_group(1, slot.bind_group(), &[]);
            rpass.draw_indexed(0..index_count(draw.instance.tile_count()), 0, i..i + 1);
        }
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        let key = PipelineKey::from_ctx(ctx);
        if self.pipeline_key == Some(key) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mosaic chunk shader"),
            source: wgpu::ShaderSource::Wgsl(CHUNK_WGSL.into()),
        });

        let view = view_bgl(ctx.device, "mosaic chunk view bgl");
        let tiles = storage_bgl(ctx.device, "mosaic chunk tiles bgl");
        let sheet = sheet_bgl(ctx.device, "mosaic chunk sheet bgl");

        let pipeline = create_pipeline(
            ctx,
            key,
            "mosaic chunk pipeline",
            &shader,
            &[&view, &tiles, &sheet],
            &[ChunkInstance::layout()],
            "fs_main",
        );
        log::debug!("ChunkRenderer: pipeline built for {key:?}");

        self.pipeline_key = Some(key);
        self.pipeline = Some(pipeline);
        self.view_bgl = Some(view);
        self.tiles_bgl = Some(tiles);
        self.sheet_bgl = Some(sheet);

        // Bind groups reference the old layouts.
        self.view = None;
        self.sheet.invalidate();
        self.tile_slots.clear();
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>, sheet: &GpuTileSheet) {
        let Some(view_bgl) = self.view_bgl.as_ref() else { return };
        if self.view.is_none() {
            self.view = Some(ViewBinding::new(ctx.device, view_bgl, "mosaic chunk view"));
        }
        if let Some(bgl) = self.sheet_bgl.as_ref() {
            self.sheet.ensure(ctx.device, bgl, sheet, "mosaic chunk sheet");
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, UVec2, Vec3};

    use super::*;

    #[test]
    fn depth_reads_translation_z() {
        let inst = ChunkInstance::new(
            Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            UVec2::splat(2),
            UVec2::splat(8),
        );
        assert_eq!(ChunkDraw::new(inst, &[]).depth(), 3.0);
    }
}
