use wgpu::util::DeviceExt;

use crate::render::{
    RenderCtx, RenderTarget, SPRITE_QUAD, SPRITE_QUAD_INDICES, SpriteInstance, SpriteMode,
    SpriteVertex,
};
use crate::sheet::GpuTileSheet;

use super::common::{
    InstanceBuffer, PipelineKey, SPRITE_WGSL, SheetBinding, ViewBinding, begin_load_pass,
    create_pipeline, sheet_bgl, view_bgl,
};

/// A sprite to draw; alias kept so call sites read like the chunk API.
pub type SpriteDraw = SpriteInstance;

/// Sprite renderer: a unit quad placed by each instance transform.
///
/// One draw call per sprite, in slice order.
#[derive(Default)]
pub struct SpriteRenderer {
    mode: SpriteMode,

    pipeline_key: Option<(PipelineKey, SpriteMode)>,
    pipeline: Option<wgpu::RenderPipeline>,

    view_bgl: Option<wgpu::BindGroupLayout>,
    sheet_bgl: Option<wgpu::BindGroupLayout>,

    view: Option<ViewBinding>,
    sheet: SheetBinding,

    quad_vbo: Option<wgpu::Buffer>,
    quad_ibo: Option<wgpu::Buffer>,
    instances: InstanceBuffer,

    warned_layer: bool,
}

impl SpriteRenderer {
    pub fn new(mode: SpriteMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    #[inline]
    pub fn mode(&self) -> SpriteMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SpriteMode) {
        self.mode = mode;
    }

    /// Draws each sprite as its own quad. One call per submitted encoder:
    /// the instance buffer is rewritten on every call.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        sheet: &GpuTileSheet,
        sprites: &[SpriteDraw],
    ) {
        if sprites.is_empty() {
            return;
        }

        self.ensure_pipeline(ctx);
        self.ensure_static_buffers(ctx);
        self.ensure_bindings(ctx, sheet);

        if !self.warned_layer
            && sprites
                .iter()
                .any(|s| s.atlas_layer as u32 >= sheet.layer_count())
        {
            log::debug!(
                "SpriteRenderer: atlas layer beyond the sheet's {} layers; sampling clamps",
                sheet.layer_count()
            );
            self.warned_layer = true;
        }

        self.instances.write(ctx, sprites, "mosaic sprite instance vbo");

        let Some(view) = self.view.as_ref() else { return };
        view.write(ctx);

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(sheet_bg) = self.sheet.bind_group() else { return };
        let Some(quad_vbo) = self.quad_vbo.as_ref() else { return };
        let Some(quad_ibo) = self.quad_ibo.as_ref() else { return };
        let Some(instance_vbo) = self.instances.buffer() else { return };

        let mut rpass = begin_load_pass(target, "mosaic sprite pass");

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, view.bind_group(), &[]);
        rpass.set_bind_group(1, sheet_bg, &[]);
        rpass.set_vertex_buffer(0, quad_vbo.slice(..));
        rpass.set_vertex_buffer(1, instance_vbo.slice(..));
        rpass.set_index_buffer(quad_ibo.slice(..), wgpu::IndexFormat::Uint16);

        let quad = SPRITE_QUAD_INDICES.len() as u32;
        for i in 0..sprites.len() as u32 {
            rpass.draw_indexed(0..quad, 0, i..i + 1);
        }
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        let key = (PipelineKey::from_ctx(ctx), self.mode);
        if self.pipeline_key == Some(key) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mosaic sprite shader"),
            source: wgpu::ShaderSource::Wgsl(SPRITE_WGSL.into()),
        });

        let view = view_bgl(ctx.device, "mosaic sprite view bgl");
        let sheet = sheet_bgl(ctx.device, "mosaic sprite sheet bgl");

        let pipeline = create_pipeline(
            ctx,
            key.0,
            "mosaic sprite pipeline",
            &shader,
            &[&view, &sheet],
            &[SpriteVertex::layout(), SpriteInstance::layout()],
            self.mode.entry_point(),
        );
        log::debug!("SpriteRenderer: pipeline built for {key:?}");

        self.pipeline_key = Some(key);
        self.pipeline = Some(pipeline);
        self.view_bgl = Some(view);
        self.sheet_bgl = Some(sheet);

        self.view = None;
        self.sheet.invalidate();
    }

    fn ensure_static_buffers(&mut self, ctx: &RenderCtx<'_>) {
        if self.quad_vbo.is_some() && self.quad_ibo.is_some() {
            return;
        }

        self.quad_vbo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mosaic sprite quad vbo"),
            contents: bytemuck::cast_slice(&SPRITE_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        }));

        self.quad_ibo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mosaic sprite quad ibo"),
            contents: bytemuck::cast_slice(&SPRITE_QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        }));
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>, sheet: &GpuTileSheet) {
        let Some(view_bgl) = self.view_bgl.as_ref() else { return };
        if self.view.is_none() {
            self.view = Some(ViewBinding::new(ctx.device, view_bgl, "mosaic sprite view"));
        }
        if let Some(bgl) = self.sheet_bgl.as_ref() {
            self.sheet.ensure(ctx.device, bgl, sheet, "mosaic sprite sheet");
        }
    }
}
