//! G-Buffer Pass
//!
//! Rasterizes opaque geometry into the seven G-buffer targets plus depth.
//! Every target clears to zero, so an eye-position `w` of zero marks
//! background pixels for the later passes.

use crate::errors::Result;
use crate::renderer::pass::{TrackedRenderPass, color_attachment};
use crate::renderer::pipeline::attachments::GBUFFER_FORMATS;
use crate::renderer::pipeline::builder::{
    PassPipeline, depth_state, geometry_pipeline, pipeline_layout, replace_target,
};
use crate::renderer::pipeline::context::{ExecuteContext, PassSetup, PipelinePass};

use super::{depth_attachment, draw_packets};

pub struct GBufferPass {
    pipeline: PassPipeline,
}

impl GBufferPass {
    pub fn new(setup: &mut PassSetup) -> Result<Self> {
        let device = setup.device;
        let module = setup.shaders.get_or_compile(device, "gbuffer", &setup.defines)?;
        let layout = pipeline_layout(
            device,
            "GBuffer Pipeline Layout",
            &[&setup.layouts.frame, &setup.layouts.object, setup.material_layout],
        );
        let targets = GBUFFER_FORMATS.map(replace_target);
        let pipeline = geometry_pipeline(
            device,
            "GBuffer Pipeline",
            &module,
            &layout,
            &targets,
            depth_state(wgpu::CompareFunction::Less, true),
            true,
        );
        Ok(Self {
            pipeline: PassPipeline::new(pipeline),
        })
    }
}

impl PipelinePass for GBufferPass {
    fn name(&self) -> &'static str {
        "GBuffer Pass"
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        let a = ctx.attachments;
        let clear = Some(wgpu::Color::TRANSPARENT);
        let targets = [
            color_attachment(&a.diffuse.view, clear),
            color_attachment(&a.lightmap.view, clear),
            color_attachment(&a.envmap.view, clear),
            color_attachment(&a.self_illum.view, clear),
            color_attachment(&a.features.view, clear),
            color_attachment(&a.eye_position.view, clear),
            color_attachment(&a.eye_normal.view, clear),
        ];

        let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("GBuffer"),
            color_attachments: &targets,
            depth_stencil_attachment: Some(depth_attachment(&a.depth.view, Some(1.0))),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        let mut pass = TrackedRenderPass::new(pass);
        let (frame_id, frame_group) = ctx.frame.frame_group();
        pass.set_pipeline(self.pipeline.id, &self.pipeline.pipeline);
        pass.set_bind_group(0, frame_id, frame_group, &[]);
        draw_packets(&mut pass, ctx, &ctx.frame.packets.opaque, true);
    }
}
