//! Shadow Map Pass
//!
//! Renders the frame's shadow casters from the shadow light:
//!
//! - Directional lights: one depth-only render per cascade layer
//! - Point lights: one render per cube face, storing the distance to the
//!   light divided by its radius
//!
//! Nothing is recorded when the scene has no shadow light; the combine
//! pass skips shadow lookups in that case.

use crate::errors::Result;
use crate::renderer::pass::TrackedRenderPass;
use crate::renderer::pipeline::attachments::DEPTH_FORMAT;
use crate::renderer::pipeline::builder::{PassPipeline, geometry_pipeline, pipeline_layout};
use crate::renderer::pipeline::context::{ExecuteContext, PassSetup, PipelinePass, ShadowMode};
use crate::renderer::pipeline::frame::FrameResources;
use crate::resources::NUM_SHADOW_CASCADES;

use super::{depth_attachment, draw_packets};

pub struct ShadowPass {
    cascade: PassPipeline,
    cube: PassPipeline,
}

impl ShadowPass {
    pub fn new(setup: &mut PassSetup) -> Result<Self> {
        let device = setup.device;
        let layout = pipeline_layout(
            device,
            "Shadow Pipeline Layout",
            &[&setup.layouts.frame, &setup.layouts.object, &setup.layouts.shadow_view],
        );

        let cascade_module = setup.shaders.get_or_compile(device, "shadow", &setup.defines.with_variant("cascade"))?;
        let cascade = geometry_pipeline(
            device,
            "Shadow Cascade Pipeline",
            &cascade_module,
            &layout,
            &[],
            Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            }),
            false,
        );

        let cube_module = setup.shaders.get_or_compile(device, "shadow", &setup.defines.with_variant("cube"))?;
        let cube = geometry_pipeline(
            device,
            "Shadow Cube Pipeline",
            &cube_module,
            &layout,
            &[],
            Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            true,
        );

        Ok(Self {
            cascade: PassPipeline::new(cascade),
            cube: PassPipeline::new(cube),
        })
    }
}

impl PipelinePass for ShadowPass {
    fn name(&self) -> &'static str {
        "Shadow Pass"
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        let Some(mode) = ctx.shadow else {
            return;
        };
        let (layers, pipeline, first_view) = match mode {
            ShadowMode::Directional => (&ctx.attachments.shadow_cascades.layer_views, &self.cascade, 0),
            ShadowMode::Point => (&ctx.attachments.shadow_cube.layer_views, &self.cube, NUM_SHADOW_CASCADES),
        };

        let (frame_id, frame_group) = ctx.frame.frame_group();
        let (view_id, view_group) = ctx.frame.shadow_views.bind_group();
        let packets = &ctx.frame.packets.shadows;

        for (layer, view) in layers.iter().enumerate() {
            let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Layer"),
                color_attachments: &[],
                depth_stencil_attachment: Some(depth_attachment(view, Some(1.0))),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            let mut pass = TrackedRenderPass::new(pass);
            pass.set_pipeline(pipeline.id, &pipeline.pipeline);
            pass.set_bind_group(0, frame_id, frame_group, &[]);
            pass.set_bind_group(
                2,
                view_id,
                view_group,
                &[FrameResources::shadow_view_offset(first_view + layer)],
            );
            draw_packets(&mut pass, ctx, packets, false);
        }
    }
}
