//! Transparent Pass
//!
//! Weighted blended order-independent transparency in two steps:
//!
//! 1. The opaque G-buffer depth is copied into the transparency depth
//!    target so transparent fragments are occluded by opaque geometry.
//! 2. Transparent meshes and particles accumulate into `oit_accum`
//!    (additive) and `oit_revealage` (multiplicative), depth tested but
//!    not depth written.
//!
//! Both targets are always cleared, so the compose pass sees an empty
//! accumulation when nothing transparent is drawn.

use rustc_hash::FxHashMap;

use crate::errors::Result;
use crate::renderer::pass::{TrackedRenderPass, color_attachment};
use crate::renderer::pipeline::attachments::{AttachmentKey, OIT_ACCUM_FORMAT, OIT_REVEALAGE_FORMAT};
use crate::renderer::pipeline::builder::{
    PassPipeline, depth_state, fullscreen_pipeline, geometry_pipeline, pipeline_layout, texture_entry, view_entry,
};
use crate::renderer::pipeline::context::{ExecuteContext, PassSetup, PipelinePass, PrepareContext};

use super::{depth_attachment, draw_packets};

pub struct TransparentPass {
    blit_layout: wgpu::BindGroupLayout,
    depth_blit: wgpu::RenderPipeline,
    oit: PassPipeline,
    blit_groups: FxHashMap<AttachmentKey, wgpu::BindGroup>,
}

impl TransparentPass {
    pub fn new(setup: &mut PassSetup) -> Result<Self> {
        let device = setup.device;

        let blit_module = setup.shaders.get_or_compile(device, "depth_blit", &setup.defines)?;
        let blit_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Depth Blit Layout"),
            entries: &[texture_entry(0, wgpu::TextureSampleType::Depth)],
        });
        let blit_pipeline_layout =
            pipeline_layout(device, "Depth Blit Pipeline Layout", &[&setup.layouts.frame, &blit_layout]);
        let depth_blit = fullscreen_pipeline(
            device,
            "Depth Blit Pipeline",
            &blit_module,
            &blit_pipeline_layout,
            &[],
            depth_state(wgpu::CompareFunction::Always, true),
        );

        let oit_module = setup.shaders.get_or_compile(device, "oit", &setup.defines)?;
        let oit_layout = pipeline_layout(
            device,
            "OIT Pipeline Layout",
            &[&setup.layouts.frame, &setup.layouts.object, setup.material_layout],
        );
        let accum = wgpu::ColorTargetState {
            format: OIT_ACCUM_FORMAT,
            blend: Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            }),
            write_mask: wgpu::ColorWrites::ALL,
        };
        let revealage_blend = wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::Zero,
            dst_factor: wgpu::BlendFactor::OneMinusSrc,
            operation: wgpu::BlendOperation::Add,
        };
        let revealage = wgpu::ColorTargetState {
            format: OIT_REVEALAGE_FORMAT,
            blend: Some(wgpu::BlendState {
                color: revealage_blend,
                alpha: revealage_blend,
            }),
            write_mask: wgpu::ColorWrites::ALL,
        };
        let oit = geometry_pipeline(
            device,
            "OIT Pipeline",
            &oit_module,
            &oit_layout,
            &[Some(accum), Some(revealage)],
            depth_state(wgpu::CompareFunction::LessEqual, false),
            true,
        );

        Ok(Self {
            blit_layout,
            depth_blit,
            oit: PassPipeline::new(oit),
            blit_groups: FxHashMap::default(),
        })
    }
}

impl PipelinePass for TransparentPass {
    fn name(&self) -> &'static str {
        "Transparent Pass"
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) {
        let a = ctx.attachments;
        self.blit_groups.entry(a.key()).or_insert_with(|| {
            ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Depth Blit Bind Group"),
                layout: &self.blit_layout,
                entries: &[view_entry(0, &a.depth.view)],
            })
        });
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        let a = ctx.attachments;
        let Some(blit_group) = self.blit_groups.get(&a.key()) else {
            return;
        };
        let (frame_id, frame_group) = ctx.frame.frame_group();

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Depth Blit"),
                color_attachments: &[],
                depth_stencil_attachment: Some(depth_attachment(&a.oit_depth.view, Some(1.0))),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.depth_blit);
            pass.set_bind_group(0, frame_group, &[]);
            pass.set_bind_group(1, blit_group, &[]);
            pass.draw(0..3, 0..1);
        }

        let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("OIT"),
            color_attachments: &[
                color_attachment(&a.oit_accum.view, Some(wgpu::Color::TRANSPARENT)),
                color_attachment(&a.oit_revealage.view, Some(wgpu::Color::WHITE)),
            ],
            depth_stencil_attachment: Some(depth_attachment(&a.oit_depth.view, None)),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        let mut pass = TrackedRenderPass::new(pass);
        pass.set_pipeline(self.oit.id, &self.oit.pipeline);
        pass.set_bind_group(0, frame_id, frame_group, &[]);
        draw_packets(&mut pass, ctx, &ctx.frame.packets.transparent, true);
    }
}
