//! SSR Pass
//!
//! Screen-space reflections at half resolution, ray marched against the
//! G-buffer eye positions. The reflected radiance is the diffuse color
//! modulated by the lightmap; the alpha channel carries the hit fade.

use rustc_hash::FxHashMap;

use crate::errors::Result;
use crate::renderer::pass::{color_attachment, fullscreen_pass};
use crate::renderer::pipeline::attachments::{AttachmentKey, COLOR_FORMAT};
use crate::renderer::pipeline::builder::{float_texture, fullscreen_pipeline, pipeline_layout, replace_target, view_entry};
use crate::renderer::pipeline::context::{ExecuteContext, PassSetup, PipelinePass, PrepareContext};

pub struct SsrPass {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
    bind_groups: FxHashMap<AttachmentKey, wgpu::BindGroup>,
}

impl SsrPass {
    pub fn new(setup: &mut PassSetup) -> Result<Self> {
        let device = setup.device;
        let module = setup.shaders.get_or_compile(device, "ssr", &setup.defines)?;
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SSR Layout"),
            entries: &[
                float_texture(0),
                float_texture(1),
                float_texture(2),
                float_texture(3),
                float_texture(4),
            ],
        });
        let pipeline_layout = pipeline_layout(device, "SSR Pipeline Layout", &[&setup.layouts.frame, &layout]);
        let pipeline = fullscreen_pipeline(
            device,
            "SSR Pipeline",
            &module,
            &pipeline_layout,
            &[replace_target(COLOR_FORMAT)],
            None,
        );
        Ok(Self {
            layout,
            pipeline,
            bind_groups: FxHashMap::default(),
        })
    }
}

impl PipelinePass for SsrPass {
    fn name(&self) -> &'static str {
        "SSR Pass"
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) {
        if !ctx.options.ssr {
            return;
        }
        let a = ctx.attachments;
        self.bind_groups.entry(a.key()).or_insert_with(|| {
            ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("SSR Bind Group"),
                layout: &self.layout,
                entries: &[
                    view_entry(0, &a.diffuse.view),
                    view_entry(1, &a.lightmap.view),
                    view_entry(2, &a.envmap.view),
                    view_entry(3, &a.eye_position.view),
                    view_entry(4, &a.eye_normal.view),
                ],
            })
        });
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        if !ctx.options.ssr {
            return;
        }
        let Some(bind_group) = self.bind_groups.get(&ctx.attachments.key()) else {
            return;
        };
        let (_, frame_group) = ctx.frame.frame_group();
        fullscreen_pass(
            encoder,
            "SSR",
            &[color_attachment(&ctx.attachments.ssr.view, Some(wgpu::Color::TRANSPARENT))],
            &self.pipeline,
            &[frame_group, bind_group],
        );
    }
}
