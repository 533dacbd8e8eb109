//! Compose Pass
//!
//! Adds the blurred bright pass to the opaque color and resolves the
//! weighted blended transparency over it into `composite`.

use rustc_hash::FxHashMap;

use crate::errors::Result;
use crate::renderer::pass::{color_attachment, fullscreen_pass};
use crate::renderer::pipeline::attachments::{AttachmentKey, COLOR_FORMAT};
use crate::renderer::pipeline::builder::{float_texture, fullscreen_pipeline, pipeline_layout, replace_target, view_entry};
use crate::renderer::pipeline::context::{ExecuteContext, PassSetup, PipelinePass, PrepareContext};

pub struct ComposePass {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
    bind_groups: FxHashMap<AttachmentKey, wgpu::BindGroup>,
}

impl ComposePass {
    pub fn new(setup: &mut PassSetup) -> Result<Self> {
        let device = setup.device;
        let module = setup.shaders.get_or_compile(device, "compose", &setup.defines)?;
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Compose Layout"),
            entries: &[float_texture(0), float_texture(1), float_texture(2), float_texture(3)],
        });
        let pipeline_layout = pipeline_layout(device, "Compose Pipeline Layout", &[&setup.layouts.frame, &layout]);
        let pipeline = fullscreen_pipeline(
            device,
            "Compose Pipeline",
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

impl PipelinePass for ComposePass {
    fn name(&self) -> &'static str {
        "Compose Pass"
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) {
        let a = ctx.attachments;
        self.bind_groups.entry(a.key()).or_insert_with(|| {
            ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Compose Bind Group"),
                layout: &self.layout,
                entries: &[
                    view_entry(0, &a.opaque_color.view),
                    view_entry(1, &a.bright_blurred.view),
                    view_entry(2, &a.oit_accum.view),
                    view_entry(3, &a.oit_revealage.view),
                ],
            })
        });
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        let Some(bind_group) = self.bind_groups.get(&ctx.attachments.key()) else {
            return;
        };
        let (_, frame_group) = ctx.frame.frame_group();
        fullscreen_pass(
            encoder,
            "Compose",
            &[color_attachment(&ctx.attachments.composite.view, Some(wgpu::Color::TRANSPARENT))],
            &self.pipeline,
            &[frame_group, bind_group],
        );
    }
}
