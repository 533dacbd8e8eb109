//! Post Pass
//!
//! Optional FXAA and sharpen filters from `composite` into `output`:
//!
//! | FXAA | Sharpen | Chain                                    |
//! |------|---------|------------------------------------------|
//! | on   | on      | composite → FXAA → post_ping → sharpen → output |
//! | on   | off     | composite → FXAA → output                |
//! | off  | on      | composite → sharpen → output             |
//! | off  | off     | composite → copy → output                |

use rustc_hash::FxHashMap;

use crate::errors::Result;
use crate::renderer::pass::{color_attachment, fullscreen_pass};
use crate::renderer::pipeline::attachments::{AttachmentKey, COLOR_FORMAT};
use crate::renderer::pipeline::builder::{
    float_texture, fullscreen_pipeline, pipeline_layout, replace_target, sampler_binding, sampler_entry, view_entry,
};
use crate::renderer::pipeline::context::{ExecuteContext, PassSetup, PipelinePass, PrepareContext};

struct PostBindGroups {
    composite: wgpu::BindGroup,
    post_ping: wgpu::BindGroup,
}

pub struct PostPass {
    layout: wgpu::BindGroupLayout,
    fxaa: wgpu::RenderPipeline,
    sharpen: wgpu::RenderPipeline,
    copy: wgpu::RenderPipeline,
    bind_groups: FxHashMap<AttachmentKey, PostBindGroups>,
}

impl PostPass {
    pub fn new(setup: &mut PassSetup) -> Result<Self> {
        let device = setup.device;
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Post Layout"),
            entries: &[float_texture(0), sampler_entry(1, wgpu::SamplerBindingType::Filtering)],
        });
        let pipeline_layout = pipeline_layout(device, "Post Pipeline Layout", &[&setup.layouts.frame, &layout]);

        let mut build = |variant: &'static str| -> Result<wgpu::RenderPipeline> {
            let module = setup.shaders.get_or_compile(device, "post", &setup.defines.with_variant(variant))?;
            Ok(fullscreen_pipeline(
                device,
                &format!("Post {variant} Pipeline"),
                &module,
                &pipeline_layout,
                &[replace_target(COLOR_FORMAT)],
                None,
            ))
        };

        Ok(Self {
            fxaa: build("fxaa")?,
            sharpen: build("sharpen")?,
            copy: build("copy")?,
            layout,
            bind_groups: FxHashMap::default(),
        })
    }
}

impl PipelinePass for PostPass {
    fn name(&self) -> &'static str {
        "Post Pass"
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) {
        let a = ctx.attachments;
        self.bind_groups.entry(a.key()).or_insert_with(|| {
            let create = |view: &wgpu::TextureView| {
                ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Post Bind Group"),
                    layout: &self.layout,
                    entries: &[view_entry(0, view), sampler_binding(1, &ctx.samplers.linear_clamp)],
                })
            };
            PostBindGroups {
                composite: create(&a.composite.view),
                post_ping: create(&a.post_ping.view),
            }
        });
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        let a = ctx.attachments;
        let Some(groups) = self.bind_groups.get(&a.key()) else {
            return;
        };
        let (_, frame_group) = ctx.frame.frame_group();
        let mut filter = |label: &str,
                          pipeline: &wgpu::RenderPipeline,
                          source: &wgpu::BindGroup,
                          target: &wgpu::TextureView| {
            fullscreen_pass(
                encoder,
                label,
                &[color_attachment(target, Some(wgpu::Color::TRANSPARENT))],
                pipeline,
                &[frame_group, source],
            );
        };

        match (ctx.options.fxaa, ctx.options.sharpen) {
            (true, true) => {
                filter("FXAA", &self.fxaa, &groups.composite, &a.post_ping.view);
                filter("Sharpen", &self.sharpen, &groups.post_ping, &a.output.view);
            }
            (true, false) => filter("FXAA", &self.fxaa, &groups.composite, &a.output.view),
            (false, true) => filter("Sharpen", &self.sharpen, &groups.composite, &a.output.view),
            (false, false) => filter("Copy", &self.copy, &groups.composite, &a.output.view),
        }
    }
}
