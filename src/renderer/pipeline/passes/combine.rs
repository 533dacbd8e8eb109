//! Deferred Combine Pass
//!
//! Resolves the G-buffer into lit color and the bright pass:
//!
//! - base light: the lightmap on lightmapped surfaces, the scene ambient
//!   color elsewhere, scaled by ambient occlusion
//! - direct lights with shadowing from the active shadow map
//! - environment reflections, optionally refined by SSR
//! - self-illumination and linear fog
//!
//! With SSAO or SSR disabled the corresponding input is bound to a neutral
//! placeholder texture, so the shader has a single code path.

use rustc_hash::FxHashMap;

use crate::errors::Result;
use crate::renderer::pass::{color_attachment, fullscreen_pass};
use crate::renderer::pipeline::attachments::{AttachmentKey, COLOR_FORMAT};
use crate::renderer::pipeline::builder::{
    float_texture, fullscreen_pipeline, pipeline_layout, replace_target, sampler_binding, sampler_entry,
    texture_entry_dim, view_entry,
};
use crate::renderer::pipeline::context::{ExecuteContext, PassSetup, PipelinePass, PrepareContext};

/// Bind groups differ per attachment set and per SSAO / SSR toggle.
type CombineKey = (AttachmentKey, bool, bool);

pub struct CombinePass {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
    bind_groups: FxHashMap<CombineKey, wgpu::BindGroup>,
}

impl CombinePass {
    pub fn new(setup: &mut PassSetup) -> Result<Self> {
        let device = setup.device;
        let module = setup.shaders.get_or_compile(device, "combine", &setup.defines)?;
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Combine Layout"),
            entries: &[
                float_texture(0),
                float_texture(1),
                float_texture(2),
                float_texture(3),
                float_texture(4),
                float_texture(5),
                float_texture(6),
                float_texture(7),
                float_texture(8),
                texture_entry_dim(9, wgpu::TextureSampleType::Depth, wgpu::TextureViewDimension::D2Array),
                texture_entry_dim(10, wgpu::TextureSampleType::Depth, wgpu::TextureViewDimension::Cube),
                sampler_entry(11, wgpu::SamplerBindingType::Filtering),
                sampler_entry(12, wgpu::SamplerBindingType::Comparison),
            ],
        });
        let pipeline_layout = pipeline_layout(device, "Combine Pipeline Layout", &[&setup.layouts.frame, &layout]);
        let pipeline = fullscreen_pipeline(
            device,
            "Combine Pipeline",
            &module,
            &pipeline_layout,
            &[replace_target(COLOR_FORMAT), replace_target(COLOR_FORMAT)],
            None,
        );
        Ok(Self {
            layout,
            pipeline,
            bind_groups: FxHashMap::default(),
        })
    }
}

impl PipelinePass for CombinePass {
    fn name(&self) -> &'static str {
        "Combine Pass"
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) {
        let a = ctx.attachments;
        let (ssao, ssr) = (ctx.options.ssao, ctx.options.ssr);
        let placeholders = &ctx.textures.placeholders;
        let ao_view = if ssao { &a.ssao_blurred.view } else { &placeholders.ao_neutral.view };
        let ssr_view = if ssr { &a.ssr.view } else { &placeholders.ssr_neutral.view };

        self.bind_groups.entry((a.key(), ssao, ssr)).or_insert_with(|| {
            log::debug!("Creating combine bind group (ssao: {ssao}, ssr: {ssr})");
            ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Combine Bind Group"),
                layout: &self.layout,
                entries: &[
                    view_entry(0, &a.diffuse.view),
                    view_entry(1, &a.lightmap.view),
                    view_entry(2, &a.envmap.view),
                    view_entry(3, &a.self_illum.view),
                    view_entry(4, &a.features.view),
                    view_entry(5, &a.eye_position.view),
                    view_entry(6, &a.eye_normal.view),
                    view_entry(7, ao_view),
                    view_entry(8, ssr_view),
                    view_entry(9, &a.shadow_cascades.view),
                    view_entry(10, &a.shadow_cube.view),
                    sampler_binding(11, &ctx.samplers.linear_clamp),
                    sampler_binding(12, &ctx.samplers.shadow),
                ],
            })
        });
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        let key: CombineKey = (ctx.attachments.key(), ctx.options.ssao, ctx.options.ssr);
        let Some(bind_group) = self.bind_groups.get(&key) else {
            return;
        };
        let (_, frame_group) = ctx.frame.frame_group();
        let a = ctx.attachments;
        fullscreen_pass(
            encoder,
            "Combine",
            &[
                color_attachment(&a.opaque_color.view, Some(wgpu::Color::TRANSPARENT)),
                color_attachment(&a.bright.view, Some(wgpu::Color::TRANSPARENT)),
            ],
            &self.pipeline,
            &[frame_group, bind_group],
        );
    }
}
