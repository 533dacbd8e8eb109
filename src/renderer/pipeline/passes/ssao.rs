//! SSAO Pass
//!
//! Hemisphere ambient occlusion at half resolution. The sample kernel and
//! the 4×4 rotation noise are generated once with fixed seeds, so the
//! result is stable across frames. Skipped when SSAO is disabled; the
//! combine pass then reads a neutral placeholder instead.

use rustc_hash::FxHashMap;
use wgpu::util::DeviceExt;

use crate::errors::Result;
use crate::renderer::pass::{color_attachment, fullscreen_pass};
use crate::renderer::pipeline::attachments::{AttachmentKey, SSAO_FORMAT};
use crate::renderer::pipeline::builder::{
    float_texture, fullscreen_pipeline, pipeline_layout, replace_target, uniform_entry, view_entry,
};
use crate::renderer::pipeline::context::{ExecuteContext, PassSetup, PipelinePass, PrepareContext};
use crate::resources::ssao::{generate_ssao_kernel, generate_ssao_noise};

pub struct SsaoPass {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
    kernel_buffer: wgpu::Buffer,
    noise_view: wgpu::TextureView,
    bind_groups: FxHashMap<AttachmentKey, wgpu::BindGroup>,
}

impl SsaoPass {
    pub fn new(setup: &mut PassSetup) -> Result<Self> {
        let device = setup.device;
        let module = setup.shaders.get_or_compile(device, "ssao", &setup.defines)?;

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SSAO Layout"),
            entries: &[
                float_texture(0),
                float_texture(1),
                float_texture(2),
                uniform_entry(3, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let pipeline_layout = pipeline_layout(device, "SSAO Pipeline Layout", &[&setup.layouts.frame, &layout]);
        let pipeline = fullscreen_pipeline(
            device,
            "SSAO Pipeline",
            &module,
            &pipeline_layout,
            &[replace_target(SSAO_FORMAT)],
            None,
        );

        let kernel = generate_ssao_kernel();
        let kernel_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("SSAO Kernel"),
            contents: bytemuck::bytes_of(&kernel),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let noise = generate_ssao_noise();
        let noise_texture = device.create_texture_with_data(
            setup.queue,
            &wgpu::TextureDescriptor {
                label: Some("SSAO Noise"),
                size: wgpu::Extent3d {
                    width: 4,
                    height: 4,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            bytemuck::cast_slice(&noise),
        );
        let noise_view = noise_texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            layout,
            pipeline,
            kernel_buffer,
            noise_view,
            bind_groups: FxHashMap::default(),
        })
    }
}

impl PipelinePass for SsaoPass {
    fn name(&self) -> &'static str {
        "SSAO Pass"
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) {
        if !ctx.options.ssao {
            return;
        }
        let a = ctx.attachments;
        self.bind_groups.entry(a.key()).or_insert_with(|| {
            ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("SSAO Bind Group"),
                layout: &self.layout,
                entries: &[
                    view_entry(0, &a.eye_position.view),
                    view_entry(1, &a.eye_normal.view),
                    view_entry(2, &self.noise_view),
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: self.kernel_buffer.as_entire_binding(),
                    },
                ],
            })
        });
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        if !ctx.options.ssao {
            return;
        }
        let Some(bind_group) = self.bind_groups.get(&ctx.attachments.key()) else {
            return;
        };
        let (_, frame_group) = ctx.frame.frame_group();
        fullscreen_pass(
            encoder,
            "SSAO",
            &[color_attachment(&ctx.attachments.ssao.view, Some(wgpu::Color::WHITE))],
            &self.pipeline,
            &[frame_group, bind_group],
        );
    }
}
