//! Lens Flare Pass
//!
//! Draws the scene's visible flare elements as additive screen-space quads
//! on top of the finished image. Each element gets its own dynamic-offset
//! uniform entry; texture bind groups are cached per texture.

use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use rustc_hash::FxHashMap;

use crate::errors::Result;
use crate::renderer::pass::{begin_color_pass, color_attachment};
use crate::renderer::pipeline::attachments::COLOR_FORMAT;
use crate::renderer::pipeline::builder::{
    float_texture, pipeline_layout, sampler_binding, sampler_entry, view_entry,
};
use crate::renderer::pipeline::context::{ExecuteContext, PassSetup, PipelinePass, PrepareContext};
use crate::renderer::pipeline::frame::DynamicUniforms;
use crate::resources::TextureId;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct FlareUniforms {
    /// xy: NDC center, z: NDC height, w: viewport aspect.
    rect: Vec4,
    color: Vec4,
}

struct FlareDraw {
    offset: u32,
    texture: Option<TextureId>,
}

pub struct FlarePass {
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
    uniforms: DynamicUniforms,
    texture_groups: FxHashMap<Option<TextureId>, wgpu::BindGroup>,
    draws: Vec<FlareDraw>,
}

impl FlarePass {
    pub fn new(setup: &mut PassSetup) -> Result<Self> {
        let device = setup.device;
        let module = setup.shaders.get_or_compile(device, "flare", &setup.defines)?;

        let uniform_size = std::mem::size_of::<FlareUniforms>() as u64;
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Flare Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(uniform_size),
                },
                count: None,
            }],
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Flare Texture Layout"),
            entries: &[float_texture(0), sampler_entry(1, wgpu::SamplerBindingType::Filtering)],
        });
        let layout = pipeline_layout(device, "Flare Pipeline Layout", &[&uniform_layout, &texture_layout]);

        let additive = wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        };
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Flare Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: COLOR_FORMAT,
                    blend: Some(wgpu::BlendState {
                        color: additive,
                        alpha: additive,
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let uniforms = DynamicUniforms::new(device, &uniform_layout, "Flare Uniforms", uniform_size);

        Ok(Self {
            uniform_layout,
            texture_layout,
            pipeline,
            uniforms,
            texture_groups: FxHashMap::default(),
            draws: Vec::new(),
        })
    }
}

impl PipelinePass for FlarePass {
    fn name(&self) -> &'static str {
        "Lens Flare Pass"
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) {
        self.uniforms.clear();
        self.draws.clear();
        if ctx.flares.is_empty() {
            return;
        }

        let (width, height) = ctx.attachments.key();
        let aspect = width as f32 / height as f32;

        for flare in ctx.flares {
            let texture = flare.texture.as_deref();
            let id = texture.map(|t| t.id());
            if !self.texture_groups.contains_key(&id) {
                let view = match texture {
                    Some(texture) => &ctx.textures.upload(ctx.device, ctx.queue, texture).view,
                    None => &ctx.textures.placeholders.white.view,
                };
                let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Flare Texture Bind Group"),
                    layout: &self.texture_layout,
                    entries: &[view_entry(0, view), sampler_binding(1, &ctx.samplers.linear_clamp)],
                });
                self.texture_groups.insert(id, bind_group);
            }

            let offset = self.uniforms.push(&FlareUniforms {
                rect: Vec4::new(flare.center.x, flare.center.y, flare.size, aspect),
                color: flare.color.extend(1.0),
            });
            self.draws.push(FlareDraw { offset, texture: id });
        }

        self.uniforms.write_and_expand(ctx.device, ctx.queue, &self.uniform_layout);
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        if self.draws.is_empty() {
            return;
        }
        let (_, uniform_group) = self.uniforms.bind_group();
        let mut pass = begin_color_pass(encoder, "Lens Flares", &[color_attachment(&ctx.attachments.output.view, None)]);
        pass.set_pipeline(&self.pipeline);
        for draw in &self.draws {
            let Some(texture_group) = self.texture_groups.get(&draw.texture) else {
                continue;
            };
            pass.set_bind_group(0, uniform_group, &[draw.offset]);
            pass.set_bind_group(1, texture_group, &[]);
            pass.draw(0..6, 0..1);
        }
    }
}
