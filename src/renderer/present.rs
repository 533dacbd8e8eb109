//! Presenter
//!
//! Draws a finished pipeline output into any color target: a swapchain
//! frame, a GUI layer, another render texture. The target is loaded, not
//! cleared, and the source is alpha blended over it, so several 3D widgets
//! can be composited into one frame by restricting each blit to a viewport.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::errors::Result;
use crate::renderer::pass::{begin_color_pass, color_attachment};
use crate::renderer::pipeline::attachments::RenderTexture;
use crate::renderer::pipeline::builder::{float_texture, pipeline_layout, sampler_binding, sampler_entry, view_entry};
use crate::renderer::shaders::{ShaderDefines, ShaderManager};

/// Destination rectangle in target pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[must_use]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Whether the rectangle covers at least one pixel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width < 1.0 || self.height < 1.0
    }
}

pub struct Presenter {
    module: Arc<wgpu::ShaderModule>,
    layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    /// One pipeline per target format, built on first use.
    pipelines: FxHashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
}

impl Presenter {
    pub fn new(device: &wgpu::Device, shaders: &mut ShaderManager) -> Result<Self> {
        let module = shaders.get_or_compile(device, "present", &ShaderDefines::default())?;
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Present Layout"),
            entries: &[float_texture(0), sampler_entry(1, wgpu::SamplerBindingType::Filtering)],
        });
        let pipeline_layout = pipeline_layout(device, "Present Pipeline Layout", &[&layout]);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Present Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            module,
            layout,
            pipeline_layout,
            sampler,
            pipelines: FxHashMap::default(),
        })
    }

    fn pipeline(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) -> &wgpu::RenderPipeline {
        let module: &wgpu::ShaderModule = &self.module;
        let pipeline_layout = &self.pipeline_layout;
        self.pipelines.entry(format).or_insert_with(|| {
            log::debug!("Creating present pipeline for {format:?}");
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Present Pipeline"),
                layout: Some(pipeline_layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_main"),
                    buffers: &[],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })
    }

    /// Records a blit of `source` into `target`, optionally restricted to
    /// `viewport`. An empty viewport records nothing.
    pub fn blit(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        source: &RenderTexture,
        target: &wgpu::TextureView,
        target_format: wgpu::TextureFormat,
        viewport: Option<Viewport>,
    ) {
        if viewport.is_some_and(|v| v.is_empty()) {
            return;
        }

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Present Bind Group"),
            layout: &self.layout,
            entries: &[view_entry(0, &source.view), sampler_binding(1, &self.sampler)],
        });
        let pipeline = self.pipeline(device, target_format);

        let mut pass = begin_color_pass(encoder, "Present", &[color_attachment(target, None)]);
        if let Some(v) = viewport {
            pass.set_viewport(v.x, v.y, v.width, v.height, 0.0, 1.0);
        }
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_smaller_than_a_pixel_is_empty() {
        assert!(Viewport::new(0.0, 0.0, 0.5, 10.0).is_empty());
        assert!(!Viewport::new(4.0, 4.0, 32.0, 16.0).is_empty());
    }
}
