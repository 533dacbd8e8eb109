//! Blur Pass
//!
//! A chain of single-texture blur stages between attachments of the same
//! set. Each stage names its kernel variant (`box`, `gaussian9_h`, ...) and
//! selects its source and target with plain function pointers, so one type
//! serves the SSAO, SSR, bloom and backdrop blurs.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::errors::Result;
use crate::renderer::pass::{color_attachment, fullscreen_pass};
use crate::renderer::pipeline::attachments::{AttachmentKey, Attachments, RenderTexture};
use crate::renderer::pipeline::builder::{float_texture, fullscreen_pipeline, pipeline_layout, replace_target, view_entry};
use crate::renderer::pipeline::context::{ExecuteContext, PassSetup, PipelinePass, PrepareContext};
use crate::renderer::settings::GraphicsOptions;

pub type TextureSelector = fn(&Attachments) -> &RenderTexture;

/// Description of one blur stage.
#[derive(Clone, Copy)]
pub struct BlurStage {
    pub variant: &'static str,
    pub source: TextureSelector,
    pub target: TextureSelector,
    pub format: wgpu::TextureFormat,
}

struct CompiledStage {
    stage: BlurStage,
    pipeline: wgpu::RenderPipeline,
    bind_groups: FxHashMap<AttachmentKey, wgpu::BindGroup>,
}

pub struct BlurPass {
    name: &'static str,
    enabled: fn(&GraphicsOptions) -> bool,
    layout: wgpu::BindGroupLayout,
    /// One or two stages: a box blur or a separable pair.
    stages: SmallVec<[CompiledStage; 2]>,
}

impl BlurPass {
    pub fn new(
        setup: &mut PassSetup,
        name: &'static str,
        enabled: fn(&GraphicsOptions) -> bool,
        stages: &[BlurStage],
    ) -> Result<Self> {
        let device = setup.device;
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blur Layout"),
            entries: &[float_texture(0)],
        });
        let pipeline_layout = pipeline_layout(device, "Blur Pipeline Layout", &[&setup.layouts.frame, &layout]);

        let mut compiled = SmallVec::with_capacity(stages.len());
        for stage in stages {
            let module = setup
                .shaders
                .get_or_compile(device, "blur", &setup.defines.with_variant(stage.variant))?;
            let pipeline = fullscreen_pipeline(
                device,
                &format!("{name} {}", stage.variant),
                &module,
                &pipeline_layout,
                &[replace_target(stage.format)],
                None,
            );
            compiled.push(CompiledStage {
                stage: *stage,
                pipeline,
                bind_groups: FxHashMap::default(),
            });
        }

        Ok(Self {
            name,
            enabled,
            layout,
            stages: compiled,
        })
    }
}

impl PipelinePass for BlurPass {
    fn name(&self) -> &'static str {
        self.name
    }

    fn prepare(&mut self, ctx: &mut PrepareContext) {
        if !(self.enabled)(ctx.options) {
            return;
        }
        let a = ctx.attachments;
        for compiled in &mut self.stages {
            let source = (compiled.stage.source)(a);
            compiled.bind_groups.entry(a.key()).or_insert_with(|| {
                ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Blur Bind Group"),
                    layout: &self.layout,
                    entries: &[view_entry(0, &source.view)],
                })
            });
        }
    }

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder) {
        if !(self.enabled)(ctx.options) {
            return;
        }
        let (_, frame_group) = ctx.frame.frame_group();
        for compiled in &self.stages {
            let Some(bind_group) = compiled.bind_groups.get(&ctx.attachments.key()) else {
                continue;
            };
            let target = (compiled.stage.target)(ctx.attachments);
            fullscreen_pass(
                encoder,
                compiled.stage.variant,
                &[color_attachment(&target.view, Some(wgpu::Color::TRANSPARENT))],
                &compiled.pipeline,
                &[frame_group, bind_group],
            );
        }
    }
}
