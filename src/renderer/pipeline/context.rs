//! Pass Contexts
//!
//! Two phase-separated contexts, as in a render graph:
//!
//! - [`PrepareContext`]: mutable phase. Passes upload data and build bind
//!   groups for the current attachment set here.
//! - [`ExecuteContext`]: read-only phase. Passes record commands here.
//!
//! All mutation happens in `prepare`, so `run` can borrow every pass and
//! every resource immutably while a single encoder records the frame.

use crate::renderer::meshes::Meshes;
use crate::renderer::pipeline::attachments::Attachments;
use crate::renderer::pipeline::builder::Samplers;
use crate::renderer::pipeline::frame::{FrameLayouts, FrameResources};
use crate::renderer::settings::GraphicsOptions;
use crate::renderer::shaders::{ShaderDefines, ShaderManager};
use crate::renderer::textures::Textures;
use crate::scene::LensFlareDraw;

/// Kind of shadow map rendered this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowMode {
    Directional,
    Point,
}

/// Everything a pass needs to build its pipelines.
pub struct PassSetup<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub shaders: &'a mut ShaderManager,
    pub defines: ShaderDefines,
    pub layouts: &'a FrameLayouts,
    pub material_layout: &'a wgpu::BindGroupLayout,
}

pub struct PrepareContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub textures: &'a mut Textures,
    pub attachments: &'a Attachments,
    pub frame: &'a FrameResources,
    pub samplers: &'a Samplers,
    pub options: &'a GraphicsOptions,
    pub flares: &'a [LensFlareDraw],
}

pub struct ExecuteContext<'a> {
    pub attachments: &'a Attachments,
    pub frame: &'a FrameResources,
    pub textures: &'a Textures,
    pub meshes: &'a Meshes,
    pub options: &'a GraphicsOptions,
    pub shadow: Option<ShadowMode>,
}

/// One stage of the frame.
///
/// - `prepare` receives the mutable context and must finish all allocation
///   and uploads the stage needs.
/// - `run` records commands only.
pub trait PipelinePass {
    /// Debug group label.
    fn name(&self) -> &'static str;

    fn prepare(&mut self, _ctx: &mut PrepareContext) {}

    fn run(&self, ctx: &ExecuteContext, encoder: &mut wgpu::CommandEncoder);
}
