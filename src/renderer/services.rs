//! Graphics Services
//!
//! The leaf services every pipeline shares, constructed once and passed
//! explicitly to whoever renders:
//!
//! - [`GraphicsContext`]: device and queue
//! - [`Textures`] and [`Meshes`]: GPU copies of decoded resources
//! - [`ShaderManager`]: template rendering and module cache
//! - [`GraphicsOptions`]: configuration, read-only once the services exist

use crate::errors::Result;
use crate::renderer::context::GraphicsContext;
use crate::renderer::meshes::Meshes;
use crate::renderer::settings::GraphicsOptions;
use crate::renderer::shaders::ShaderManager;
use crate::renderer::textures::Textures;

pub struct GraphicsServices {
    pub context: GraphicsContext,
    pub textures: Textures,
    pub meshes: Meshes,
    pub shaders: ShaderManager,
    /// Pipelines bake `pbr` and `shadow_resolution` in when built, so the
    /// options cannot change afterwards.
    pub(crate) options: GraphicsOptions,
}

impl GraphicsServices {
    /// Builds the services on an existing context. Options are sanitized
    /// first.
    pub fn new(context: GraphicsContext, options: GraphicsOptions) -> Result<Self> {
        let options = options.sanitized();
        let textures = Textures::new(&context.device, &context.queue, options.anisotropy);
        let meshes = Meshes::new(&context.device);
        let shaders = ShaderManager::new()?;

        log::info!(
            "Graphics services ready (ssao: {}, ssr: {}, fxaa: {}, sharpen: {}, pbr: {}, shadows: {})",
            options.ssao,
            options.ssr,
            options.fxaa,
            options.sharpen,
            options.pbr,
            options.shadow_resolution
        );

        Ok(Self {
            context,
            textures,
            meshes,
            shaders,
            options,
        })
    }

    /// Blocking constructor on a headless context.
    pub fn new_headless(options: GraphicsOptions) -> Result<Self> {
        let context = pollster::block_on(GraphicsContext::new_headless())?;
        Self::new(context, options)
    }

    /// Sanitized options the services were built with.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &GraphicsOptions {
        &self.options
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.context.device
    }

    #[inline]
    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.context.queue
    }
}
