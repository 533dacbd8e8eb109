//! Per-resolution render targets.
//!
//! One [`Attachments`] set exists per distinct `(width, height)` the
//! pipeline has been asked to draw at. Sets are created lazily and never
//! resized; a new resolution simply gets a new set.

use rustc_hash::FxHashMap;

use crate::errors::{OdysseyError, Result};
use crate::resources::NUM_SHADOW_CASCADES;

/// G-buffer color targets in attachment order: diffuse, lightmap, envmap,
/// self-illumination, features, eye-space position, eye-space normal.
pub const GBUFFER_FORMATS: [wgpu::TextureFormat; 7] = [
    wgpu::TextureFormat::Rgba8Unorm,
    wgpu::TextureFormat::Rgba8Unorm,
    wgpu::TextureFormat::Rgba8Unorm,
    wgpu::TextureFormat::Rgba8Unorm,
    wgpu::TextureFormat::Rg8Unorm,
    wgpu::TextureFormat::Rgba16Float,
    wgpu::TextureFormat::Rgba16Float,
];

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const SSAO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;
pub const OIT_ACCUM_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const OIT_REVEALAGE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R16Float;

/// Exact resolution an attachment set was created for.
pub type AttachmentKey = (u32, u32);

/// A texture together with its default view.
pub struct RenderTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

impl RenderTexture {
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        (width, height): (u32, u32),
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width,
            height,
            format,
        }
    }

    fn target(device: &wgpu::Device, label: &str, size: (u32, u32), format: wgpu::TextureFormat) -> Self {
        Self::new(
            device,
            label,
            size,
            format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        )
    }
}

/// Layered depth texture: the cascade array or the point light cube.
pub struct ShadowMap {
    pub texture: wgpu::Texture,
    /// Array or cube view sampled by the combine pass.
    pub view: wgpu::TextureView,
    /// One single-layer view per cascade or cube face, rendered into.
    pub layer_views: Vec<wgpu::TextureView>,
    pub resolution: u32,
}

impl ShadowMap {
    fn new(device: &wgpu::Device, label: &str, resolution: u32, layers: u32, cube: bool) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(if cube {
                wgpu::TextureViewDimension::Cube
            } else {
                wgpu::TextureViewDimension::D2Array
            }),
            array_layer_count: Some(layers),
            ..Default::default()
        });
        let layer_views = (0..layers)
            .map(|layer| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some(&format!("{label} Layer {layer}")),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();
        Self {
            texture,
            view,
            layer_views,
            resolution,
        }
    }
}

/// Every render target of one resolution.
pub struct Attachments {
    key: AttachmentKey,

    // G-buffer
    pub diffuse: RenderTexture,
    pub lightmap: RenderTexture,
    pub envmap: RenderTexture,
    pub self_illum: RenderTexture,
    pub features: RenderTexture,
    pub eye_position: RenderTexture,
    pub eye_normal: RenderTexture,
    pub depth: RenderTexture,

    // Shadows
    pub shadow_cascades: ShadowMap,
    pub shadow_cube: ShadowMap,

    // Screen-space effects (half resolution)
    pub ssao: RenderTexture,
    pub ssao_blurred: RenderTexture,
    pub ssr: RenderTexture,
    pub ssr_ping: RenderTexture,

    // Deferred combine and bloom
    pub opaque_color: RenderTexture,
    pub bright: RenderTexture,
    pub bright_blurred: RenderTexture,
    pub color_ping: RenderTexture,
    pub backdrop: RenderTexture,

    // Transparency
    pub oit_accum: RenderTexture,
    pub oit_revealage: RenderTexture,
    pub oit_depth: RenderTexture,

    // Composition and post
    pub composite: RenderTexture,
    pub post_ping: RenderTexture,
    pub output: RenderTexture,
}

impl Attachments {
    pub fn new(device: &wgpu::Device, (width, height): AttachmentKey, shadow_resolution: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(OdysseyError::InvalidResolution { width, height });
        }
        log::info!("Creating attachments for {width}x{height}");

        let full = (width, height);
        let half = ((width / 2).max(1), (height / 2).max(1));
        let target = |label: &str, size, format| RenderTexture::target(device, label, size, format);

        Ok(Self {
            key: full,
            diffuse: target("GBuffer Diffuse", full, GBUFFER_FORMATS[0]),
            lightmap: target("GBuffer Lightmap", full, GBUFFER_FORMATS[1]),
            envmap: target("GBuffer Envmap", full, GBUFFER_FORMATS[2]),
            self_illum: target("GBuffer Self Illumination", full, GBUFFER_FORMATS[3]),
            features: target("GBuffer Features", full, GBUFFER_FORMATS[4]),
            eye_position: target("GBuffer Eye Position", full, GBUFFER_FORMATS[5]),
            eye_normal: target("GBuffer Eye Normal", full, GBUFFER_FORMATS[6]),
            depth: target("GBuffer Depth", full, DEPTH_FORMAT),

            shadow_cascades: ShadowMap::new(
                device,
                "Shadow Cascades",
                shadow_resolution,
                NUM_SHADOW_CASCADES as u32,
                false,
            ),
            shadow_cube: ShadowMap::new(device, "Shadow Cube", shadow_resolution, 6, true),

            ssao: target("SSAO", half, SSAO_FORMAT),
            ssao_blurred: target("SSAO Blurred", half, SSAO_FORMAT),
            ssr: target("SSR", half, COLOR_FORMAT),
            ssr_ping: target("SSR Ping", half, COLOR_FORMAT),

            opaque_color: target("Opaque Color", full, COLOR_FORMAT),
            bright: target("Bright Pass", full, COLOR_FORMAT),
            bright_blurred: target("Bright Pass Blurred", full, COLOR_FORMAT),
            color_ping: target("Color Ping", full, COLOR_FORMAT),
            backdrop: target("Backdrop", full, COLOR_FORMAT),

            oit_accum: target("OIT Accumulation", full, OIT_ACCUM_FORMAT),
            oit_revealage: target("OIT Revealage", full, OIT_REVEALAGE_FORMAT),
            oit_depth: target("OIT Depth", full, DEPTH_FORMAT),

            composite: target("Composite", full, COLOR_FORMAT),
            post_ping: target("Post Ping", full, COLOR_FORMAT),
            output: RenderTexture::new(
                device,
                "Output",
                full,
                COLOR_FORMAT,
                wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
            ),
        })
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> AttachmentKey {
        self.key
    }

    #[must_use]
    pub fn half_size(&self) -> (u32, u32) {
        (self.ssao.width, self.ssao.height)
    }
}

/// Attachment sets keyed by exact resolution. Sets are boxed so a cached
/// set keeps its address while other resolutions come and go.
#[derive(Default)]
pub struct AttachmentCache {
    sets: FxHashMap<AttachmentKey, Box<Attachments>>,
}

impl AttachmentCache {
    /// Returns the set for `key`, creating it on first use.
    pub fn get_or_create(
        &mut self,
        device: &wgpu::Device,
        key: AttachmentKey,
        shadow_resolution: u32,
    ) -> Result<&Attachments> {
        if !self.sets.contains_key(&key) {
            let attachments = Attachments::new(device, key, shadow_resolution)?;
            self.sets.insert(key, Box::new(attachments));
        }
        self.sets
            .get(&key)
            .map(|set| &**set)
            .ok_or(OdysseyError::InvalidResolution { width: key.0, height: key.1 })
    }

    #[must_use]
    pub fn get(&self, key: AttachmentKey) -> Option<&Attachments> {
        self.sets.get(&key).map(|set| &**set)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn clear(&mut self) {
        self.sets.clear();
    }
}
