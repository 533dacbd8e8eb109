//! Texture service
//!
//! Uploads decoded [`Texture`]s on first use and hands out their views,
//! plus the built-in placeholders substituted for missing inputs. Material
//! bind groups (diffuse, lightmap, envmap, bumpmap) are cached by the ids of
//! the four textures they reference.

use rustc_hash::FxHashMap;

use crate::renderer::pass::next_binding_id;
use crate::resources::{Texture, TextureId, TextureKind};
use crate::scene::MaterialTextures;

/// GPU copy of an uploaded texture.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub kind: TextureKind,
    pub width: u32,
    pub height: u32,
}

impl GpuTexture {
    #[must_use]
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, texture: &Texture) -> Self {
        Self::from_pixels(
            device,
            queue,
            &texture.name,
            texture.kind,
            (texture.width, texture.height),
            wgpu::TextureFormat::Rgba8Unorm,
            &texture.pixels,
        )
    }

    fn from_pixels(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        kind: TextureKind,
        (width, height): (u32, u32),
        format: wgpu::TextureFormat,
        pixels: &[u8],
    ) -> Self {
        let layers = match kind {
            TextureKind::Image2D => 1,
            TextureKind::CubeMap => 6,
        };
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: layers,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let bytes_per_pixel = format.block_copy_size(None).unwrap_or(4);
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(width * bytes_per_pixel),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(match kind {
                TextureKind::Image2D => wgpu::TextureViewDimension::D2,
                TextureKind::CubeMap => wgpu::TextureViewDimension::Cube,
            }),
            ..Default::default()
        });

        Self {
            texture,
            view,
            kind,
            width,
            height,
        }
    }
}

/// Neutral inputs bound where a texture or a disabled pass output is missing.
pub struct Placeholders {
    /// Opaque white RGBA.
    pub white: GpuTexture,
    /// Transparent black RGBA.
    pub black: GpuTexture,
    /// Single channel, fully unoccluded.
    pub ao_neutral: GpuTexture,
    /// No reflection.
    pub ssr_neutral: GpuTexture,
    pub black_cube: GpuTexture,
    /// Tangent-space normal pointing straight out of the surface.
    pub flat_normal: GpuTexture,
}

impl Placeholders {
    fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let solid = |label: &str, format: wgpu::TextureFormat, pixel: &[u8]| {
            GpuTexture::from_pixels(device, queue, label, TextureKind::Image2D, (1, 1), format, pixel)
        };
        Self {
            white: solid("Placeholder White", wgpu::TextureFormat::Rgba8Unorm, &[255, 255, 255, 255]),
            black: solid("Placeholder Black", wgpu::TextureFormat::Rgba8Unorm, &[0, 0, 0, 0]),
            ao_neutral: solid("Placeholder AO", wgpu::TextureFormat::R8Unorm, &[255]),
            ssr_neutral: solid("Placeholder SSR", wgpu::TextureFormat::Rgba8Unorm, &[0, 0, 0, 0]),
            black_cube: GpuTexture::from_pixels(
                device,
                queue,
                "Placeholder Black Cube",
                TextureKind::CubeMap,
                (1, 1),
                wgpu::TextureFormat::Rgba8Unorm,
                &[0; 24],
            ),
            flat_normal: solid("Placeholder Flat Normal", wgpu::TextureFormat::Rgba8Unorm, &[128, 128, 255, 255]),
        }
    }
}

/// Ids of the four material textures; `0` marks an absent slot.
pub type MaterialKey = [u64; 4];

pub struct MaterialBindGroup {
    pub id: u64,
    pub bind_group: wgpu::BindGroup,
}

pub struct Textures {
    cache: FxHashMap<TextureId, GpuTexture>,
    pub placeholders: Placeholders,
    material_sampler: wgpu::Sampler,
    material_layout: wgpu::BindGroupLayout,
    material_groups: FxHashMap<MaterialKey, MaterialBindGroup>,
}

impl Textures {
    #[must_use]
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, anisotropy: u16) -> Self {
        let material_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            anisotropy_clamp: anisotropy.max(1),
            ..Default::default()
        });

        let texture_entry = |binding: u32, dimension: wgpu::TextureViewDimension| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: dimension,
                multisampled: false,
            },
            count: None,
        };
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Layout"),
            entries: &[
                texture_entry(0, wgpu::TextureViewDimension::D2),
                texture_entry(1, wgpu::TextureViewDimension::D2),
                texture_entry(2, wgpu::TextureViewDimension::Cube),
                texture_entry(3, wgpu::TextureViewDimension::D2),
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        Self {
            cache: FxHashMap::default(),
            placeholders: Placeholders::new(device, queue),
            material_sampler,
            material_layout,
            material_groups: FxHashMap::default(),
        }
    }

    /// Uploads `texture` unless it is already resident.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, texture: &Texture) -> &GpuTexture {
        self.cache.entry(texture.id()).or_insert_with(|| {
            log::debug!("Uploading texture '{}' ({}x{})", texture.name, texture.width, texture.height);
            GpuTexture::new(device, queue, texture)
        })
    }

    #[must_use]
    pub fn get(&self, id: TextureId) -> Option<&GpuTexture> {
        self.cache.get(&id)
    }

    /// Drops the GPU copy of a texture. Bind groups referencing it are
    /// dropped as well.
    pub fn evict(&mut self, id: TextureId) {
        if self.cache.remove(&id).is_some() {
            let raw = id.raw();
            self.material_groups.retain(|key, _| !key.contains(&raw));
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    #[must_use]
    pub fn material_layout(&self) -> &wgpu::BindGroupLayout {
        &self.material_layout
    }

    /// Uploads the material's textures and builds its bind group if needed.
    pub fn prepare_material(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        material: &MaterialTextures,
    ) -> MaterialKey {
        let slots = [
            material.diffuse.as_deref(),
            material.lightmap.as_deref(),
            material.envmap.as_deref(),
            material.bumpmap.as_deref(),
        ];
        let key = slots.map(|t| t.map_or(0, |t| t.id().raw()));
        if self.material_groups.contains_key(&key) {
            return key;
        }

        for texture in slots.iter().flatten() {
            self.upload(device, queue, texture);
        }

        let placeholders = &self.placeholders;
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Bind Group"),
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(material_view(&self.cache, slots[0], &placeholders.white, false)),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(material_view(&self.cache, slots[1], &placeholders.white, false)),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(material_view(&self.cache, slots[2], &placeholders.black_cube, true)),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(material_view(&self.cache, slots[3], &placeholders.flat_normal, false)),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&self.material_sampler),
                },
            ],
        });

        let id = next_binding_id();
        self.material_groups.insert(key, MaterialBindGroup { id, bind_group });
        key
    }

    #[must_use]
    pub fn material(&self, key: &MaterialKey) -> Option<&MaterialBindGroup> {
        self.material_groups.get(key)
    }
}

fn material_view<'a>(
    cache: &'a FxHashMap<TextureId, GpuTexture>,
    texture: Option<&Texture>,
    fallback: &'a GpuTexture,
    cube: bool,
) -> &'a wgpu::TextureView {
    let Some(texture) = texture else {
        return &fallback.view;
    };
    match cache.get(&texture.id()) {
        Some(gpu) if (gpu.kind == TextureKind::CubeMap) == cube => &gpu.view,
        Some(_) => {
            log::warn!("Texture '{}' has the wrong dimension for its slot", texture.name);
            &fallback.view
        }
        None => &fallback.view,
    }
}
