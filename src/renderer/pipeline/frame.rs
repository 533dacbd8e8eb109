//! Per-frame GPU state.
//!
//! [`FrameResources`] owns everything that is rewritten once per frame:
//!
//! - the [`FrameUniforms`] block (group 0, binding 0)
//! - storage arrays for bone matrices and particle instances (group 0)
//! - [`DynamicUniforms`] holding every draw's [`GeneralUniforms`] (group 1)
//! - the shadow view block, one entry per cascade or cube face
//! - the [`DrawPacket`] lists the geometry passes replay
//!
//! Buffers grow on demand and are never shrunk; a regrown buffer gets a new
//! bind group.

use std::num::NonZeroU64;

use bytemuck::Pod;
use glam::Mat4;

use crate::renderer::meshes::Meshes;
use crate::renderer::pass::next_binding_id;
use crate::renderer::textures::{MaterialKey, Textures};
use crate::resources::uniforms::{ShadowViewUniforms, UNIFORM_STRIDE};
use crate::resources::{BlendMode, FrameUniforms, GeneralUniforms, MeshId, ParticleInstance};
use crate::scene::{DrawCall, DrawGeometry};

/// Shadow view slots: cascades first, then cube faces.
pub const SHADOW_VIEW_COUNT: usize = crate::resources::NUM_SHADOW_CASCADES + 6;

// ============================================================================
// Dynamic uniforms
// ============================================================================

/// Growable uniform buffer addressed with dynamic offsets.
///
/// Every entry occupies [`UNIFORM_STRIDE`] bytes regardless of its size.
pub struct DynamicUniforms {
    label: &'static str,
    data: Vec<u8>,
    buffer: wgpu::Buffer,
    binding_size: u64,
    bind_group: wgpu::BindGroup,
    bind_group_id: u64,
}

impl DynamicUniforms {
    const INITIAL_ENTRIES: u64 = 128;

    #[must_use]
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &'static str, binding_size: u64) -> Self {
        let buffer = Self::create_buffer(device, label, Self::INITIAL_ENTRIES * UNIFORM_STRIDE);
        let bind_group = Self::create_bind_group(device, layout, label, &buffer, binding_size);
        Self {
            label,
            data: Vec::new(),
            buffer,
            binding_size,
            bind_group,
            bind_group_id: next_binding_id(),
        }
    }

    fn create_buffer(device: &wgpu::Device, label: &str, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        buffer: &wgpu::Buffer,
        binding_size: u64,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: 0,
                    size: NonZeroU64::new(binding_size),
                }),
            }],
        })
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Appends `value` and returns its dynamic offset.
    pub fn push<T: Pod>(&mut self, value: &T) -> u32 {
        let offset = self.data.len();
        let bytes = bytemuck::bytes_of(value);
        self.data.extend_from_slice(bytes);
        self.data.resize(offset + UNIFORM_STRIDE as usize, 0);
        offset as u32
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / UNIFORM_STRIDE as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Uploads the collected entries, regrowing the buffer if needed.
    pub fn write_and_expand(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, layout: &wgpu::BindGroupLayout) {
        if self.data.is_empty() {
            return;
        }
        let required = self.data.len() as u64;
        if required > self.buffer.size() {
            let size = required.next_power_of_two();
            log::info!("Recreating BindGroup for {} (Buffer Resized to {size} bytes)", self.label);
            self.buffer = Self::create_buffer(device, self.label, size);
            self.bind_group = Self::create_bind_group(device, layout, self.label, &self.buffer, self.binding_size);
            self.bind_group_id = next_binding_id();
        }
        queue.write_buffer(&self.buffer, 0, &self.data);
    }

    #[must_use]
    pub fn bind_group(&self) -> (u64, &wgpu::BindGroup) {
        (self.bind_group_id, &self.bind_group)
    }
}

// ============================================================================
// Storage arrays
// ============================================================================

/// Growable read-only storage buffer of `T`.
pub struct StorageArray<T: Pod> {
    label: &'static str,
    data: Vec<T>,
    buffer: wgpu::Buffer,
}

impl<T: Pod> StorageArray<T> {
    const INITIAL_CAPACITY: u64 = 256;

    fn new(device: &wgpu::Device, label: &'static str) -> Self {
        Self {
            label,
            data: Vec::new(),
            buffer: Self::create_buffer(device, label, Self::INITIAL_CAPACITY * Self::element_size()),
        }
    }

    fn element_size() -> u64 {
        std::mem::size_of::<T>() as u64
    }

    fn create_buffer(device: &wgpu::Device, label: &str, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Appends `items` and returns the index of the first one.
    pub fn push_slice(&mut self, items: &[T]) -> u32 {
        let start = self.data.len() as u32;
        self.data.extend_from_slice(items);
        start
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Uploads the collected items. Returns `true` when the buffer was
    /// recreated and bind groups referencing it must be rebuilt.
    fn write_and_expand(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> bool {
        let required = self.data.len() as u64 * Self::element_size();
        let mut recreated = false;
        if required > self.buffer.size() {
            let size = required.next_power_of_two();
            log::info!("Resizing {} to {size} bytes", self.label);
            self.buffer = Self::create_buffer(device, self.label, size);
            recreated = true;
        }
        if !self.data.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&self.data));
        }
        recreated
    }
}

// ============================================================================
// Draw packets
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketGeometry {
    Mesh(MeshId),
    Billboard,
}

/// A draw call reduced to the handles a pass needs to replay it.
#[derive(Debug, Clone, Copy)]
pub struct DrawPacket {
    pub object_offset: u32,
    pub material: Option<MaterialKey>,
    pub geometry: PacketGeometry,
    pub instances: u32,
    pub blend: BlendMode,
}

/// Draw lists of one frame, as produced by the scene graph.
#[derive(Default)]
pub struct DrawLists {
    pub shadows: Vec<DrawCall>,
    pub opaque: Vec<DrawCall>,
    pub transparent: Vec<DrawCall>,
}

#[derive(Default)]
pub struct FramePackets {
    pub shadows: Vec<DrawPacket>,
    pub opaque: Vec<DrawPacket>,
    pub transparent: Vec<DrawPacket>,
}

impl FramePackets {
    fn clear(&mut self) {
        self.shadows.clear();
        self.opaque.clear();
        self.transparent.clear();
    }
}

// ============================================================================
// Frame resources
// ============================================================================

pub struct FrameLayouts {
    /// Frame uniforms plus bone and particle storage.
    pub frame: wgpu::BindGroupLayout,
    /// Per-draw [`GeneralUniforms`], dynamic offset.
    pub object: wgpu::BindGroupLayout,
    /// Per-view [`ShadowViewUniforms`], dynamic offset.
    pub shadow_view: wgpu::BindGroupLayout,
}

impl FrameLayouts {
    fn new(device: &wgpu::Device) -> Self {
        let storage = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let frame = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(std::mem::size_of::<FrameUniforms>() as u64),
                    },
                    count: None,
                },
                storage(1),
                storage(2),
            ],
        });

        let dynamic = |label, size: usize| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: NonZeroU64::new(size as u64),
                    },
                    count: None,
                }],
            })
        };

        Self {
            frame,
            object: dynamic("Object Layout", std::mem::size_of::<GeneralUniforms>()),
            shadow_view: dynamic("Shadow View Layout", std::mem::size_of::<ShadowViewUniforms>()),
        }
    }
}

pub struct FrameResources {
    pub layouts: FrameLayouts,
    uniform_buffer: wgpu::Buffer,
    bones: StorageArray<Mat4>,
    particles: StorageArray<ParticleInstance>,
    frame_group: wgpu::BindGroup,
    frame_group_id: u64,
    pub objects: DynamicUniforms,
    pub shadow_views: DynamicUniforms,
    pub packets: FramePackets,
}

impl FrameResources {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let layouts = FrameLayouts::new(device);
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bones = StorageArray::new(device, "Bone Matrices");
        let particles = StorageArray::new(device, "Particle Instances");
        let frame_group = Self::create_frame_group(device, &layouts.frame, &uniform_buffer, &bones, &particles);
        let objects = DynamicUniforms::new(
            device,
            &layouts.object,
            "Object Uniforms",
            std::mem::size_of::<GeneralUniforms>() as u64,
        );
        let shadow_views = DynamicUniforms::new(
            device,
            &layouts.shadow_view,
            "Shadow View Uniforms",
            std::mem::size_of::<ShadowViewUniforms>() as u64,
        );

        Self {
            layouts,
            uniform_buffer,
            bones,
            particles,
            frame_group,
            frame_group_id: next_binding_id(),
            objects,
            shadow_views,
            packets: FramePackets::default(),
        }
    }

    fn create_frame_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniform_buffer: &wgpu::Buffer,
        bones: &StorageArray<Mat4>,
        particles: &StorageArray<ParticleInstance>,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: bones.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: particles.buffer.as_entire_binding(),
                },
            ],
        })
    }

    /// Rebuilds every per-frame buffer and packet list.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        textures: &mut Textures,
        meshes: &mut Meshes,
        uniforms: &FrameUniforms,
        shadow_views: &[ShadowViewUniforms; SHADOW_VIEW_COUNT],
        lists: &DrawLists,
    ) {
        self.objects.clear();
        self.shadow_views.clear();
        self.bones.clear();
        self.particles.clear();
        self.packets.clear();

        for view in shadow_views {
            self.shadow_views.push(view);
        }

        let mut packets = std::mem::take(&mut self.packets);
        for draw in &lists.shadows {
            if let Some(packet) = self.record(device, queue, None, meshes, draw) {
                packets.shadows.push(packet);
            }
        }
        for draw in &lists.opaque {
            if let Some(packet) = self.record(device, queue, Some(&mut *textures), meshes, draw) {
                packets.opaque.push(packet);
            }
        }
        for draw in &lists.transparent {
            if let Some(packet) = self.record(device, queue, Some(&mut *textures), meshes, draw) {
                packets.transparent.push(packet);
            }
        }
        self.packets = packets;

        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
        self.objects.write_and_expand(device, queue, &self.layouts.object);
        self.shadow_views.write_and_expand(device, queue, &self.layouts.shadow_view);
        let bones_resized = self.bones.write_and_expand(device, queue);
        let particles_resized = self.particles.write_and_expand(device, queue);
        if bones_resized || particles_resized {
            self.frame_group = Self::create_frame_group(
                device,
                &self.layouts.frame,
                &self.uniform_buffer,
                &self.bones,
                &self.particles,
            );
            self.frame_group_id = next_binding_id();
        }

        log::debug!(
            "Frame prepared: {} shadow, {} opaque, {} transparent draws, {} bones, {} particles",
            self.packets.shadows.len(),
            self.packets.opaque.len(),
            self.packets.transparent.len(),
            self.bones.len(),
            self.particles.len()
        );
    }

    /// Appends a draw's uniforms and sub-blocks and uploads its geometry.
    /// Returns `None` when the draw has nothing to rasterize.
    fn record(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        textures: Option<&mut Textures>,
        meshes: &mut Meshes,
        draw: &DrawCall,
    ) -> Option<DrawPacket> {
        let (geometry, instances) = match &draw.geometry {
            DrawGeometry::Mesh(mesh) => {
                meshes.upload(device, mesh)?;
                (PacketGeometry::Mesh(mesh.id()), 1)
            }
            DrawGeometry::Billboard { instances } if *instances > 0 => (PacketGeometry::Billboard, *instances),
            DrawGeometry::Billboard { .. } => return None,
        };

        let mut general = draw.uniforms.general;
        if let Some(bones) = &draw.uniforms.skeletal {
            // Slot 0 of every skeleton is the identity, so bone index -1 maps to it
            general.params.y = self.bones.push_slice(&[Mat4::IDENTITY]);
            self.bones.push_slice(bones);
        }
        if let Some(particles) = &draw.uniforms.particles {
            general.params.z = self.particles.push_slice(particles);
            general.params.w = particles.len() as u32;
        }

        let material = textures.map(|textures| textures.prepare_material(device, queue, &draw.textures));
        let object_offset = self.objects.push(&general);

        Some(DrawPacket {
            object_offset,
            material,
            geometry,
            instances,
            blend: draw.blend,
        })
    }

    #[must_use]
    pub fn frame_group(&self) -> (u64, &wgpu::BindGroup) {
        (self.frame_group_id, &self.frame_group)
    }

    /// Dynamic offset of shadow view `index`.
    #[must_use]
    pub fn shadow_view_offset(index: usize) -> u32 {
        (index as u64 * UNIFORM_STRIDE) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_view_offsets_are_stride_aligned() {
        assert_eq!(FrameResources::shadow_view_offset(0), 0);
        assert_eq!(FrameResources::shadow_view_offset(5), 5 * 256);
        assert_eq!(SHADOW_VIEW_COUNT, 10);
    }
}
