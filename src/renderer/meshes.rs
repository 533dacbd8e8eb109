//! Mesh service: vertex and index buffers uploaded on first use.

use rustc_hash::FxHashMap;
use wgpu::util::DeviceExt;

use crate::resources::{Mesh, MeshId};

pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    /// Identity used for redundant-bind elimination.
    pub id: u64,
}

impl GpuMesh {
    #[must_use]
    pub fn new(device: &wgpu::Device, mesh: &Mesh) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertices", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Indices", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
            id: mesh.id().raw(),
        }
    }
}

pub struct Meshes {
    cache: FxHashMap<MeshId, GpuMesh>,
    billboard: GpuMesh,
}

impl Meshes {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            cache: FxHashMap::default(),
            billboard: GpuMesh::new(device, &Mesh::quad("Billboard", 1.0, 1.0)),
        }
    }

    /// Uploads `mesh` unless it is already resident. Meshes without
    /// geometry are never uploaded.
    pub fn upload(&mut self, device: &wgpu::Device, mesh: &Mesh) -> Option<&GpuMesh> {
        if mesh.vertices.is_empty() || mesh.indices.is_empty() {
            log::debug!("Mesh '{}' has no geometry, skipping upload", mesh.name);
            return None;
        }
        Some(self.cache.entry(mesh.id()).or_insert_with(|| {
            log::debug!(
                "Uploading mesh '{}' ({} vertices, {} indices)",
                mesh.name,
                mesh.vertices.len(),
                mesh.indices.len()
            );
            GpuMesh::new(device, mesh)
        }))
    }

    #[must_use]
    pub fn get(&self, id: MeshId) -> Option<&GpuMesh> {
        self.cache.get(&id)
    }

    pub fn evict(&mut self, id: MeshId) {
        self.cache.remove(&id);
    }

    /// Unit quad in the XY plane, used for particles and lens flares.
    #[must_use]
    pub fn billboard(&self) -> &GpuMesh {
        &self.billboard
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
