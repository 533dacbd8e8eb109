//! Decoded mesh data: interleaved vertices, indices and the per-mesh
//! material block that model nodes carry.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};

use crate::errors::{OdysseyError, Result};
use crate::resources::texture::Texture;

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u64);

impl MeshId {
    fn next() -> Self {
        Self(NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

// ============================================================================
// Vertex
// ============================================================================

/// Interleaved vertex shared by every geometry pass.
///
/// Bone indices are stored as floats with `-1.0` meaning "no bone"; the
/// shaders shift them by one so the identity matrix in slot 0 absorbs
/// unused influences.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv1: [f32; 2],
    pub uv2: [f32; 2],
    pub tangent: [f32; 4],
    pub bone_weights: [f32; 4],
    pub bone_indices: [f32; 4],
    /// Danglymesh constraint weight in `[0, 1]`.
    pub constraint: f32,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            normal: [0.0, 0.0, 1.0],
            uv1: [0.0; 2],
            uv2: [0.0; 2],
            tangent: [1.0, 0.0, 0.0, 1.0],
            bone_weights: [0.0; 4],
            bone_indices: [-1.0; 4],
            constraint: 0.0,
        }
    }
}

impl Vertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 8] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
        3 => Float32x2,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32,
    ];

    #[must_use]
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    #[must_use]
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv1: uv.to_array(),
            ..Self::default()
        }
    }
}

// ============================================================================
// Bounding Box
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    #[must_use]
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |bb, p| Self {
            min: bb.min.min(p),
            max: bb.max.max(p),
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    #[must_use]
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    #[must_use]
    pub fn corners(&self) -> [Vec3; 8] {
        [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    #[must_use]
    pub fn transform(&self, matrix: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self::from_points(self.corners().into_iter().map(|c| matrix.transform_point3(c)))
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

// ============================================================================
// Mesh
// ============================================================================

#[derive(Debug, Clone)]
pub struct Mesh {
    id: MeshId,
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub bounds: BoundingBox,
}

impl Mesh {
    pub fn new(name: impl Into<String>, vertices: Vec<Vertex>, indices: Vec<u32>) -> Result<Self> {
        let name = name.into();
        if indices.len() % 3 != 0 {
            return Err(OdysseyError::InvalidAsset {
                name,
                reason: format!("index count {} is not a multiple of 3", indices.len()),
            });
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(OdysseyError::InvalidAsset {
                name,
                reason: format!("index {bad} out of range for {} vertices", vertices.len()),
            });
        }
        let bounds = BoundingBox::from_points(vertices.iter().map(|v| Vec3::from_array(v.position)));
        Ok(Self {
            id: MeshId::next(),
            name,
            vertices,
            indices,
            bounds,
        })
    }

    /// Unit quad in the XY plane facing +Z, centered on the origin.
    #[must_use]
    pub fn quad(name: impl Into<String>, width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        let n = Vec3::Z;
        let vertices = vec![
            Vertex::new(Vec3::new(-hw, -hh, 0.0), n, Vec2::new(0.0, 1.0)),
            Vertex::new(Vec3::new(hw, -hh, 0.0), n, Vec2::new(1.0, 1.0)),
            Vertex::new(Vec3::new(hw, hh, 0.0), n, Vec2::new(1.0, 0.0)),
            Vertex::new(Vec3::new(-hw, hh, 0.0), n, Vec2::new(0.0, 0.0)),
        ];
        let bounds = BoundingBox::from_points(vertices.iter().map(|v| Vec3::from_array(v.position)));
        Self {
            id: MeshId::next(),
            name: name.into(),
            vertices,
            indices: vec![0, 1, 2, 0, 2, 3],
            bounds,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> MeshId {
        self.id
    }

    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

// ============================================================================
// Mesh node payload
// ============================================================================

/// Scrolling UV animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvAnimation {
    /// Offset per second.
    pub direction: Vec2,
    pub jitter: f32,
    pub jitter_speed: f32,
}

impl UvAnimation {
    #[must_use]
    pub fn offset_at(&self, elapsed: f32) -> Vec2 {
        let mut offset = self.direction * elapsed;
        if self.jitter > 0.0 {
            let phase = elapsed * self.jitter_speed;
            offset += Vec2::new(phase.sin(), phase.cos()) * self.jitter;
        }
        Vec2::new(offset.x.rem_euclid(1.0), offset.y.rem_euclid(1.0))
    }
}

/// Skeletal binding of a skinned mesh.
///
/// `bone_node_numbers[i]` names the model node driving bone slot `i`;
/// `inverse_bind_poses[i]` maps mesh space into that node's rest space.
#[derive(Debug, Clone, Default)]
pub struct Skin {
    pub bone_node_numbers: Vec<u16>,
    pub inverse_bind_poses: Vec<Mat4>,
}

/// Spring-decay parameters of a danglymesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DanglymeshParams {
    pub period: f32,
    pub tightness: f32,
    pub displacement: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Opaque,
    /// Alpha-weighted order independent transparency.
    Transparent,
    Additive,
}

/// Everything a model mesh node needs to be drawn.
#[derive(Debug, Clone)]
pub struct MeshMaterial {
    pub diffuse: Option<Arc<Texture>>,
    pub lightmap: Option<Arc<Texture>>,
    pub envmap: Option<Arc<Texture>>,
    pub bumpmap: Option<Arc<Texture>>,
    pub diffuse_color: Vec3,
    pub self_illum_color: Vec3,
    pub alpha: f32,
    pub blend: BlendMode,
    pub casts_shadows: bool,
    pub render: bool,
    /// Debug nodes that only carry bounds.
    pub aabb_only: bool,
}

impl Default for MeshMaterial {
    fn default() -> Self {
        Self {
            diffuse: None,
            lightmap: None,
            envmap: None,
            bumpmap: None,
            diffuse_color: Vec3::ONE,
            self_illum_color: Vec3::ZERO,
            alpha: 1.0,
            blend: BlendMode::Opaque,
            casts_shadows: true,
            render: true,
            aabb_only: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelMesh {
    pub mesh: Arc<Mesh>,
    pub material: MeshMaterial,
    pub uv_animation: Option<UvAnimation>,
    pub skin: Option<Skin>,
    pub danglymesh: Option<DanglymeshParams>,
}

impl ModelMesh {
    #[must_use]
    pub fn new(mesh: Arc<Mesh>, material: MeshMaterial) -> Self {
        Self {
            mesh,
            material,
            uv_animation: None,
            skin: None,
            danglymesh: None,
        }
    }
}
