//! Draw lists handed from the scene graph to the pipeline.

use std::sync::Arc;

use glam::{Vec2, Vec3};

use crate::resources::{BlendMode, Mesh, ShaderUniforms, Texture};
use crate::scene::NodeId;

#[derive(Debug, Clone)]
pub enum DrawGeometry {
    Mesh(Arc<Mesh>),
    /// Camera-facing quads, one per particle instance.
    Billboard { instances: u32 },
}

#[derive(Debug, Clone, Default)]
pub struct MaterialTextures {
    pub diffuse: Option<Arc<Texture>>,
    pub lightmap: Option<Arc<Texture>>,
    pub envmap: Option<Arc<Texture>>,
    pub bumpmap: Option<Arc<Texture>>,
}

#[derive(Debug, Clone)]
pub struct DrawCall {
    pub node: NodeId,
    pub geometry: DrawGeometry,
    pub textures: MaterialTextures,
    pub uniforms: ShaderUniforms,
    pub blend: BlendMode,
    /// Distance along the camera's view axis, used for ordering.
    pub view_depth: f32,
}

/// One flare element positioned in normalised device coordinates.
#[derive(Debug, Clone)]
pub struct LensFlareDraw {
    pub texture: Option<Arc<Texture>>,
    pub center: Vec2,
    /// Height of the flare quad in NDC units.
    pub size: f32,
    pub color: Vec3,
}
