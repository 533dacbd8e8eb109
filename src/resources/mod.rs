//! Decoded, CPU-side resources consumed by the scene graph and renderer.
//!
//! Resource formats (TPC, MDL, ...) are parsed elsewhere; the types here are
//! the already-decoded results.

pub mod animation;
pub mod mesh;
pub mod model;
pub mod ssao;
pub mod texture;
pub mod uniforms;

pub use animation::{Animation, AnimationState, Keyframe, NodeTrack};
pub use mesh::{
    BlendMode, BoundingBox, DanglymeshParams, Mesh, MeshId, MeshMaterial, ModelMesh, Skin,
    UvAnimation, Vertex,
};
pub use model::{
    DynamicType, EmitterDesc, LensFlare, Lifetime3, LightDesc, Model, ModelNode, ModelNodePayload,
};
pub use ssao::{SsaoSettings, SsrSettings};
pub use texture::{Texture, TextureFeatures, TextureId, TextureKind};
pub use uniforms::{
    DrawFeatures, FrameUniforms, GeneralUniforms, GpuLight, ParticleInstance, ShaderUniforms,
    MAX_BONES, MAX_LIGHTS, MAX_PARTICLES_PER_DRAW, NUM_SHADOW_CASCADES, NUM_SSAO_SAMPLES,
};
