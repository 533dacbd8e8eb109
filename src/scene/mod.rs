//! Scene graph module
//!
//! One [`SceneGraph`] per logical scene (the world, each 3D GUI widget):
//! - [`SceneNode`]: arena node with hierarchy links, transforms and a
//!   [`SceneNodeKind`] payload
//! - Camera, mesh, light, emitter/particle, trigger and model payloads
//! - Draw lists (`draw_opaque`, `draw_transparent`, `draw_shadows`,
//!   `draw_lens_flares`) consumed by the renderer

pub mod camera;
pub mod danglymesh;
pub mod draw;
pub mod emitter;
pub mod graph;
pub mod light;
pub mod manager;
pub mod mesh;
pub mod model;
pub mod node;
pub mod trigger;

pub use camera::{CameraNode, CameraView, Frustum};
pub use danglymesh::Danglymesh;
pub use draw::{DrawCall, DrawGeometry, LensFlareDraw, MaterialTextures};
pub use emitter::{EmitterNode, ParticleNode};
pub use graph::{FogSettings, SHADOW_FADE_SECONDS, SceneGraph};
pub use light::{ActiveLight, LightNode};
pub use manager::{MAIN_SCENE, SceneGraphs};
pub use mesh::MeshNode;
pub use model::ModelSceneNode;
pub use node::{SceneNode, SceneNodeKind};
pub use trigger::TriggerNode;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeId;
}
