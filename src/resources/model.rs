//! Model assets: a tree of numbered nodes with optional mesh, light and
//! emitter payloads, plus the animations that drive them.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec2, Vec3};

use crate::resources::animation::Animation;
use crate::resources::mesh::{BlendMode, ModelMesh};
use crate::resources::texture::Texture;

/// Aurora light dynamic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DynamicType {
    /// Baked into lightmaps; only lights dynamic geometry.
    #[default]
    Static,
    Dynamic,
}

#[derive(Debug, Clone)]
pub struct LensFlare {
    pub texture: Option<Arc<Texture>>,
    /// Position along the light-to-center axis, `0` at the light and `1` at the
    /// screen center.
    pub position: f32,
    pub size: f32,
    pub color: Vec3,
}

#[derive(Debug, Clone)]
pub struct LightDesc {
    pub color: Vec3,
    pub multiplier: f32,
    pub radius: f32,
    pub priority: u32,
    pub ambient_only: bool,
    pub directional: bool,
    pub casts_shadows: bool,
    pub dynamic_type: DynamicType,
    pub flares: Vec<LensFlare>,
}

impl Default for LightDesc {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            multiplier: 1.0,
            radius: 10.0,
            priority: 5,
            ambient_only: false,
            directional: false,
            casts_shadows: false,
            dynamic_type: DynamicType::Static,
            flares: Vec::new(),
        }
    }
}

/// Start, middle and end values of a particle property over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lifetime3<T> {
    pub start: T,
    pub mid: T,
    pub end: T,
}

impl<T: Copy> Lifetime3<T> {
    pub const fn constant(value: T) -> Self {
        Self { start: value, mid: value, end: value }
    }
}

#[derive(Debug, Clone)]
pub struct EmitterDesc {
    pub texture: Option<Arc<Texture>>,
    /// Particles per second.
    pub birthrate: f32,
    pub lifetime: f32,
    pub max_particles: u32,
    pub velocity: f32,
    pub random_velocity: f32,
    /// Cone half angle in radians around local +Z.
    pub spread: f32,
    pub size: Lifetime3<Vec2>,
    pub color: Lifetime3<Vec3>,
    pub alpha: Lifetime3<f32>,
    /// Lifetime fraction at which the middle values apply.
    pub percent_mid: f32,
    pub grid_x: u32,
    pub grid_y: u32,
    pub fps: f32,
    pub frame_start: u32,
    pub frame_end: u32,
    pub blend: BlendMode,
    /// Particle positions follow the emitter instead of staying in world space.
    pub local_space: bool,
}

impl Default for EmitterDesc {
    fn default() -> Self {
        Self {
            texture: None,
            birthrate: 10.0,
            lifetime: 1.0,
            max_particles: 64,
            velocity: 1.0,
            random_velocity: 0.0,
            spread: 0.0,
            size: Lifetime3::constant(Vec2::splat(0.25)),
            color: Lifetime3::constant(Vec3::ONE),
            alpha: Lifetime3::constant(1.0),
            percent_mid: 0.5,
            grid_x: 1,
            grid_y: 1,
            fps: 0.0,
            frame_start: 0,
            frame_end: 0,
            blend: BlendMode::Transparent,
            local_space: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ModelNodePayload {
    Dummy,
    Mesh(ModelMesh),
    Light(LightDesc),
    Emitter(EmitterDesc),
    /// Attachment point for another model (weapons, heads).
    Reference(Arc<Model>),
}

#[derive(Debug, Clone)]
pub struct ModelNode {
    pub name: String,
    pub number: u16,
    pub position: Vec3,
    pub orientation: Quat,
    pub payload: ModelNodePayload,
    pub children: Vec<ModelNode>,
}

impl ModelNode {
    #[must_use]
    pub fn new(name: impl Into<String>, number: u16, payload: ModelNodePayload) -> Self {
        Self {
            name: name.into(),
            number,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            payload,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_transform(mut self, position: Vec3, orientation: Quat) -> Self {
        self.position = position;
        self.orientation = orientation;
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: ModelNode) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn local_transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position)
    }

    /// Depth-first search by node number.
    #[must_use]
    pub fn find(&self, number: u16) -> Option<&ModelNode> {
        if self.number == number {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(number))
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    pub root: ModelNode,
    pub animations: Vec<Arc<Animation>>,
    pub affected_by_fog: bool,
}

impl Model {
    #[must_use]
    pub fn new(name: impl Into<String>, root: ModelNode) -> Self {
        Self {
            name: name.into(),
            root,
            animations: Vec::new(),
            affected_by_fog: true,
        }
    }

    #[must_use]
    pub fn animation(&self, name: &str) -> Option<&Arc<Animation>> {
        self.animations.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }
}
