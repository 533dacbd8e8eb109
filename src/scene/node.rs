use glam::Mat4;

use crate::scene::NodeId;
use crate::scene::camera::CameraNode;
use crate::scene::emitter::{EmitterNode, ParticleNode};
use crate::scene::light::LightNode;
use crate::scene::mesh::MeshNode;
use crate::scene::model::ModelSceneNode;
use crate::scene::trigger::TriggerNode;

/// Node payload. Every consumer matches on it exhaustively.
#[derive(Debug, Clone)]
pub enum SceneNodeKind {
    Dummy,
    Camera(CameraNode),
    Mesh(Box<MeshNode>),
    Light(LightNode),
    Emitter(Box<EmitterNode>),
    Particle(ParticleNode),
    Trigger(TriggerNode),
    Model(Box<ModelSceneNode>),
}

impl SceneNodeKind {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Dummy => "dummy",
            Self::Camera(_) => "camera",
            Self::Mesh(_) => "mesh",
            Self::Light(_) => "light",
            Self::Emitter(_) => "emitter",
            Self::Particle(_) => "particle",
            Self::Trigger(_) => "trigger",
            Self::Model(_) => "model",
        }
    }
}

/// A node of the scene graph arena.
///
/// Hierarchy links are arena indices: a node owns its children (removing it
/// removes them) and refers to its parent without owning it.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) local_transform: Mat4,
    pub(crate) absolute_transform: Mat4,
    /// Visibility flag of this node alone.
    pub visible: bool,
    /// `visible` combined with every ancestor's flag, refreshed with transforms.
    pub(crate) effective_visible: bool,
    pub kind: SceneNodeKind,
}

impl SceneNode {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: SceneNodeKind) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            local_transform: Mat4::IDENTITY,
            absolute_transform: Mat4::IDENTITY,
            visible: true,
            effective_visible: true,
            kind,
        }
    }

    #[must_use]
    pub fn with_transform(mut self, local: Mat4) -> Self {
        self.local_transform = local;
        self.absolute_transform = local;
        self
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn local_transform(&self) -> &Mat4 {
        &self.local_transform
    }

    #[inline]
    #[must_use]
    pub fn absolute_transform(&self) -> &Mat4 {
        &self.absolute_transform
    }

    #[inline]
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.effective_visible
    }
}
