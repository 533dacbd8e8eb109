use std::sync::Arc;

use glam::{Quat, Vec3};
use rustc_hash::FxHashMap;

use crate::resources::{AnimationState, Model};
use crate::scene::NodeId;

/// Root of an instantiated model.
///
/// Keeps the lookup tables needed to resolve skin bones (by node number) and
/// animation tracks (by lower-cased node name), and the rest pose that
/// un-animated channels fall back to.
#[derive(Debug, Clone)]
pub struct ModelSceneNode {
    pub model: Arc<Model>,
    pub animation: Option<AnimationState>,
    pub(crate) nodes_by_number: FxHashMap<u16, NodeId>,
    pub(crate) nodes_by_name: FxHashMap<String, NodeId>,
    pub(crate) rest_pose: FxHashMap<NodeId, (Vec3, Quat)>,
}

impl ModelSceneNode {
    #[must_use]
    pub fn new(model: Arc<Model>) -> Self {
        Self {
            model,
            animation: None,
            nodes_by_number: FxHashMap::default(),
            nodes_by_name: FxHashMap::default(),
            rest_pose: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn node_by_number(&self, number: u16) -> Option<NodeId> {
        self.nodes_by_number.get(&number).copied()
    }

    #[must_use]
    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes_by_name.get(&name.to_ascii_lowercase()).copied()
    }

    /// Starts an animation by name. Returns `false` if the model has none by
    /// that name.
    pub fn play(&mut self, name: &str, looping: bool) -> bool {
        if self.model.animation(name).is_none() {
            log::warn!("Model '{}' has no animation '{}'", self.model.name, name);
            return false;
        }
        self.animation = Some(AnimationState::new(name, looping));
        true
    }

    pub fn stop(&mut self) {
        self.animation = None;
    }
}
