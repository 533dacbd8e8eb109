use rustc_hash::FxHashMap;

use crate::scene::graph::SceneGraph;

/// Name of the world scene graph.
pub const MAIN_SCENE: &str = "main";

/// Named scene graphs: the world plus one per 3D GUI widget.
#[derive(Default)]
pub struct SceneGraphs {
    scenes: FxHashMap<String, SceneGraph>,
}

impl SceneGraphs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SceneGraph> {
        self.scenes.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut SceneGraph> {
        self.scenes.get_mut(name)
    }

    /// Returns the named scene graph, creating an empty one first if needed.
    pub fn get_or_create(&mut self, name: &str) -> &mut SceneGraph {
        self.scenes.entry(name.to_owned()).or_insert_with(|| {
            log::debug!("Creating scene graph '{name}'");
            SceneGraph::new(name)
        })
    }

    pub fn remove(&mut self, name: &str) -> Option<SceneGraph> {
        let removed = self.scenes.remove(name);
        if removed.is_none() {
            log::warn!("Attempted to remove unknown scene graph '{name}'");
        }
        removed
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scenes.keys().map(String::as_str)
    }

    /// Advances every scene graph by `dt` seconds.
    pub fn update_all(&mut self, dt: f32) {
        for scene in self.scenes.values_mut() {
            scene.update(dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent() {
        let mut graphs = SceneGraphs::new();
        graphs.get_or_create(MAIN_SCENE).ambient_color = glam::Vec3::ONE;
        assert_eq!(graphs.get_or_create(MAIN_SCENE).ambient_color, glam::Vec3::ONE);
        assert_eq!(graphs.names().count(), 1);
        assert!(graphs.remove(MAIN_SCENE).is_some());
        assert!(graphs.get(MAIN_SCENE).is_none());
    }
}
