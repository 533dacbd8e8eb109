use glam::{Mat4, Vec3};

use crate::resources::{BlendMode, DrawFeatures, GeneralUniforms, ModelMesh, ShaderUniforms};
use crate::scene::NodeId;
use crate::scene::danglymesh::Danglymesh;

/// Mesh payload of a scene node.
#[derive(Debug, Clone)]
pub struct MeshNode {
    pub data: ModelMesh,
    /// Owning model instance, if instantiated from a model.
    pub model: Option<NodeId>,
    pub affected_by_fog: bool,
    /// Alpha multiplier applied on top of the material alpha.
    pub alpha: f32,
    /// Resolved skin bones; `None` where the node number was not found.
    pub bones: Vec<Option<NodeId>>,
    pub danglymesh: Option<Danglymesh>,
    /// World-space force pushing the danglymesh, overriding the motion of the node.
    pub applied_force: Option<Vec3>,
    /// World position at the previous update, used to derive danglymesh force.
    pub(crate) last_world_position: Option<Vec3>,
}

impl MeshNode {
    #[must_use]
    pub fn new(data: ModelMesh) -> Self {
        let danglymesh = data.danglymesh.map(Danglymesh::new);
        Self {
            data,
            model: None,
            affected_by_fog: true,
            alpha: 1.0,
            bones: Vec::new(),
            danglymesh,
            applied_force: None,
            last_world_position: None,
        }
    }

    #[must_use]
    pub fn effective_alpha(&self) -> f32 {
        self.alpha * self.data.material.alpha
    }

    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.data.material.blend != BlendMode::Opaque || self.effective_alpha() < 1.0
    }

    /// Whether the node produces a draw at all.
    ///
    /// The deferred G-buffer path also needs a diffuse texture; forward
    /// transparency does not.
    #[must_use]
    pub fn should_render(&self, deferred: bool) -> bool {
        let material = &self.data.material;
        if !material.render || material.aabb_only {
            return false;
        }
        if self.data.mesh.indices.is_empty() || self.effective_alpha() <= 0.0 {
            return false;
        }
        !(deferred && material.diffuse.is_none())
    }

    #[must_use]
    pub fn casts_shadows(&self) -> bool {
        self.data.material.casts_shadows && !self.is_transparent() && self.should_render(false)
    }

    /// Builds the per-draw uniforms for a node with the given absolute transform.
    ///
    /// `time` drives UV scrolling and bumpmap frame cycling.
    #[must_use]
    pub fn build_uniforms(&self, absolute: Mat4, time: f32) -> ShaderUniforms {
        let material = &self.data.material;
        let mut general = GeneralUniforms::from_transform(absolute);
        general.color = material.diffuse_color.extend(self.effective_alpha());
        general.self_illum = material.self_illum_color.extend(1.0);

        let mut features = DrawFeatures::empty();
        if material.diffuse.is_some() {
            features |= DrawFeatures::DIFFUSE;
        }
        if material.lightmap.is_some() {
            features |= DrawFeatures::LIGHTMAP;
        }
        if material.envmap.is_some() {
            features |= DrawFeatures::ENVMAP;
        }
        if let Some(bumpmap) = &material.bumpmap {
            features |= DrawFeatures::BUMPMAP;
            if bumpmap.features.grayscale {
                features |= DrawFeatures::GRAYSCALE_BUMP;
            }
            general.bumpmap_rect = bumpmap.frame_rect(bumpmap.frame_at(time));
        }
        if self.affected_by_fog {
            features |= DrawFeatures::FOG;
        }
        if material.blend == BlendMode::Additive {
            features |= DrawFeatures::ADDITIVE;
        }
        if let Some(anim) = &self.data.uv_animation {
            general.uv_offset = anim.offset_at(time).extend(0.0).extend(0.0);
        }
        general.set_features(features);

        let mut uniforms = ShaderUniforms::new(general);
        if let Some(dangly) = &self.danglymesh {
            uniforms.set_danglymesh_stride(dangly.stride());
        }
        uniforms
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::resources::{Mesh, MeshMaterial, Texture};

    fn node(diffuse: bool) -> MeshNode {
        let material = MeshMaterial {
            diffuse: diffuse.then(|| Arc::new(Texture::solid("d", [255; 4]))),
            ..MeshMaterial::default()
        };
        MeshNode::new(ModelMesh::new(Arc::new(Mesh::quad("q", 1.0, 1.0)), material))
    }

    #[test]
    fn deferred_path_requires_diffuse() {
        assert!(node(true).should_render(true));
        assert!(!node(false).should_render(true));
        assert!(node(false).should_render(false));
    }

    #[test]
    fn zero_alpha_and_debug_nodes_are_skipped() {
        let mut n = node(true);
        n.alpha = 0.0;
        assert!(!n.should_render(true));

        let mut n = node(true);
        n.data.material.aabb_only = true;
        assert!(!n.should_render(false));
    }

    #[test]
    fn uniforms_carry_material_features() {
        let n = node(true);
        let u = n.build_uniforms(Mat4::IDENTITY, 0.0);
        let f = u.general.features();
        assert!(f.contains(DrawFeatures::DIFFUSE | DrawFeatures::FOG));
        assert!(!f.contains(DrawFeatures::LIGHTMAP));
        assert_eq!(u.general.color.w, 1.0);
    }
}
