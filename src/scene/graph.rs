//! The scene graph: an arena of nodes plus the per-frame state the pipeline
//! queries (camera, lights, shadow light, fog, draw lists).

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::resources::{
    BlendMode, DrawFeatures, GeneralUniforms, LightDesc, MAX_BONES, MAX_LIGHTS,
    MAX_PARTICLES_PER_DRAW, Model, ModelMesh, ModelNode, ModelNodePayload, ShaderUniforms,
};
use crate::scene::NodeId;
use crate::scene::camera::{CameraNode, CameraView, Frustum};
use crate::scene::draw::{DrawCall, DrawGeometry, LensFlareDraw, MaterialTextures};
use crate::scene::emitter::{EmitterNode, ParticleNode};
use crate::scene::light::{ActiveLight, LightNode};
use crate::scene::mesh::MeshNode;
use crate::scene::model::ModelSceneNode;
use crate::scene::node::{SceneNode, SceneNodeKind};
use crate::scene::trigger::TriggerNode;

/// Time for a newly selected shadow light to reach full strength.
pub const SHADOW_FADE_SECONDS: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogSettings {
    pub enabled: bool,
    pub near: f32,
    pub far: f32,
    pub color: Vec3,
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            near: 0.0,
            far: 100.0,
            color: Vec3::ZERO,
        }
    }
}

pub struct SceneGraph {
    name: String,
    nodes: SlotMap<NodeId, SceneNode>,
    roots: Vec<NodeId>,
    active_camera: Option<NodeId>,
    time: f32,

    pub ambient_color: Vec3,
    pub fog: FogSettings,

    active_lights: Vec<ActiveLight>,
    shadow_light: Option<ActiveLight>,
    shadow_strength: f32,

    next_emitter_seed: u64,
}

impl SceneGraph {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: SlotMap::with_key(),
            roots: Vec::new(),
            active_camera: None,
            time: 0.0,
            ambient_color: Vec3::splat(0.2),
            fog: FogSettings::default(),
            active_lights: Vec::new(),
            shadow_light: None,
            shadow_strength: 0.0,
            next_emitter_seed: 0,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Seconds accumulated by [`update`](Self::update).
    #[must_use]
    pub fn time(&self) -> f32 {
        self.time
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// Inserts a node under `parent` (or as a root) and resolves its
    /// absolute transform.
    pub fn add_node(&mut self, node: SceneNode, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.insert(node);
        match parent {
            Some(parent_id) if self.nodes.contains_key(parent_id) => {
                self.nodes[parent_id].children.push(id);
                self.nodes[id].parent = Some(parent_id);
            }
            Some(parent_id) => {
                log::warn!("Parent {parent_id:?} not found, adding node as root");
                self.roots.push(id);
            }
            None => self.roots.push(id),
        }
        self.refresh_subtree(id);
        id
    }

    /// Removes a node together with its whole subtree.
    pub fn remove_node(&mut self, id: NodeId) {
        let parent = match self.nodes.get(id) {
            Some(node) => node.parent,
            None => return,
        };

        match parent {
            Some(parent_id) => {
                if let Some(parent) = self.nodes.get_mut(parent_id)
                    && let Some(pos) = parent.children.iter().position(|&c| c == id)
                {
                    parent.children.remove(pos);
                }
            }
            None => self.roots.retain(|&r| r != id),
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(removed) = self.nodes.remove(current) {
                stack.extend(removed.children);
            }
            if self.active_camera == Some(current) {
                self.active_camera = None;
            }
        }
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter()
    }

    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, n)| n.name.eq_ignore_ascii_case(name))
            .map(|(id, _)| id)
    }

    pub fn set_local_transform(&mut self, id: NodeId, local: Mat4) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.local_transform = local;
            self.refresh_subtree(id);
        }
    }

    /// Pushes the danglymesh of a mesh node with a world-space force until
    /// cleared with `None`. Returns `false` when `id` is not a mesh.
    pub fn set_applied_force(&mut self, id: NodeId, force: Option<Vec3>) -> bool {
        match self.nodes.get_mut(id).map(|n| &mut n.kind) {
            Some(SceneNodeKind::Mesh(mesh)) => {
                mesh.applied_force = force;
                true
            }
            _ => false,
        }
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.visible = visible;
            self.refresh_subtree(id);
        }
    }

    fn refresh_subtree(&mut self, id: NodeId) {
        let (parent_abs, parent_visible) = match self
            .nodes
            .get(id)
            .and_then(|n| n.parent)
            .and_then(|p| self.nodes.get(p))
        {
            Some(parent) => (parent.absolute_transform, parent.effective_visible),
            None => (Mat4::IDENTITY, true),
        };

        let mut stack = vec![(id, parent_abs, parent_visible)];
        while let Some((current, parent_abs, parent_visible)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(current) else {
                continue;
            };
            node.absolute_transform = match &node.kind {
                // World-space particles ignore the emitter's motion after birth
                SceneNodeKind::Particle(p) if !p.local_space => Mat4::from_translation(p.position),
                _ => parent_abs * node.local_transform,
            };
            node.effective_visible = parent_visible && node.visible;
            for &child in &node.children {
                stack.push((child, node.absolute_transform, node.effective_visible));
            }
        }
    }

    fn refresh_all(&mut self) {
        for root in self.roots.clone() {
            self.refresh_subtree(root);
        }
    }

    // ========================================================================
    // Convenience constructors
    // ========================================================================

    /// Adds a camera; the first camera added becomes the active one.
    pub fn add_camera(&mut self, camera: CameraNode, transform: Mat4, parent: Option<NodeId>) -> NodeId {
        let id = self.add_node(
            SceneNode::new("camera", SceneNodeKind::Camera(camera)).with_transform(transform),
            parent,
        );
        if self.active_camera.is_none() {
            self.active_camera = Some(id);
        }
        id
    }

    pub fn add_light(&mut self, desc: LightDesc, transform: Mat4, parent: Option<NodeId>) -> NodeId {
        self.add_node(
            SceneNode::new("light", SceneNodeKind::Light(LightNode::new(desc))).with_transform(transform),
            parent,
        )
    }

    pub fn add_mesh(&mut self, mesh: ModelMesh, transform: Mat4, parent: Option<NodeId>) -> NodeId {
        let name = mesh.mesh.name.clone();
        self.add_node(
            SceneNode::new(name, SceneNodeKind::Mesh(Box::new(MeshNode::new(mesh)))).with_transform(transform),
            parent,
        )
    }

    pub fn add_trigger(&mut self, trigger: TriggerNode, transform: Mat4) -> NodeId {
        self.add_node(
            SceneNode::new("trigger", SceneNodeKind::Trigger(trigger)).with_transform(transform),
            None,
        )
    }

    /// Instantiates a model (and any models it references) under `parent`.
    ///
    /// Skin bones are resolved by node number against this instance only;
    /// unresolved numbers are logged and skinned as identity.
    pub fn add_model(&mut self, model: Arc<Model>, parent: Option<NodeId>) -> NodeId {
        let root_id = self.add_node(
            SceneNode::new(
                model.name.clone(),
                SceneNodeKind::Model(Box::new(ModelSceneNode::new(Arc::clone(&model)))),
            ),
            parent,
        );

        let mut by_number = FxHashMap::default();
        let mut by_name = FxHashMap::default();
        let mut rest_pose = FxHashMap::default();
        let mut skinned = Vec::new();

        let mut stack: Vec<(&ModelNode, NodeId)> = vec![(&model.root, root_id)];
        while let Some((source, parent_id)) = stack.pop() {
            let skinned_mesh = matches!(&source.payload, ModelNodePayload::Mesh(m) if m.skin.is_some());
            let kind = match &source.payload {
                ModelNodePayload::Dummy | ModelNodePayload::Reference(_) => SceneNodeKind::Dummy,
                ModelNodePayload::Mesh(mesh) => {
                    let mut node = MeshNode::new(mesh.clone());
                    node.model = Some(root_id);
                    node.affected_by_fog = model.affected_by_fog;
                    SceneNodeKind::Mesh(Box::new(node))
                }
                ModelNodePayload::Light(desc) => SceneNodeKind::Light(LightNode::new(desc.clone())),
                ModelNodePayload::Emitter(desc) => {
                    self.next_emitter_seed += 1;
                    SceneNodeKind::Emitter(Box::new(EmitterNode::new(desc.clone(), self.next_emitter_seed)))
                }
            };

            let id = self.add_node(
                SceneNode::new(source.name.clone(), kind).with_transform(source.local_transform()),
                Some(parent_id),
            );
            if skinned_mesh {
                skinned.push(id);
            }
            if let ModelNodePayload::Reference(attached) = &source.payload {
                self.add_model(Arc::clone(attached), Some(id));
            }

            by_number.insert(source.number, id);
            by_name.insert(source.name.to_ascii_lowercase(), id);
            rest_pose.insert(id, (source.position, source.orientation));
            stack.extend(source.children.iter().map(|child| (child, id)));
        }

        for mesh_id in skinned {
            let Some(SceneNodeKind::Mesh(mesh)) = self.nodes.get_mut(mesh_id).map(|n| &mut n.kind) else {
                continue;
            };
            let bones: Vec<Option<NodeId>> = mesh
                .data
                .skin
                .iter()
                .flat_map(|skin| skin.bone_node_numbers.iter())
                .map(|bone| {
                    let resolved = by_number.get(bone).copied();
                    if resolved.is_none() {
                        log::warn!("Model '{}': bone node {} not found", model.name, bone);
                    }
                    resolved
                })
                .collect();
            mesh.bones = bones;
        }

        if let Some(SceneNodeKind::Model(instance)) = self.nodes.get_mut(root_id).map(|n| &mut n.kind) {
            instance.nodes_by_number = by_number;
            instance.nodes_by_name = by_name;
            instance.rest_pose = rest_pose;
        }
        root_id
    }

    /// Starts an animation on a model instance.
    pub fn play_animation(&mut self, model_id: NodeId, name: &str, looping: bool) -> bool {
        match self.nodes.get_mut(model_id).map(|n| &mut n.kind) {
            Some(SceneNodeKind::Model(model)) => model.play(name, looping),
            _ => false,
        }
    }

    /// Triggers whose volume contains `point`.
    #[must_use]
    pub fn triggers_at(&self, point: Vec3) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter_map(|(id, node)| match &node.kind {
                SceneNodeKind::Trigger(t) if t.contains(&node.absolute_transform, point) => Some(id),
                _ => None,
            })
            .collect()
    }

    // ========================================================================
    // Per-frame update
    // ========================================================================

    /// Advances animations, particles, danglymesh physics and light
    /// selection by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        self.time += dt;
        self.advance_animations(dt);
        self.update_emitters(dt);
        self.refresh_all();
        self.update_danglymeshes(dt);
        self.select_lights(dt);
    }

    fn advance_animations(&mut self, dt: f32) {
        let models: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, n)| matches!(n.kind, SceneNodeKind::Model(_)))
            .map(|(id, _)| id)
            .collect();

        for id in models {
            let mut poses: Vec<(NodeId, Vec3, Quat)> = Vec::new();
            if let Some(SceneNodeKind::Model(model)) = self.nodes.get_mut(id).map(|n| &mut n.kind) {
                let Some(state) = model.animation.as_mut() else {
                    continue;
                };
                let Some(animation) = model.model.animation(&state.name).cloned() else {
                    continue;
                };
                state.advance(dt, animation.length);
                let time = state.time;

                for track in &animation.tracks {
                    let Some(target) = model.node_by_name(&track.node_name) else {
                        continue;
                    };
                    let (rest_position, rest_orientation) =
                        model.rest_pose.get(&target).copied().unwrap_or((Vec3::ZERO, Quat::IDENTITY));
                    poses.push((
                        target,
                        track.sample_position(time).unwrap_or(rest_position),
                        track.sample_orientation(time).unwrap_or(rest_orientation),
                    ));
                }
            }
            for (target, position, orientation) in poses {
                if let Some(node) = self.nodes.get_mut(target) {
                    node.local_transform = Mat4::from_rotation_translation(orientation, position);
                }
            }
        }
    }

    fn update_emitters(&mut self, dt: f32) {
        let emitters: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, n)| matches!(n.kind, SceneNodeKind::Emitter(_)))
            .map(|(id, _)| id)
            .collect();

        for id in emitters {
            let children = self.nodes.get(id).map(|n| n.children.clone()).unwrap_or_default();
            let mut alive = 0;
            let mut expired = Vec::new();
            for child in children {
                let Some(node) = self.nodes.get_mut(child) else {
                    continue;
                };
                if let SceneNodeKind::Particle(particle) = &mut node.kind {
                    if particle.advance(dt) {
                        alive += 1;
                        if particle.local_space {
                            node.local_transform = Mat4::from_translation(particle.position);
                        }
                    } else {
                        expired.push(child);
                    }
                }
            }
            for child in expired {
                self.remove_node(child);
            }

            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };
            let emitter_world = node.absolute_transform;
            let SceneNodeKind::Emitter(emitter) = &mut node.kind else {
                continue;
            };
            let births = emitter.births(dt, alive);
            let spawned: Vec<ParticleNode> = (0..births).map(|_| emitter.spawn(&emitter_world)).collect();
            for particle in spawned {
                let local = if particle.local_space {
                    Mat4::from_translation(particle.position)
                } else {
                    Mat4::IDENTITY
                };
                self.add_node(
                    SceneNode::new("particle", SceneNodeKind::Particle(particle)).with_transform(local),
                    Some(id),
                );
            }
        }
    }

    fn update_danglymeshes(&mut self, dt: f32) {
        for node in self.nodes.values_mut() {
            let absolute = node.absolute_transform;
            let SceneNodeKind::Mesh(mesh) = &mut node.kind else {
                continue;
            };
            let world = absolute.w_axis.truncate();
            let previous = mesh.last_world_position.replace(world);
            let applied = mesh.applied_force;
            let Some(dangly) = mesh.danglymesh.as_mut() else {
                continue;
            };
            let force = match (applied, previous) {
                (Some(force), _) => Some(absolute.inverse().transform_vector3(force)),
                (None, Some(previous)) if dt > 0.0 => {
                    let velocity = (world - previous) / dt;
                    (velocity.length_squared() > 1e-8).then(|| absolute.inverse().transform_vector3(velocity))
                }
                _ => None,
            };
            dangly.update(dt, force);
        }
    }

    fn select_lights(&mut self, dt: f32) {
        let camera = self.camera().map(|c| (c.position, c.camera.far));
        let origin = camera.map_or(Vec3::ZERO, |(position, _)| position);

        let mut lights: Vec<ActiveLight> = self
            .nodes
            .iter()
            .filter_map(|(id, node)| match &node.kind {
                SceneNodeKind::Light(light) if light.enabled && node.effective_visible => {
                    Some(ActiveLight::resolve(id, light, &node.absolute_transform))
                }
                _ => None,
            })
            .collect();

        if let Some((position, far)) = camera {
            lights.retain(|l| l.reach_distance(position) <= far);
        }
        lights.sort_by(|a, b| {
            b.is_directional()
                .cmp(&a.is_directional())
                .then_with(|| a.reach_distance(origin).total_cmp(&b.reach_distance(origin)))
                .then_with(|| b.priority.cmp(&a.priority))
        });
        lights.truncate(MAX_LIGHTS);

        let shadow = lights.iter().find(|l| l.casts_shadows && !l.ambient_only).cloned();
        let same_light = match (&self.shadow_light, &shadow) {
            (Some(a), Some(b)) => a.node == b.node,
            (None, None) => true,
            _ => false,
        };
        if !same_light {
            self.shadow_strength = 0.0;
        }
        self.shadow_strength = if shadow.is_some() {
            (self.shadow_strength + dt / SHADOW_FADE_SECONDS).min(1.0)
        } else {
            0.0
        };

        self.shadow_light = shadow;
        self.active_lights = lights;
    }

    // ========================================================================
    // Queries consumed by the pipeline
    // ========================================================================

    pub fn set_active_camera(&mut self, id: Option<NodeId>) {
        self.active_camera = id.filter(|&id| {
            matches!(self.nodes.get(id).map(|n| &n.kind), Some(SceneNodeKind::Camera(_)))
        });
    }

    #[must_use]
    pub fn active_camera(&self) -> Option<NodeId> {
        self.active_camera
    }

    #[must_use]
    pub fn camera(&self) -> Option<CameraView> {
        let node = self.nodes.get(self.active_camera?)?;
        match &node.kind {
            SceneNodeKind::Camera(camera) => Some(CameraView::new(*camera, node.absolute_transform)),
            _ => None,
        }
    }

    /// Lights selected by the last [`update`](Self::update), at most
    /// [`MAX_LIGHTS`].
    #[must_use]
    pub fn active_lights(&self) -> &[ActiveLight] {
        &self.active_lights
    }

    #[must_use]
    pub fn has_shadow_light(&self) -> bool {
        self.shadow_light.is_some()
    }

    /// Node of the light casting shadows this frame.
    #[must_use]
    pub fn shadow_light_node(&self) -> Option<NodeId> {
        self.shadow_light.as_ref().map(|l| l.node)
    }

    #[must_use]
    pub fn is_shadow_light_directional(&self) -> bool {
        self.shadow_light.as_ref().is_some_and(ActiveLight::is_directional)
    }

    /// Position of the shadow light, or the direction towards it for
    /// directional lights.
    #[must_use]
    pub fn shadow_light_position(&self) -> Vec3 {
        self.shadow_light
            .as_ref()
            .map_or(Vec3::ZERO, |l| l.position.truncate())
    }

    #[must_use]
    pub fn shadow_strength(&self) -> f32 {
        self.shadow_strength
    }

    #[must_use]
    pub fn shadow_radius(&self) -> f32 {
        self.shadow_light.as_ref().map_or(0.0, |l| l.radius)
    }

    #[must_use]
    pub fn ambient_light_color(&self) -> Vec3 {
        self.ambient_color
    }

    #[must_use]
    pub fn is_fog_enabled(&self) -> bool {
        self.fog.enabled
    }

    #[must_use]
    pub fn fog_near(&self) -> f32 {
        self.fog.near
    }

    #[must_use]
    pub fn fog_far(&self) -> f32 {
        self.fog.far
    }

    #[must_use]
    pub fn fog_color(&self) -> Vec3 {
        self.fog.color
    }

    // ========================================================================
    // Draw lists
    // ========================================================================

    /// Opaque meshes for the G-buffer, front to back.
    #[must_use]
    pub fn draw_opaque(&self) -> Vec<DrawCall> {
        let Some(camera) = self.camera() else {
            return Vec::new();
        };
        let frustum = camera.frustum();
        let mut draws: Vec<DrawCall> = self
            .visible_meshes()
            .filter(|(_, node, mesh)| {
                mesh.should_render(true) && !mesh.is_transparent() && in_frustum(&frustum, node, mesh)
            })
            .map(|(id, node, mesh)| self.mesh_draw(id, node, mesh, Some(&camera)))
            .collect();
        draws.sort_by(|a, b| a.view_depth.total_cmp(&b.view_depth));
        draws
    }

    /// Transparent meshes and particle batches, back to front.
    #[must_use]
    pub fn draw_transparent(&self) -> Vec<DrawCall> {
        let Some(camera) = self.camera() else {
            return Vec::new();
        };
        let frustum = camera.frustum();
        let mut draws: Vec<DrawCall> = self
            .visible_meshes()
            .filter(|(_, node, mesh)| {
                mesh.should_render(false) && mesh.is_transparent() && in_frustum(&frustum, node, mesh)
            })
            .map(|(id, node, mesh)| self.mesh_draw(id, node, mesh, Some(&camera)))
            .collect();

        for (id, node) in &self.nodes {
            let SceneNodeKind::Emitter(emitter) = &node.kind else {
                continue;
            };
            if !node.effective_visible {
                continue;
            }
            self.particle_draws(id, node, emitter, &camera, &mut draws);
        }

        draws.sort_by(|a, b| b.view_depth.total_cmp(&a.view_depth));
        draws
    }

    /// Shadow casters. Not frustum culled: casters outside the view can
    /// still shade visible geometry.
    #[must_use]
    pub fn draw_shadows(&self) -> Vec<DrawCall> {
        if self.shadow_light.is_none() {
            return Vec::new();
        }
        self.visible_meshes()
            .filter(|(_, _, mesh)| mesh.casts_shadows())
            .map(|(id, node, mesh)| self.mesh_draw(id, node, mesh, None))
            .collect()
    }

    /// Flare elements of active lights whose projection is on screen.
    #[must_use]
    pub fn draw_lens_flares(&self) -> Vec<LensFlareDraw> {
        let Some(camera) = self.camera() else {
            return Vec::new();
        };
        let mut flares = Vec::new();
        for light in &self.active_lights {
            let Some(SceneNodeKind::Light(node)) = self.nodes.get(light.node).map(|n| &n.kind) else {
                continue;
            };
            if node.desc.flares.is_empty() {
                continue;
            }
            let world = if light.is_directional() {
                camera.position + light.position.truncate() * camera.camera.far * 0.99
            } else {
                light.position.truncate()
            };
            let Some(ndc) = camera.project(world) else {
                continue;
            };
            if ndc.x.abs() > 1.0 || ndc.y.abs() > 1.0 || !(0.0..=1.0).contains(&ndc.z) {
                continue;
            }
            let light_ndc = ndc.truncate();
            flares.extend(node.desc.flares.iter().map(|flare| LensFlareDraw {
                texture: flare.texture.clone(),
                center: light_ndc * (1.0 - flare.position),
                size: flare.size,
                color: flare.color,
            }));
        }
        flares
    }

    fn visible_meshes(&self) -> impl Iterator<Item = (NodeId, &SceneNode, &MeshNode)> {
        self.nodes.iter().filter_map(|(id, node)| match &node.kind {
            SceneNodeKind::Mesh(mesh) if node.effective_visible => Some((id, node, &**mesh)),
            _ => None,
        })
    }

    fn mesh_draw(&self, id: NodeId, node: &SceneNode, mesh: &MeshNode, camera: Option<&CameraView>) -> DrawCall {
        let absolute = node.absolute_transform;
        let mut uniforms = mesh.build_uniforms(absolute, self.time);
        if let Some(bones) = self.skin_matrices(mesh, &absolute) {
            uniforms.set_skeletal(bones);
        }
        let center = absolute.transform_point3(mesh.data.mesh.bounds.center());
        let material = &mesh.data.material;
        DrawCall {
            node: id,
            geometry: DrawGeometry::Mesh(Arc::clone(&mesh.data.mesh)),
            textures: MaterialTextures {
                diffuse: material.diffuse.clone(),
                lightmap: material.lightmap.clone(),
                envmap: material.envmap.clone(),
                bumpmap: material.bumpmap.clone(),
            },
            uniforms,
            blend: material.blend,
            view_depth: camera.map_or(0.0, |c| -c.view.transform_point3(center).z),
        }
    }

    /// Bone matrices mapping rest-pose mesh space to animated mesh space.
    fn skin_matrices(&self, mesh: &MeshNode, absolute: &Mat4) -> Option<Vec<Mat4>> {
        let skin = mesh.data.skin.as_ref()?;
        let inverse_mesh = absolute.inverse();
        Some(
            mesh.bones
                .iter()
                .take(MAX_BONES)
                .enumerate()
                .map(|(slot, bone)| {
                    let inverse_bind = skin.inverse_bind_poses.get(slot).copied().unwrap_or(Mat4::IDENTITY);
                    bone.and_then(|b| self.nodes.get(b))
                        .map_or(Mat4::IDENTITY, |b| inverse_mesh * b.absolute_transform * inverse_bind)
                })
                .collect(),
        )
    }

    fn particle_draws(
        &self,
        id: NodeId,
        node: &SceneNode,
        emitter: &EmitterNode,
        camera: &CameraView,
        draws: &mut Vec<DrawCall>,
    ) {
        let instances: Vec<_> = node
            .children
            .iter()
            .filter_map(|&child| {
                let child_node = self.nodes.get(child)?;
                match &child_node.kind {
                    SceneNodeKind::Particle(p) => {
                        let world = if p.local_space {
                            child_node.absolute_transform.w_axis.truncate()
                        } else {
                            p.position
                        };
                        Some(p.instance(&emitter.desc, world))
                    }
                    _ => None,
                }
            })
            .collect();

        let center = node.absolute_transform.w_axis.truncate();
        let view_depth = -camera.view.transform_point3(center).z;
        for chunk in instances.chunks(MAX_PARTICLES_PER_DRAW) {
            let mut general = GeneralUniforms::default();
            let mut features = DrawFeatures::empty();
            if emitter.desc.texture.is_some() {
                features |= DrawFeatures::DIFFUSE;
            }
            if emitter.desc.blend == BlendMode::Additive {
                features |= DrawFeatures::ADDITIVE;
            }
            general.set_features(features);
            let mut uniforms = ShaderUniforms::new(general);
            uniforms.set_particles(chunk.to_vec());
            draws.push(DrawCall {
                node: id,
                geometry: DrawGeometry::Billboard {
                    instances: chunk.len() as u32,
                },
                textures: MaterialTextures {
                    diffuse: emitter.desc.texture.clone(),
                    ..MaterialTextures::default()
                },
                uniforms,
                blend: emitter.desc.blend,
                view_depth,
            });
        }
    }
}

fn in_frustum(frustum: &Frustum, node: &SceneNode, mesh: &MeshNode) -> bool {
    let bounds = mesh.data.mesh.bounds.transform(&node.absolute_transform);
    if bounds.is_empty() {
        return true;
    }
    frustum.intersects_sphere(bounds.center(), bounds.size().length() * 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_clears_active_camera() {
        let mut graph = SceneGraph::new("main");
        let cam = graph.add_camera(CameraNode::new_perspective(60.0, 1.0, 0.1, 100.0), Mat4::IDENTITY, None);
        assert!(graph.camera().is_some());
        graph.remove_node(cam);
        assert!(graph.camera().is_none());
        assert!(graph.is_empty());
    }

    #[test]
    fn set_active_camera_rejects_non_cameras() {
        let mut graph = SceneGraph::new("main");
        let dummy = graph.add_node(SceneNode::new("d", SceneNodeKind::Dummy), None);
        graph.set_active_camera(Some(dummy));
        assert_eq!(graph.active_camera(), None);
    }
}
