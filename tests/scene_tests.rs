//! Scene Graph Integration Tests
//!
//! Tests for:
//! - Model instantiation (node numbers, names, lights, emitters)
//! - Draw list contents and ordering (opaque, transparent, shadows)
//! - Light selection policy and shadow light fade
//! - Animation playback, triggers, lens flares
//! - Scene graph registry

use std::sync::Arc;

use glam::{Mat4, Quat, Vec2, Vec3};

use odyssey::resources::{
    Animation, BlendMode, EmitterDesc, Keyframe, LensFlare, LightDesc, Mesh, MeshMaterial, Model, ModelMesh,
    ModelNode, ModelNodePayload, NodeTrack, Texture, MAX_LIGHTS,
};
use odyssey::scene::{
    CameraNode, DrawGeometry, SHADOW_FADE_SECONDS, SceneGraph, SceneGraphs, TriggerNode, MAIN_SCENE,
};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

/// Scene with a camera at z = 10 looking down -Z.
fn scene_with_camera() -> SceneGraph {
    let mut scene = SceneGraph::new("test");
    scene.add_camera(
        CameraNode::new_perspective(60.0, 1.0, 0.1, 200.0),
        Mat4::from_translation(Vec3::new(0.0, 0.0, 10.0)),
        None,
    );
    scene
}

fn textured_material() -> MeshMaterial {
    MeshMaterial {
        diffuse: Some(Arc::new(Texture::solid("white", [255, 255, 255, 255]))),
        ..MeshMaterial::default()
    }
}

fn quad(material: MeshMaterial) -> ModelMesh {
    ModelMesh::new(Arc::new(Mesh::quad("quad", 2.0, 2.0)), material)
}

fn light(desc: LightDesc) -> Model {
    Model::new("light", ModelNode::new("light", 0, ModelNodePayload::Light(desc)))
}

// ============================================================================
// Model instantiation
// ============================================================================

#[test]
fn model_nodes_are_instantiated_with_transforms() {
    let mut scene = scene_with_camera();
    let root = ModelNode::new("body", 0, ModelNodePayload::Dummy).with_child(
        ModelNode::new("head", 1, ModelNodePayload::Mesh(quad(textured_material())))
            .with_transform(Vec3::new(0.0, 1.5, 0.0), Quat::IDENTITY),
    );
    scene.add_model(Arc::new(Model::new("creature", root)), None);

    let head = scene.find_by_name("head").expect("head node should exist");
    let position = scene.node(head).unwrap().absolute_transform().w_axis.truncate();
    assert!(approx(position.y, 1.5), "Head should sit at y = 1.5, got {position:?}");
    assert_eq!(scene.draw_opaque().len(), 1);
}

#[test]
fn model_lights_become_active_lights() {
    let mut scene = scene_with_camera();
    scene.add_model(Arc::new(light(LightDesc::default())), None);
    scene.update(0.016);
    assert_eq!(scene.active_lights().len(), 1);
}

// ============================================================================
// Draw lists
// ============================================================================

#[test]
fn opaque_draws_need_a_diffuse_texture() {
    let mut scene = scene_with_camera();
    scene.add_mesh(quad(MeshMaterial::default()), Mat4::IDENTITY, None);
    assert!(scene.draw_opaque().is_empty(), "Untextured meshes are skipped by the G-buffer");
}

#[test]
fn opaque_draws_are_front_to_back() {
    let mut scene = scene_with_camera();
    let far = scene.add_mesh(quad(textured_material()), Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0)), None);
    let near = scene.add_mesh(quad(textured_material()), Mat4::IDENTITY, None);

    let draws = scene.draw_opaque();
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[0].node, near);
    assert_eq!(draws[1].node, far);
    assert!(draws[0].view_depth < draws[1].view_depth);
}

#[test]
fn transparent_draws_are_back_to_front() {
    let mut scene = scene_with_camera();
    let glass = MeshMaterial {
        alpha: 0.5,
        ..textured_material()
    };
    let near = scene.add_mesh(quad(glass.clone()), Mat4::IDENTITY, None);
    let far = scene.add_mesh(quad(glass), Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0)), None);

    assert!(scene.draw_opaque().is_empty(), "Translucent meshes never reach the G-buffer");
    let draws = scene.draw_transparent();
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[0].node, far);
    assert_eq!(draws[1].node, near);
}

#[test]
fn meshes_behind_the_camera_are_culled() {
    let mut scene = scene_with_camera();
    scene.add_mesh(quad(textured_material()), Mat4::from_translation(Vec3::new(0.0, 0.0, 50.0)), None);
    assert!(scene.draw_opaque().is_empty());
}

#[test]
fn shadow_draws_require_a_shadow_light() {
    let mut scene = scene_with_camera();
    scene.add_mesh(quad(textured_material()), Mat4::IDENTITY, None);
    scene.update(0.016);
    assert!(scene.draw_shadows().is_empty());

    scene.add_light(
        LightDesc {
            casts_shadows: true,
            ..LightDesc::default()
        },
        Mat4::from_translation(Vec3::new(0.0, 3.0, 2.0)),
        None,
    );
    scene.update(0.016);
    assert_eq!(scene.draw_shadows().len(), 1);
}

#[test]
fn no_camera_means_no_draws() {
    let mut scene = SceneGraph::new("empty");
    scene.add_mesh(quad(textured_material()), Mat4::IDENTITY, None);
    assert!(scene.camera().is_none());
    assert!(scene.draw_opaque().is_empty());
    assert!(scene.draw_transparent().is_empty());
    assert!(scene.draw_lens_flares().is_empty());
}

// ============================================================================
// Lights
// ============================================================================

#[test]
fn directional_lights_sort_first() {
    let mut scene = scene_with_camera();
    scene.add_light(LightDesc::default(), Mat4::from_translation(Vec3::new(0.0, 0.0, 9.0)), None);
    scene.add_light(
        LightDesc {
            directional: true,
            ..LightDesc::default()
        },
        Mat4::from_translation(Vec3::new(1.0, 1.0, 0.0)),
        None,
    );
    scene.update(0.016);

    let lights = scene.active_lights();
    assert_eq!(lights.len(), 2);
    assert!(lights[0].is_directional(), "Directional light should come first");
}

#[test]
fn active_lights_are_capped() {
    let mut scene = scene_with_camera();
    for i in 0..MAX_LIGHTS + 4 {
        scene.add_light(LightDesc::default(), Mat4::from_translation(Vec3::new(i as f32, 0.0, 0.0)), None);
    }
    scene.update(0.016);
    assert_eq!(scene.active_lights().len(), MAX_LIGHTS);
}

#[test]
fn lights_out_of_reach_are_dropped() {
    let mut scene = scene_with_camera();
    scene.add_light(
        LightDesc {
            radius: 1.0,
            ..LightDesc::default()
        },
        Mat4::from_translation(Vec3::new(0.0, 0.0, -500.0)),
        None,
    );
    scene.update(0.016);
    assert!(scene.active_lights().is_empty());
}

#[test]
fn shadow_strength_fades_in() {
    let mut scene = scene_with_camera();
    scene.add_light(
        LightDesc {
            casts_shadows: true,
            ..LightDesc::default()
        },
        Mat4::IDENTITY,
        None,
    );
    scene.update(SHADOW_FADE_SECONDS * 0.25);
    assert!(scene.has_shadow_light());
    assert!(
        approx(scene.shadow_strength(), 0.25),
        "Strength should be a quarter in, got {}",
        scene.shadow_strength()
    );
    scene.update(SHADOW_FADE_SECONDS * 2.0);
    assert!(approx(scene.shadow_strength(), 1.0));
}

#[test]
fn changing_shadow_light_restarts_fade() {
    let mut scene = scene_with_camera();
    let shadowed = LightDesc {
        casts_shadows: true,
        ..LightDesc::default()
    };
    let first = scene.add_light(shadowed.clone(), Mat4::IDENTITY, None);
    scene.update(SHADOW_FADE_SECONDS * 2.0);
    assert!(approx(scene.shadow_strength(), 1.0));

    let second = scene.add_light(shadowed, Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0)), None);
    scene.set_visible(first, false);
    scene.update(SHADOW_FADE_SECONDS * 0.5);
    assert_eq!(scene.shadow_light_node(), Some(second));
    assert!(approx(scene.shadow_strength(), 0.5), "Got {}", scene.shadow_strength());
}

#[test]
fn ambient_only_lights_never_cast_shadows() {
    let mut scene = scene_with_camera();
    scene.add_light(
        LightDesc {
            casts_shadows: true,
            ambient_only: true,
            ..LightDesc::default()
        },
        Mat4::IDENTITY,
        None,
    );
    scene.update(0.016);
    assert!(!scene.has_shadow_light());
}

#[test]
fn directional_shadow_light_reports_direction() {
    let mut scene = scene_with_camera();
    scene.add_light(
        LightDesc {
            directional: true,
            casts_shadows: true,
            ..LightDesc::default()
        },
        Mat4::from_translation(Vec3::new(0.0, 20.0, 0.0)),
        None,
    );
    scene.update(0.016);
    assert!(scene.is_shadow_light_directional());
    let direction = scene.shadow_light_position();
    assert!(approx(direction.y, 1.0), "Direction towards the light should be +Y, got {direction:?}");
}

// ============================================================================
// Animation
// ============================================================================

#[test]
fn animation_moves_model_nodes() {
    let mut scene = scene_with_camera();
    let root = ModelNode::new("root", 0, ModelNodePayload::Dummy)
        .with_child(ModelNode::new("arm", 1, ModelNodePayload::Dummy));
    let mut model = Model::new("puppet", root);
    model.animations.push(Arc::new(Animation {
        name: "wave".to_string(),
        length: 1.0,
        tracks: vec![NodeTrack {
            node_name: "arm".to_string(),
            positions: vec![
                Keyframe {
                    time: 0.0,
                    value: Vec3::ZERO,
                },
                Keyframe {
                    time: 1.0,
                    value: Vec3::new(2.0, 0.0, 0.0),
                },
            ],
            orientations: Vec::new(),
        }],
    }));
    let instance = scene.add_model(Arc::new(model), None);

    assert!(scene.play_animation(instance, "wave", true));
    assert!(!scene.play_animation(instance, "missing", true));
    scene.update(0.5);

    let arm = scene.find_by_name("arm").unwrap();
    let x = scene.node(arm).unwrap().absolute_transform().w_axis.x;
    assert!(approx(x, 1.0), "Arm should be halfway, got {x}");
}

// ============================================================================
// Emitters
// ============================================================================

#[test]
fn emitters_produce_instanced_billboards() {
    let mut scene = scene_with_camera();
    let emitter = EmitterDesc {
        birthrate: 10.0,
        lifetime: 5.0,
        blend: BlendMode::Additive,
        ..EmitterDesc::default()
    };
    scene.add_model(
        Arc::new(Model::new(
            "fire",
            ModelNode::new("emitter", 0, ModelNodePayload::Emitter(emitter)),
        )),
        None,
    );
    scene.update(0.5);

    let draws = scene.draw_transparent();
    let billboards: Vec<u32> = draws
        .iter()
        .filter_map(|d| match d.geometry {
            DrawGeometry::Billboard { instances } => Some(instances),
            DrawGeometry::Mesh(_) => None,
        })
        .collect();
    assert_eq!(billboards, vec![5], "Ten per second for half a second");
}

// ============================================================================
// Triggers
// ============================================================================

#[test]
fn triggers_contain_points_inside_their_volume() {
    let mut scene = SceneGraph::new("module");
    let footprint = vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(4.0, 0.0),
        Vec2::new(4.0, 4.0),
        Vec2::new(0.0, 4.0),
    ];
    let trigger = scene.add_trigger(TriggerNode::new(footprint, 2.0), Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)));

    assert_eq!(scene.triggers_at(Vec3::new(12.0, 2.0, 1.0)), vec![trigger]);
    assert!(scene.triggers_at(Vec3::new(2.0, 2.0, 1.0)).is_empty());
    assert!(scene.triggers_at(Vec3::new(12.0, 2.0, 3.0)).is_empty(), "Above the trigger height");
}

// ============================================================================
// Lens flares
// ============================================================================

#[test]
fn lens_flares_follow_visible_lights() {
    let mut scene = scene_with_camera();
    let desc = LightDesc {
        flares: vec![LensFlare {
            texture: None,
            position: 0.5,
            size: 0.1,
            color: Vec3::ONE,
        }],
        ..LightDesc::default()
    };
    scene.add_light(desc.clone(), Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0)), None);
    scene.update(0.016);

    let flares = scene.draw_lens_flares();
    assert_eq!(flares.len(), 1);
    assert!(flares[0].center.x > 0.0, "Flare should sit right of center, got {:?}", flares[0].center);

    let mut behind = scene_with_camera();
    behind.add_light(desc, Mat4::from_translation(Vec3::new(0.0, 0.0, 15.0)), None);
    behind.update(0.016);
    assert!(behind.draw_lens_flares().is_empty(), "Lights behind the camera have no flare");
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn registry_creates_and_removes_scenes() {
    let mut scenes = SceneGraphs::new();
    scenes.get_or_create(MAIN_SCENE);
    scenes.get_or_create("portrait");
    assert!(scenes.get("portrait").is_some());

    scenes.update_all(0.25);
    assert!(approx(scenes.get(MAIN_SCENE).unwrap().time(), 0.25));

    assert!(scenes.remove("portrait").is_some());
    assert!(scenes.remove("portrait").is_none());
    assert_eq!(scenes.names().count(), 1);
}
