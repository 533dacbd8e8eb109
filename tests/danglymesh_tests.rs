//! Danglymesh Physics Tests
//!
//! Tests for:
//! - Decay without force (including dt = 0)
//! - Zero-crossing snap: the stride settles at exactly 0.0
//! - Per-axis clamping under a sustained force
//! - Scene integration: a moving node or an applied force drives its danglymesh

use std::sync::Arc;

use glam::{Mat4, Vec3};

use odyssey::resources::{DanglymeshParams, Mesh, MeshMaterial, ModelMesh};
use odyssey::scene::{Danglymesh, MeshNode, SceneGraph, SceneNode, SceneNodeKind};

const EPSILON: f32 = 1e-6;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn params() -> DanglymeshParams {
    DanglymeshParams {
        period: 2.0,
        tightness: 1.0,
        displacement: 0.3,
    }
}

// ============================================================================
// Decay
// ============================================================================

#[test]
fn zero_dt_leaves_stride_unchanged() {
    let mut dangly = Danglymesh::new(params());
    dangly.set_stride(Vec3::new(0.2, -0.1, 0.05));
    dangly.update(0.0, None);
    assert_eq!(dangly.stride(), Vec3::new(0.2, -0.1, 0.05));
}

#[test]
fn decay_shrinks_every_axis() {
    let mut dangly = Danglymesh::new(params());
    dangly.set_stride(Vec3::new(0.2, -0.1, 0.0));
    dangly.update(0.1, None);
    let stride = dangly.stride();
    assert!(approx(stride.x, 0.16), "x should decay to 0.16, got {}", stride.x);
    assert!(approx(stride.y, -0.08), "y should decay to -0.08, got {}", stride.y);
    assert_eq!(stride.z, 0.0);
}

#[test]
fn overshooting_decay_snaps_to_exact_zero() {
    let mut dangly = Danglymesh::new(params());
    dangly.set_stride(Vec3::new(0.1, -0.1, 0.1));
    // period * dt = 1.5 carries every axis past zero
    dangly.update(0.75, None);
    assert_eq!(dangly.stride(), Vec3::ZERO, "Stride should snap to zero, got {:?}", dangly.stride());
}

#[test]
fn decay_never_oscillates() {
    let mut dangly = Danglymesh::new(params());
    dangly.set_stride(Vec3::new(0.25, 0.0, 0.0));
    let mut previous = dangly.stride().x;
    for _ in 0..200 {
        dangly.update(0.05, None);
        let x = dangly.stride().x;
        assert!(x >= 0.0, "Stride crossed zero: {x}");
        assert!(x <= previous, "Stride grew during decay: {previous} -> {x}");
        previous = x;
    }
}

// ============================================================================
// Force
// ============================================================================

#[test]
fn sustained_force_is_clamped_per_axis() {
    let mut dangly = Danglymesh::new(params());
    for _ in 0..100 {
        dangly.update(0.1, Some(Vec3::new(5.0, -5.0, 0.01)));
    }
    let stride = dangly.stride();
    assert!(approx(stride.x, -0.3), "x should clamp to -displacement, got {}", stride.x);
    assert!(approx(stride.y, 0.3), "y should clamp to +displacement, got {}", stride.y);
    assert!(stride.z.abs() <= 0.3 + EPSILON);
}

#[test]
fn force_then_release_returns_to_rest() {
    let mut dangly = Danglymesh::new(params());
    dangly.update(0.1, Some(Vec3::X));
    assert!(dangly.stride().x < 0.0);
    for _ in 0..500 {
        dangly.update(0.1, None);
    }
    assert_eq!(dangly.stride().x, 0.0, "Stride should settle at rest, got {}", dangly.stride().x);
}

#[test]
fn gradual_decay_settles_at_exact_zero() {
    let mut dangly = Danglymesh::new(DanglymeshParams {
        displacement: 0.5,
        ..params()
    });
    dangly.set_stride(Vec3::new(0.25, 0.0, 0.0));
    // period * dt = 0.1 never overshoots, so only the settle threshold ends the decay
    let steps = (0..1000).find(|_| {
        dangly.update(0.05, None);
        dangly.stride().x == 0.0
    });
    assert!(steps.is_some(), "Stride should reach 0.0, got {:e}", dangly.stride().x);
    for _ in 0..10 {
        dangly.update(0.05, None);
        assert_eq!(dangly.stride().x, 0.0, "Stride should stay at rest");
    }
}

// ============================================================================
// Scene integration
// ============================================================================

#[test]
fn moving_node_displaces_its_danglymesh() {
    let mut scene = SceneGraph::new("dangly");
    let mut data = ModelMesh::new(Arc::new(Mesh::quad("cloth", 1.0, 1.0)), MeshMaterial::default());
    data.danglymesh = Some(params());
    let mut node = MeshNode::new(data);
    node.affected_by_fog = false;
    let id = scene.add_node(SceneNode::new("cloth", SceneNodeKind::Mesh(Box::new(node))), None);

    scene.update(0.1);
    scene.set_local_transform(id, Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)));
    scene.update(0.1);

    let Some(SceneNodeKind::Mesh(mesh)) = scene.node(id).map(|n| &n.kind) else {
        panic!("cloth node should stay a mesh");
    };
    let stride = mesh.danglymesh.as_ref().map(Danglymesh::stride).unwrap_or_default();
    assert!(stride.x < 0.0, "Stride should trail the motion, got {stride:?}");
}

#[test]
fn applied_force_pushes_a_static_danglymesh() {
    let mut scene = SceneGraph::new("dangly");
    let mut data = ModelMesh::new(Arc::new(Mesh::quad("flag", 1.0, 1.0)), MeshMaterial::default());
    data.danglymesh = Some(params());
    let id = scene.add_node(SceneNode::new("flag", SceneNodeKind::Mesh(Box::new(MeshNode::new(data)))), None);
    // Rotated a quarter turn about Z, so world +X is object -Y
    scene.set_local_transform(id, Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2));

    assert!(scene.set_applied_force(id, Some(Vec3::X)), "Mesh nodes accept a force");
    scene.update(0.1);

    let stride = |scene: &SceneGraph| match scene.node(id).map(|n| &n.kind) {
        Some(SceneNodeKind::Mesh(mesh)) => mesh.danglymesh.as_ref().map(Danglymesh::stride).unwrap_or_default(),
        _ => panic!("flag node should stay a mesh"),
    };
    let pushed = stride(&scene);
    assert!(approx(pushed.y, 0.2), "Object-space stride should move against the force, got {pushed:?}");
    assert!(approx(pushed.x, 0.0), "Force has no object X component, got {pushed:?}");

    scene.set_applied_force(id, None);
    scene.update(0.1);
    assert!(stride(&scene).y < pushed.y, "Released stride should decay");
}

#[test]
fn applied_force_is_ignored_on_non_mesh_nodes() {
    let mut scene = SceneGraph::new("dangly");
    let id = scene.add_node(SceneNode::new("empty", SceneNodeKind::Dummy), None);
    assert!(!scene.set_applied_force(id, Some(Vec3::X)));
}
