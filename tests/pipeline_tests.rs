//! Pipeline Integration Tests
//!
//! Tests for:
//! - A complete frame on a headless device
//! - Attachment sets keyed by resolution
//! - Early outs (no camera, empty resolution)
//!
//! These need a GPU adapter. Without one (or when the adapter cannot host
//! the G-buffer) each test logs the reason and returns.

use std::sync::Arc;

use glam::{Mat4, Vec3};

use odyssey::renderer::{Attachments, GraphicsOptions, GraphicsServices, Pipeline};
use odyssey::resources::{LightDesc, Mesh, MeshMaterial, ModelMesh, Texture};
use odyssey::scene::{CameraNode, SceneGraph};

const SIZE: (u32, u32) = (64, 48);

fn services(options: GraphicsOptions) -> Option<GraphicsServices> {
    let _ = env_logger::builder().is_test(true).try_init();
    match GraphicsServices::new_headless(options) {
        Ok(services) => Some(services),
        Err(e) => {
            log::warn!("Skipping GPU test: {e}");
            None
        }
    }
}

/// A white quad facing a camera at z = 5, lit head-on by a shadowed
/// directional light.
fn lit_scene() -> SceneGraph {
    let mut scene = SceneGraph::new("pipeline");
    scene.ambient_color = Vec3::splat(0.2);
    scene.add_camera(
        CameraNode::new_perspective(60.0, SIZE.0 as f32 / SIZE.1 as f32, 0.1, 100.0),
        Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0)),
        None,
    );
    scene.add_light(
        LightDesc {
            directional: true,
            casts_shadows: true,
            ..LightDesc::default()
        },
        Mat4::from_translation(Vec3::new(0.0, 0.0, 10.0)),
        None,
    );
    let material = MeshMaterial {
        diffuse: Some(Arc::new(Texture::solid("white", [255, 255, 255, 255]))),
        ..MeshMaterial::default()
    };
    scene.add_mesh(
        ModelMesh::new(Arc::new(Mesh::quad("quad", 2.0, 2.0)), material),
        Mat4::IDENTITY,
        None,
    );
    scene.update(0.5);
    scene
}

fn pixel(pixels: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * width + x) * 4) as usize;
    [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
}

fn brightness(p: [u8; 4]) -> u32 {
    u32::from(p[0]) + u32::from(p[1]) + u32::from(p[2])
}

// ============================================================================
// Full frame
// ============================================================================

#[test]
fn lit_quad_reaches_the_output() {
    let Some(mut services) = services(GraphicsOptions::default()) else {
        return;
    };
    let mut pipeline = Pipeline::new(&mut services).expect("Pipeline should build");
    let scene = lit_scene();

    let output = pipeline.draw(&mut services, &scene, SIZE).expect("Scene has a camera");
    assert_eq!((output.width, output.height), SIZE, "Output matches the requested resolution");

    let pixels = services
        .context
        .read_texture_rgba8(&output.texture)
        .expect("Output should be readable");
    assert_eq!(pixels.len(), (SIZE.0 * SIZE.1 * 4) as usize);

    let center = pixel(&pixels, SIZE.0, SIZE.0 / 2, SIZE.1 / 2);
    let corner = pixel(&pixels, SIZE.0, 0, 0);
    assert!(brightness(center) > 0, "Quad should be lit, got {center:?}");
    assert!(
        brightness(center) > brightness(corner),
        "Quad {center:?} should be brighter than the empty background {corner:?}"
    );
}

#[test]
fn every_effect_enabled_still_draws() {
    let options = GraphicsOptions {
        ssao: true,
        ssr: true,
        fxaa: true,
        sharpen: true,
        ..GraphicsOptions::default()
    };
    let Some(mut services) = services(options) else {
        return;
    };
    let mut pipeline = Pipeline::new(&mut services).expect("Pipeline should build");
    let scene = lit_scene();
    assert!(pipeline.draw(&mut services, &scene, SIZE).is_some());
}

#[test]
fn pbr_lighting_builds_and_draws() {
    let options = GraphicsOptions {
        pbr: true,
        ..GraphicsOptions::default()
    };
    let Some(mut services) = services(options) else {
        return;
    };
    let mut pipeline = Pipeline::new(&mut services).expect("Pipeline should build");
    assert!(pipeline.draw(&mut services, &lit_scene(), SIZE).is_some());
}

#[test]
fn services_expose_the_sanitized_options() {
    let options = GraphicsOptions {
        shadow_resolution: 3000,
        pbr: true,
        ..GraphicsOptions::default()
    };
    let Some(services) = services(options) else {
        return;
    };
    assert_eq!(services.options().shadow_resolution, 4096, "Shadow resolution rounds to a power of two");
    assert!(services.options().pbr);
}

// ============================================================================
// Attachments
// ============================================================================

#[test]
fn attachments_are_reused_per_resolution() {
    let Some(mut services) = services(GraphicsOptions::default()) else {
        return;
    };
    let mut pipeline = Pipeline::new(&mut services).expect("Pipeline should build");
    let scene = lit_scene();

    pipeline.draw(&mut services, &scene, SIZE);
    let first: *const Attachments = pipeline.attachments(SIZE).expect("Set exists after a draw");
    pipeline.draw(&mut services, &scene, SIZE);
    assert_eq!(pipeline.attachment_set_count(), 1, "Same resolution shares one set");
    let second: *const Attachments = pipeline.attachments(SIZE).expect("Set still cached");
    assert!(std::ptr::eq(first, second), "Same resolution must return the cached set");

    pipeline.draw(&mut services, &scene, (32, 32));
    assert_eq!(pipeline.attachment_set_count(), 2);
    let other: *const Attachments = pipeline.attachments((32, 32)).expect("Second set exists");
    assert!(!std::ptr::eq(first, other), "Distinct resolutions must use distinct sets");
    let again: *const Attachments = pipeline.attachments(SIZE).expect("First set kept");
    assert!(std::ptr::eq(first, again), "Adding a resolution keeps the earlier set in place");
    assert!(pipeline.backdrop((32, 32)).is_some());

    let half = pipeline.attachments(SIZE).expect("Set exists").half_size();
    assert_eq!(half, (SIZE.0 / 2, SIZE.1 / 2));

    pipeline.clear_attachments();
    assert_eq!(pipeline.attachment_set_count(), 0);
}

// ============================================================================
// Early outs
// ============================================================================

#[test]
fn scene_without_camera_draws_nothing() {
    let Some(mut services) = services(GraphicsOptions::default()) else {
        return;
    };
    let mut pipeline = Pipeline::new(&mut services).expect("Pipeline should build");
    let scene = SceneGraph::new("empty");

    assert!(pipeline.draw(&mut services, &scene, SIZE).is_none());
    assert!(pipeline.draw(&mut services, &lit_scene(), (0, 16)).is_none());
    assert_eq!(pipeline.attachment_set_count(), 0, "Nothing allocated for skipped draws");
}
