//! Shadow Algorithm Tests
//!
//! Tests for:
//! - Cascade far planes as fixed fractions of the camera far plane
//! - Frustum slice corners in world space
//! - Cascade view-projection coverage
//! - Point light cube face projections

use glam::{Mat4, Vec3};

use odyssey::renderer::pipeline::shadow_utils::*;
use odyssey::resources::NUM_SHADOW_CASCADES;
use odyssey::scene::{CameraNode, CameraView};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn camera_at(position: Vec3, far: f32) -> CameraView {
    CameraView::new(
        CameraNode::new_perspective(60.0, 16.0 / 9.0, 0.1, far),
        Mat4::from_translation(position),
    )
}

// ============================================================================
// Cascade far planes
// ============================================================================

#[test]
fn cascade_far_planes_follow_fixed_fractions() {
    let far = 1000.0;
    let planes = cascade_far_planes(far);
    let expected = [5.0, 15.0, 45.0, 135.0];
    for i in 0..NUM_SHADOW_CASCADES {
        assert!(
            approx(planes[i], expected[i]),
            "planes[{i}]: expected {}, got {}",
            expected[i],
            planes[i]
        );
    }
}

#[test]
fn cascade_far_planes_strictly_increasing() {
    for far in [10.0, 250.0, 4000.0] {
        let planes = cascade_far_planes(far);
        for i in 1..NUM_SHADOW_CASCADES {
            assert!(
                planes[i] > planes[i - 1],
                "Far planes should strictly increase: planes[{}]={} <= planes[{}]={}",
                i,
                planes[i],
                i - 1,
                planes[i - 1]
            );
        }
    }
}

// ============================================================================
// Frustum corners
// ============================================================================

#[test]
fn frustum_corners_lie_at_slice_depths() {
    let camera = camera_at(Vec3::new(3.0, 1.0, -2.0), 100.0);
    let corners = frustum_corners_world(&camera, 1.0, 10.0);
    for (i, corner) in corners.iter().enumerate() {
        let view_z = -camera.view.transform_point3(*corner).z;
        let expected = if i < 4 { 1.0 } else { 10.0 };
        assert!(approx(view_z, expected), "Corner {i} at depth {view_z}, expected {expected}");
    }
}

#[test]
fn far_corners_are_wider_than_near_corners() {
    let camera = camera_at(Vec3::ZERO, 100.0);
    let corners = frustum_corners_world(&camera, 1.0, 10.0);
    let near_width = corners[0].distance(corners[1]);
    let far_width = corners[4].distance(corners[5]);
    assert!(approx(far_width / near_width, 10.0), "Width ratio {}", far_width / near_width);
}

// ============================================================================
// Cascade view-projections
// ============================================================================

#[test]
fn each_cascade_encloses_its_slice() {
    let camera = camera_at(Vec3::new(0.0, 2.0, 8.0), 500.0);
    let towards_light = Vec3::new(-0.4, 1.0, 0.3).normalize();
    let (matrices, far_planes) = cascade_view_projections(&camera, towards_light, 1024, 20.0);

    let mut near = camera.camera.near;
    for (i, (vp, far)) in matrices.iter().zip(far_planes).enumerate() {
        for corner in frustum_corners_world(&camera, near, far) {
            let ndc = vp.project_point3(corner);
            assert!(
                ndc.x.abs() <= 1.0 + 1e-3 && ndc.y.abs() <= 1.0 + 1e-3,
                "Cascade {i} misses corner {corner:?}: {ndc:?}"
            );
            assert!((-1e-3..=1.0 + 1e-3).contains(&ndc.z), "Cascade {i} depth {}", ndc.z);
        }
        near = far;
    }
}

#[test]
fn casters_towards_the_light_stay_in_range() {
    let camera = camera_at(Vec3::ZERO, 200.0);
    let towards_light = Vec3::Y;
    let (matrices, far_planes) = cascade_view_projections(&camera, towards_light, 2048, 50.0);
    let corners = frustum_corners_world(&camera, camera.camera.near, far_planes[0]);
    let center = corners.iter().copied().sum::<Vec3>() / 8.0;
    let caster = center + towards_light * 40.0;
    let ndc = matrices[0].project_point3(caster);
    assert!((0.0..=1.0).contains(&ndc.z), "Caster above the slice should be in depth range: {ndc:?}");
}

// ============================================================================
// Cube faces
// ============================================================================

#[test]
fn cube_faces_center_their_axis() {
    let position = Vec3::new(2.0, -1.0, 4.0);
    let faces = cube_face_view_projections(position, 12.0);
    let axes = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
    for (i, (vp, axis)) in faces.iter().zip(axes).enumerate() {
        let ndc = vp.project_point3(position + axis * 3.0);
        assert!(ndc.x.abs() < EPSILON && ndc.y.abs() < EPSILON, "Face {i}: {ndc:?}");
        assert!((0.0..=1.0).contains(&ndc.z), "Face {i} depth {}", ndc.z);
    }
}

#[test]
fn cube_faces_reject_points_beyond_radius() {
    let faces = cube_face_view_projections(Vec3::ZERO, 5.0);
    let ndc = faces[0].project_point3(Vec3::X * 6.0);
    assert!(ndc.z > 1.0, "Point past the radius should be clipped, got depth {}", ndc.z);
}
