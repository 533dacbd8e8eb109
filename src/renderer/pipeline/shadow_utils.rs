//! Shadow Utilities
//!
//! Pure math for the shadow pass, kept apart from GPU code for testability.
//!
//! - Cascade far planes as fixed fractions of the camera far plane
//! - Frustum slice corners in world space
//! - Tight orthographic view-projection per cascade
//! - Six cube face view-projections for point lights

use glam::{Mat4, Vec3};

use crate::resources::NUM_SHADOW_CASCADES;
use crate::scene::CameraView;

/// Far plane of each cascade as a fraction of the camera far plane.
pub const CASCADE_DIVISORS: [f32; NUM_SHADOW_CASCADES] = [0.005, 0.015, 0.045, 0.135];

/// Near plane of the point light cube projections.
pub const CUBE_NEAR: f32 = 0.05;

// ============================================================================
// Cascades
// ============================================================================

/// View-space far distance of each cascade.
#[must_use]
pub fn cascade_far_planes(camera_far: f32) -> [f32; NUM_SHADOW_CASCADES] {
    CASCADE_DIVISORS.map(|d| camera_far * d)
}

/// World-space corners of the camera frustum between `slice_near` and
/// `slice_far` (view-space distances). Near face first.
#[must_use]
pub fn frustum_corners_world(camera: &CameraView, slice_near: f32, slice_far: f32) -> [Vec3; 8] {
    let tan_half_fov = (camera.camera.fov_y * 0.5).tan();
    let aspect = camera.camera.aspect;

    let h_near = tan_half_fov * slice_near;
    let w_near = h_near * aspect;
    let h_far = tan_half_fov * slice_far;
    let w_far = h_far * aspect;

    // RH view space: -Z is forward
    let corners_view = [
        Vec3::new(-w_near, -h_near, -slice_near),
        Vec3::new(w_near, -h_near, -slice_near),
        Vec3::new(w_near, h_near, -slice_near),
        Vec3::new(-w_near, h_near, -slice_near),
        Vec3::new(-w_far, -h_far, -slice_far),
        Vec3::new(w_far, -h_far, -slice_far),
        Vec3::new(w_far, h_far, -slice_far),
        Vec3::new(-w_far, h_far, -slice_far),
    ];

    corners_view.map(|c| camera.world.transform_point3(c))
}

/// Orthographic view-projection tightly enclosing `corners` as seen from a
/// directional light shining along `light_direction`.
///
/// The depth range is pushed towards the light by `caster_extension` so
/// casters outside the slice still land in the map. Bounds are snapped to
/// the texel grid to avoid shimmering while the camera moves.
#[must_use]
pub fn cascade_view_projection(
    light_direction: Vec3,
    corners: &[Vec3; 8],
    shadow_map_size: u32,
    caster_extension: f32,
) -> Mat4 {
    let dir = light_direction.normalize_or(-Vec3::Z);
    let center = corners.iter().copied().sum::<Vec3>() / 8.0;
    let up = if dir.y.abs() > 0.99 { Vec3::X } else { Vec3::Y };
    let light_view = Mat4::look_at_rh(center - dir, center, up);

    let mut ls_min = Vec3::splat(f32::MAX);
    let mut ls_max = Vec3::splat(f32::MIN);
    for c in corners {
        let ls = light_view.transform_point3(*c);
        ls_min = ls_min.min(ls);
        ls_max = ls_max.max(ls);
    }

    // In RH light view, max z is towards the light
    let z_range = (ls_max.z - ls_min.z).max(1.0);
    ls_max.z += caster_extension.max(z_range);
    ls_min.z -= z_range;

    let texel_x = (ls_max.x - ls_min.x) / shadow_map_size as f32;
    let texel_y = (ls_max.y - ls_min.y) / shadow_map_size as f32;
    if texel_x > 0.0 {
        ls_min.x = (ls_min.x / texel_x).floor() * texel_x;
        ls_max.x = (ls_max.x / texel_x).ceil() * texel_x;
    }
    if texel_y > 0.0 {
        ls_min.y = (ls_min.y / texel_y).floor() * texel_y;
        ls_max.y = (ls_max.y / texel_y).ceil() * texel_y;
    }

    let proj = Mat4::orthographic_rh(ls_min.x, ls_max.x, ls_min.y, ls_max.y, -ls_max.z, -ls_min.z);
    proj * light_view
}

/// View-projections of all cascades for a light whose direction towards the
/// light is `towards_light`.
#[must_use]
pub fn cascade_view_projections(
    camera: &CameraView,
    towards_light: Vec3,
    shadow_map_size: u32,
    caster_extension: f32,
) -> ([Mat4; NUM_SHADOW_CASCADES], [f32; NUM_SHADOW_CASCADES]) {
    let far_planes = cascade_far_planes(camera.camera.far);
    let mut matrices = [Mat4::IDENTITY; NUM_SHADOW_CASCADES];
    let mut slice_near = camera.camera.near;
    for (i, &slice_far) in far_planes.iter().enumerate() {
        let corners = frustum_corners_world(camera, slice_near, slice_far.max(slice_near + 1e-3));
        matrices[i] = cascade_view_projection(-towards_light, &corners, shadow_map_size, caster_extension);
        slice_near = slice_far;
    }
    (matrices, far_planes)
}

// ============================================================================
// Point light cube
// ============================================================================

/// View-projections of the six cube faces in +X, -X, +Y, -Y, +Z, -Z order.
///
/// The projection is mirrored vertically so the rendered faces match the
/// texture-space orientation that cube sampling expects.
#[must_use]
pub fn cube_face_view_projections(position: Vec3, radius: f32) -> [Mat4; 6] {
    const FACES: [(Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::NEG_Y),
        (Vec3::NEG_X, Vec3::NEG_Y),
        (Vec3::Y, Vec3::Z),
        (Vec3::NEG_Y, Vec3::NEG_Z),
        (Vec3::Z, Vec3::NEG_Y),
        (Vec3::NEG_Z, Vec3::NEG_Y),
    ];
    let far = radius.max(CUBE_NEAR * 2.0);
    let proj = Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0))
        * Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, CUBE_NEAR, far);
    FACES.map(|(forward, up)| proj * Mat4::look_at_rh(position, position + forward, up))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::CameraNode;

    fn camera() -> CameraView {
        CameraView::new(CameraNode::new_perspective(60.0, 1.5, 0.1, 1000.0), Mat4::IDENTITY)
    }

    #[test]
    fn cascade_corners_lie_inside_their_cascade() {
        let camera = camera();
        let (matrices, far_planes) = cascade_view_projections(&camera, Vec3::new(0.3, 1.0, 0.2), 2048, 50.0);
        let mut near = camera.camera.near;
        for (vp, far) in matrices.iter().zip(far_planes) {
            for corner in frustum_corners_world(&camera, near, far) {
                let clip = vp.project_point3(corner);
                assert!(clip.x.abs() <= 1.0 + 1e-3 && clip.y.abs() <= 1.0 + 1e-3, "{clip:?}");
                assert!((-1e-3..=1.0 + 1e-3).contains(&clip.z), "{clip:?}");
            }
            near = far;
        }
    }

    #[test]
    fn cube_faces_look_along_their_axis() {
        let faces = cube_face_view_projections(Vec3::ZERO, 10.0);
        let targets = [Vec3::X, -Vec3::X, Vec3::Y, -Vec3::Y, Vec3::Z, -Vec3::Z];
        for (vp, target) in faces.iter().zip(targets) {
            let ndc = vp.project_point3(target * 5.0);
            assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4, "{ndc:?}");
            assert!((0.0..=1.0).contains(&ndc.z));
        }
    }
}
