use glam::{Mat4, Vec3, Vec4};

/// Perspective camera payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraNode {
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl CameraNode {
    /// `fov_y_degrees` is converted to radians.
    #[must_use]
    pub fn new_perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    #[must_use]
    pub fn projection(&self) -> Mat4 {
        // glam's perspective_rh maps depth to [0, 1] as wgpu expects
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }
}

/// Camera state resolved against its node's absolute transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub camera: CameraNode,
    pub world: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub position: Vec3,
}

impl CameraView {
    #[must_use]
    pub fn new(camera: CameraNode, world: Mat4) -> Self {
        Self {
            camera,
            world,
            view: world.inverse(),
            projection: camera.projection(),
            position: world.w_axis.truncate(),
        }
    }

    #[inline]
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    #[must_use]
    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(self.view_projection())
    }

    /// Normalised device coordinates of a world point, `None` behind the camera.
    #[must_use]
    pub fn project(&self, point: Vec3) -> Option<Vec3> {
        let clip = self.view_projection() * point.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        Some(clip.truncate() / clip.w)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Frustum {
    planes: [Vec4; 6], // Left, Right, Bottom, Top, Near, Far
}

impl Frustum {
    /// Gribb-Hartmann plane extraction for a `[0, 1]` depth range.
    #[must_use]
    pub fn from_matrix(m: Mat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];

        let mut planes = [
            rows[3] + rows[0],
            rows[3] - rows[0],
            rows[3] + rows[1],
            rows[3] - rows[1],
            rows[2],
            rows[3] - rows[2],
        ];

        for plane in &mut planes {
            let length = plane.truncate().length();
            if length > f32::EPSILON {
                *plane /= length;
            }
        }

        Self { planes }
    }

    #[must_use]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(center) + plane.w >= -radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_inverts_world() {
        let world = Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0));
        let view = CameraView::new(CameraNode::new_perspective(60.0, 1.0, 0.1, 100.0), world);
        assert!((view.position - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-6);
        let origin = view.view.transform_point3(Vec3::ZERO);
        assert!((origin.z + 5.0).abs() < 1e-5);
    }

    #[test]
    fn frustum_culls_spheres_behind() {
        let view = CameraView::new(CameraNode::new_perspective(60.0, 1.0, 0.1, 100.0), Mat4::IDENTITY);
        let frustum = view.frustum();
        assert!(frustum.intersects_sphere(Vec3::new(0.0, 0.0, -10.0), 1.0));
        assert!(!frustum.intersects_sphere(Vec3::new(0.0, 0.0, 10.0), 1.0));
        assert!(view.project(Vec3::new(0.0, 0.0, 10.0)).is_none());
    }
}
