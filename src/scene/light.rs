use glam::{Mat4, Vec3, Vec4};

use crate::resources::{GpuLight, LightDesc};

/// Light payload of a scene node.
#[derive(Debug, Clone)]
pub struct LightNode {
    pub desc: LightDesc,
    /// Lights can be switched off without being removed.
    pub enabled: bool,
}

impl LightNode {
    #[must_use]
    pub fn new(desc: LightDesc) -> Self {
        Self { desc, enabled: true }
    }
}

/// A light selected for shading this frame, resolved to world space.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveLight {
    pub node: crate::scene::NodeId,
    /// Position (w = 1) or direction towards the light (w = 0).
    pub position: Vec4,
    pub color: Vec3,
    pub multiplier: f32,
    pub radius: f32,
    pub priority: u32,
    pub ambient_only: bool,
    pub casts_shadows: bool,
}

impl ActiveLight {
    /// Directional lights shine from the direction of their node's
    /// translation; a light at the origin shines from +Z.
    #[must_use]
    pub fn resolve(node: crate::scene::NodeId, light: &LightNode, absolute: &Mat4) -> Self {
        let translation = absolute.w_axis.truncate();
        let position = if light.desc.directional {
            translation.normalize_or(Vec3::Z).extend(0.0)
        } else {
            translation.extend(1.0)
        };
        Self {
            node,
            position,
            color: light.desc.color,
            multiplier: light.desc.multiplier,
            radius: light.desc.radius,
            priority: light.desc.priority,
            ambient_only: light.desc.ambient_only,
            casts_shadows: light.desc.casts_shadows,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_directional(&self) -> bool {
        self.position.w == 0.0
    }

    /// Distance from `point` to the edge of the light's sphere of influence.
    #[must_use]
    pub fn reach_distance(&self, point: Vec3) -> f32 {
        if self.is_directional() {
            return 0.0;
        }
        (self.position.truncate().distance(point) - self.radius).max(0.0)
    }

    #[must_use]
    pub fn to_gpu(&self) -> GpuLight {
        GpuLight {
            position: self.position,
            color: (self.color * self.multiplier).extend(if self.ambient_only { 1.0 } else { 0.0 }),
            params: Vec4::new(self.radius, self.multiplier, 0.0, 0.0),
        }
    }
}
