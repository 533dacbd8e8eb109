use glam::{Mat4, Vec2, Vec3};

/// Invisible volume: a polygon footprint in the node's XY plane extruded
/// upwards by `height`.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerNode {
    pub footprint: Vec<Vec2>,
    pub height: f32,
}

impl TriggerNode {
    #[must_use]
    pub fn new(footprint: Vec<Vec2>, height: f32) -> Self {
        Self { footprint, height }
    }

    /// Whether a world-space point lies inside the trigger placed at `absolute`.
    #[must_use]
    pub fn contains(&self, absolute: &Mat4, point: Vec3) -> bool {
        if self.footprint.len() < 3 {
            return false;
        }
        let local = absolute.inverse().transform_point3(point);
        if local.z < 0.0 || local.z > self.height {
            return false;
        }
        let p = local.truncate();
        let mut inside = false;
        let mut j = self.footprint.len() - 1;
        for (i, a) in self.footprint.iter().enumerate() {
            let b = self.footprint[j];
            if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_footprint_contains_center_only() {
        let t = TriggerNode::new(
            vec![Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0), Vec2::new(2.0, 2.0), Vec2::new(0.0, 2.0)],
            1.0,
        );
        let at = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
        assert!(t.contains(&at, Vec3::new(11.0, 1.0, 0.5)));
        assert!(!t.contains(&at, Vec3::new(1.0, 1.0, 0.5)));
        assert!(!t.contains(&at, Vec3::new(11.0, 1.0, 2.0)));
    }
}
